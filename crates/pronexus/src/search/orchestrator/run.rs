use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{ErrorClass, OrchestratorError, SearchError};
use crate::search::audit::AuditFinding;
use crate::search::domain::{CandidateId, CandidateRecord, RoleId, RoleProfile};
use crate::search::evaluation::EvaluationResult;
use crate::search::matchmaker::Recommendation;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a search run. Stages advance strictly in declaration order; `Failed` is
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Created,
    Sourcing,
    Auditing,
    Evaluating,
    Matchmaking,
    Completed,
    Failed,
}

impl SearchState {
    /// The single state that may follow this one on the happy path.
    pub const fn next(self) -> Option<Self> {
        match self {
            SearchState::Created => Some(SearchState::Sourcing),
            SearchState::Sourcing => Some(SearchState::Auditing),
            SearchState::Auditing => Some(SearchState::Evaluating),
            SearchState::Evaluating => Some(SearchState::Matchmaking),
            SearchState::Matchmaking => Some(SearchState::Completed),
            SearchState::Completed | SearchState::Failed => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, SearchState::Completed | SearchState::Failed)
    }

    pub fn can_transition_to(self, target: SearchState) -> bool {
        if target == SearchState::Failed {
            return !self.is_terminal();
        }
        self.next() == Some(target)
    }

    pub const fn label(self) -> &'static str {
        match self {
            SearchState::Created => "created",
            SearchState::Sourcing => "sourcing",
            SearchState::Auditing => "auditing",
            SearchState::Evaluating => "evaluating",
            SearchState::Matchmaking => "matchmaking",
            SearchState::Completed => "completed",
            SearchState::Failed => "failed",
        }
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunErrorEntry {
    pub stage: SearchState,
    pub candidate_id: Option<CandidateId>,
    pub class: ErrorClass,
    pub code: String,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub state: SearchState,
    pub at: DateTime<Utc>,
}

/// Aggregate root for one search. Only the orchestrator mutates it; callers receive
/// cloned snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRun {
    run_id: RunId,
    profile: RoleProfile,
    state: SearchState,
    candidates: Vec<CandidateRecord>,
    evaluations: BTreeMap<CandidateId, EvaluationResult>,
    audits: BTreeMap<CandidateId, AuditFinding>,
    excluded: BTreeSet<CandidateId>,
    recommendations: Vec<Recommendation>,
    error_log: Vec<RunErrorEntry>,
    history: Vec<StateTransition>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SearchRun {
    pub(crate) fn new(run_id: RunId, profile: RoleProfile) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            profile,
            state: SearchState::Created,
            candidates: Vec::new(),
            evaluations: BTreeMap::new(),
            audits: BTreeMap::new(),
            excluded: BTreeSet::new(),
            recommendations: Vec::new(),
            error_log: Vec::new(),
            history: vec![StateTransition {
                state: SearchState::Created,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn profile(&self) -> &RoleProfile {
        &self.profile
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn candidates(&self) -> &[CandidateRecord] {
        &self.candidates
    }

    pub fn evaluations(&self) -> &BTreeMap<CandidateId, EvaluationResult> {
        &self.evaluations
    }

    pub fn audits(&self) -> &BTreeMap<CandidateId, AuditFinding> {
        &self.audits
    }

    /// Candidates dropped from later stages after an isolated failure.
    pub fn excluded(&self) -> &BTreeSet<CandidateId> {
        &self.excluded
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn error_log(&self) -> &[RunErrorEntry] {
        &self.error_log
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn has_candidate(&self, candidate_id: &CandidateId) -> bool {
        self.candidates
            .iter()
            .any(|candidate| &candidate.id == candidate_id)
    }

    pub(crate) fn transition(
        &mut self,
        target: SearchState,
        operation: &'static str,
    ) -> Result<(), OrchestratorError> {
        if !self.state.can_transition_to(target) {
            return Err(OrchestratorError::InvalidState {
                run_id: self.run_id.clone(),
                state: self.state,
                operation,
            });
        }
        self.state = target;
        self.touch();
        self.history.push(StateTransition {
            state: target,
            at: self.updated_at,
        });
        Ok(())
    }

    /// Store sourced records, dropping repeated identifiers into the error log.
    pub(crate) fn record_candidates(&mut self, records: Vec<CandidateRecord>) -> bool {
        if self.state != SearchState::Sourcing {
            return false;
        }
        let mut seen = BTreeSet::new();
        for record in records {
            if seen.insert(record.id.clone()) {
                self.candidates.push(record);
            } else {
                self.log(SearchError::DuplicateCandidate(record.id));
            }
        }
        self.touch();
        true
    }

    /// Write one candidate's audit. Ignored once the run is terminal or for unknown ids.
    pub(crate) fn record_audit(&mut self, finding: AuditFinding) -> bool {
        if self.state != SearchState::Auditing || !self.has_candidate(&finding.candidate_id) {
            return false;
        }
        self.audits.insert(finding.candidate_id.clone(), finding);
        self.touch();
        true
    }

    pub(crate) fn record_evaluation(&mut self, result: EvaluationResult) -> bool {
        if self.state != SearchState::Evaluating
            || !self.audits.contains_key(&result.candidate_id)
            || self.excluded.contains(&result.candidate_id)
        {
            return false;
        }
        self.evaluations
            .insert(result.candidate_id.clone(), result);
        self.touch();
        true
    }

    /// Exclude a candidate after an isolated failure in the current stage.
    pub(crate) fn exclude(&mut self, candidate_id: CandidateId, error: SearchError) -> bool {
        if self.state.is_terminal() || !self.has_candidate(&candidate_id) {
            return false;
        }
        self.excluded.insert(candidate_id);
        self.log(error);
        true
    }

    pub(crate) fn set_recommendations(&mut self, recommendations: Vec<Recommendation>) -> bool {
        if self.state != SearchState::Matchmaking {
            return false;
        }
        self.recommendations = recommendations;
        self.touch();
        true
    }

    /// Record a run-fatal error and move to `Failed`.
    pub(crate) fn fail(&mut self, error: SearchError) -> Result<(), OrchestratorError> {
        let stage = self.state;
        self.transition(SearchState::Failed, "fail")?;
        self.push_entry(stage, error);
        Ok(())
    }

    /// Candidates that passed auditing and are still in the run.
    pub(crate) fn audited_survivors(&self) -> Vec<CandidateRecord> {
        self.candidates
            .iter()
            .filter(|candidate| {
                self.audits.contains_key(&candidate.id) && !self.excluded.contains(&candidate.id)
            })
            .cloned()
            .collect()
    }

    /// Audits of candidates that also hold an evaluation.
    pub(crate) fn paired_audits(&self) -> BTreeMap<CandidateId, AuditFinding> {
        self.audits
            .iter()
            .filter(|(id, _)| self.evaluations.contains_key(*id))
            .map(|(id, finding)| (id.clone(), finding.clone()))
            .collect()
    }

    fn log(&mut self, error: SearchError) {
        self.push_entry(self.state, error);
    }

    fn push_entry(&mut self, stage: SearchState, error: SearchError) {
        self.touch();
        self.error_log.push(RunErrorEntry {
            stage,
            candidate_id: error.candidate_id().cloned(),
            class: error.class(),
            code: error.code().to_string(),
            message: error.to_string(),
            recorded_at: self.updated_at,
        });
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            role: self.profile.role,
            state: self.state,
            candidates: self.candidates.len(),
            excluded: self.excluded.len(),
            recommendations: self.recommendations.len(),
            errors: self.error_log.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Ranked shortlist joined with candidate names, for presentation.
    pub fn shortlist(&self) -> ShortlistView {
        let entries = self
            .recommendations
            .iter()
            .map(|recommendation| {
                let name = self
                    .candidates
                    .iter()
                    .find(|candidate| candidate.id == recommendation.candidate_id)
                    .map(|candidate| candidate.name.clone())
                    .unwrap_or_default();
                ShortlistEntry {
                    rank: recommendation.rank,
                    candidate_id: recommendation.candidate_id.clone(),
                    name,
                    tier: recommendation.tier.label().to_string(),
                    final_score: recommendation.final_score,
                    disqualified: recommendation.disqualified,
                    red_flags: recommendation.red_flags.clone(),
                    justification: recommendation.justification.clone(),
                }
            })
            .collect();

        ShortlistView {
            run_id: self.run_id.clone(),
            role: self.profile.role,
            state: self.state,
            entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub role: RoleId,
    pub state: SearchState,
    pub candidates: usize,
    pub excluded: usize,
    pub recommendations: usize,
    pub errors: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub rank: usize,
    pub candidate_id: CandidateId,
    pub name: String,
    pub tier: String,
    pub final_score: f64,
    pub disqualified: bool,
    pub red_flags: Vec<String>,
    pub justification: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistView {
    pub run_id: RunId,
    pub role: RoleId,
    pub state: SearchState,
    pub entries: Vec<ShortlistEntry>,
}
