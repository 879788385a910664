mod config;
mod flags;
mod rules;

pub use config::EvaluationConfig;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{CandidateError, CandidateId, CandidateRecord, RoleId, Severity};
use super::history::HistoryView;
use super::rubric::Rubric;
use crate::config::SearchConfig;

/// Scores one candidate against one rubric.
///
/// Implementations must be deterministic: the same `(candidate, rubric)` pair always yields
/// the same [`EvaluationResult`]. The orchestrator only depends on this contract, so a
/// model-backed evaluator can be swapped in without touching run sequencing.
#[async_trait]
pub trait DomainEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        candidate: &CandidateRecord,
        rubric: &Rubric,
    ) -> Result<EvaluationResult, CandidateError>;
}

/// Rule-based evaluator driven by rubric data.
#[derive(Debug, Clone, Default)]
pub struct RubricEvaluator {
    default: EvaluationConfig,
    overrides: BTreeMap<RoleId, EvaluationConfig>,
}

impl RubricEvaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self {
            default: config,
            overrides: BTreeMap::new(),
        }
    }

    /// Build an evaluator honouring per-role threshold overrides.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            default: config.evaluation_defaults(),
            overrides: RoleId::ordered()
                .into_iter()
                .map(|role| (role, config.evaluation_for(role)))
                .collect(),
        }
    }

    pub fn config_for(&self, role: RoleId) -> &EvaluationConfig {
        self.overrides.get(&role).unwrap_or(&self.default)
    }

    pub fn score(
        &self,
        candidate: &CandidateRecord,
        rubric: &Rubric,
    ) -> Result<EvaluationResult, CandidateError> {
        candidate.validate()?;

        let view = HistoryView::new(candidate);
        let (criteria, composite) = rules::score_criteria(&view, rubric);
        let red_flags = flags::detect_red_flags(&view, rubric, self.config_for(rubric.role));

        Ok(EvaluationResult {
            candidate_id: candidate.id.clone(),
            role: rubric.role,
            criteria,
            composite,
            red_flags,
        })
    }
}

#[async_trait]
impl DomainEvaluator for RubricEvaluator {
    async fn evaluate(
        &self,
        candidate: &CandidateRecord,
        rubric: &Rubric,
    ) -> Result<EvaluationResult, CandidateError> {
        self.score(candidate, rubric)
    }
}

/// Sub-score for a single rubric criterion, with the evidence that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub weight: f64,
    pub score: u8,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredRedFlag {
    pub name: String,
    pub severity: Severity,
    pub detail: String,
}

/// Evaluation output for one candidate in one run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub candidate_id: CandidateId,
    pub role: RoleId,
    pub criteria: Vec<CriterionScore>,
    pub composite: f64,
    pub red_flags: Vec<TriggeredRedFlag>,
}

impl EvaluationResult {
    pub fn criterion(&self, name_fragment: &str) -> Option<&CriterionScore> {
        self.criteria
            .iter()
            .find(|score| score.criterion.contains(name_fragment))
    }

    pub fn has_flag(&self, name_fragment: &str) -> bool {
        self.red_flags
            .iter()
            .any(|flag| flag.name.contains(name_fragment))
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.red_flags.iter().map(|flag| flag.severity).max()
    }
}
