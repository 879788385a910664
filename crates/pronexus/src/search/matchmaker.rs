//! Aggregates evaluation and audit outputs into a ranked shortlist.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::audit::AuditFinding;
use super::domain::{round2, CandidateId, RoleId, Severity};
use super::evaluation::EvaluationResult;
use crate::config::SearchConfig;

/// Combines per-candidate results into an ordered recommendation list.
///
/// Aggregation is pure: the same mappings always produce the same ordered output.
pub trait Aggregator: Send + Sync {
    fn aggregate(
        &self,
        evaluations: &BTreeMap<CandidateId, EvaluationResult>,
        audits: &BTreeMap<CandidateId, AuditFinding>,
    ) -> Vec<Recommendation>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchmakerConfig {
    /// Audit confidence below this disqualifies a candidate.
    pub min_audit_confidence: f64,
}

impl Default for MatchmakerConfig {
    fn default() -> Self {
        Self {
            min_audit_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
    StrongHire,
    Hire,
    RiskFlag,
    DoNotHire,
}

impl RecommendationTier {
    pub fn classify(final_score: f64, disqualified: bool) -> Self {
        if disqualified {
            return RecommendationTier::DoNotHire;
        }
        match final_score {
            score if score >= 85.0 => RecommendationTier::StrongHire,
            score if score >= 70.0 => RecommendationTier::Hire,
            score if score >= 50.0 => RecommendationTier::RiskFlag,
            _ => RecommendationTier::DoNotHire,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RecommendationTier::StrongHire => "Strong Hire",
            RecommendationTier::Hire => "Hire",
            RecommendationTier::RiskFlag => "Risk Flag",
            RecommendationTier::DoNotHire => "Do Not Hire",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub candidate_id: CandidateId,
    /// 1-based position in the shortlist.
    pub rank: usize,
    pub final_score: f64,
    pub composite: f64,
    pub audit_confidence: f64,
    pub disqualified: bool,
    pub tier: RecommendationTier,
    pub red_flags: Vec<String>,
    pub justification: Vec<String>,
}

/// Default aggregator: final score is `composite × audit confidence`.
#[derive(Debug, Clone, Default)]
pub struct Matchmaker {
    default: MatchmakerConfig,
    overrides: BTreeMap<RoleId, MatchmakerConfig>,
}

impl Matchmaker {
    pub fn new(config: MatchmakerConfig) -> Self {
        Self {
            default: config,
            overrides: BTreeMap::new(),
        }
    }

    /// Global threshold plus any per-role overrides from configuration.
    pub fn from_config(config: &SearchConfig) -> Self {
        let mut matchmaker = Self::new(config.matchmaking_defaults());
        for role in config.role_overrides.keys() {
            matchmaker
                .overrides
                .insert(*role, config.matchmaking_for(*role));
        }
        matchmaker
    }

    pub fn with_role_override(mut self, role: RoleId, config: MatchmakerConfig) -> Self {
        self.overrides.insert(role, config);
        self
    }

    pub fn config_for(&self, role: RoleId) -> &MatchmakerConfig {
        self.overrides.get(&role).unwrap_or(&self.default)
    }

    fn recommend(&self, evaluation: &EvaluationResult, audit: &AuditFinding) -> Recommendation {
        let config = self.config_for(evaluation.role);
        let confidence = audit.confidence;
        let final_score = round2(evaluation.composite * confidence);

        let high_flag = evaluation
            .red_flags
            .iter()
            .find(|flag| flag.severity == Severity::High);
        let disqualification = if let Some(flag) = high_flag {
            Some(format!("Disqualified: high-severity red flag {}", flag.name))
        } else if confidence < config.min_audit_confidence {
            Some(format!(
                "Disqualified: audit confidence {confidence:.2} below {:.2}",
                config.min_audit_confidence
            ))
        } else {
            None
        };
        let disqualified = disqualification.is_some();

        let mut justification = vec![format!(
            "Composite {:.2} x audit confidence {confidence:.2} = {final_score:.2}",
            evaluation.composite
        )];
        if let Some(best) = evaluation
            .criteria
            .iter()
            .max_by(|left, right| {
                left.score
                    .cmp(&right.score)
                    .then_with(|| right.criterion.cmp(&left.criterion))
            })
        {
            justification.push(format!(
                "Strongest: {} ({}): {}",
                best.criterion, best.score, best.notes
            ));
        }
        if let Some(worst) = evaluation
            .criteria
            .iter()
            .min_by(|left, right| {
                left.score
                    .cmp(&right.score)
                    .then_with(|| left.criterion.cmp(&right.criterion))
            })
        {
            justification.push(format!(
                "Weakest: {} ({}): {}",
                worst.criterion, worst.score, worst.notes
            ));
        }
        for flag in &evaluation.red_flags {
            justification.push(format!(
                "Red flag ({}): {}: {}",
                flag.severity.label(),
                flag.name,
                flag.detail
            ));
        }
        for inconsistency in &audit.inconsistencies {
            justification.push(format!(
                "Audit {}: {}",
                inconsistency.category.label(),
                inconsistency.description
            ));
        }
        if let Some(reason) = disqualification {
            justification.push(reason);
        }

        Recommendation {
            candidate_id: evaluation.candidate_id.clone(),
            rank: 0,
            final_score,
            composite: evaluation.composite,
            audit_confidence: confidence,
            disqualified,
            tier: RecommendationTier::classify(final_score, disqualified),
            red_flags: evaluation
                .red_flags
                .iter()
                .map(|flag| flag.name.clone())
                .collect(),
            justification,
        }
    }
}

impl Aggregator for Matchmaker {
    fn aggregate(
        &self,
        evaluations: &BTreeMap<CandidateId, EvaluationResult>,
        audits: &BTreeMap<CandidateId, AuditFinding>,
    ) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = evaluations
            .iter()
            .filter_map(|(id, evaluation)| {
                audits
                    .get(id)
                    .map(|audit| self.recommend(evaluation, audit))
            })
            .collect();

        recommendations.sort_by(shortlist_order);
        for (index, recommendation) in recommendations.iter_mut().enumerate() {
            recommendation.rank = index + 1;
        }
        recommendations
    }
}

/// Eligible before disqualified, then final score descending, then candidate id ascending.
fn shortlist_order(left: &Recommendation, right: &Recommendation) -> Ordering {
    left.disqualified
        .cmp(&right.disqualified)
        .then_with(|| right.final_score.total_cmp(&left.final_score))
        .then_with(|| left.candidate_id.cmp(&right.candidate_id))
}
