//! Role rubrics: weighted criteria and red-flag rules per mandate.
//!
//! Rubrics are process-wide, read-only configuration. The built-in registry is initialised
//! once on first use and shared by every run; callers only ever see `Arc<Rubric>` handles.

mod builtin;

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use super::domain::{RoleId, Severity};

/// Tolerance applied when checking that criterion weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RubricError {
    #[error("unknown role identifier '{0}'")]
    UnknownRole(String),
    #[error("rubric for {role} has weights summing to {total:.6}, expected 1.0")]
    InvalidWeights { role: RoleId, total: f64 },
    #[error("rubric for {role} has a criterion weight outside 0..=1: {criterion}")]
    WeightOutOfRange { role: RoleId, criterion: &'static str },
}

/// How a criterion turns a candidate's history into a 0-100 sub-score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationRule {
    /// Coverage of distinct `terms`, saturating at `saturation` matches. With
    /// `quantified_bonus`, 30 of the 100 points are reserved for a claim that pairs one of
    /// the terms with a figure.
    Evidence {
        terms: &'static [&'static str],
        saturation: usize,
        quantified_bonus: bool,
    },
    /// Months spent in roles whose title matches `titles`, full marks at `target_months`.
    Tenure {
        titles: &'static [&'static str],
        target_months: u32,
    },
}

/// Predicate deciding whether a red flag fires for a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RedFlagPredicate {
    TermsPresent {
        terms: &'static [&'static str],
    },
    TermsAbsent {
        terms: &'static [&'static str],
    },
    /// Both sides are mentioned somewhere in the record.
    ConflictingTerms {
        left: &'static [&'static str],
        right: &'static [&'static str],
    },
    /// `present` is mentioned but none of `support` is.
    Unsupported {
        present: &'static [&'static str],
        support: &'static [&'static str],
    },
    /// Consecutive employment periods separated by more than the configured gap threshold.
    EmploymentGap,
    /// A finished role matching `titles` lasted under `max_months`, unless its title or
    /// description mentions one of `exempt`.
    ShortTenure {
        titles: &'static [&'static str],
        max_months: u32,
        exempt: &'static [&'static str],
    },
    /// `terms` are claimed but never alongside a figure.
    UnquantifiedClaims {
        terms: &'static [&'static str],
    },
    /// No description or claim in the history carries a figure.
    VagueHistory,
    /// A title matches `titles` but none of `credentials` is mentioned.
    MissingCredential {
        titles: &'static [&'static str],
        credentials: &'static [&'static str],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Criterion {
    pub name: &'static str,
    pub weight: f64,
    pub rule: EvaluationRule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedFlagRule {
    pub name: &'static str,
    pub severity: Severity,
    pub predicate: RedFlagPredicate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rubric {
    pub role: RoleId,
    pub criteria: Vec<Criterion>,
    pub red_flags: Vec<RedFlagRule>,
}

impl Rubric {
    pub fn total_weight(&self) -> f64 {
        self.criteria.iter().map(|criterion| criterion.weight).sum()
    }

    pub fn validate(&self) -> Result<(), RubricError> {
        if let Some(criterion) = self
            .criteria
            .iter()
            .find(|criterion| !(0.0..=1.0).contains(&criterion.weight))
        {
            return Err(RubricError::WeightOutOfRange {
                role: self.role,
                criterion: criterion.name,
            });
        }

        let total = self.total_weight();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RubricError::InvalidWeights {
                role: self.role,
                total,
            });
        }

        Ok(())
    }
}

/// Lookup table from role to rubric.
#[derive(Debug, Clone)]
pub struct RubricRegistry {
    rubrics: BTreeMap<RoleId, Arc<Rubric>>,
}

static BUILTIN: OnceLock<Arc<RubricRegistry>> = OnceLock::new();

impl RubricRegistry {
    /// Shared registry holding the three built-in rubrics.
    pub fn builtin() -> Arc<RubricRegistry> {
        BUILTIN
            .get_or_init(|| {
                Arc::new(Self {
                    rubrics: builtin::rubrics()
                        .into_iter()
                        .map(|rubric| (rubric.role, Arc::new(rubric)))
                        .collect(),
                })
            })
            .clone()
    }

    /// Build a registry from caller-supplied rubrics, validating their weights.
    pub fn from_rubrics(rubrics: Vec<Rubric>) -> Result<Self, RubricError> {
        let mut table = BTreeMap::new();
        for rubric in rubrics {
            rubric.validate()?;
            table.insert(rubric.role, Arc::new(rubric));
        }
        Ok(Self { rubrics: table })
    }

    pub fn get_rubric(&self, role: RoleId) -> Result<Arc<Rubric>, RubricError> {
        self.rubrics
            .get(&role)
            .cloned()
            .ok_or_else(|| RubricError::UnknownRole(role.as_str().to_string()))
    }

    /// Resolve a raw role identifier, e.g. from a request body or CLI flag.
    pub fn lookup(&self, identifier: &str) -> Result<Arc<Rubric>, RubricError> {
        let role: RoleId = identifier.parse()?;
        self.get_rubric(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.rubrics.keys().copied()
    }
}

/// Fetch a built-in rubric.
pub fn get_rubric(role: RoleId) -> Result<Arc<Rubric>, RubricError> {
    RubricRegistry::builtin().get_rubric(role)
}
