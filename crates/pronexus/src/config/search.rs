use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;
use crate::search::audit::{AuditConfig, AuditPenalties};
use crate::search::evaluation::EvaluationConfig;
use crate::search::matchmaker::MatchmakerConfig;
use crate::search::RoleId;

/// Recognized search options, supplied to the orchestrator at construction time.
///
/// Every default lives in [`SearchConfig::default`]; nothing downstream falls back to its own.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Uncovered days between roles before the auditor records a timeline gap.
    pub gap_threshold_days: i64,
    /// Days two full-time roles may overlap before the auditor flags them.
    pub overlap_tolerance_days: i64,
    /// Audit confidence below which the matchmaker disqualifies a candidate.
    pub min_audit_confidence: f64,
    /// Uncovered days before the rubric "Extended Employment Gap" red flag fires.
    pub red_flag_gap_days: i64,
    pub worker_limit: usize,
    pub candidate_count: usize,
    pub source_timeout: Duration,
    pub candidate_timeout: Duration,
    pub penalties: AuditPenalties,
    pub role_overrides: BTreeMap<RoleId, RoleOverride>,
}

/// Per-role replacements for the role-sensitive thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoleOverride {
    pub min_audit_confidence: Option<f64>,
    pub red_flag_gap_days: Option<i64>,
}

/// Thresholds in effect for one role after overrides are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleThresholds {
    pub min_audit_confidence: f64,
    pub red_flag_gap_days: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            gap_threshold_days: 90,
            overlap_tolerance_days: 30,
            min_audit_confidence: 0.3,
            red_flag_gap_days: 180,
            worker_limit: 4,
            candidate_count: 10,
            source_timeout: Duration::from_millis(30_000),
            candidate_timeout: Duration::from_millis(5_000),
            penalties: AuditPenalties::default(),
            role_overrides: BTreeMap::new(),
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mut role_overrides = BTreeMap::new();
        for role in RoleId::ordered() {
            let role_override = RoleOverride {
                min_audit_confidence: option(
                    &lookup,
                    &format!("SEARCH_{}_MIN_AUDIT_CONFIDENCE", role.env_key()),
                )?,
                red_flag_gap_days: option(
                    &lookup,
                    &format!("SEARCH_{}_RED_FLAG_GAP_DAYS", role.env_key()),
                )?,
            };
            if role_override != RoleOverride::default() {
                role_overrides.insert(role, role_override);
            }
        }

        let config = Self {
            gap_threshold_days: option(&lookup, "SEARCH_GAP_THRESHOLD_DAYS")?
                .unwrap_or(defaults.gap_threshold_days),
            overlap_tolerance_days: option(&lookup, "SEARCH_OVERLAP_TOLERANCE_DAYS")?
                .unwrap_or(defaults.overlap_tolerance_days),
            min_audit_confidence: option(&lookup, "SEARCH_MIN_AUDIT_CONFIDENCE")?
                .unwrap_or(defaults.min_audit_confidence),
            red_flag_gap_days: option(&lookup, "SEARCH_RED_FLAG_GAP_DAYS")?
                .unwrap_or(defaults.red_flag_gap_days),
            worker_limit: option(&lookup, "SEARCH_WORKER_LIMIT")?
                .unwrap_or(defaults.worker_limit),
            candidate_count: option(&lookup, "SEARCH_CANDIDATE_COUNT")?
                .unwrap_or(defaults.candidate_count),
            source_timeout: option(&lookup, "SEARCH_SOURCE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.source_timeout),
            candidate_timeout: option(&lookup, "SEARCH_CANDIDATE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.candidate_timeout),
            penalties: defaults.penalties,
            role_overrides,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_limit == 0 {
            return Err(ConfigError::search_option(
                "SEARCH_WORKER_LIMIT",
                self.worker_limit,
                "at least one worker is required",
            ));
        }
        if self.source_timeout.is_zero() {
            return Err(ConfigError::search_option(
                "SEARCH_SOURCE_TIMEOUT_MS",
                self.source_timeout.as_millis(),
                "timeout must be positive",
            ));
        }
        if self.candidate_timeout.is_zero() {
            return Err(ConfigError::search_option(
                "SEARCH_CANDIDATE_TIMEOUT_MS",
                self.candidate_timeout.as_millis(),
                "timeout must be positive",
            ));
        }
        for (key, days) in [
            ("SEARCH_GAP_THRESHOLD_DAYS", self.gap_threshold_days),
            ("SEARCH_OVERLAP_TOLERANCE_DAYS", self.overlap_tolerance_days),
            ("SEARCH_RED_FLAG_GAP_DAYS", self.red_flag_gap_days),
        ] {
            if days < 0 {
                return Err(ConfigError::search_option(key, days, "must not be negative"));
            }
        }
        check_confidence("SEARCH_MIN_AUDIT_CONFIDENCE", self.min_audit_confidence)?;

        for (name, penalty) in self.penalties.values() {
            if !(0.0..=1.0).contains(&penalty) {
                return Err(ConfigError::search_option(
                    format!("penalties.{name}"),
                    penalty,
                    "penalty must be between 0 and 1",
                ));
            }
        }

        for (role, role_override) in &self.role_overrides {
            if let Some(confidence) = role_override.min_audit_confidence {
                check_confidence(
                    &format!("SEARCH_{}_MIN_AUDIT_CONFIDENCE", role.env_key()),
                    confidence,
                )?;
            }
            if let Some(days) = role_override.red_flag_gap_days.filter(|days| *days < 0) {
                return Err(ConfigError::search_option(
                    format!("SEARCH_{}_RED_FLAG_GAP_DAYS", role.env_key()),
                    days,
                    "must not be negative",
                ));
            }
        }

        Ok(())
    }

    /// Effective role-sensitive thresholds for `role`.
    pub fn for_role(&self, role: RoleId) -> RoleThresholds {
        let role_override = self
            .role_overrides
            .get(&role)
            .copied()
            .unwrap_or_default();
        RoleThresholds {
            min_audit_confidence: role_override
                .min_audit_confidence
                .unwrap_or(self.min_audit_confidence),
            red_flag_gap_days: role_override
                .red_flag_gap_days
                .unwrap_or(self.red_flag_gap_days),
        }
    }

    pub fn audit(&self) -> AuditConfig {
        AuditConfig {
            gap_threshold_days: self.gap_threshold_days,
            overlap_tolerance_days: self.overlap_tolerance_days,
            penalties: self.penalties,
        }
    }

    pub fn evaluation_defaults(&self) -> EvaluationConfig {
        EvaluationConfig {
            red_flag_gap_days: self.red_flag_gap_days,
        }
    }

    pub fn evaluation_for(&self, role: RoleId) -> EvaluationConfig {
        EvaluationConfig {
            red_flag_gap_days: self.for_role(role).red_flag_gap_days,
        }
    }

    pub fn matchmaking_defaults(&self) -> MatchmakerConfig {
        MatchmakerConfig {
            min_audit_confidence: self.min_audit_confidence,
        }
    }

    pub fn matchmaking_for(&self, role: RoleId) -> MatchmakerConfig {
        MatchmakerConfig {
            min_audit_confidence: self.for_role(role).min_audit_confidence,
        }
    }
}

fn option<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .map(|value| parse_value(key, &value))
        .transpose()
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::search_option(key, value, "could not parse value"))
}

fn check_confidence(key: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::search_option(
            key,
            value,
            "confidence must be between 0 and 1",
        ))
    }
}
