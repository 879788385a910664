use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::rubric::RubricError;

/// Identifier wrapper for sourced candidates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mandates the search engine knows how to vet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    InterimCfo,
    HealthcareOpsLead,
    ProjectManager,
}

impl RoleId {
    pub const fn ordered() -> [Self; 3] {
        [Self::InterimCfo, Self::HealthcareOpsLead, Self::ProjectManager]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InterimCfo => "interim_cfo",
            Self::HealthcareOpsLead => "healthcare_ops_lead",
            Self::ProjectManager => "project_manager",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::InterimCfo => "Interim CFO",
            Self::HealthcareOpsLead => "Healthcare Clinical Operations Lead",
            Self::ProjectManager => "Elite Project Manager",
        }
    }

    /// Upper-case token used for per-role environment overrides.
    pub const fn env_key(self) -> &'static str {
        match self {
            Self::InterimCfo => "INTERIM_CFO",
            Self::HealthcareOpsLead => "HEALTHCARE_OPS_LEAD",
            Self::ProjectManager => "PROJECT_MANAGER",
        }
    }

    /// Map a free-text search query onto a mandate, defaulting to the CFO search.
    pub fn infer(query: &str) -> Self {
        if query.to_ascii_uppercase().contains("CFO") {
            Self::InterimCfo
        } else if query.contains("Healthcare") || query.contains("Ops") {
            Self::HealthcareOpsLead
        } else if query.contains("Project Manager") || query.contains("PM") {
            Self::ProjectManager
        } else {
            Self::InterimCfo
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleId {
    type Err = RubricError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key: String = value
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "interimcfo" | "cfo" => Ok(Self::InterimCfo),
            "healthcareopslead" | "healthcareclinicaloperationslead" | "healthcareops" => {
                Ok(Self::HealthcareOpsLead)
            }
            "projectmanager" | "eliteprojectmanager" | "pm" => Ok(Self::ProjectManager),
            _ => Err(RubricError::UnknownRole(value.trim().to_string())),
        }
    }
}

/// Mandate description handed to the orchestrator. Immutable once a search starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleProfile {
    pub role: RoleId,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub query: String,
}

impl RoleProfile {
    pub fn new(role: RoleId, requirements: Vec<String>) -> Self {
        Self {
            role,
            requirements,
            query: role.label().to_string(),
        }
    }

    /// Build a profile from a raw search query, pulling out the hard requirements it names.
    pub fn from_query(query: &str) -> Self {
        let mut requirements = Vec::new();

        if let Some(band) = revenue_band(query) {
            requirements.push(format!("Revenue scale {band}"));
        }
        if query.contains("ASC 606") {
            requirements.push("ASC 606 required".to_string());
        }
        if query.contains("Remote") {
            requirements.push("Remote".to_string());
        }

        Self {
            role: RoleId::infer(query),
            requirements,
            query: query.trim().to_string(),
        }
    }
}

fn revenue_band(query: &str) -> Option<String> {
    query.match_indices('$').find_map(|(index, _)| {
        let rest = &query[index + 1..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        let suffix = if rest[digits.len()..].starts_with('M') {
            "M"
        } else {
            ""
        };
        Some(format!("${digits}{suffix}"))
    })
}

/// Where a candidate record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceProvenance {
    Synthetic,
    Live,
}

/// One entry of a candidate's claimed employment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkEntry {
    pub employer: String,
    pub title: String,
    pub start: NaiveDate,
    /// `None` while the role is ongoing.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default = "full_time_default")]
    pub full_time: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub claims: Vec<String>,
}

fn full_time_default() -> bool {
    true
}

impl WorkEntry {
    pub fn end_or(&self, as_of: NaiveDate) -> NaiveDate {
        self.end.unwrap_or(as_of)
    }

    pub fn is_ongoing(&self) -> bool {
        self.end.is_none()
    }

    /// Whole months spent in the role, counting ongoing roles up to `as_of`.
    pub fn tenure_months(&self, as_of: NaiveDate) -> i64 {
        let days = (self.end_or(as_of) - self.start).num_days().max(0);
        days / 30
    }
}

/// Sourced candidate. Read-only once created; every evaluator consumes it by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub name: String,
    pub provenance: SourceProvenance,
    /// Date the record was captured; ongoing roles are measured up to it.
    pub as_of: NaiveDate,
    #[serde(default)]
    pub summary: String,
    pub history: Vec<WorkEntry>,
    #[serde(default)]
    pub skills: BTreeSet<String>,
}

impl CandidateRecord {
    /// Check that the history carries the fields every evaluator relies on.
    pub fn validate(&self) -> Result<(), CandidateError> {
        let malformed = |reason: String| CandidateError::Malformed {
            candidate_id: self.id.clone(),
            reason,
        };

        if self.id.0.trim().is_empty() {
            return Err(malformed("candidate identifier is blank".to_string()));
        }
        if self.history.is_empty() {
            return Err(malformed("work history is empty".to_string()));
        }

        for (index, entry) in self.history.iter().enumerate() {
            if entry.employer.trim().is_empty() {
                return Err(malformed(format!("history entry {index} has no employer")));
            }
            if entry.title.trim().is_empty() {
                return Err(malformed(format!("history entry {index} has no title")));
            }
            if let Some(end) = entry.end {
                if end < entry.start {
                    return Err(malformed(format!(
                        "history entry {index} ends ({end}) before it starts ({})",
                        entry.start
                    )));
                }
            }
            if entry.start > self.as_of {
                return Err(malformed(format!(
                    "history entry {index} starts after the record date {}",
                    self.as_of
                )));
            }
        }

        Ok(())
    }
}

/// Per-candidate failure raised by auditors and evaluators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CandidateError {
    #[error("candidate {candidate_id} is malformed: {reason}")]
    Malformed {
        candidate_id: CandidateId,
        reason: String,
    },
}

impl CandidateError {
    pub fn candidate_id(&self) -> &CandidateId {
        match self {
            CandidateError::Malformed { candidate_id, .. } => candidate_id,
        }
    }
}

/// Red-flag severity. Only `High` disqualifies on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Round to two decimal places, the precision scores are reported at.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
