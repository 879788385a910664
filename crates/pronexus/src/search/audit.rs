//! Role-independent consistency checks over a candidate's claimed history.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{round2, CandidateError, CandidateId, CandidateRecord};
use super::history::{contains_term, normalize, HistoryView};

const IMPROVEMENT_VERBS: &[&str] = &[
    "increased", "grew", "improved", "boosted", "raised", "expanded", "scaled",
];
const REDUCTION_VERBS: &[&str] = &["reduced", "cut", "decreased", "lowered", "shrank"];
const SHORT_STINT_MONTHS: i64 = 12;
const SHORT_STINT_LIMIT: usize = 3;
const STINT_EXEMPT: &[&str] = &["interim", "fractional"];

/// Cross-checks a candidate's history for internal consistency.
///
/// Implementations must be deterministic and must not depend on the role being searched.
#[async_trait]
pub trait ForensicAuditor: Send + Sync {
    async fn audit(&self, candidate: &CandidateRecord) -> Result<AuditFinding, CandidateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyCategory {
    TimelineGap,
    OverlappingRoles,
    UnsupportedClaim,
    ImplausibleClaim,
    TenureInstability,
}

impl InconsistencyCategory {
    pub const fn label(self) -> &'static str {
        match self {
            InconsistencyCategory::TimelineGap => "timeline gap",
            InconsistencyCategory::OverlappingRoles => "overlapping roles",
            InconsistencyCategory::UnsupportedClaim => "unsupported claim",
            InconsistencyCategory::ImplausibleClaim => "implausible claim",
            InconsistencyCategory::TenureInstability => "tenure instability",
        }
    }
}

/// Confidence deducted once for each category present in a finding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuditPenalties {
    pub timeline_gap: f64,
    pub overlapping_roles: f64,
    pub unsupported_claim: f64,
    pub implausible_claim: f64,
    pub tenure_instability: f64,
}

impl AuditPenalties {
    pub fn for_category(&self, category: InconsistencyCategory) -> f64 {
        match category {
            InconsistencyCategory::TimelineGap => self.timeline_gap,
            InconsistencyCategory::OverlappingRoles => self.overlapping_roles,
            InconsistencyCategory::UnsupportedClaim => self.unsupported_claim,
            InconsistencyCategory::ImplausibleClaim => self.implausible_claim,
            InconsistencyCategory::TenureInstability => self.tenure_instability,
        }
    }

    pub(crate) fn values(&self) -> [(&'static str, f64); 5] {
        [
            ("timeline_gap", self.timeline_gap),
            ("overlapping_roles", self.overlapping_roles),
            ("unsupported_claim", self.unsupported_claim),
            ("implausible_claim", self.implausible_claim),
            ("tenure_instability", self.tenure_instability),
        ]
    }
}

impl Default for AuditPenalties {
    fn default() -> Self {
        Self {
            timeline_gap: 0.15,
            overlapping_roles: 0.25,
            unsupported_claim: 0.10,
            implausible_claim: 0.30,
            tenure_instability: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    pub gap_threshold_days: i64,
    pub overlap_tolerance_days: i64,
    pub penalties: AuditPenalties,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            gap_threshold_days: 90,
            overlap_tolerance_days: 30,
            penalties: AuditPenalties::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inconsistency {
    pub category: InconsistencyCategory,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub candidate_id: CandidateId,
    pub inconsistencies: Vec<Inconsistency>,
    /// Trust in the claimed history, from 0.0 to 1.0.
    pub confidence: f64,
}

impl AuditFinding {
    pub fn has(&self, category: InconsistencyCategory) -> bool {
        self.inconsistencies
            .iter()
            .any(|inconsistency| inconsistency.category == category)
    }

    pub fn categories(&self) -> BTreeSet<InconsistencyCategory> {
        self.inconsistencies
            .iter()
            .map(|inconsistency| inconsistency.category)
            .collect()
    }
}

/// Rule-based auditor covering timeline, overlap, claim and tenure checks.
#[derive(Debug, Clone, Default)]
pub struct TimelineAuditor {
    config: AuditConfig,
}

impl TimelineAuditor {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn inspect(&self, candidate: &CandidateRecord) -> Result<AuditFinding, CandidateError> {
        candidate.validate()?;

        let view = HistoryView::new(candidate);
        let mut inconsistencies = Vec::new();
        self.timeline_gaps(&view, &mut inconsistencies);
        self.overlapping_roles(&view, &mut inconsistencies);
        claim_consistency(&view, &mut inconsistencies);
        tenure_instability(&view, &mut inconsistencies);

        let categories: BTreeSet<InconsistencyCategory> = inconsistencies
            .iter()
            .map(|inconsistency| inconsistency.category)
            .collect();
        let penalty: f64 = categories
            .iter()
            .map(|category| self.config.penalties.for_category(*category))
            .sum();

        Ok(AuditFinding {
            candidate_id: candidate.id.clone(),
            inconsistencies,
            confidence: round2((1.0 - penalty).max(0.0)),
        })
    }

    fn timeline_gaps(&self, view: &HistoryView<'_>, out: &mut Vec<Inconsistency>) {
        for gap in view
            .gaps()
            .into_iter()
            .filter(|gap| gap.days > self.config.gap_threshold_days)
        {
            out.push(Inconsistency {
                category: InconsistencyCategory::TimelineGap,
                description: format!(
                    "{} uncovered days between {} (ended {}) and {} (started {})",
                    gap.days,
                    gap.before.employer,
                    gap.covered_until,
                    gap.after.employer,
                    gap.after.start
                ),
            });
        }
    }

    fn overlapping_roles(&self, view: &HistoryView<'_>, out: &mut Vec<Inconsistency>) {
        let as_of = view.as_of();
        let full_time: Vec<_> = view
            .chronological()
            .into_iter()
            .filter(|entry| entry.full_time)
            .collect();

        for (index, first) in full_time.iter().enumerate() {
            for second in &full_time[index + 1..] {
                let overlap_start = first.start.max(second.start);
                let overlap_end = first.end_or(as_of).min(second.end_or(as_of));
                let days = (overlap_end - overlap_start).num_days();
                if days > self.config.overlap_tolerance_days {
                    out.push(Inconsistency {
                        category: InconsistencyCategory::OverlappingRoles,
                        description: format!(
                            "full-time roles at {} and {} overlap by {days} days from {overlap_start}",
                            first.employer, second.employer
                        ),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl ForensicAuditor for TimelineAuditor {
    async fn audit(&self, candidate: &CandidateRecord) -> Result<AuditFinding, CandidateError> {
        self.inspect(candidate)
    }
}

fn claim_consistency(view: &HistoryView<'_>, out: &mut Vec<Inconsistency>) {
    for statement in view.statements() {
        let text = &statement.normalized;

        if IMPROVEMENT_VERBS.iter().any(|verb| contains_term(text, verb))
            && targets_figure(text)
            && !contains_term(text, "from")
        {
            out.push(Inconsistency {
                category: InconsistencyCategory::UnsupportedClaim,
                description: format!("\"{}\" states a result with no baseline", statement.raw),
            });
        }

        if REDUCTION_VERBS.iter().any(|verb| contains_term(text, verb))
            && percentages(statement.raw)
                .into_iter()
                .any(|value| value >= 100.0)
        {
            out.push(Inconsistency {
                category: InconsistencyCategory::ImplausibleClaim,
                description: format!(
                    "\"{}\" claims a reduction of 100% or more",
                    statement.raw
                ),
            });
        }
    }
}

fn tenure_instability(view: &HistoryView<'_>, out: &mut Vec<Inconsistency>) {
    let as_of = view.as_of();
    let short: Vec<_> = view
        .candidate
        .history
        .iter()
        .filter(|entry| !entry.is_ongoing())
        .filter(|entry| {
            let title = normalize(&entry.title);
            !STINT_EXEMPT.iter().any(|term| contains_term(&title, term))
        })
        .filter(|entry| entry.tenure_months(as_of) < SHORT_STINT_MONTHS)
        .collect();

    if short.len() >= SHORT_STINT_LIMIT {
        out.push(Inconsistency {
            category: InconsistencyCategory::TenureInstability,
            description: format!(
                "{} completed roles under {SHORT_STINT_MONTHS} months ({})",
                short.len(),
                short
                    .iter()
                    .map(|entry| entry.employer.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    }
}

/// True when a normalized statement contains "to <figure>".
fn targets_figure(normalized: &str) -> bool {
    let words: Vec<&str> = normalized.split_whitespace().collect();
    words.windows(2).any(|pair| {
        pair[0] == "to"
            && pair[1]
                .chars()
                .next()
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
    })
}

fn percentages(raw: &str) -> Vec<f64> {
    let mut values = Vec::new();
    let mut number = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() || (c == '.' && !number.is_empty()) {
            number.push(c);
            continue;
        }
        if c == '%' {
            if let Ok(value) = number.trim_end_matches('.').parse::<f64>() {
                values.push(value);
            }
        }
        number.clear();
    }
    values
}
