//! Executive-search pipeline: rubric-driven vetting, forensic audit and ranked shortlists.

pub mod audit;
pub mod domain;
pub mod evaluation;
pub(crate) mod history;
pub mod matchmaker;
pub mod orchestrator;
pub mod router;
pub mod rubric;
pub mod source;

pub use audit::{
    AuditConfig, AuditFinding, AuditPenalties, ForensicAuditor, Inconsistency,
    InconsistencyCategory, TimelineAuditor,
};
pub use domain::{
    CandidateError, CandidateId, CandidateRecord, RoleId, RoleProfile, Severity,
    SourceProvenance, WorkEntry,
};
pub use evaluation::{
    CriterionScore, DomainEvaluator, EvaluationConfig, EvaluationResult, RubricEvaluator,
    TriggeredRedFlag,
};
pub use matchmaker::{Aggregator, Matchmaker, MatchmakerConfig, Recommendation, RecommendationTier};
pub use orchestrator::{
    ErrorClass, OrchestratorError, RunErrorEntry, RunId, RunSummary, SearchError,
    SearchOrchestrator, SearchOrchestratorBuilder, SearchRun, SearchState, ShortlistEntry,
    ShortlistView,
};
pub use router::search_router;
pub use rubric::{get_rubric, Rubric, RubricError, RubricRegistry};
pub use source::{CandidateSource, CsvCandidateSource, SourceError, SyntheticCandidateSource};

#[cfg(test)]
mod tests;
