use serde::{Deserialize, Serialize};

use super::run::{RunId, SearchState};
use crate::search::domain::{CandidateError, CandidateId};
use crate::search::rubric::RubricError;

/// Whether a recorded error excluded one candidate or ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Isolated,
    Fatal,
}

/// Errors the orchestrator classifies and records in a run's error log.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    MalformedCandidate(#[from] CandidateError),
    #[error("candidate {candidate_id} did not finish within {timeout_ms} ms")]
    CandidateTimeout {
        candidate_id: CandidateId,
        timeout_ms: u64,
    },
    #[error("candidate {0} was returned more than once by the source")]
    DuplicateCandidate(CandidateId),
    #[error("worker for candidate {0} stopped without producing a result")]
    WorkerFailed(CandidateId),
    #[error("{0}")]
    SourceUnavailable(String),
    #[error("candidate source did not respond within {timeout_ms} ms")]
    SourceTimeout { timeout_ms: u64 },
    #[error("search run was cancelled")]
    Cancelled,
    #[error("{stage} stage stopped unexpectedly: {reason}")]
    StageFailed { stage: SearchState, reason: String },
}

impl SearchError {
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::MalformedCandidate(_) => "malformed_candidate",
            SearchError::CandidateTimeout { .. } => "candidate_timeout",
            SearchError::DuplicateCandidate(_) => "duplicate_candidate",
            SearchError::WorkerFailed(_) => "worker_failed",
            SearchError::SourceUnavailable(_) => "source_unavailable",
            SearchError::SourceTimeout { .. } => "source_timeout",
            SearchError::Cancelled => "cancelled",
            SearchError::StageFailed { .. } => "stage_failed",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            SearchError::MalformedCandidate(_)
            | SearchError::CandidateTimeout { .. }
            | SearchError::DuplicateCandidate(_)
            | SearchError::WorkerFailed(_) => ErrorClass::Isolated,
            SearchError::SourceUnavailable(_)
            | SearchError::SourceTimeout { .. }
            | SearchError::Cancelled
            | SearchError::StageFailed { .. } => ErrorClass::Fatal,
        }
    }

    pub fn candidate_id(&self) -> Option<&CandidateId> {
        match self {
            SearchError::MalformedCandidate(err) => Some(err.candidate_id()),
            SearchError::CandidateTimeout { candidate_id, .. } => Some(candidate_id),
            SearchError::DuplicateCandidate(id) | SearchError::WorkerFailed(id) => Some(id),
            SearchError::SourceUnavailable(_)
            | SearchError::SourceTimeout { .. }
            | SearchError::Cancelled
            | SearchError::StageFailed { .. } => None,
        }
    }
}

/// Caller misuse raised synchronously by the orchestrator API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid role: {0}")]
    InvalidRole(#[from] RubricError),
    #[error("search run {run_id} is {state}; cannot {operation}")]
    InvalidState {
        run_id: RunId,
        state: SearchState,
        operation: &'static str,
    },
    #[error("search run {0} not found")]
    RunNotFound(RunId),
    #[error("no async runtime available to launch search run {0}")]
    RuntimeUnavailable(RunId),
}
