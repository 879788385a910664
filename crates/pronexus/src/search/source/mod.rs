//! Candidate sources feeding the sourcing stage.

mod csv_export;
mod synthetic;

pub use csv_export::CsvCandidateSource;
pub use synthetic::SyntheticCandidateSource;

use async_trait::async_trait;

use super::domain::{CandidateRecord, RoleProfile};

/// Yields candidate records for a role.
///
/// Implementations must be deterministic for a fixed configuration (seed, export file) so
/// runs can be reproduced in tests.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch(
        &self,
        profile: &RoleProfile,
        count: usize,
    ) -> Result<Vec<CandidateRecord>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("candidate source unavailable: {0}")]
    Unavailable(String),
    #[error("invalid candidate export row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },
}
