use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use pronexus::search::{CandidateSource, CsvCandidateSource, RoleId, SyntheticCandidateSource};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Seed used when none is supplied, so repeated runs show the same candidates.
pub(crate) const DEFAULT_SEED: u64 = 42;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// CSV export when a path is given, otherwise the seeded synthetic generator.
pub(crate) fn candidate_source(
    csv: Option<PathBuf>,
    seed: u64,
    as_of: NaiveDate,
) -> Arc<dyn CandidateSource> {
    match csv {
        Some(path) => {
            info!(path = %path.display(), "sourcing candidates from csv export");
            Arc::new(CsvCandidateSource::new(path))
        }
        None => {
            info!(seed, %as_of, "sourcing synthetic candidates");
            Arc::new(SyntheticCandidateSource::new(seed, as_of))
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_role(raw: &str) -> Result<RoleId, String> {
    raw.parse::<RoleId>().map_err(|err| err.to_string())
}
