use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use pronexus::config::SearchConfig;
use pronexus::search::{
    CandidateId, CsvCandidateSource, RecommendationTier, RoleId, RoleProfile, SearchOrchestrator,
    SearchState, SyntheticCandidateSource,
};

const EXPORT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/candidates.csv");
const INVALID_EXPORT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/invalid_dates.csv");

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid as-of date")
}

fn config() -> SearchConfig {
    SearchConfig {
        source_timeout: Duration::from_secs(5),
        candidate_timeout: Duration::from_secs(2),
        ..SearchConfig::default()
    }
}

fn cfo_search() -> RoleProfile {
    RoleProfile::new(RoleId::InterimCfo, vec!["ASC 606".to_string()])
}

#[tokio::test]
async fn csv_export_runs_to_a_ranked_shortlist() {
    let orchestrator = SearchOrchestrator::new(Arc::new(CsvCandidateSource::new(EXPORT)), config())
        .expect("valid config");

    let run_id = orchestrator.start(cfo_search()).expect("run starts");
    let run = orchestrator.wait(&run_id).await.expect("run finishes");

    assert_eq!(run.state(), SearchState::Completed);
    assert_eq!(run.candidates().len(), 4);
    assert!(run.excluded().contains(&CandidateId::new("cfo-004")));

    let ranked: Vec<&str> = run
        .recommendations()
        .iter()
        .map(|recommendation| recommendation.candidate_id.as_str())
        .collect();
    assert_eq!(ranked, ["cfo-001", "cfo-003", "cfo-002"]);

    let leader = &run.recommendations()[0];
    assert_eq!(leader.rank, 1);
    assert_eq!(leader.tier, RecommendationTier::StrongHire);
    assert_eq!(leader.final_score, 100.0);

    let gapped = &run.recommendations()[1];
    assert!(!gapped.disqualified);
    assert!(gapped.audit_confidence < 1.0);
    assert!(gapped
        .red_flags
        .iter()
        .any(|flag| flag == "Extended Employment Gap"));

    let cash_basis = &run.recommendations()[2];
    assert!(cash_basis.disqualified);
    assert_eq!(cash_basis.tier, RecommendationTier::DoNotHire);

    let malformed = run
        .error_log()
        .iter()
        .find(|entry| entry.candidate_id == Some(CandidateId::new("cfo-004")))
        .expect("malformed row logged");
    assert_eq!(malformed.code, "malformed_candidate");
    assert_eq!(malformed.stage, SearchState::Auditing);

    let shortlist = run.shortlist();
    assert_eq!(shortlist.entries[0].name, "Dana Whitfield");
    assert_eq!(shortlist.entries[0].tier, "Strong Hire");
}

#[tokio::test]
async fn unreadable_export_fails_the_run() {
    let orchestrator = SearchOrchestrator::new(
        Arc::new(CsvCandidateSource::new(INVALID_EXPORT)),
        config(),
    )
    .expect("valid config");

    let run_id = orchestrator.start(cfo_search()).expect("run starts");
    let run = orchestrator.wait(&run_id).await.expect("run finishes");

    assert_eq!(run.state(), SearchState::Failed);
    assert!(run.recommendations().is_empty());
    let fatal = run.error_log().last().expect("fatal error logged");
    assert_eq!(fatal.code, "source_unavailable");
    assert!(fatal.message.contains("start_date"));
}

#[tokio::test]
async fn synthetic_runs_are_reproducible_for_a_seed() {
    let mut shortlists = Vec::new();
    for _ in 0..2 {
        let source = Arc::new(SyntheticCandidateSource::new(42, as_of()));
        let orchestrator = SearchOrchestrator::new(source, config()).expect("valid config");
        let run_id = orchestrator
            .start(RoleProfile::from_query("Interim CFO for a SaaS company"))
            .expect("run starts");
        let run = orchestrator.wait(&run_id).await.expect("run finishes");
        assert_eq!(run.state(), SearchState::Completed);
        shortlists.push(run.recommendations().to_vec());
    }

    assert!(!shortlists[0].is_empty());
    assert_eq!(shortlists[0], shortlists[1]);
}
