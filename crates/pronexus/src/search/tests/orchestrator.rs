use std::sync::Arc;
use std::time::Duration;

use super::common::*;

use crate::config::SearchConfig;
use crate::search::domain::{CandidateId, RoleId, RoleProfile};
use crate::search::orchestrator::{
    ErrorClass, OrchestratorError, RunId, SearchOrchestrator, SearchState,
};
use crate::search::rubric::RubricRegistry;
use crate::search::source::SyntheticCandidateSource;

#[tokio::test]
async fn empty_candidate_pool_completes_with_empty_shortlist() {
    let orchestrator = orchestrator(StaticSource::empty());
    let run_id = orchestrator.start(cfo_profile()).expect("run starts");

    let run = orchestrator.wait(&run_id).await.expect("run finishes");

    assert_eq!(run.state(), SearchState::Completed);
    assert!(run.recommendations().is_empty());
    assert!(run.error_log().is_empty());
    let states: Vec<SearchState> = run.history().iter().map(|step| step.state).collect();
    assert_eq!(
        states,
        vec![
            SearchState::Created,
            SearchState::Sourcing,
            SearchState::Auditing,
            SearchState::Evaluating,
            SearchState::Matchmaking,
            SearchState::Completed,
        ]
    );
}

#[tokio::test]
async fn source_outage_fails_the_run_with_one_error() {
    let orchestrator = orchestrator(FailingSource);
    let run_id = orchestrator.start(cfo_profile()).expect("run starts");

    let run = orchestrator.wait(&run_id).await.expect("run finishes");

    assert_eq!(run.state(), SearchState::Failed);
    assert_eq!(run.error_log().len(), 1);
    let entry = &run.error_log()[0];
    assert_eq!(entry.code, "source_unavailable");
    assert_eq!(entry.class, ErrorClass::Fatal);
    assert_eq!(entry.stage, SearchState::Sourcing);
    assert!(entry.message.contains("provider outage"));
}

#[tokio::test]
async fn launching_a_started_run_is_rejected() {
    let orchestrator = orchestrator(StaticSource::empty());
    let run_id = orchestrator.create(cfo_profile());
    assert_eq!(
        orchestrator.get_state(&run_id).expect("run exists").state(),
        SearchState::Created
    );

    orchestrator.launch(&run_id).expect("first launch");
    let err = orchestrator.launch(&run_id).expect_err("second launch");

    assert!(matches!(err, OrchestratorError::InvalidState { .. }));
}

#[tokio::test]
async fn waiting_on_an_unlaunched_run_is_rejected() {
    let orchestrator = orchestrator(StaticSource::empty());
    let run_id = orchestrator.create(cfo_profile());

    let err = orchestrator.wait(&run_id).await.expect_err("not launched");
    assert!(matches!(
        err,
        OrchestratorError::InvalidState {
            state: SearchState::Created,
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_role_fails_before_any_run_is_created() {
    let orchestrator = SearchOrchestrator::builder(Arc::new(FailingSource))
        .config(test_config())
        .registry(Arc::new(
            RubricRegistry::from_rubrics(Vec::new()).expect("empty registry"),
        ))
        .build()
        .expect("valid config");

    let err = orchestrator
        .start(cfo_profile())
        .expect_err("no rubric for role");

    assert!(matches!(err, OrchestratorError::InvalidRole(_)));
    assert!(orchestrator.list().is_empty());
}

#[tokio::test]
async fn malformed_and_duplicate_candidates_are_isolated() {
    let orchestrator = orchestrator(StaticSource::new(vec![
        strong_cfo("good"),
        malformed("broken"),
        strong_cfo("good"),
        cash_basis_cfo("cash"),
    ]));
    let run_id = orchestrator.start(cfo_profile()).expect("run starts");

    let run = orchestrator.wait(&run_id).await.expect("run finishes");

    assert_eq!(run.state(), SearchState::Completed);
    assert_eq!(run.candidates().len(), 3);
    assert!(run.excluded().contains(&CandidateId::new("broken")));
    assert!(!run.evaluations().contains_key(&CandidateId::new("broken")));

    let codes: Vec<&str> = run.error_log().iter().map(|entry| entry.code.as_str()).collect();
    assert!(codes.contains(&"duplicate_candidate"));
    assert!(codes.contains(&"malformed_candidate"));
    assert!(run
        .error_log()
        .iter()
        .all(|entry| entry.class == ErrorClass::Isolated));

    let shortlist: Vec<&str> = run
        .recommendations()
        .iter()
        .map(|recommendation| recommendation.candidate_id.as_str())
        .collect();
    assert_eq!(shortlist, vec!["good", "cash"]);
    assert!(run.recommendations()[1].disqualified);
}

#[tokio::test]
async fn slow_candidate_is_timed_out_without_stalling_the_run() {
    let config = SearchConfig {
        candidate_timeout: Duration::from_millis(50),
        ..test_config()
    };
    let orchestrator = SearchOrchestrator::builder(Arc::new(StaticSource::new(vec![
        strong_cfo("fast"),
        strong_cfo("slow"),
    ])))
    .config(config)
    .auditor(Arc::new(StallingAuditor::new("slow", Duration::from_secs(5))))
    .build()
    .expect("valid config");

    let run_id = orchestrator.start(cfo_profile()).expect("run starts");
    let run = tokio::time::timeout(Duration::from_secs(3), orchestrator.wait(&run_id))
        .await
        .expect("run does not hang")
        .expect("run finishes");

    assert_eq!(run.state(), SearchState::Completed);
    assert_eq!(run.recommendations().len(), 1);
    assert_eq!(run.error_log().len(), 1);
    assert_eq!(run.error_log()[0].code, "candidate_timeout");
    assert_eq!(run.error_log()[0].stage, SearchState::Auditing);
    assert_eq!(
        run.error_log()[0].candidate_id,
        Some(CandidateId::new("slow"))
    );
}

#[tokio::test]
async fn source_timeout_is_fatal() {
    let config = SearchConfig {
        source_timeout: Duration::from_millis(20),
        ..test_config()
    };
    let orchestrator = SearchOrchestrator::new(
        Arc::new(SlowSource {
            delay: Duration::from_secs(5),
        }),
        config,
    )
    .expect("valid config");

    let run_id = orchestrator.start(cfo_profile()).expect("run starts");
    let run = orchestrator.wait(&run_id).await.expect("run finishes");

    assert_eq!(run.state(), SearchState::Failed);
    assert_eq!(run.error_log().len(), 1);
    assert_eq!(run.error_log()[0].code, "source_timeout");
}

#[tokio::test]
async fn cancel_moves_in_flight_run_to_failed() {
    let orchestrator = orchestrator(SlowSource {
        delay: Duration::from_secs(30),
    });
    let run_id = orchestrator.start(cfo_profile()).expect("run starts");

    let snapshot = orchestrator.cancel(&run_id).expect("cancel succeeds");
    assert_eq!(snapshot.state(), SearchState::Failed);
    assert_eq!(snapshot.error_log().len(), 1);
    assert_eq!(snapshot.error_log()[0].code, "cancelled");

    let run = orchestrator.wait(&run_id).await.expect("wait returns");
    assert_eq!(run.state(), SearchState::Failed);
    assert!(run.recommendations().is_empty());

    let err = orchestrator.cancel(&run_id).expect_err("already terminal");
    assert!(matches!(err, OrchestratorError::InvalidState { .. }));
}

#[tokio::test]
async fn cancel_during_auditing_keeps_written_audits_intact() {
    let records = vec![strong_cfo("quick"), strong_cfo("stalled")];
    let orchestrator = SearchOrchestrator::builder(Arc::new(StaticSource::new(records)))
        .config(test_config())
        .auditor(Arc::new(StallingAuditor::new(
            "stalled",
            Duration::from_millis(300),
        )))
        .build()
        .expect("valid config");
    let run_id = orchestrator.start(cfo_profile()).expect("run starts");

    let quick = CandidateId::new("quick");
    let mut attempts = 0;
    loop {
        let run = orchestrator.get_state(&run_id).expect("run exists");
        if run.state() == SearchState::Auditing && run.audits().contains_key(&quick) {
            break;
        }
        attempts += 1;
        assert!(attempts < 200, "run never reached a partial audit");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let snapshot = orchestrator.cancel(&run_id).expect("cancel succeeds");
    assert_eq!(snapshot.state(), SearchState::Failed);
    assert_eq!(snapshot.audits().len(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;

    let run = orchestrator.get_state(&run_id).expect("run exists");
    assert_eq!(run.state(), SearchState::Failed);
    assert_eq!(run.audits(), snapshot.audits());
    assert!(run.evaluations().is_empty());
    assert!(run.recommendations().is_empty());
    let codes: Vec<&str> = run.error_log().iter().map(|entry| entry.code.as_str()).collect();
    assert_eq!(codes, ["cancelled"]);
}

#[tokio::test]
async fn evaluation_failures_exclude_only_that_candidate() {
    let records = vec![strong_cfo("keep"), strong_cfo("reject")];
    let orchestrator = SearchOrchestrator::builder(Arc::new(StaticSource::new(records)))
        .config(test_config())
        .evaluator(Arc::new(RejectingEvaluator::new("reject")))
        .build()
        .expect("valid config");

    let run_id = orchestrator.start(cfo_profile()).expect("run starts");
    let run = orchestrator.wait(&run_id).await.expect("run finishes");

    let rejected = CandidateId::new("reject");
    assert_eq!(run.state(), SearchState::Completed);
    assert!(run.audits().contains_key(&rejected));
    assert!(!run.evaluations().contains_key(&rejected));
    assert!(run.excluded().contains(&rejected));

    assert_eq!(run.error_log().len(), 1);
    let entry = &run.error_log()[0];
    assert_eq!(entry.stage, SearchState::Evaluating);
    assert_eq!(entry.code, "malformed_candidate");
    assert_eq!(entry.class, ErrorClass::Isolated);
    assert_eq!(entry.candidate_id, Some(rejected.clone()));

    let ranked: Vec<&str> = run
        .recommendations()
        .iter()
        .map(|recommendation| recommendation.candidate_id.as_str())
        .collect();
    assert_eq!(ranked, ["keep"]);
}

#[tokio::test]
async fn panicking_source_fails_the_run() {
    let orchestrator = orchestrator(PanickingSource);
    let run_id = orchestrator.start(cfo_profile()).expect("run starts");

    let run = tokio::time::timeout(Duration::from_secs(2), orchestrator.wait(&run_id))
        .await
        .expect("run does not hang")
        .expect("run finishes");

    assert_eq!(run.state(), SearchState::Failed);
    assert_eq!(run.error_log().len(), 1);
    let entry = &run.error_log()[0];
    assert_eq!(entry.code, "source_unavailable");
    assert_eq!(entry.class, ErrorClass::Fatal);
    assert_eq!(entry.stage, SearchState::Sourcing);
    assert!(entry.message.contains("provider client crashed"));
}

#[tokio::test]
async fn panicking_aggregator_fails_the_run() {
    let orchestrator =
        SearchOrchestrator::builder(Arc::new(StaticSource::new(vec![strong_cfo("only")])))
            .config(test_config())
            .aggregator(Arc::new(PanickingAggregator))
            .build()
            .expect("valid config");
    let run_id = orchestrator.start(cfo_profile()).expect("run starts");

    let run = tokio::time::timeout(Duration::from_secs(2), orchestrator.wait(&run_id))
        .await
        .expect("run does not hang")
        .expect("run finishes");

    assert_eq!(run.state(), SearchState::Failed);
    assert!(run.recommendations().is_empty());
    assert_eq!(run.error_log().len(), 1);
    let entry = &run.error_log()[0];
    assert_eq!(entry.code, "stage_failed");
    assert_eq!(entry.stage, SearchState::Matchmaking);
    assert!(entry.message.contains("ranking model crashed"));
}

#[tokio::test]
async fn unknown_runs_are_reported() {
    let orchestrator = orchestrator(StaticSource::empty());
    let missing = RunId::new("run-999999");

    assert!(matches!(
        orchestrator.get_state(&missing),
        Err(OrchestratorError::RunNotFound(_))
    ));
    assert!(matches!(
        orchestrator.cancel(&missing),
        Err(OrchestratorError::RunNotFound(_))
    ));
}

#[tokio::test]
async fn worker_limit_bounds_concurrent_audits() {
    let auditor = Arc::new(CountingAuditor::default());
    let records = (0..6).map(|index| strong_cfo(&format!("c-{index}"))).collect();
    let config = SearchConfig {
        worker_limit: 2,
        ..test_config()
    };
    let orchestrator = SearchOrchestrator::builder(Arc::new(StaticSource::new(records)))
        .config(config)
        .auditor(auditor.clone())
        .build()
        .expect("valid config");

    let run_id = orchestrator.start(cfo_profile()).expect("run starts");
    let run = orchestrator.wait(&run_id).await.expect("run finishes");

    assert_eq!(run.state(), SearchState::Completed);
    assert_eq!(run.recommendations().len(), 6);
    assert!(auditor.peak() <= 2, "peak {}", auditor.peak());
    assert!(auditor.peak() >= 1);
}

#[tokio::test]
async fn synthetic_search_produces_an_ordered_shortlist() {
    let source = SyntheticCandidateSource::new(7, as_of());
    let orchestrator = orchestrator(source);
    let run_id = orchestrator
        .start(RoleProfile::new(RoleId::ProjectManager, Vec::new()))
        .expect("run starts");

    let run = orchestrator.wait(&run_id).await.expect("run finishes");

    assert_eq!(run.state(), SearchState::Completed);
    assert_eq!(
        run.recommendations().len(),
        run.candidates().len() - run.excluded().len()
    );
    let first_disqualified = run
        .recommendations()
        .iter()
        .position(|recommendation| recommendation.disqualified)
        .unwrap_or(run.recommendations().len());
    assert!(run.recommendations()[first_disqualified..]
        .iter()
        .all(|recommendation| recommendation.disqualified));

    let shortlist = run.shortlist();
    assert_eq!(shortlist.entries.len(), run.recommendations().len());
    assert!(shortlist.entries.iter().all(|entry| !entry.name.is_empty()));
}

#[tokio::test]
async fn list_reports_every_run_in_creation_order() {
    let orchestrator = orchestrator(StaticSource::empty());
    let first = orchestrator.create(cfo_profile());
    let second = orchestrator
        .start(RoleProfile::from_query("Healthcare Ops turnaround lead"))
        .expect("run starts");
    orchestrator.wait(&second).await.expect("run finishes");

    let summaries = orchestrator.list();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].run_id, first);
    assert_eq!(summaries[0].state, SearchState::Created);
    assert_eq!(summaries[1].role, RoleId::HealthcareOpsLead);
    assert_eq!(summaries[1].state, SearchState::Completed);
}
