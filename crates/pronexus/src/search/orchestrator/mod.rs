//! Search run state machine.
//!
//! The orchestrator exclusively owns every [`SearchRun`]. Components receive read-only
//! slices and return pure results which the orchestrator writes back one candidate at a
//! time, so a cancelled run never holds half-written candidate state.

mod error;
mod run;
mod stage;

pub use error::{ErrorClass, OrchestratorError, SearchError};
pub use run::{
    RunErrorEntry, RunId, RunSummary, SearchRun, SearchState, ShortlistEntry, ShortlistView,
    StateTransition,
};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::{debug, info, warn};

use super::audit::{ForensicAuditor, TimelineAuditor};
use super::domain::RoleProfile;
use super::evaluation::{DomainEvaluator, RubricEvaluator};
use super::matchmaker::{Aggregator, Matchmaker};
use super::rubric::{Rubric, RubricRegistry};
use super::source::CandidateSource;
use crate::config::{ConfigError, SearchConfig};
use stage::StageLimits;

/// Per-run storage: the aggregate itself plus the channels observers and workers use.
struct RunSlot {
    run: Mutex<SearchRun>,
    state: watch::Sender<SearchState>,
    cancel: watch::Sender<bool>,
    task: Mutex<Option<AbortHandle>>,
}

impl RunSlot {
    fn new(run: SearchRun) -> Self {
        let (state, _) = watch::channel(run.state());
        let (cancel, _) = watch::channel(false);
        Self {
            run: Mutex::new(run),
            state,
            cancel,
            task: Mutex::new(None),
        }
    }

    /// Apply one atomic mutation and publish the resulting state.
    fn with<T>(&self, apply: impl FnOnce(&mut SearchRun) -> T) -> T {
        let mut run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = apply(&mut run);
        self.state.send_replace(run.state());
        outcome
    }

    fn snapshot(&self) -> SearchRun {
        self.run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Collaborators shared by every run.
#[derive(Clone)]
struct Pipeline {
    source: Arc<dyn CandidateSource>,
    auditor: Arc<dyn ForensicAuditor>,
    evaluator: Arc<dyn DomainEvaluator>,
    aggregator: Arc<dyn Aggregator>,
    config: Arc<SearchConfig>,
}

/// Drives search runs through sourcing, auditing, evaluation and matchmaking.
pub struct SearchOrchestrator {
    pipeline: Pipeline,
    registry: Arc<RubricRegistry>,
    runs: Mutex<BTreeMap<RunId, Arc<RunSlot>>>,
    sequence: AtomicU64,
}

impl SearchOrchestrator {
    pub fn builder(source: Arc<dyn CandidateSource>) -> SearchOrchestratorBuilder {
        SearchOrchestratorBuilder {
            source,
            config: SearchConfig::default(),
            auditor: None,
            evaluator: None,
            aggregator: None,
            registry: None,
        }
    }

    /// Orchestrator with the rule-based auditor, evaluator and matchmaker.
    pub fn new(source: Arc<dyn CandidateSource>, config: SearchConfig) -> Result<Self, ConfigError> {
        Self::builder(source).config(config).build()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.pipeline.config
    }

    pub fn registry(&self) -> &Arc<RubricRegistry> {
        &self.registry
    }

    /// Register a run in `Created` without starting it.
    pub fn create(&self, profile: RoleProfile) -> RunId {
        let run_id = self.next_run_id();
        let role = profile.role;
        let slot = Arc::new(RunSlot::new(SearchRun::new(run_id.clone(), profile)));
        self.runs().insert(run_id.clone(), slot);
        debug!(run_id = %run_id, role = %role, "search run created");
        run_id
    }

    /// Move a `Created` run to `Sourcing` and drive it on the current tokio runtime.
    ///
    /// The rubric is resolved before any sourcing call; an unknown role leaves the run in
    /// `Created`.
    pub fn launch(&self, run_id: &RunId) -> Result<(), OrchestratorError> {
        let slot = self.slot(run_id)?;
        let role = slot.with(|run| run.profile().role);
        let rubric = self.registry.get_rubric(role)?;
        let runtime = Handle::try_current()
            .map_err(|_| OrchestratorError::RuntimeUnavailable(run_id.clone()))?;

        slot.with(|run| run.transition(SearchState::Sourcing, "start"))?;
        info!(run_id = %run_id, role = %role, "search run started");

        let driver = runtime.spawn(drive(self.pipeline.clone(), Arc::clone(&slot), rubric));
        *slot.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(driver.abort_handle());
        runtime.spawn(supervise(slot, run_id.clone(), driver));
        Ok(())
    }

    /// Validate the role, create a run and launch it.
    pub fn start(&self, profile: RoleProfile) -> Result<RunId, OrchestratorError> {
        self.registry.get_rubric(profile.role)?;
        let run_id = self.create(profile);
        self.launch(&run_id)?;
        Ok(run_id)
    }

    /// Wait for a launched run to reach `Completed` or `Failed` and return its snapshot.
    pub async fn wait(&self, run_id: &RunId) -> Result<SearchRun, OrchestratorError> {
        let slot = self.slot(run_id)?;
        let mut state = slot.state.subscribe();
        let current = *state.borrow_and_update();
        if current == SearchState::Created {
            return Err(OrchestratorError::InvalidState {
                run_id: run_id.clone(),
                state: current,
                operation: "wait",
            });
        }

        let _ = state.wait_for(|state| state.is_terminal()).await;
        Ok(slot.snapshot())
    }

    /// Read-only copy of a run.
    pub fn get_state(&self, run_id: &RunId) -> Result<SearchRun, OrchestratorError> {
        Ok(self.slot(run_id)?.snapshot())
    }

    pub fn list(&self) -> Vec<RunSummary> {
        self.runs()
            .values()
            .map(|slot| slot.snapshot().summary())
            .collect()
    }

    /// Move an in-flight run to `Failed` and stop its workers.
    pub fn cancel(&self, run_id: &RunId) -> Result<SearchRun, OrchestratorError> {
        let slot = self.slot(run_id)?;
        slot.with(|run| {
            if run.state().is_terminal() {
                return Err(OrchestratorError::InvalidState {
                    run_id: run_id.clone(),
                    state: run.state(),
                    operation: "cancel",
                });
            }
            run.fail(SearchError::Cancelled)
        })?;

        slot.cancel.send_replace(true);
        if let Some(task) = slot
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        warn!(run_id = %run_id, "search run cancelled");
        Ok(slot.snapshot())
    }

    fn runs(&self) -> MutexGuard<'_, BTreeMap<RunId, Arc<RunSlot>>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, run_id: &RunId) -> Result<Arc<RunSlot>, OrchestratorError> {
        self.runs()
            .get(run_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::RunNotFound(run_id.clone()))
    }

    fn next_run_id(&self) -> RunId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        RunId(format!("run-{id:06}"))
    }
}

pub struct SearchOrchestratorBuilder {
    source: Arc<dyn CandidateSource>,
    config: SearchConfig,
    auditor: Option<Arc<dyn ForensicAuditor>>,
    evaluator: Option<Arc<dyn DomainEvaluator>>,
    aggregator: Option<Arc<dyn Aggregator>>,
    registry: Option<Arc<RubricRegistry>>,
}

impl SearchOrchestratorBuilder {
    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn auditor(mut self, auditor: Arc<dyn ForensicAuditor>) -> Self {
        self.auditor = Some(auditor);
        self
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn DomainEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn aggregator(mut self, aggregator: Arc<dyn Aggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn registry(mut self, registry: Arc<RubricRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<SearchOrchestrator, ConfigError> {
        self.config.validate()?;
        let config = self.config;

        let auditor = self
            .auditor
            .unwrap_or_else(|| Arc::new(TimelineAuditor::new(config.audit())));
        let evaluator = self
            .evaluator
            .unwrap_or_else(|| Arc::new(RubricEvaluator::from_config(&config)));
        let aggregator = self
            .aggregator
            .unwrap_or_else(|| Arc::new(Matchmaker::from_config(&config)));

        Ok(SearchOrchestrator {
            pipeline: Pipeline {
                source: self.source,
                auditor,
                evaluator,
                aggregator,
                config: Arc::new(config),
            },
            registry: self.registry.unwrap_or_else(RubricRegistry::builtin),
            runs: Mutex::new(BTreeMap::new()),
            sequence: AtomicU64::new(1),
        })
    }
}

/// Advance to `target`, returning false when the run was stopped underneath us.
fn advance(slot: &RunSlot, run_id: &RunId, target: SearchState) -> bool {
    match slot.with(|run| run.transition(target, "advance")) {
        Ok(()) => {
            debug!(run_id = %run_id, stage = %target, "stage entered");
            true
        }
        Err(err) => {
            debug!(run_id = %run_id, error = %err, "run stopped before stage");
            false
        }
    }
}

fn fail(slot: &RunSlot, run_id: &RunId, error: SearchError) {
    warn!(run_id = %run_id, code = error.code(), error = %error, "search run failed");
    if let Err(err) = slot.with(|run| run.fail(error)) {
        debug!(run_id = %run_id, error = %err, "run already terminal");
    }
}

fn record_exclusion(slot: &RunSlot, run_id: &RunId, stage: SearchState, error: SearchError) {
    let Some(candidate_id) = error.candidate_id().cloned() else {
        return;
    };
    if slot.with(|run| run.exclude(candidate_id.clone(), error.clone())) {
        warn!(
            run_id = %run_id,
            candidate_id = %candidate_id,
            stage = %stage,
            code = error.code(),
            error = %error,
            "candidate excluded"
        );
    }
}

/// Fail the run when its driver dies without reaching a terminal state.
async fn supervise(slot: Arc<RunSlot>, run_id: RunId, driver: JoinHandle<()>) {
    let Err(err) = driver.await else {
        return;
    };
    if err.is_cancelled() {
        return;
    }

    let stage = slot.with(|run| run.state());
    if stage.is_terminal() {
        return;
    }
    let reason = panic_reason(err);
    let error = if stage == SearchState::Sourcing {
        SearchError::SourceUnavailable(format!("candidate source panicked: {reason}"))
    } else {
        SearchError::StageFailed { stage, reason }
    };
    fail(&slot, &run_id, error);
}

fn panic_reason(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string()),
        Err(err) => err.to_string(),
    }
}

async fn drive(pipeline: Pipeline, slot: Arc<RunSlot>, rubric: Arc<Rubric>) {
    let (run_id, profile) = slot.with(|run| (run.run_id().clone(), run.profile().clone()));
    let config = Arc::clone(&pipeline.config);
    let limits = StageLimits {
        worker_limit: config.worker_limit,
        candidate_timeout: config.candidate_timeout,
    };

    let fetched = tokio::time::timeout(
        config.source_timeout,
        pipeline.source.fetch(&profile, config.candidate_count),
    )
    .await;
    let records = match fetched {
        Ok(Ok(records)) => records,
        Ok(Err(err)) => {
            fail(&slot, &run_id, SearchError::SourceUnavailable(err.to_string()));
            return;
        }
        Err(_) => {
            let timeout_ms = u64::try_from(config.source_timeout.as_millis()).unwrap_or(u64::MAX);
            fail(&slot, &run_id, SearchError::SourceTimeout { timeout_ms });
            return;
        }
    };
    info!(run_id = %run_id, candidates = records.len(), "candidates sourced");

    let Some(candidates) = slot.with(|run| {
        run.record_candidates(records)
            .then(|| run.candidates().to_vec())
    }) else {
        return;
    };
    if !advance(&slot, &run_id, SearchState::Auditing) {
        return;
    }

    let auditor = Arc::clone(&pipeline.auditor);
    stage::fan_out(
        candidates,
        limits,
        slot.cancel.subscribe(),
        move |candidate| {
            let auditor = Arc::clone(&auditor);
            async move { auditor.audit(&candidate).await }
        },
        |candidate_id, outcome| match outcome {
            Ok(finding) => {
                slot.with(|run| run.record_audit(finding));
            }
            Err(SearchError::Cancelled) => {
                debug!(run_id = %run_id, candidate_id = %candidate_id, "audit cancelled");
            }
            Err(error) => record_exclusion(&slot, &run_id, SearchState::Auditing, error),
        },
    )
    .await;
    if !advance(&slot, &run_id, SearchState::Evaluating) {
        return;
    }

    let survivors = slot.with(|run| run.audited_survivors());
    let evaluator = Arc::clone(&pipeline.evaluator);
    let stage_rubric = Arc::clone(&rubric);
    stage::fan_out(
        survivors,
        limits,
        slot.cancel.subscribe(),
        move |candidate| {
            let evaluator = Arc::clone(&evaluator);
            let rubric = Arc::clone(&stage_rubric);
            async move { evaluator.evaluate(&candidate, &rubric).await }
        },
        |candidate_id, outcome| match outcome {
            Ok(result) => {
                slot.with(|run| run.record_evaluation(result));
            }
            Err(SearchError::Cancelled) => {
                debug!(run_id = %run_id, candidate_id = %candidate_id, "evaluation cancelled");
            }
            Err(error) => record_exclusion(&slot, &run_id, SearchState::Evaluating, error),
        },
    )
    .await;
    if !advance(&slot, &run_id, SearchState::Matchmaking) {
        return;
    }

    let (evaluations, audits) = slot.with(|run| (run.evaluations().clone(), run.paired_audits()));
    let recommendations = pipeline.aggregator.aggregate(&evaluations, &audits);
    let shortlisted = recommendations.len();
    let completed = slot.with(|run| {
        run.set_recommendations(recommendations)
            && run.transition(SearchState::Completed, "complete").is_ok()
    });

    if completed {
        let summary = slot.with(|run| run.summary());
        info!(
            run_id = %run_id,
            shortlisted,
            excluded = summary.excluded,
            errors = summary.errors,
            "search run completed"
        );
    }
}
