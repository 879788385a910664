use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::warn;

use super::error::SearchError;
use crate::search::domain::{CandidateError, CandidateId, CandidateRecord};

/// Bounds applied to every per-candidate call in a stage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageLimits {
    pub worker_limit: usize,
    pub candidate_timeout: Duration,
}

/// Run `work` for every candidate with at most `worker_limit` in flight.
///
/// Each result is handed to `on_result` as soon as that candidate finishes, so writes stay
/// atomic per candidate and ordering never depends on completion order. A worker that
/// panics or is aborted is reported as [`SearchError::WorkerFailed`].
pub(crate) async fn fan_out<T, W, Fut, R>(
    candidates: Vec<CandidateRecord>,
    limits: StageLimits,
    cancel: watch::Receiver<bool>,
    work: W,
    mut on_result: R,
) where
    T: Send + 'static,
    W: Fn(Arc<CandidateRecord>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, CandidateError>> + Send + 'static,
    R: FnMut(CandidateId, Result<T, SearchError>),
{
    let semaphore = Arc::new(Semaphore::new(limits.worker_limit.max(1)));
    let work = Arc::new(work);
    let timeout_ms = u64::try_from(limits.candidate_timeout.as_millis()).unwrap_or(u64::MAX);
    let mut pending: BTreeSet<CandidateId> = BTreeSet::new();
    let mut workers = JoinSet::new();

    for candidate in candidates {
        let candidate = Arc::new(candidate);
        pending.insert(candidate.id.clone());

        let semaphore = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        let mut cancel = cancel.clone();
        let timeout = limits.candidate_timeout;

        workers.spawn(async move {
            let candidate_id = candidate.id.clone();
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (candidate_id, Err(SearchError::Cancelled));
            };
            if *cancel.borrow() {
                return (candidate_id, Err(SearchError::Cancelled));
            }

            let cancelled = async move {
                if cancel.wait_for(|flag| *flag).await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            let outcome = tokio::select! {
                _ = cancelled => Err(SearchError::Cancelled),
                result = tokio::time::timeout(timeout, work(Arc::clone(&candidate))) => match result {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(SearchError::MalformedCandidate(err)),
                    Err(_) => Err(SearchError::CandidateTimeout {
                        candidate_id: candidate_id.clone(),
                        timeout_ms,
                    }),
                },
            };

            (candidate_id, outcome)
        });
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((candidate_id, outcome)) => {
                pending.remove(&candidate_id);
                on_result(candidate_id, outcome);
            }
            Err(err) => warn!(error = %err, "candidate worker terminated abnormally"),
        }
    }

    for candidate_id in pending {
        on_result(
            candidate_id.clone(),
            Err(SearchError::WorkerFailed(candidate_id)),
        );
    }
}
