use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{RoleId, RoleProfile};
use super::orchestrator::{OrchestratorError, RunId, SearchOrchestrator};

/// Body accepted by `POST /api/v1/searches`. Either `role` or `query` must be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub query: Option<String>,
}

impl SearchRequest {
    /// Resolve the request into a role profile.
    pub fn into_profile(self) -> Result<RoleProfile, OrchestratorError> {
        let query = self.query.filter(|query| !query.trim().is_empty());
        let mut profile = match (self.role, query) {
            (Some(role), query) => {
                let role: RoleId = role.parse()?;
                let mut profile = RoleProfile::new(role, Vec::new());
                if let Some(query) = query {
                    profile.query = query.trim().to_string();
                }
                profile
            }
            (None, Some(query)) => RoleProfile::from_query(&query),
            (None, None) => {
                return Err(OrchestratorError::InvalidRole(
                    super::rubric::RubricError::UnknownRole(String::new()),
                ))
            }
        };
        profile.requirements.extend(self.requirements);
        Ok(profile)
    }
}

/// Router exposing search runs and rubric descriptions.
pub fn search_router(orchestrator: Arc<SearchOrchestrator>) -> Router {
    Router::new()
        .route(
            "/api/v1/searches",
            post(start_handler).get(list_handler),
        )
        .route("/api/v1/searches/:run_id", get(run_handler))
        .route("/api/v1/searches/:run_id/cancel", post(cancel_handler))
        .route("/api/v1/rubrics/:role", get(rubric_handler))
        .with_state(orchestrator)
}

pub(crate) async fn start_handler(
    State(orchestrator): State<Arc<SearchOrchestrator>>,
    axum::Json(request): axum::Json<SearchRequest>,
) -> Response {
    let started = request
        .into_profile()
        .and_then(|profile| orchestrator.start(profile));

    match started {
        Ok(run_id) => {
            let state = orchestrator
                .get_state(&run_id)
                .map(|run| run.state().label())
                .unwrap_or("sourcing");
            let payload = json!({
                "run_id": run_id,
                "state": state,
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler(State(orchestrator): State<Arc<SearchOrchestrator>>) -> Response {
    (StatusCode::OK, axum::Json(orchestrator.list())).into_response()
}

pub(crate) async fn run_handler(
    State(orchestrator): State<Arc<SearchOrchestrator>>,
    Path(run_id): Path<String>,
) -> Response {
    match orchestrator.get_state(&RunId(run_id)) {
        Ok(run) => {
            let payload = json!({
                "summary": run.summary(),
                "shortlist": run.shortlist(),
                "run": run,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler(
    State(orchestrator): State<Arc<SearchOrchestrator>>,
    Path(run_id): Path<String>,
) -> Response {
    match orchestrator.cancel(&RunId(run_id)) {
        Ok(run) => (StatusCode::OK, axum::Json(run.summary())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rubric_handler(
    State(orchestrator): State<Arc<SearchOrchestrator>>,
    Path(role): Path<String>,
) -> Response {
    match orchestrator.registry().lookup(&role) {
        Ok(rubric) => (StatusCode::OK, axum::Json(rubric.as_ref().clone())).into_response(),
        Err(error) => error_response(OrchestratorError::InvalidRole(error)),
    }
}

fn error_response(error: OrchestratorError) -> Response {
    let status = match &error {
        OrchestratorError::InvalidRole(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OrchestratorError::InvalidState { .. } => StatusCode::CONFLICT,
        OrchestratorError::RunNotFound(_) => StatusCode::NOT_FOUND,
        OrchestratorError::RuntimeUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
