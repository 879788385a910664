use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

use crate::search::orchestrator::{RunId, SearchOrchestrator};
use crate::search::router::{search_router, SearchRequest};
use crate::search::domain::RoleId;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("json body")))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

fn shared(source: impl crate::search::source::CandidateSource + 'static) -> Arc<SearchOrchestrator> {
    Arc::new(orchestrator(source))
}

#[tokio::test]
async fn start_route_accepts_known_roles() {
    let orchestrator = shared(StaticSource::new(vec![strong_cfo("good")]));
    let router = search_router(orchestrator.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/searches",
            json!({ "role": "interim_cfo", "requirements": ["ASC 606 required"] }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let payload = read_json_body(response).await;
    let run_id = payload
        .get("run_id")
        .and_then(Value::as_str)
        .expect("run id")
        .to_string();

    let run = orchestrator
        .wait(&RunId::new(run_id))
        .await
        .expect("run finishes");
    assert_eq!(run.profile().requirements, vec!["ASC 606 required".to_string()]);
    assert_eq!(run.recommendations().len(), 1);
}

#[tokio::test]
async fn start_route_rejects_unknown_roles() {
    let router = search_router(shared(StaticSource::empty()));

    let response = router
        .oneshot(post_json("/api/v1/searches", json!({ "role": "chief_of_staff" })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("chief_of_staff"));
}

#[tokio::test]
async fn run_route_returns_snapshot_and_404_for_unknown_ids() {
    let orchestrator = shared(StaticSource::new(vec![strong_cfo("good")]));
    let run_id = orchestrator.start(cfo_profile()).expect("run starts");
    orchestrator.wait(&run_id).await.expect("run finishes");
    let router = search_router(orchestrator);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/searches/{run_id}")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["summary"]["state"], json!("completed"));
    assert_eq!(payload["shortlist"]["entries"][0]["candidate_id"], json!("good"));
    assert_eq!(payload["shortlist"]["entries"][0]["tier"], json!("Strong Hire"));

    let response = router
        .oneshot(get("/api/v1/searches/run-424242"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_route_conflicts_on_finished_runs() {
    let orchestrator = shared(StaticSource::empty());
    let run_id = orchestrator.start(cfo_profile()).expect("run starts");
    orchestrator.wait(&run_id).await.expect("run finishes");

    let response = search_router(orchestrator)
        .oneshot(post_json(
            &format!("/api/v1/searches/{run_id}/cancel"),
            json!({}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_route_returns_summaries() {
    let orchestrator = shared(StaticSource::empty());
    orchestrator.create(cfo_profile());

    let response = search_router(orchestrator)
        .oneshot(get("/api/v1/searches"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(1));
    assert_eq!(payload[0]["state"], json!("created"));
}

#[tokio::test]
async fn rubric_route_describes_criteria_and_red_flags() {
    let router = search_router(shared(StaticSource::empty()));

    let response = router
        .clone()
        .oneshot(get("/api/v1/rubrics/project_manager"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["role"], json!("project_manager"));
    assert_eq!(payload["criteria"].as_array().map(Vec::len), Some(4));
    assert_eq!(payload["red_flags"][0]["name"], json!("Vague Project History"));

    let response = router
        .oneshot(get("/api/v1/rubrics/astronaut"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn requests_resolve_roles_from_queries() {
    let request = SearchRequest {
        query: Some("Interim CFO for $50M SaaS, ASC 606 required, Remote".to_string()),
        ..SearchRequest::default()
    };
    let profile = request.into_profile().expect("query resolves");

    assert_eq!(profile.role, RoleId::InterimCfo);
    assert!(profile.requirements.contains(&"ASC 606 required".to_string()));
    assert!(profile.requirements.contains(&"Remote".to_string()));

    assert!(SearchRequest::default().into_profile().is_err());
}
