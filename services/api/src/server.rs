use crate::cli::ServeArgs;
use crate::infra::{candidate_source, AppState, DEFAULT_SEED};
use crate::routes::with_search_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use pronexus::config::AppConfig;
use pronexus::error::AppError;
use pronexus::search::SearchOrchestrator;
use pronexus::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let source = candidate_source(
        args.csv.take(),
        args.seed.unwrap_or(DEFAULT_SEED),
        Local::now().date_naive(),
    );
    let orchestrator = Arc::new(SearchOrchestrator::new(source, config.search.clone())?);

    let app = with_search_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        worker_limit = config.search.worker_limit,
        "search orchestrator ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
