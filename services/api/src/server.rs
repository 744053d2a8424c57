use crate::cli::ServeArgs;
use crate::infra::{open_store, seed_vehicles, AppState, TracingNotifier};
use crate::routes::with_inspection_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use dealer_ops::config::AppConfig;
use dealer_ops::error::AppError;
use dealer_ops::telemetry;
use dealer_ops::workflows::inspection::InspectionWorkflowService;
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

    let store = Arc::new(open_store(&config.store)?);
    if args.seed {
        let added = seed_vehicles(store.as_ref())?;
        info!(added, "sample vehicles loaded");
    }

    let service = Arc::new(InspectionWorkflowService::new(
        store,
        Arc::new(TracingNotifier::default()),
        config.workflow.clone(),
    ));

    let app = with_inspection_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        store = ?config.store.backend,
        edit_policy = ?config.workflow.edit_policy,
        "inspection workflow service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
