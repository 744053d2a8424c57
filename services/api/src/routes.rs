use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use dealer_ops::store::EntityStore;
use dealer_ops::workflows::inspection::{
    inspection_router, InspectionWorkflowService, WorkflowNotifier,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_inspection_routes<S, N>(service: Arc<InspectionWorkflowService<S, N>>) -> Router
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    inspection_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::TracingNotifier;
    use axum::body::Body;
    use axum::http::Request;
    use dealer_ops::store::JsonStore;
    use dealer_ops::workflows::inspection::InspectionWorkflowConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(ready: bool) -> Router {
        let service = Arc::new(InspectionWorkflowService::new(
            Arc::new(JsonStore::in_memory()),
            Arc::new(TracingNotifier::default()),
            InspectionWorkflowConfig::default(),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        state.readiness.store(ready, Ordering::Release);
        with_inspection_routes(service).layer(Extension(state))
    }

    async fn get_status(router: Router, uri: &str) -> StatusCode {
        router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes")
            .status()
    }

    #[tokio::test]
    async fn readiness_tracks_startup_flag() {
        assert_eq!(get_status(app(false), "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(get_status(app(true), "/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_and_workflow_routes_share_one_router() {
        assert_eq!(get_status(app(true), "/health").await, StatusCode::OK);
        assert_eq!(
            get_status(app(true), "/api/v1/dashboard/inspections").await,
            StatusCode::OK
        );
        assert_eq!(get_status(app(true), "/metrics").await, StatusCode::OK);
    }
}
