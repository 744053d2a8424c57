use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::disposition::{DispositionAction, DispositionError};
use super::domain::{Actor, InspectionDraft, Role};
use super::notices::WorkflowNotifier;
use super::service::{InspectionWorkflowService, WorkflowError};
use crate::store::{EntityStore, RecordId, StoreError};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_EMAIL_HEADER: &str = "x-actor-email";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Router builder exposing the inspection workflow over HTTP.
pub fn inspection_router<S, N>(service: Arc<InspectionWorkflowService<S, N>>) -> Router
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/vehicles/:vehicle_id/inspection-request",
            post(request_inspection_handler::<S, N>),
        )
        .route(
            "/api/v1/vehicles/:vehicle_id/inspection",
            post(open_handler::<S, N>),
        )
        .route(
            "/api/v1/vehicles/:vehicle_id/inspections",
            get(history_handler::<S, N>),
        )
        .route("/api/v1/inspections/queue", get(queue_handler::<S, N>))
        .route(
            "/api/v1/inspections/:inspection_id",
            get(detail_handler::<S, N>).put(save_handler::<S, N>),
        )
        .route(
            "/api/v1/inspections/:inspection_id/notes",
            get(notes_handler::<S, N>),
        )
        .route(
            "/api/v1/inspections/:inspection_id/submit",
            post(submit_handler::<S, N>),
        )
        .route(
            "/api/v1/inspections/:inspection_id/approve",
            post(approve_handler::<S, N>),
        )
        .route(
            "/api/v1/inspections/:inspection_id/revision",
            post(revision_handler::<S, N>),
        )
        .route(
            "/api/v1/inspections/:inspection_id/edit-request",
            post(edit_request_handler::<S, N>),
        )
        .route(
            "/api/v1/inspections/:inspection_id/edit-approval",
            post(edit_approval_handler::<S, N>),
        )
        .route(
            "/api/v1/inspections/:inspection_id/disposition",
            post(disposition_handler::<S, N>),
        )
        .route(
            "/api/v1/mechanics/:mechanic/pending",
            get(pending_handler::<S, N>),
        )
        .route(
            "/api/v1/dashboard/inspections",
            get(dashboard_handler::<S, N>),
        )
        .with_state(service)
}

/// Identity forwarded by the auth collaborator in request headers.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

#[async_trait]
impl<St> FromRequestParts<St> for RequestActor
where
    St: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(RequestActor)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let unauthorized = |detail: &str| {
        let payload = json!({ "error": detail });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    };

    let id = header_value(headers, ACTOR_ID_HEADER)
        .ok_or_else(|| unauthorized("missing actor identity"))?;
    let raw_role = header_value(headers, ACTOR_ROLE_HEADER)
        .ok_or_else(|| unauthorized("missing actor role"))?;
    let role = Role::parse(&raw_role).ok_or_else(|| unauthorized("unknown actor role"))?;

    Ok(Actor {
        email: header_value(headers, ACTOR_EMAIL_HEADER).unwrap_or_default(),
        full_name: header_value(headers, ACTOR_NAME_HEADER).unwrap_or_default(),
        id,
        role,
    })
}

#[derive(Debug, Deserialize)]
pub struct InspectionRequestBody {
    pub mechanic: String,
}

#[derive(Debug, Deserialize)]
pub struct NotesBody {
    pub notes: String,
}

pub(crate) fn error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::Validation(_)
        | WorkflowError::Disposition(DispositionError::MissingDiscardReason) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
        WorkflowError::NotFound { .. } | WorkflowError::Store(StoreError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        WorkflowError::InvalidTransition(_)
        | WorkflowError::Disposition(_)
        | WorkflowError::ActiveInspection { .. }
        | WorkflowError::DecisionPending { .. }
        | WorkflowError::NotAwaitingInspection { .. }
        | WorkflowError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, WorkflowError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

type SharedService<S, N> = State<Arc<InspectionWorkflowService<S, N>>>;

pub(crate) async fn request_inspection_handler<S, N>(
    State(service): SharedService<S, N>,
    RequestActor(actor): RequestActor,
    Path(vehicle_id): Path<String>,
    Json(body): Json<InspectionRequestBody>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    let result = service.request_inspection(&actor, &RecordId(vehicle_id), &body.mechanic);
    respond(StatusCode::OK, result)
}

pub(crate) async fn open_handler<S, N>(
    State(service): SharedService<S, N>,
    RequestActor(actor): RequestActor,
    Path(vehicle_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::OK,
        service.open_inspection(&actor, &RecordId(vehicle_id)),
    )
}

pub(crate) async fn history_handler<S, N>(
    State(service): SharedService<S, N>,
    Path(vehicle_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::OK,
        service.inspection_history(&RecordId(vehicle_id)),
    )
}

pub(crate) async fn detail_handler<S, N>(
    State(service): SharedService<S, N>,
    Path(inspection_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::OK,
        service.get_inspection(&RecordId(inspection_id)),
    )
}

pub(crate) async fn save_handler<S, N>(
    State(service): SharedService<S, N>,
    RequestActor(actor): RequestActor,
    Path(inspection_id): Path<String>,
    Json(draft): Json<InspectionDraft>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::OK,
        service.save_inspection(&actor, &RecordId(inspection_id), draft),
    )
}

pub(crate) async fn notes_handler<S, N>(
    State(service): SharedService<S, N>,
    Path(inspection_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(StatusCode::OK, service.review_notes(&RecordId(inspection_id)))
}

pub(crate) async fn submit_handler<S, N>(
    State(service): SharedService<S, N>,
    RequestActor(actor): RequestActor,
    Path(inspection_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::ACCEPTED,
        service.submit(&actor, &RecordId(inspection_id)),
    )
}

pub(crate) async fn approve_handler<S, N>(
    State(service): SharedService<S, N>,
    RequestActor(actor): RequestActor,
    Path(inspection_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::OK,
        service.approve(&actor, &RecordId(inspection_id)),
    )
}

pub(crate) async fn revision_handler<S, N>(
    State(service): SharedService<S, N>,
    RequestActor(actor): RequestActor,
    Path(inspection_id): Path<String>,
    Json(body): Json<NotesBody>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::OK,
        service.request_revision(&actor, &RecordId(inspection_id), &body.notes),
    )
}

pub(crate) async fn edit_request_handler<S, N>(
    State(service): SharedService<S, N>,
    RequestActor(actor): RequestActor,
    Path(inspection_id): Path<String>,
    Json(body): Json<NotesBody>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::OK,
        service.request_edit(&actor, &RecordId(inspection_id), &body.notes),
    )
}

pub(crate) async fn edit_approval_handler<S, N>(
    State(service): SharedService<S, N>,
    RequestActor(actor): RequestActor,
    Path(inspection_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::OK,
        service.approve_edit(&actor, &RecordId(inspection_id)),
    )
}

pub(crate) async fn disposition_handler<S, N>(
    State(service): SharedService<S, N>,
    RequestActor(actor): RequestActor,
    Path(inspection_id): Path<String>,
    Json(decision): Json<DispositionAction>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(
        StatusCode::OK,
        service.decide(&actor, &RecordId(inspection_id), decision),
    )
}

pub(crate) async fn pending_handler<S, N>(
    State(service): SharedService<S, N>,
    Path(mechanic): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(StatusCode::OK, service.pending_for_mechanic(&mechanic))
}

pub(crate) async fn queue_handler<S, N>(State(service): SharedService<S, N>) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(StatusCode::OK, service.manager_queue())
}

pub(crate) async fn dashboard_handler<S, N>(State(service): SharedService<S, N>) -> Response
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    respond(StatusCode::OK, service.dashboard_counts())
}
