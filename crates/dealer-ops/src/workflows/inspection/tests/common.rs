use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::store::{Criteria, Entity, EntityStore, JsonStore, RecordId, SortSpec, StoreError};
use crate::workflows::inspection::domain::{
    Actor, Assessment, ComponentAssessment, ConditionRating, Inspection, InspectionDraft,
    Recommendation, Role, TireAssessment, Vehicle, VehicleStatus,
};
use crate::workflows::inspection::notices::{NotifyError, WorkflowNotice, WorkflowNotifier};
use crate::workflows::inspection::router::{
    ACTOR_EMAIL_HEADER, ACTOR_ID_HEADER, ACTOR_NAME_HEADER, ACTOR_ROLE_HEADER,
};
use crate::workflows::inspection::{InspectionWorkflowConfig, InspectionWorkflowService};

pub(super) const MECHANIC_NAME: &str = "Rosa Medina";

pub(super) type TestService = InspectionWorkflowService<JsonStore, MemoryNotifier>;

pub(super) fn mechanic() -> Actor {
    Actor {
        id: "user-rosa".to_string(),
        email: "rosa@dealer.test".to_string(),
        full_name: MECHANIC_NAME.to_string(),
        role: Role::Mechanic,
    }
}

pub(super) fn other_mechanic() -> Actor {
    Actor {
        id: "user-tomas".to_string(),
        email: "tomas@dealer.test".to_string(),
        full_name: "Tomas Ruiz".to_string(),
        role: Role::Mechanic,
    }
}

pub(super) fn manager() -> Actor {
    Actor {
        id: "user-lucia".to_string(),
        email: "lucia@dealer.test".to_string(),
        full_name: "Lucia Paz".to_string(),
        role: Role::Manager,
    }
}

pub(super) fn build_service() -> (TestService, Arc<JsonStore>, Arc<MemoryNotifier>) {
    build_service_with(InspectionWorkflowConfig::default())
}

pub(super) fn build_service_with(
    config: InspectionWorkflowConfig,
) -> (TestService, Arc<JsonStore>, Arc<MemoryNotifier>) {
    let store = Arc::new(JsonStore::in_memory());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = InspectionWorkflowService::new(store.clone(), notifier.clone(), config);
    (service, store, notifier)
}

pub(super) fn seed_vehicle(store: &JsonStore, brand: &str, model: &str) -> Vehicle {
    let mut vehicle = Vehicle::new(brand, model, VehicleStatus::Disponible);
    vehicle.year = Some(2019);
    vehicle.kilometers = Some(84_000);
    store.create(vehicle).expect("vehicle stored")
}

/// Vehicle with an open inspection request assigned to `MECHANIC_NAME`.
pub(super) fn requested_vehicle(service: &TestService, store: &JsonStore) -> Vehicle {
    let vehicle = seed_vehicle(store, "Toyota", "Hilux");
    service
        .request_inspection(&manager(), &vehicle.id, MECHANIC_NAME)
        .expect("inspection requested")
}

/// Form contents whose itemized costs add up to 6100.
pub(super) fn completed_draft() -> InspectionDraft {
    let component = |name: &str, rating, cost| ComponentAssessment {
        component: name.to_string(),
        rating,
        estimated_cost: cost,
        notes: None,
    };
    let tire = |position: &str, condition, cost| TireAssessment {
        position: position.to_string(),
        condition,
        tread_depth_mm: None,
        estimated_cost: cost,
    };

    InspectionDraft {
        inspector_name: Some(MECHANIC_NAME.to_string()),
        inspection_date: NaiveDate::from_ymd_opt(2025, 6, 2),
        kilometers_at_inspection: Some(84_250),
        recommendation: Some(Recommendation::TakeWithRepairs),
        general_observations: Some("Clutch slipping, rear tires worn".to_string()),
        assessment: Assessment {
            components: vec![
                component("clutch", ConditionRating::Poor, 1500.0),
                component("engine", ConditionRating::Good, 0.0),
                component("gearbox", ConditionRating::Fair, 3000.0),
            ],
            tires: vec![
                tire("rear_left", ConditionRating::Poor, 800.0),
                tire("rear_right", ConditionRating::Poor, 800.0),
                tire("front_left", ConditionRating::Good, 0.0),
                tire("front_right", ConditionRating::Good, 0.0),
            ],
            paint: Vec::new(),
            services: Vec::new(),
        },
    }
}

pub(super) fn submitted_inspection(service: &TestService, store: &JsonStore) -> Inspection {
    let vehicle = requested_vehicle(service, store);
    let draft = service
        .open_inspection(&mechanic(), &vehicle.id)
        .expect("draft opened");
    service
        .save_inspection(&mechanic(), &draft.id, completed_draft())
        .expect("draft saved");
    service
        .submit(&mechanic(), &draft.id)
        .expect("inspection submitted")
}

pub(super) fn approved_inspection(service: &TestService, store: &JsonStore) -> Inspection {
    let submitted = submitted_inspection(service, store);
    service
        .approve(&manager(), &submitted.id)
        .expect("inspection approved")
        .inspection
}

pub(super) fn stored_vehicle(store: &JsonStore, id: &RecordId) -> Vehicle {
    store
        .get::<Vehicle>(id)
        .expect("store readable")
        .expect("vehicle present")
}

pub(super) fn stored_inspection(store: &JsonStore, id: &RecordId) -> Inspection {
    store
        .get::<Inspection>(id)
        .expect("store readable")
        .expect("inspection present")
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    notices: Arc<Mutex<Vec<WorkflowNotice>>>,
}

impl MemoryNotifier {
    pub(super) fn notices(&self) -> Vec<WorkflowNotice> {
        self.notices.lock().expect("notice mutex poisoned").clone()
    }

    pub(super) fn last(&self) -> WorkflowNotice {
        self.notices().pop().expect("at least one notice")
    }
}

impl WorkflowNotifier for MemoryNotifier {
    fn publish(&self, notice: WorkflowNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct UnavailableStore;

impl EntityStore for UnavailableStore {
    fn filter<T: Entity>(
        &self,
        _criteria: &Criteria,
        _sort: Option<&SortSpec>,
    ) -> Result<Vec<T>, StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn get<T: Entity>(&self, _id: &RecordId) -> Result<Option<T>, StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn create<T: Entity>(&self, _record: T) -> Result<T, StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn update<T: Entity>(&self, _id: &RecordId, _record: T) -> Result<T, StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn delete<T: Entity>(&self, _id: &RecordId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }
}

pub(super) fn request(
    method: Method,
    uri: &str,
    actor: Option<&Actor>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, actor.id.as_str())
            .header(ACTOR_EMAIL_HEADER, actor.email.as_str())
            .header(ACTOR_NAME_HEADER, actor.full_name.as_str())
            .header(ACTOR_ROLE_HEADER, actor.role.label());
    }

    match body {
        Some(body) => builder
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("json body")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
