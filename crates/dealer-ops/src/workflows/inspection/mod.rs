//! Vehicle inspection ("peritaje") approval workflow.
//!
//! Mechanics fill in and submit inspections for vehicles assigned to them; managers approve,
//! send them back for revision, unlock approved records for edits, and decide whether the
//! vehicle is taken into inventory, discarded, or left for later.

pub mod config;
pub mod disposition;
pub mod domain;
pub mod guard;
pub mod lifecycle;
pub mod notices;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use config::{EditRequestPolicy, InspectionWorkflowConfig, DEFAULT_REFRESH_INTERVAL};
pub use disposition::{DispositionAction, DispositionError};
pub use domain::{
    Actor, Assessment, ComponentAssessment, ConditionRating, DispositionState, Inspection,
    InspectionDraft, InspectionStatus, PaintAssessment, Recommendation, Role, ServiceEntry,
    TireAssessment, Vehicle, VehicleStatus,
};
pub use guard::{AuthorizationGuard, Forbidden, WorkflowAction};
pub use lifecycle::{InspectionAction, InvalidTransition, ValidationError};
pub use notices::{DependentView, NoticeOutcome, NotifyError, WorkflowNotice, WorkflowNotifier};
pub use router::inspection_router;
pub use service::{InspectionWorkflowService, WorkflowError};
pub use views::{
    ApprovalOutcome, DashboardCounts, DispositionCandidate, ManagerQueue, NoteKind, PendingItem,
    PendingReason, ReviewNotes,
};
