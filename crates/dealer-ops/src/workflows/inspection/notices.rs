use serde::{Deserialize, Serialize};

use super::guard::WorkflowAction;
use crate::store::RecordId;

/// Views that mirror vehicle/inspection lists and must re-fetch after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentView {
    PendingApprovalQueue,
    MechanicAssignments,
    DashboardCounts,
    VehicleDetail,
    InspectionDetail,
}

impl DependentView {
    pub const ALL: [Self; 5] = [
        Self::PendingApprovalQueue,
        Self::MechanicAssignments,
        Self::DashboardCounts,
        Self::VehicleDetail,
        Self::InspectionDetail,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeOutcome {
    Success,
    Failure,
}

/// Message emitted after each workflow call for toasts and cache invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNotice {
    pub action: WorkflowAction,
    pub outcome: NoticeOutcome,
    pub actor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_id: Option<RecordId>,
    pub message: String,
    pub invalidated: Vec<DependentView>,
}

/// Outbound hook for the notification surface. Delivery is best effort.
pub trait WorkflowNotifier: Send + Sync {
    fn publish(&self, notice: WorkflowNotice) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
