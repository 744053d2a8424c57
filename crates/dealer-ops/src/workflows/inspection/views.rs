//! Read-side projections served to mechanics and managers.

use serde::Serialize;

use super::domain::{Inspection, InspectionStatus, Vehicle, VehicleStatus};
use crate::store::RecordId;

/// Why a vehicle still appears on a mechanic's worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingReason {
    NotStarted,
    Draft,
    RevisionRequested,
    EditApproved,
    AwaitingApproval,
    AwaitingDisposition,
}

impl PendingReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Inspection not started",
            Self::Draft => "Draft in progress",
            Self::RevisionRequested => "Revision requested by manager",
            Self::EditApproved => "Edit approved, resubmit required",
            Self::AwaitingApproval => "Awaiting manager approval",
            Self::AwaitingDisposition => "Approved, awaiting disposition",
        }
    }
}

/// Classify a vehicle for the mechanic worklist.
///
/// A vehicle is pending while it is `A_PERITAR` and either has no inspection, has one in a
/// working or review state, or has an approved inspection whose disposition is still open
/// (including deferred decisions). An approval older than the vehicle's latest request belongs
/// to a finished cycle and counts as not started. Pending edit requests are waiting on the manager and are
/// left off the list.
pub fn pending_reason(vehicle: &Vehicle, latest: Option<&Inspection>) -> Option<PendingReason> {
    if vehicle.status != VehicleStatus::APeritar {
        return None;
    }

    let Some(inspection) = latest else {
        return Some(PendingReason::NotStarted);
    };

    match inspection.status {
        InspectionStatus::Draft => Some(PendingReason::Draft),
        InspectionStatus::RevisionRequested => Some(PendingReason::RevisionRequested),
        InspectionStatus::EditApproved => Some(PendingReason::EditApproved),
        InspectionStatus::PendingApproval => Some(PendingReason::AwaitingApproval),
        InspectionStatus::Approved if vehicle.requested_since(inspection) => {
            Some(PendingReason::NotStarted)
        }
        InspectionStatus::Approved => Some(PendingReason::AwaitingDisposition),
        InspectionStatus::EditRequested => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingItem {
    pub vehicle: Vehicle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection: Option<Inspection>,
    pub reason: PendingReason,
    pub reason_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispositionCandidate {
    pub vehicle: Vehicle,
    pub inspection: Inspection,
    pub deferred: bool,
}

/// Items waiting on a manager.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManagerQueue {
    pub awaiting_approval: Vec<Inspection>,
    pub edit_requests: Vec<Inspection>,
    pub awaiting_disposition: Vec<DispositionCandidate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub awaiting_inspection: usize,
    pub awaiting_approval: usize,
    pub edit_requests: usize,
    pub awaiting_disposition: usize,
    pub deferred_decisions: usize,
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Revision,
    EditRequest,
}

/// Notes left for the counter-party on an inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewNotes {
    pub inspection_id: RecordId,
    pub status: InspectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NoteKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl ReviewNotes {
    pub fn for_inspection(inspection: &Inspection) -> Self {
        let (kind, author) = match inspection.status {
            InspectionStatus::RevisionRequested => (
                Some(NoteKind::Revision),
                inspection.revision_requested_by.clone(),
            ),
            InspectionStatus::EditRequested | InspectionStatus::EditApproved => (
                Some(NoteKind::EditRequest),
                inspection.edit_requested_by.clone(),
            ),
            _ => (None, None),
        };

        Self {
            inspection_id: inspection.id.clone(),
            status: inspection.status,
            kind,
            notes: inspection.revision_notes.clone(),
            author,
        }
    }
}

/// Result of an approval: the manager is prompted for a disposition when the vehicle is
/// still undecided.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub inspection: Inspection,
    pub decision_required: bool,
}
