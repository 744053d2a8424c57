//! Decision window opened on a vehicle once its inspection is approved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    DispositionState, Inspection, InspectionStatus, Vehicle, VehicleStatus,
};

/// Manager decision taken on an approved vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DispositionAction {
    Take,
    Discard { reason: String },
    Defer,
}

impl DispositionAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Take => "take",
            Self::Discard { .. } => "discard",
            Self::Defer => "defer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispositionError {
    #[error("inspection is {} and cannot open a disposition decision", .status.code())]
    InspectionNotApproved { status: InspectionStatus },
    #[error("vehicle no longer awaiting disposition (status {})", .status.code())]
    NotAwaitingDisposition { status: VehicleStatus },
    #[error("inspection belongs to a different vehicle")]
    VehicleMismatch,
    #[error("a newer inspection supersedes this one")]
    Superseded,
    #[error("discard reason must not be empty")]
    MissingDiscardReason,
}

/// Whether `inspection` currently allows a disposition decision for `vehicle`.
pub fn decision_window_open(vehicle: &Vehicle, inspection: &Inspection) -> bool {
    ensure_window(vehicle, inspection).is_ok()
}

fn ensure_window(vehicle: &Vehicle, inspection: &Inspection) -> Result<(), DispositionError> {
    if inspection.vehicle_id != vehicle.id {
        return Err(DispositionError::VehicleMismatch);
    }
    if inspection.status != InspectionStatus::Approved {
        return Err(DispositionError::InspectionNotApproved {
            status: inspection.status,
        });
    }
    if vehicle.status != VehicleStatus::APeritar {
        return Err(DispositionError::NotAwaitingDisposition {
            status: vehicle.status,
        });
    }
    if vehicle.requested_since(inspection) {
        return Err(DispositionError::Superseded);
    }
    Ok(())
}

/// Apply a decision and return the updated vehicle. The inspection is never modified.
pub fn decide(
    vehicle: &Vehicle,
    inspection: &Inspection,
    action: &DispositionAction,
    now: DateTime<Utc>,
) -> Result<Vehicle, DispositionError> {
    ensure_window(vehicle, inspection)?;

    let mut updated = vehicle.clone();
    match action {
        DispositionAction::Take => {
            updated.status = VehicleStatus::AIngresar;
            updated.disposition = DispositionState::None;
        }
        DispositionAction::Discard { reason } => {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(DispositionError::MissingDiscardReason);
            }
            updated.status = VehicleStatus::Descartado;
            updated.discard_date = Some(now);
            updated.discard_reason = Some(reason.to_string());
            updated.disposition = DispositionState::None;
        }
        DispositionAction::Defer => {
            updated.disposition = DispositionState::AwaitingDecision;
        }
    }
    Ok(updated)
}

/// The decision-pending sub-state is only valid while the latest inspection is approved and
/// the vehicle is still awaiting inspection.
pub fn disposition_consistent(vehicle: &Vehicle, latest: Option<&Inspection>) -> bool {
    match vehicle.disposition {
        DispositionState::None => true,
        DispositionState::AwaitingDecision => {
            vehicle.status == VehicleStatus::APeritar
                && latest.is_some_and(|inspection| {
                    inspection.status == InspectionStatus::Approved
                })
        }
    }
}
