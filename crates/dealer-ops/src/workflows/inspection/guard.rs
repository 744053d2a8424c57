use serde::{Deserialize, Serialize};

use super::domain::{Actor, Inspection, InspectionStatus, Role, Vehicle};
use super::lifecycle::is_editable;

/// Every operation an actor can invoke through the workflow service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    RequestInspection,
    Open,
    Save,
    Submit,
    Approve,
    RequestRevision,
    RequestEdit,
    ApproveEdit,
    Take,
    Discard,
    Defer,
}

impl WorkflowAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RequestInspection => "request_inspection",
            Self::Open => "open",
            Self::Save => "save",
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::RequestRevision => "request_revision",
            Self::RequestEdit => "request_edit",
            Self::ApproveEdit => "approve_edit",
            Self::Take => "take",
            Self::Discard => "discard",
            Self::Defer => "defer",
        }
    }
}

/// Authorization failures raised before any record is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Forbidden {
    #[error("{} may not {}", .role.label(), .action.label())]
    RoleNotPermitted { role: Role, action: WorkflowAction },
    #[error("vehicle is assigned to {}", .assigned.as_deref().unwrap_or("nobody"))]
    NotAssigned { assigned: Option<String> },
    #[error("inspection is locked for editing while {}", .status.code())]
    EditLocked { status: InspectionStatus },
}

/// Role table checked at the service boundary for every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGuard;

impl AuthorizationGuard {
    pub fn permits(&self, role: Role, action: WorkflowAction) -> bool {
        use WorkflowAction::*;

        match role {
            Role::Mechanic => matches!(action, Open | Save | Submit | RequestEdit),
            Role::Manager | Role::Administrator => !matches!(action, Submit),
        }
    }

    pub fn authorize(&self, actor: &Actor, action: WorkflowAction) -> Result<(), Forbidden> {
        if self.permits(actor.role, action) {
            Ok(())
        } else {
            Err(Forbidden::RoleNotPermitted {
                role: actor.role,
                action,
            })
        }
    }

    /// Role check plus, for mechanics, assignment to the vehicle.
    pub fn authorize_on_vehicle(
        &self,
        actor: &Actor,
        action: WorkflowAction,
        vehicle: &Vehicle,
    ) -> Result<(), Forbidden> {
        self.authorize(actor, action)?;
        if actor.role.is_manager() {
            return Ok(());
        }

        let assigned = vehicle
            .assigned_mechanic
            .as_deref()
            .is_some_and(|mechanic| actor.is_named(mechanic));
        if assigned {
            Ok(())
        } else {
            Err(Forbidden::NotAssigned {
                assigned: vehicle.assigned_mechanic.clone(),
            })
        }
    }

    /// Field edits are only accepted while the record is in a working state.
    pub fn authorize_edit(
        &self,
        actor: &Actor,
        vehicle: &Vehicle,
        inspection: &Inspection,
    ) -> Result<(), Forbidden> {
        self.authorize_on_vehicle(actor, WorkflowAction::Save, vehicle)?;
        if is_editable(inspection.status) {
            Ok(())
        } else {
            Err(Forbidden::EditLocked {
                status: inspection.status,
            })
        }
    }
}
