use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::config::{EditRequestPolicy, InspectionWorkflowConfig};
use super::disposition::{self, DispositionAction, DispositionError};
use super::domain::{
    Actor, DispositionState, Inspection, InspectionDraft, Role, Vehicle, VehicleStatus,
};
use super::guard::{AuthorizationGuard, Forbidden, WorkflowAction};
use super::lifecycle::{
    is_active, required_notes, submission_action, transition, validate_submission,
    InspectionAction, InvalidTransition, ValidationError,
};
use super::notices::{DependentView, NoticeOutcome, WorkflowNotice, WorkflowNotifier};
use super::views::{
    pending_reason, ApprovalOutcome, DashboardCounts, DispositionCandidate, ManagerQueue,
    PendingItem, PendingReason, ReviewNotes,
};
use crate::store::{criteria, EntityStore, RecordId, SortSpec, StoreError};

/// Single entry point for mechanic and manager actions on inspections and vehicles.
///
/// Every call re-reads the records it touches, checks the authorization guard and the
/// relevant transition table against the stored status, and only then issues at most one
/// store mutation.
pub struct InspectionWorkflowService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    guard: AuthorizationGuard,
    config: InspectionWorkflowConfig,
}

struct CallScope {
    action: WorkflowAction,
    actor_id: String,
    role: Role,
    vehicle_id: Option<RecordId>,
    inspection_id: Option<RecordId>,
    mutated: bool,
    message: Option<String>,
}

impl CallScope {
    fn new(actor: &Actor, action: WorkflowAction) -> Self {
        Self {
            action,
            actor_id: actor.id.clone(),
            role: actor.role,
            vehicle_id: None,
            inspection_id: None,
            mutated: true,
            message: None,
        }
    }

    fn inspection(mut self, id: &RecordId) -> Self {
        self.inspection_id = Some(id.clone());
        self
    }

    fn vehicle(mut self, id: &RecordId) -> Self {
        self.vehicle_id = Some(id.clone());
        self
    }

    fn notice(
        self,
        outcome: NoticeOutcome,
        message: String,
        invalidated: Vec<DependentView>,
    ) -> WorkflowNotice {
        WorkflowNotice {
            action: self.action,
            outcome,
            actor_id: self.actor_id,
            vehicle_id: self.vehicle_id,
            inspection_id: self.inspection_id,
            message,
            invalidated,
        }
    }
}

impl<S, N> InspectionWorkflowService<S, N>
where
    S: EntityStore + 'static,
    N: WorkflowNotifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: InspectionWorkflowConfig) -> Self {
        Self {
            store,
            notifier,
            guard: AuthorizationGuard,
            config,
        }
    }

    pub fn config(&self) -> &InspectionWorkflowConfig {
        &self.config
    }

    /// Manager asks for a vehicle to be inspected by `mechanic`.
    pub fn request_inspection(
        &self,
        actor: &Actor,
        vehicle_id: &RecordId,
        mechanic: &str,
    ) -> Result<Vehicle, WorkflowError> {
        let scope = CallScope::new(actor, WorkflowAction::RequestInspection).vehicle(vehicle_id);
        self.run(scope, |scope| {
            self.guard
                .authorize(actor, WorkflowAction::RequestInspection)?;
            let mechanic = required_notes("assigned_mechanic", mechanic)?;
            let mut vehicle = self.load_vehicle(vehicle_id)?;

            if let Some(active) = self
                .latest_inspection(&vehicle.id)?
                .filter(|inspection| is_active(inspection.status))
            {
                return Err(WorkflowError::ActiveInspection {
                    vehicle_id: vehicle.id.clone(),
                    inspection_id: active.id,
                });
            }

            vehicle.status = VehicleStatus::APeritar;
            vehicle.assigned_mechanic = Some(mechanic.clone());
            vehicle.inspection_requested_date = Some(Utc::now());
            vehicle.inspection_requested_by = Some(actor.display_name().to_string());
            vehicle.disposition = DispositionState::None;
            vehicle.discard_date = None;
            vehicle.discard_reason = None;

            let stored = self.store.update(vehicle_id, vehicle)?;
            scope.message = Some(format!("inspection requested from {mechanic}"));
            Ok(stored)
        })
    }

    /// Return the inspection for the vehicle's current request, creating the draft on first open.
    pub fn open_inspection(
        &self,
        actor: &Actor,
        vehicle_id: &RecordId,
    ) -> Result<Inspection, WorkflowError> {
        let scope = CallScope::new(actor, WorkflowAction::Open).vehicle(vehicle_id);
        self.run(scope, |scope| {
            let vehicle = self.load_vehicle(vehicle_id)?;
            self.guard
                .authorize_on_vehicle(actor, WorkflowAction::Open, &vehicle)?;

            if let Some(latest) = self.latest_inspection(&vehicle.id)? {
                if is_active(latest.status) || !vehicle.requested_since(&latest) {
                    scope.mutated = false;
                    scope.inspection_id = Some(latest.id.clone());
                    return Ok(latest);
                }
            }

            if vehicle.status != VehicleStatus::APeritar {
                return Err(WorkflowError::NotAwaitingInspection {
                    status: vehicle.status,
                });
            }

            let mut draft = Inspection::draft_for(&vehicle);
            if actor.role == Role::Mechanic {
                draft.inspector_name = Some(actor.display_name().to_string());
            }
            let created = self.store.create(draft)?;
            scope.inspection_id = Some(created.id.clone());
            scope.message = Some("inspection draft created".to_string());
            Ok(created)
        })
    }

    /// Save the form fields of an inspection in a working state.
    pub fn save_inspection(
        &self,
        actor: &Actor,
        inspection_id: &RecordId,
        draft: InspectionDraft,
    ) -> Result<Inspection, WorkflowError> {
        let scope = CallScope::new(actor, WorkflowAction::Save).inspection(inspection_id);
        self.run(scope, |scope| {
            let mut inspection = self.load_inspection(inspection_id)?;
            let vehicle = self.load_vehicle(&inspection.vehicle_id)?;
            scope.vehicle_id = Some(vehicle.id.clone());
            self.guard.authorize_edit(actor, &vehicle, &inspection)?;

            inspection.apply_draft(draft);
            inspection.total_estimated_cost = inspection.assessment.total_estimated_cost();
            let stored = self.store.update(inspection_id, inspection)?;
            scope.message = Some("inspection saved".to_string());
            Ok(stored)
        })
    }

    /// Submit a draft, or resubmit after a revision or an approved edit.
    pub fn submit(&self, actor: &Actor, inspection_id: &RecordId) -> Result<Inspection, WorkflowError> {
        let scope = CallScope::new(actor, WorkflowAction::Submit).inspection(inspection_id);
        self.run(scope, |scope| {
            let mut inspection = self.load_inspection(inspection_id)?;
            let vehicle = self.load_vehicle(&inspection.vehicle_id)?;
            scope.vehicle_id = Some(vehicle.id.clone());
            self.guard
                .authorize_on_vehicle(actor, WorkflowAction::Submit, &vehicle)?;

            let action = submission_action(inspection.status).ok_or(InvalidTransition {
                from: inspection.status,
                action: InspectionAction::Submit,
            })?;
            let next = transition(inspection.status, action)?;
            let total = validate_submission(&inspection)?;

            inspection.total_estimated_cost = total;
            inspection.status = next;
            inspection.submitted_date = Some(Utc::now());
            let stored = self.store.update(inspection_id, inspection)?;
            scope.message = Some(format!("inspection sent for approval ({})", action.label()));
            Ok(stored)
        })
    }

    pub fn approve(
        &self,
        actor: &Actor,
        inspection_id: &RecordId,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        let scope = CallScope::new(actor, WorkflowAction::Approve).inspection(inspection_id);
        self.run(scope, |scope| {
            self.guard.authorize(actor, WorkflowAction::Approve)?;
            let mut inspection = self.load_inspection(inspection_id)?;
            let vehicle = self.load_vehicle(&inspection.vehicle_id)?;
            scope.vehicle_id = Some(vehicle.id.clone());

            inspection.status = transition(inspection.status, InspectionAction::Approve)?;
            inspection.approved_by = Some(actor.display_name().to_string());
            inspection.approved_date = Some(Utc::now());
            let stored = self.store.update(inspection_id, inspection)?;

            let decision_required = vehicle.status == VehicleStatus::APeritar;
            scope.message = Some(if decision_required {
                "inspection approved; vehicle awaiting disposition".to_string()
            } else {
                "inspection approved".to_string()
            });
            Ok(ApprovalOutcome {
                inspection: stored,
                decision_required,
            })
        })
    }

    pub fn request_revision(
        &self,
        actor: &Actor,
        inspection_id: &RecordId,
        notes: &str,
    ) -> Result<Inspection, WorkflowError> {
        let scope =
            CallScope::new(actor, WorkflowAction::RequestRevision).inspection(inspection_id);
        self.run(scope, |scope| {
            self.guard
                .authorize(actor, WorkflowAction::RequestRevision)?;
            let mut inspection = self.load_inspection(inspection_id)?;
            scope.vehicle_id = Some(inspection.vehicle_id.clone());

            let next = transition(inspection.status, InspectionAction::RequestRevision)?;
            let notes = required_notes("revision_notes", notes)?;

            inspection.status = next;
            inspection.revision_notes = Some(notes);
            inspection.revision_requested_by = Some(actor.display_name().to_string());
            let stored = self.store.update(inspection_id, inspection)?;
            scope.message = Some("revision requested".to_string());
            Ok(stored)
        })
    }

    /// Reopen an approved inspection. Blocked while a deferred disposition is outstanding.
    pub fn request_edit(
        &self,
        actor: &Actor,
        inspection_id: &RecordId,
        justification: &str,
    ) -> Result<Inspection, WorkflowError> {
        let scope = CallScope::new(actor, WorkflowAction::RequestEdit).inspection(inspection_id);
        self.run(scope, |scope| {
            let mut inspection = self.load_inspection(inspection_id)?;
            let vehicle = self.load_vehicle(&inspection.vehicle_id)?;
            scope.vehicle_id = Some(vehicle.id.clone());
            self.guard
                .authorize_on_vehicle(actor, WorkflowAction::RequestEdit, &vehicle)?;

            let mut next = transition(inspection.status, InspectionAction::RequestEdit)?;
            let justification = required_notes("revision_notes", justification)?;
            if vehicle.inspection_decision_pending() {
                return Err(WorkflowError::DecisionPending {
                    vehicle_id: vehicle.id,
                });
            }

            let self_approved = actor.role.is_manager()
                && self.config.edit_policy == EditRequestPolicy::ManagerSelfApproves;
            if self_approved {
                next = transition(next, InspectionAction::ApproveEdit)?;
            }

            inspection.status = next;
            inspection.revision_notes = Some(justification);
            inspection.edit_requested_by = Some(actor.display_name().to_string());
            let stored = self.store.update(inspection_id, inspection)?;
            scope.message = Some(if self_approved {
                "edit request approved".to_string()
            } else {
                "edit requested".to_string()
            });
            Ok(stored)
        })
    }

    pub fn approve_edit(
        &self,
        actor: &Actor,
        inspection_id: &RecordId,
    ) -> Result<Inspection, WorkflowError> {
        let scope = CallScope::new(actor, WorkflowAction::ApproveEdit).inspection(inspection_id);
        self.run(scope, |scope| {
            self.guard.authorize(actor, WorkflowAction::ApproveEdit)?;
            let mut inspection = self.load_inspection(inspection_id)?;
            scope.vehicle_id = Some(inspection.vehicle_id.clone());

            inspection.status = transition(inspection.status, InspectionAction::ApproveEdit)?;
            let stored = self.store.update(inspection_id, inspection)?;
            scope.message = Some("edit request approved".to_string());
            Ok(stored)
        })
    }

    /// Take, discard, or defer the vehicle covered by an approved inspection.
    pub fn decide(
        &self,
        actor: &Actor,
        inspection_id: &RecordId,
        decision: DispositionAction,
    ) -> Result<Vehicle, WorkflowError> {
        let action = match decision {
            DispositionAction::Take => WorkflowAction::Take,
            DispositionAction::Discard { .. } => WorkflowAction::Discard,
            DispositionAction::Defer => WorkflowAction::Defer,
        };
        let scope = CallScope::new(actor, action).inspection(inspection_id);
        self.run(scope, |scope| {
            self.guard.authorize(actor, action)?;
            let inspection = self.load_inspection(inspection_id)?;
            let vehicle = self.load_vehicle(&inspection.vehicle_id)?;
            scope.vehicle_id = Some(vehicle.id.clone());

            let superseded = self
                .latest_inspection(&vehicle.id)?
                .is_some_and(|latest| latest.id != inspection.id);
            if superseded {
                return Err(DispositionError::Superseded.into());
            }

            let updated = disposition::decide(&vehicle, &inspection, &decision, Utc::now())?;
            let stored = self.store.update(&vehicle.id, updated)?;
            scope.message = Some(format!("vehicle disposition: {}", decision.label()));
            Ok(stored)
        })
    }

    pub fn take(&self, actor: &Actor, inspection_id: &RecordId) -> Result<Vehicle, WorkflowError> {
        self.decide(actor, inspection_id, DispositionAction::Take)
    }

    pub fn discard(
        &self,
        actor: &Actor,
        inspection_id: &RecordId,
        reason: &str,
    ) -> Result<Vehicle, WorkflowError> {
        self.decide(
            actor,
            inspection_id,
            DispositionAction::Discard {
                reason: reason.to_string(),
            },
        )
    }

    pub fn defer(&self, actor: &Actor, inspection_id: &RecordId) -> Result<Vehicle, WorkflowError> {
        self.decide(actor, inspection_id, DispositionAction::Defer)
    }

    /// Vehicles still actionable for `mechanic`, oldest request first.
    ///
    /// `mechanic` is compared with the assignment exactly as `request_inspection` stored it,
    /// ignoring case and surrounding whitespace. Another identifier for the same person (an id
    /// where a full name was assigned) does not match.
    pub fn pending_for_mechanic(&self, mechanic: &str) -> Result<Vec<PendingItem>, WorkflowError> {
        let mut items = Vec::new();
        for vehicle in self.vehicles_awaiting_inspection()? {
            if !vehicle.assigned_to(mechanic) {
                continue;
            }
            let latest = self.latest_inspection(&vehicle.id)?;
            if let Some(reason) = pending_reason(&vehicle, latest.as_ref()) {
                items.push(PendingItem {
                    vehicle,
                    inspection: latest,
                    reason,
                    reason_label: reason.label(),
                });
            }
        }
        Ok(items)
    }

    pub fn manager_queue(&self) -> Result<ManagerQueue, WorkflowError> {
        let awaiting_approval = self.store.filter(
            &criteria([("status", "PENDING_APPROVAL")]),
            Some(&SortSpec::ascending("submitted_date")),
        )?;
        let edit_requests = self.store.filter(
            &criteria([("status", "EDIT_REQUESTED")]),
            Some(&SortSpec::ascending("updated_date")),
        )?;

        let mut awaiting_disposition = Vec::new();
        for vehicle in self.vehicles_awaiting_inspection()? {
            let Some(latest) = self.latest_inspection(&vehicle.id)? else {
                continue;
            };
            if disposition::decision_window_open(&vehicle, &latest) {
                awaiting_disposition.push(DispositionCandidate {
                    deferred: vehicle.inspection_decision_pending(),
                    vehicle,
                    inspection: latest,
                });
            }
        }

        Ok(ManagerQueue {
            awaiting_approval,
            edit_requests,
            awaiting_disposition,
        })
    }

    pub fn dashboard_counts(&self) -> Result<DashboardCounts, WorkflowError> {
        let queue = self.manager_queue()?;

        let mut awaiting_inspection = 0;
        for vehicle in self.vehicles_awaiting_inspection()? {
            let latest = self.latest_inspection(&vehicle.id)?;
            let in_progress = matches!(
                pending_reason(&vehicle, latest.as_ref()),
                Some(
                    PendingReason::NotStarted
                        | PendingReason::Draft
                        | PendingReason::RevisionRequested
                        | PendingReason::EditApproved
                )
            );
            if in_progress {
                awaiting_inspection += 1;
            }
        }

        Ok(DashboardCounts {
            awaiting_inspection,
            awaiting_approval: queue.awaiting_approval.len(),
            edit_requests: queue.edit_requests.len(),
            awaiting_disposition: queue.awaiting_disposition.len(),
            deferred_decisions: queue
                .awaiting_disposition
                .iter()
                .filter(|candidate| candidate.deferred)
                .count(),
            refresh_interval_secs: self.config.refresh_interval.as_secs(),
        })
    }

    /// All inspections recorded for a vehicle, newest first.
    pub fn inspection_history(&self, vehicle_id: &RecordId) -> Result<Vec<Inspection>, WorkflowError> {
        let vehicle = self.load_vehicle(vehicle_id)?;
        Ok(self.store.filter(
            &criteria([("vehicle_id", vehicle.id.as_str())]),
            Some(&SortSpec::newest_first()),
        )?)
    }

    pub fn review_notes(&self, inspection_id: &RecordId) -> Result<ReviewNotes, WorkflowError> {
        let inspection = self.load_inspection(inspection_id)?;
        Ok(ReviewNotes::for_inspection(&inspection))
    }

    pub fn get_inspection(&self, inspection_id: &RecordId) -> Result<Inspection, WorkflowError> {
        self.load_inspection(inspection_id)
    }

    pub fn get_vehicle(&self, vehicle_id: &RecordId) -> Result<Vehicle, WorkflowError> {
        self.load_vehicle(vehicle_id)
    }

    /// Check the decision-pending sub-state of a stored vehicle against its latest inspection.
    pub fn disposition_consistent(&self, vehicle_id: &RecordId) -> Result<bool, WorkflowError> {
        let vehicle = self.load_vehicle(vehicle_id)?;
        let latest = self.latest_inspection(&vehicle.id)?;
        Ok(disposition::disposition_consistent(&vehicle, latest.as_ref()))
    }

    fn run<T>(
        &self,
        mut scope: CallScope,
        operation: impl FnOnce(&mut CallScope) -> Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        let result = operation(&mut scope);

        match &result {
            Ok(_) if !scope.mutated => {}
            Ok(_) => {
                info!(
                    action = scope.action.label(),
                    actor = %scope.actor_id,
                    role = scope.role.label(),
                    vehicle_id = ?scope.vehicle_id,
                    inspection_id = ?scope.inspection_id,
                    "inspection workflow action applied"
                );
                let message = scope
                    .message
                    .take()
                    .unwrap_or_else(|| format!("{} completed", scope.action.label()));
                self.publish(scope.notice(
                    NoticeOutcome::Success,
                    message,
                    DependentView::ALL.to_vec(),
                ));
            }
            Err(error) => {
                warn!(
                    action = scope.action.label(),
                    actor = %scope.actor_id,
                    role = scope.role.label(),
                    vehicle_id = ?scope.vehicle_id,
                    inspection_id = ?scope.inspection_id,
                    %error,
                    "inspection workflow action rejected"
                );
                let invalidated = if error.is_not_found() {
                    DependentView::ALL.to_vec()
                } else {
                    Vec::new()
                };
                self.publish(scope.notice(NoticeOutcome::Failure, error.to_string(), invalidated));
            }
        }

        result
    }

    fn publish(&self, notice: WorkflowNotice) {
        if let Err(err) = self.notifier.publish(notice) {
            warn!(error = %err, "workflow notice not delivered");
        }
    }

    fn load_vehicle(&self, id: &RecordId) -> Result<Vehicle, WorkflowError> {
        self.store
            .get::<Vehicle>(id)?
            .ok_or_else(|| WorkflowError::NotFound {
                kind: "vehicle",
                id: id.clone(),
            })
    }

    fn load_inspection(&self, id: &RecordId) -> Result<Inspection, WorkflowError> {
        self.store
            .get::<Inspection>(id)?
            .ok_or_else(|| WorkflowError::NotFound {
                kind: "inspection",
                id: id.clone(),
            })
    }

    fn latest_inspection(&self, vehicle_id: &RecordId) -> Result<Option<Inspection>, WorkflowError> {
        let inspections: Vec<Inspection> = self.store.filter(
            &criteria([("vehicle_id", vehicle_id.as_str())]),
            Some(&SortSpec::newest_first()),
        )?;
        Ok(inspections.into_iter().next())
    }

    fn vehicles_awaiting_inspection(&self) -> Result<Vec<Vehicle>, WorkflowError> {
        Ok(self.store.filter(
            &criteria([("status", VehicleStatus::APeritar.code())]),
            Some(&SortSpec::ascending("inspection_requested_date")),
        )?)
    }
}

/// Error raised by the inspection workflow service.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error(transparent)]
    Disposition(#[from] DispositionError),
    #[error(transparent)]
    Forbidden(#[from] Forbidden),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: RecordId },
    #[error("vehicle {vehicle_id} already has an active inspection ({inspection_id})")]
    ActiveInspection {
        vehicle_id: RecordId,
        inspection_id: RecordId,
    },
    #[error("vehicle {vehicle_id} has a deferred disposition; take or discard it before editing")]
    DecisionPending { vehicle_id: RecordId },
    #[error("vehicle is {} and not awaiting inspection", .status.code())]
    NotAwaitingInspection { status: VehicleStatus },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkflowError::NotFound { .. } | WorkflowError::Store(StoreError::NotFound)
        )
    }
}
