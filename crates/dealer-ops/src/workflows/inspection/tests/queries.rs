use super::common::*;

use crate::store::RecordId;
use crate::workflows::inspection::domain::InspectionStatus;
use crate::workflows::inspection::views::{DashboardCounts, NoteKind, PendingReason};

struct Lot {
    deferred: RecordId,
    edit_requested: RecordId,
    awaiting_approval: RecordId,
    not_started: RecordId,
}

/// One vehicle per worklist situation, requested in a fixed order.
fn seed_lot(service: &TestService, store: &crate::store::JsonStore) -> Lot {
    let deferred = approved_inspection(service, store);
    service.defer(&manager(), &deferred.id).expect("deferred");

    let taken = approved_inspection(service, store);
    service.take(&manager(), &taken.id).expect("taken");

    let edit_requested = approved_inspection(service, store);
    service
        .request_edit(&mechanic(), &edit_requested.id, "odometer misread")
        .expect("edit requested");

    let awaiting_approval = submitted_inspection(service, store);
    let not_started = requested_vehicle(service, store);

    let elsewhere = seed_vehicle(store, "Fiat", "Cronos");
    service
        .request_inspection(&manager(), &elsewhere.id, &other_mechanic().full_name)
        .expect("requested for another mechanic");

    Lot {
        deferred: deferred.vehicle_id,
        edit_requested: edit_requested.id,
        awaiting_approval: awaiting_approval.id,
        not_started: not_started.id,
    }
}

#[test]
fn mechanic_worklist_keeps_deferred_and_drops_decided_vehicles() {
    let (service, store, _) = build_service();
    let lot = seed_lot(&service, &store);

    let pending = service
        .pending_for_mechanic(MECHANIC_NAME)
        .expect("worklist readable");

    let summary: Vec<(RecordId, PendingReason)> = pending
        .iter()
        .map(|item| (item.vehicle.id.clone(), item.reason))
        .collect();
    let awaiting_approval_vehicle = stored_inspection(&store, &lot.awaiting_approval).vehicle_id;
    assert_eq!(
        summary,
        vec![
            (lot.deferred.clone(), PendingReason::AwaitingDisposition),
            (awaiting_approval_vehicle, PendingReason::AwaitingApproval),
            (lot.not_started.clone(), PendingReason::NotStarted),
        ]
    );
    assert!(pending[2].inspection.is_none());
    assert_eq!(pending[0].reason_label, "Approved, awaiting disposition");
}

#[test]
fn manager_queue_groups_waiting_items() {
    let (service, store, _) = build_service();
    let lot = seed_lot(&service, &store);

    let queue = service.manager_queue().expect("queue readable");

    let approvals: Vec<&RecordId> = queue.awaiting_approval.iter().map(|i| &i.id).collect();
    assert_eq!(approvals, vec![&lot.awaiting_approval]);

    assert_eq!(queue.edit_requests.len(), 1);
    assert_eq!(queue.edit_requests[0].id, lot.edit_requested);
    assert_eq!(queue.edit_requests[0].status, InspectionStatus::EditRequested);

    assert_eq!(queue.awaiting_disposition.len(), 1);
    let candidate = &queue.awaiting_disposition[0];
    assert_eq!(candidate.vehicle.id, lot.deferred);
    assert!(candidate.deferred);
}

#[test]
fn dashboard_counts_summarize_the_lot() {
    let (service, store, _) = build_service();
    seed_lot(&service, &store);

    let counts = service.dashboard_counts().expect("counts readable");

    assert_eq!(
        counts,
        DashboardCounts {
            awaiting_inspection: 2,
            awaiting_approval: 1,
            edit_requests: 1,
            awaiting_disposition: 1,
            deferred_decisions: 1,
            refresh_interval_secs: 15,
        }
    );
}

#[test]
fn undeferred_approvals_wait_for_a_decision() {
    let (service, store, _) = build_service();
    let approved = approved_inspection(&service, &store);

    let queue = service.manager_queue().expect("queue readable");
    assert_eq!(queue.awaiting_disposition.len(), 1);
    assert!(!queue.awaiting_disposition[0].deferred);
    assert_eq!(queue.awaiting_disposition[0].inspection.id, approved.id);
}

#[test]
fn re_requested_vehicle_waits_for_a_new_inspection() {
    let (service, store, _) = build_service();
    let approved = approved_inspection(&service, &store);
    service.take(&manager(), &approved.id).expect("taken");
    service
        .request_inspection(&manager(), &approved.vehicle_id, MECHANIC_NAME)
        .expect("second request");

    let pending = service
        .pending_for_mechanic(MECHANIC_NAME)
        .expect("worklist readable");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].reason, PendingReason::NotStarted);

    let queue = service.manager_queue().expect("queue readable");
    assert!(queue.awaiting_disposition.is_empty());

    let counts = service.dashboard_counts().expect("counts readable");
    assert_eq!(counts.awaiting_inspection, 1);
    assert_eq!(counts.awaiting_disposition, 0);
}

#[test]
fn worklist_lookup_ignores_case_and_padding() {
    let (service, store, _) = build_service();
    let vehicle = requested_vehicle(&service, &store);

    let pending = service
        .pending_for_mechanic(&format!("  {}  ", MECHANIC_NAME.to_uppercase()))
        .expect("worklist readable");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].vehicle.id, vehicle.id);

    assert!(service
        .pending_for_mechanic("   ")
        .expect("worklist readable")
        .is_empty());
}

#[test]
fn review_notes_follow_the_edit_request() {
    let (service, store, _) = build_service();
    let approved = approved_inspection(&service, &store);
    service
        .request_edit(&mechanic(), &approved.id, "tire cost doubled by mistake")
        .expect("edit requested");

    let notes = service.review_notes(&approved.id).expect("notes readable");
    assert_eq!(notes.kind, Some(NoteKind::EditRequest));
    assert_eq!(notes.notes.as_deref(), Some("tire cost doubled by mistake"));
    assert_eq!(notes.author.as_deref(), Some(MECHANIC_NAME));

    let plain = service
        .review_notes(&approved_inspection(&service, &store).id)
        .expect("notes readable");
    assert!(plain.kind.is_none());
    assert!(plain.notes.is_none());
}

#[test]
fn history_of_unknown_vehicle_is_not_found() {
    let (service, _, _) = build_service();
    let err = service
        .inspection_history(&RecordId::new("veh-00000404"))
        .expect_err("vehicle missing");
    assert!(err.is_not_found());
}
