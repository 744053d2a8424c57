use crate::infra::{sample_vehicles, TracingNotifier};
use chrono::Local;
use clap::Args;
use dealer_ops::error::AppError;
use dealer_ops::store::{EntityStore, JsonStore};
use dealer_ops::workflows::inspection::{
    Actor, Assessment, ComponentAssessment, ConditionRating, EditRequestPolicy, InspectionDraft,
    InspectionStatus, InspectionWorkflowConfig, InspectionWorkflowService, NoticeOutcome,
    PaintAssessment, Recommendation, Role, TireAssessment,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Defer the disposition before discarding instead of taking the vehicle.
    #[arg(long)]
    pub(crate) defer: bool,
    /// Walk through a post-approval edit before the final decision.
    #[arg(long)]
    pub(crate) with_edit: bool,
    /// Let managers approve their own edit requests.
    #[arg(long)]
    pub(crate) manager_self_approves: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Vehicle inspection workflow demo");
    for line in walkthrough(&args)? {
        println!("{line}");
    }
    Ok(())
}

fn mechanic() -> Actor {
    Actor {
        id: "mech-01".to_string(),
        email: "rosa.medina@dealer.example".to_string(),
        full_name: "Rosa Medina".to_string(),
        role: Role::Mechanic,
    }
}

fn manager() -> Actor {
    Actor {
        id: "mgr-01".to_string(),
        email: "lucia.paz@dealer.example".to_string(),
        full_name: "Lucia Paz".to_string(),
        role: Role::Manager,
    }
}

fn inspection_form(mechanic: &Actor) -> InspectionDraft {
    InspectionDraft {
        inspector_name: Some(mechanic.full_name.clone()),
        inspection_date: Some(Local::now().date_naive()),
        kilometers_at_inspection: Some(98_640),
        recommendation: Some(Recommendation::TakeWithRepairs),
        general_observations: Some("Clutch near end of life, rear tires worn".to_string()),
        assessment: Assessment {
            components: vec![
                ComponentAssessment {
                    component: "clutch".to_string(),
                    rating: ConditionRating::Poor,
                    estimated_cost: 1500.0,
                    notes: Some("slips under load".to_string()),
                },
                ComponentAssessment {
                    component: "engine".to_string(),
                    rating: ConditionRating::Good,
                    estimated_cost: 0.0,
                    notes: None,
                },
            ],
            tires: ["rear_left", "rear_right"]
                .into_iter()
                .map(|position| TireAssessment {
                    position: position.to_string(),
                    condition: ConditionRating::Poor,
                    tread_depth_mm: Some(1.8),
                    estimated_cost: 800.0,
                })
                .collect(),
            paint: vec![PaintAssessment {
                part: "rear bumper".to_string(),
                needs_paint: true,
                needs_bodywork: false,
                estimated_cost: 3000.0,
            }],
            services: Vec::new(),
        },
    }
}

/// Run one inspection cycle against an in-memory store and describe each step.
fn walkthrough(args: &DemoArgs) -> Result<Vec<String>, AppError> {
    let edit_policy = if args.manager_self_approves {
        EditRequestPolicy::ManagerSelfApproves
    } else {
        EditRequestPolicy::CounterpartApproval
    };
    let store = Arc::new(JsonStore::in_memory());
    let notifier = Arc::new(TracingNotifier::default());
    let service = InspectionWorkflowService::new(
        store.clone(),
        notifier.clone(),
        InspectionWorkflowConfig {
            edit_policy,
            ..InspectionWorkflowConfig::default()
        },
    );
    let mechanic = mechanic();
    let manager = manager();
    let mut lines = Vec::new();

    let mut vehicles = Vec::new();
    for vehicle in sample_vehicles() {
        vehicles.push(store.create(vehicle)?);
    }
    let vehicle = &vehicles[0];

    let requested = service.request_inspection(&manager, &vehicle.id, &mechanic.full_name)?;
    lines.push(format!(
        "- {} requested an inspection of {} from {} (vehicle {})",
        manager.full_name,
        requested.display_name(),
        mechanic.full_name,
        requested.status.code()
    ));

    let draft = service.open_inspection(&mechanic, &vehicle.id)?;
    service.save_inspection(&mechanic, &draft.id, inspection_form(&mechanic))?;
    let submitted = service.submit(&mechanic, &draft.id)?;
    lines.push(format!(
        "- {} submitted {} with an estimated cost of {:.2} ({})",
        mechanic.full_name,
        submitted.id,
        submitted.total_estimated_cost,
        submitted.status.code()
    ));

    let revised = service.request_revision(&manager, &draft.id, "check brakes")?;
    lines.push(format!(
        "- {} asked for a revision: \"{}\" ({})",
        manager.full_name,
        revised.revision_notes.as_deref().unwrap_or_default(),
        revised.status.code()
    ));

    let pending = service.pending_for_mechanic(&mechanic.full_name)?;
    for item in &pending {
        lines.push(format!(
            "  worklist: {} - {}",
            item.vehicle.display_name(),
            item.reason_label
        ));
    }

    let resubmitted = service.submit(&mechanic, &draft.id)?;
    lines.push(format!(
        "- {} resubmitted ({})",
        mechanic.full_name,
        resubmitted.status.code()
    ));

    let approval = service.approve(&manager, &draft.id)?;
    lines.push(format!(
        "- {} approved {} (decision required: {})",
        manager.full_name, approval.inspection.id, approval.decision_required
    ));

    if args.with_edit {
        let requested = service.request_edit(&manager, &draft.id, "paint estimate too low")?;
        lines.push(format!(
            "- {} asked to edit the approved inspection ({})",
            manager.full_name,
            requested.status.code()
        ));
        if requested.status == InspectionStatus::EditRequested {
            let unlocked = service.approve_edit(&manager, &draft.id)?;
            lines.push(format!("  edit approved ({})", unlocked.status.code()));
        }
        let mut form = inspection_form(&mechanic);
        form.assessment.paint[0].estimated_cost = 3400.0;
        service.save_inspection(&mechanic, &draft.id, form)?;
        let resubmitted = service.submit(&mechanic, &draft.id)?;
        lines.push(format!(
            "- {} updated the estimate to {:.2} ({})",
            mechanic.full_name,
            resubmitted.total_estimated_cost,
            resubmitted.status.code()
        ));
        service.approve(&manager, &draft.id)?;
        lines.push(format!("- {} approved the edited inspection", manager.full_name));
    }

    let decided = if args.defer {
        let deferred = service.defer(&manager, &draft.id)?;
        lines.push(format!(
            "- {} deferred the decision (vehicle {}, decision pending: {})",
            manager.full_name,
            deferred.status.code(),
            deferred.inspection_decision_pending()
        ));
        let counts = service.dashboard_counts()?;
        lines.push(format!(
            "  dashboard: {} awaiting disposition, {} deferred",
            counts.awaiting_disposition, counts.deferred_decisions
        ));
        service.discard(&manager, &draft.id, "repair costs exceed trade-in margin")?
    } else {
        service.take(&manager, &draft.id)?
    };
    lines.push(format!(
        "- {} is now {}",
        decided.display_name(),
        decided.status.code()
    ));

    let notices = notifier.recent();
    let failures = notices
        .iter()
        .filter(|notice| notice.outcome == NoticeOutcome::Failure)
        .count();
    lines.push(format!(
        "Notices published: {} ({} rejected)",
        notices.len(),
        failures
    ));

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_walkthrough_takes_the_vehicle() {
        let lines = walkthrough(&DemoArgs::default()).expect("demo runs");
        assert!(lines.iter().any(|line| line.contains("6100.00")));
        assert!(lines
            .last()
            .is_some_and(|line| line.starts_with("Notices published")));
        assert!(lines.iter().any(|line| line.ends_with("is now A_INGRESAR")));
    }

    #[test]
    fn deferred_walkthrough_discards_after_edit() {
        let args = DemoArgs {
            defer: true,
            with_edit: true,
            manager_self_approves: true,
        };
        let lines = walkthrough(&args).expect("demo runs");
        assert!(lines.iter().any(|line| line.contains("6500.00")));
        assert!(lines.iter().any(|line| line.contains("1 deferred")));
        assert!(lines.iter().any(|line| line.ends_with("is now DESCARTADO")));
        assert!(!lines.iter().any(|line| line.contains("edit approved (")));
    }
}
