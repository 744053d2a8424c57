use dealer_ops::config::{StoreBackend, StoreConfig};
use dealer_ops::store::{EntityStore, JsonStore, StoreError};
use dealer_ops::workflows::inspection::{
    NoticeOutcome, NotifyError, Vehicle, VehicleStatus, WorkflowNotice, WorkflowNotifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const RECENT_NOTICE_LIMIT: usize = 64;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notifier that logs every workflow notice and keeps the most recent ones around.
#[derive(Default, Clone)]
pub(crate) struct TracingNotifier {
    recent: Arc<Mutex<VecDeque<WorkflowNotice>>>,
}

impl TracingNotifier {
    pub(crate) fn recent(&self) -> Vec<WorkflowNotice> {
        match self.recent.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl WorkflowNotifier for TracingNotifier {
    fn publish(&self, notice: WorkflowNotice) -> Result<(), NotifyError> {
        match notice.outcome {
            NoticeOutcome::Success => info!(
                action = notice.action.label(),
                actor = %notice.actor_id,
                views = notice.invalidated.len(),
                "{}", notice.message
            ),
            NoticeOutcome::Failure => warn!(
                action = notice.action.label(),
                actor = %notice.actor_id,
                "{}", notice.message
            ),
        }

        let mut guard = self
            .recent
            .lock()
            .map_err(|_| NotifyError::Transport("notice buffer poisoned".to_string()))?;
        if guard.len() == RECENT_NOTICE_LIMIT {
            guard.pop_front();
        }
        guard.push_back(notice);
        Ok(())
    }
}

pub(crate) fn open_store(config: &StoreConfig) -> Result<JsonStore, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(JsonStore::in_memory()),
        StoreBackend::File => JsonStore::open(&config.path),
    }
}

/// Trade-ins used by `serve --seed` and the demo.
pub(crate) fn sample_vehicles() -> Vec<Vehicle> {
    [
        ("Toyota", "Hilux", 2018, "AC421KD", 98_500),
        ("Volkswagen", "Gol Trend", 2016, "AA903PL", 121_000),
        ("Ford", "Ranger", 2020, "AE118ZT", 64_200),
    ]
    .into_iter()
    .map(|(brand, model, year, plate, kilometers)| {
        let mut vehicle = Vehicle::new(brand, model, VehicleStatus::Disponible);
        vehicle.year = Some(year);
        vehicle.plate = Some(plate.to_string());
        vehicle.kilometers = Some(kilometers);
        vehicle
    })
    .collect()
}

/// Insert the sample vehicles when the store holds none. Returns how many were added.
pub(crate) fn seed_vehicles<S: EntityStore>(store: &S) -> Result<usize, StoreError> {
    if !store.list::<Vehicle>(None)?.is_empty() {
        return Ok(0);
    }

    let mut added = 0;
    for vehicle in sample_vehicles() {
        store.create(vehicle)?;
        added += 1;
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealer_ops::store::RecordId;
    use dealer_ops::workflows::inspection::{DependentView, WorkflowAction};

    fn notice(outcome: NoticeOutcome) -> WorkflowNotice {
        WorkflowNotice {
            action: WorkflowAction::Approve,
            outcome,
            actor_id: "user-lucia".to_string(),
            vehicle_id: Some(RecordId::new("veh-00000001")),
            inspection_id: Some(RecordId::new("insp-00000002")),
            message: "inspection approved".to_string(),
            invalidated: DependentView::ALL.to_vec(),
        }
    }

    #[test]
    fn notifier_keeps_a_bounded_history() {
        let notifier = TracingNotifier::default();
        for _ in 0..RECENT_NOTICE_LIMIT + 5 {
            notifier
                .publish(notice(NoticeOutcome::Success))
                .expect("published");
        }
        notifier
            .publish(notice(NoticeOutcome::Failure))
            .expect("published");

        let recent = notifier.recent();
        assert_eq!(recent.len(), RECENT_NOTICE_LIMIT);
        assert_eq!(
            recent.last().map(|notice| notice.outcome),
            Some(NoticeOutcome::Failure)
        );
    }

    #[test]
    fn seeding_only_fills_an_empty_store() {
        let store = JsonStore::in_memory();
        assert_eq!(seed_vehicles(&store).expect("seeded"), 3);
        assert_eq!(seed_vehicles(&store).expect("seeded"), 0);
        assert_eq!(store.list::<Vehicle>(None).expect("listed").len(), 3);
    }
}
