//! In-memory backend used when no HTTP API is configured

use allocation_core::commit::{CommitMode, CommitPayload, CommitReceipt};
use allocation_core::environment::{BoxFuture, CommitGateway, SessionObserver, VehicleCatalog};
use allocation_core::error::{CatalogError, CommitError};
use allocation_core::types::{Capacity, Guest, GuestId, Vehicle, VehicleId, VehicleStatus};
use std::sync::{Arc, Mutex, PoisonError};

/// Three vans of two, three and seven seats
#[must_use]
pub fn fleet() -> Vec<Vehicle> {
    [(1, 2), (2, 3), (3, 7)]
        .into_iter()
        .map(|(id, seats)| {
            Vehicle::new(VehicleId::new(id), format!("KA-01-{id:04}"), Capacity::new(seats))
                .with_kind("Van")
        })
        .collect()
}

/// Guests `1..=count`
#[must_use]
pub fn guests(count: u64) -> Vec<Guest> {
    (1..=count)
        .map(|id| Guest::new(GuestId::new(id), format!("Guest {id}")))
        .collect()
}

/// Fixed fleet, matched by number or type
#[derive(Clone, Debug)]
pub struct InMemoryCatalog {
    fleet: Arc<Vec<Vehicle>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(fleet: Vec<Vehicle>) -> Self {
        Self {
            fleet: Arc::new(fleet),
        }
    }
}

impl VehicleCatalog for InMemoryCatalog {
    fn search(
        &self,
        term: &str,
        status: Option<VehicleStatus>,
    ) -> BoxFuture<Result<Vec<Vehicle>, CatalogError>> {
        let term = term.trim().to_lowercase();
        let found: Vec<Vehicle> = self
            .fleet
            .iter()
            .filter(|vehicle| status.is_none_or(|status| vehicle.status == status))
            .filter(|vehicle| {
                term.is_empty()
                    || vehicle.number.to_lowercase().contains(&term)
                    || vehicle.kind.to_lowercase().contains(&term)
            })
            .cloned()
            .collect();
        Box::pin(async move { Ok(found) })
    }
}

/// Accepts every allocation and logs it
#[derive(Clone, Copy, Debug, Default)]
pub struct InMemoryGateway;

impl CommitGateway for InMemoryGateway {
    fn commit(
        &self,
        mode: CommitMode,
        payload: CommitPayload,
    ) -> BoxFuture<Result<CommitReceipt, CommitError>> {
        tracing::info!(
            ?mode,
            route_id = payload.route_id.value(),
            groups = payload.allocations.len(),
            "Allocation stored in memory"
        );
        let message = format!("Saved {} vehicle group(s)", payload.allocations.len());
        Box::pin(async move {
            Ok(CommitReceipt {
                message: Some(message),
            })
        })
    }
}

/// Remembers close notifications for the final report
#[derive(Clone, Debug, Default)]
pub struct ClosedLog {
    notifications: Arc<Mutex<Vec<bool>>>,
}

impl ClosedLog {
    #[must_use]
    pub fn notifications(&self) -> Vec<bool> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionObserver for ClosedLog {
    fn session_closed(&self, committed: bool) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(committed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn catalog_matches_number_and_type() {
        let catalog = InMemoryCatalog::new(fleet());

        let vans = catalog.search(" VAN ", Some(VehicleStatus::Active)).await.unwrap();
        let second = catalog.search("0002", None).await.unwrap();
        let inactive = catalog.search("", Some(VehicleStatus::Inactive)).await.unwrap();

        assert_eq!(vans.len(), 3);
        assert_eq!(second.iter().map(|v| v.id.value()).collect::<Vec<_>>(), vec![2]);
        assert!(inactive.is_empty());
    }

    #[test]
    fn closed_log_records_each_notification() {
        let log = ClosedLog::default();
        let observer: Arc<dyn SessionObserver> = Arc::new(log.clone());

        observer.session_closed(false);
        observer.session_closed(true);

        assert_eq!(log.notifications(), vec![false, true]);
    }
}
