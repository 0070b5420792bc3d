//! Builders for guests, vehicles, schedules, and session environments.

use crate::mocks::{MockCommitGateway, MockVehicleCatalog, RecordingObserver, test_clock};
use allocation_core::commit::{CommitService, encode_route_token};
use allocation_core::config::SessionConfig;
use allocation_core::reducer::Reducer;
use allocation_core::session::{SessionAction, SessionEnvironment, SessionReducer, SessionState};
use allocation_core::types::{
    Capacity, ExistingSchedule, Guest, GuestId, RouteId, ScheduleId, SessionId, Vehicle, VehicleId,
};
use std::sync::Arc;
use std::time::Duration;

/// Guest `id` with a predictable name, phone, and seat
#[must_use]
pub fn guest(id: u64) -> Guest {
    let mut guest = Guest::new(GuestId::new(id), format!("Guest {id}"));
    guest.phone = format!("+1555{id:07}");
    guest.seat_number = Some(format!("{}{}", id / 4 + 1, if id % 2 == 0 { 'B' } else { 'A' }));
    guest.status = "confirmed".to_string();
    guest
}

/// Guests `1..=count`
#[must_use]
pub fn guests(count: u64) -> Vec<Guest> {
    (1..=count).map(guest).collect()
}

/// Active van `id` with `seats` seats, numbered `KA-01-<id>`
#[must_use]
pub fn vehicle(id: u64, seats: u32) -> Vehicle {
    Vehicle::new(VehicleId::new(id), format!("KA-01-{id:04}"), Capacity::new(seats)).with_kind("Van")
}

/// A persisted schedule
#[must_use]
pub fn schedule(id: u64, vehicle: Option<Vehicle>, guests: Vec<Guest>) -> ExistingSchedule {
    ExistingSchedule {
        schedule_id: ScheduleId::new(id),
        vehicle,
        guests,
    }
}

/// Valid route token for route `id`
#[must_use]
pub fn route_token(id: u64) -> String {
    encode_route_token(RouteId::new(id))
}

/// `Open` for route 42 under a fresh session id
#[must_use]
pub fn open_action(guests: Vec<Guest>, existing_schedules: Option<Vec<ExistingSchedule>>) -> SessionAction {
    SessionAction::Open {
        session_id: SessionId::new(),
        guests,
        existing_schedules,
        route_token: route_token(42),
    }
}

/// Mocks behind a [`SessionEnvironment`], kept so tests can script and inspect them
#[derive(Clone, Debug)]
pub struct TestBackends {
    /// Vehicle lookup
    pub catalog: MockVehicleCatalog,
    /// Commit endpoint
    pub gateway: MockCommitGateway,
    /// Close notifications
    pub observer: RecordingObserver,
    /// Session tunables; searches are not debounced by default
    pub config: SessionConfig,
}

impl TestBackends {
    /// Empty fleet, accepting gateway, no debounce
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: MockVehicleCatalog::default(),
            gateway: MockCommitGateway::new(),
            observer: RecordingObserver::new(),
            config: SessionConfig::default().with_search_debounce(Duration::ZERO),
        }
    }

    /// Replaces the catalog fleet
    #[must_use]
    pub fn with_fleet(mut self, fleet: Vec<Vehicle>) -> Self {
        self.catalog = MockVehicleCatalog::new(fleet);
        self
    }

    /// Replaces the session config
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Environment wired to these mocks with a fixed clock
    #[must_use]
    pub fn environment(&self) -> SessionEnvironment {
        SessionEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(self.catalog.clone()),
            CommitService::new(Arc::new(self.gateway.clone())),
            Arc::new(self.observer.clone()),
            self.config.clone(),
        )
    }
}

impl Default for TestBackends {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs actions through a fresh [`SessionReducer`], discarding effects
#[must_use]
pub fn reduce_all(env: &SessionEnvironment, actions: Vec<SessionAction>) -> SessionState {
    let reducer = SessionReducer::new();
    let mut state = SessionState::new();
    for action in actions {
        let _ = reducer.reduce(&mut state, action, env);
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation_core::commit::decode_route_token;
    use allocation_core::session::SessionPhase;

    #[test]
    fn route_token_round_trips() {
        assert_eq!(decode_route_token(&route_token(42)), Ok(RouteId::new(42)));
    }

    #[test]
    fn reduce_all_opens_a_session() {
        let env = TestBackends::new().environment();
        let state = reduce_all(&env, vec![open_action(guests(3), None)]);

        assert_eq!(state.phase, SessionPhase::Editing);
        assert_eq!(state.allocation.pool().len(), 3);
    }
}
