//! Vehicle search state with a last-issued-wins sequence guard.

use crate::allocation::AllocationState;
use crate::error::CatalogError;
use crate::types::{GroupId, Vehicle, VehicleStatus};
use serde::{Deserialize, Serialize};

/// Current query and the results of the latest lookup
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VehicleSearch {
    /// Text of the most recently issued query
    pub term: String,
    /// Status filter of the most recently issued query
    pub status: Option<VehicleStatus>,
    /// Vehicles returned by the latest applied lookup
    pub results: Vec<Vehicle>,
    /// `true` between issuing a query and applying its result
    pub loading: bool,
    /// Failure of the latest lookup, cleared by the next success
    pub error: Option<CatalogError>,
    latest_seq: u64,
}

impl VehicleSearch {
    /// Records a new query and returns its sequence number.
    ///
    /// Every earlier sequence number becomes stale.
    pub fn issue(&mut self, term: impl Into<String>, status: Option<VehicleStatus>) -> u64 {
        self.latest_seq += 1;
        self.term = term.into();
        self.status = status;
        self.loading = true;
        self.latest_seq
    }

    /// Clears the query and results for a new session.
    ///
    /// The sequence keeps counting, so answers to queries issued before the
    /// reset are stale afterwards.
    pub fn reset(&mut self) {
        *self = Self {
            latest_seq: self.latest_seq + 1,
            ..Self::default()
        };
    }

    /// Sequence number of the most recently issued query
    #[must_use]
    pub const fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Returns `true` if `seq` belongs to the most recently issued query
    #[must_use]
    pub const fn is_latest(&self, seq: u64) -> bool {
        seq == self.latest_seq
    }

    /// Applies a lookup result if it answers the latest query.
    ///
    /// Returns `false` and leaves the search untouched for stale results.
    pub fn apply(&mut self, seq: u64, result: Result<Vec<Vehicle>, CatalogError>) -> bool {
        if !self.is_latest(seq) {
            tracing::debug!(seq, latest = self.latest_seq, "Discarding stale vehicle search result");
            return false;
        }

        self.loading = false;
        match result {
            Ok(vehicles) => {
                self.results = vehicles;
                self.error = None;
            }
            Err(error) => {
                tracing::warn!(%error, "Vehicle search failed");
                self.error = Some(error);
            }
        }
        true
    }
}

/// A search result as presented in a group's vehicle picker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleOption {
    /// The vehicle itself
    pub vehicle: Vehicle,
    /// Group currently holding the vehicle, if any
    pub assigned_to: Option<GroupId>,
    /// `false` when another group holds the vehicle
    pub selectable: bool,
}

/// Annotates search results for the picker of `group_id`.
///
/// A vehicle held by the picking group itself stays selectable.
#[must_use]
pub fn options(
    results: &[Vehicle],
    state: &AllocationState,
    group_id: Option<GroupId>,
) -> Vec<VehicleOption> {
    results
        .iter()
        .map(|vehicle| {
            let assigned_to = state.vehicle_holder(vehicle.id);
            VehicleOption {
                vehicle: vehicle.clone(),
                assigned_to,
                selectable: assigned_to.is_none() || assigned_to == group_id,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Capacity, Guest, GuestId, VehicleId};

    fn van(id: u64) -> Vehicle {
        Vehicle::new(VehicleId::new(id), format!("VAN-{id}"), Capacity::new(4))
    }

    #[test]
    fn later_query_wins_over_late_response() {
        let mut search = VehicleSearch::default();
        let first = search.issue("ka", None);
        let second = search.issue("ka-01", None);

        assert!(search.apply(second, Ok(vec![van(2)])));
        assert!(!search.apply(first, Ok(vec![van(1)])));

        assert_eq!(search.results, vec![van(2)]);
        assert_eq!(search.term, "ka-01");
        assert!(!search.loading);
    }

    #[test]
    fn reset_makes_outstanding_queries_stale() {
        let mut search = VehicleSearch::default();
        let seq = search.issue("ka", None);
        search.reset();

        assert!(!search.apply(seq, Ok(vec![van(1)])));
        assert!(search.results.is_empty());
        assert!(search.term.is_empty());
    }

    #[test]
    fn failure_keeps_previous_results() {
        let mut search = VehicleSearch::default();
        let seq = search.issue("", Some(VehicleStatus::Active));
        assert!(search.apply(seq, Ok(vec![van(1)])));

        let seq = search.issue("x", Some(VehicleStatus::Active));
        assert!(search.apply(seq, Err(CatalogError::Status(503))));

        assert_eq!(search.results, vec![van(1)]);
        assert_eq!(search.error, Some(CatalogError::Status(503)));
    }

    #[test]
    fn options_disable_vehicles_held_elsewhere() {
        let mut state = AllocationState::initialize(vec![Guest::new(GuestId::new(1), "A")], None);
        let first = state.groups()[0].id;
        let second = state.add_group();
        assert!(state.select_vehicle(first, Some(van(1))).is_ok());

        let for_second = options(&[van(1), van(2)], &state, Some(second));
        assert!(!for_second[0].selectable);
        assert_eq!(for_second[0].assigned_to, Some(first));
        assert!(for_second[1].selectable);

        let for_first = options(&[van(1)], &state, Some(first));
        assert!(for_first[0].selectable);
    }
}
