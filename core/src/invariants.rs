//! Structural invariants of an [`AllocationState`].
//!
//! A violation here means the engine itself is wrong. Callers report it;
//! they never patch the state to make it go away.

use crate::allocation::AllocationState;
use crate::error::ConsistencyViolation;
use crate::types::GuestId;
use std::collections::{BTreeMap, BTreeSet};

/// Verifies that every guest is in exactly one location and no vehicle is shared.
///
/// # Errors
///
/// Returns the first [`ConsistencyViolation`] found.
pub fn check_consistency(state: &AllocationState) -> Result<(), ConsistencyViolation> {
    let mut occurrences: BTreeMap<GuestId, usize> = BTreeMap::new();
    let placed = state
        .pool()
        .iter()
        .chain(state.groups().iter().flat_map(|group| group.assigned_guests.iter()));
    for id in placed {
        *occurrences.entry(*id).or_default() += 1;
    }

    for (guest_id, count) in &occurrences {
        if state.guest(*guest_id).is_none() {
            return Err(ConsistencyViolation::UnknownGuest(*guest_id));
        }
        if *count > 1 {
            return Err(ConsistencyViolation::GuestDuplicated {
                guest_id: *guest_id,
                occurrences: *count,
            });
        }
    }

    if let Some(missing) = state
        .guests()
        .find(|guest| !occurrences.contains_key(&guest.id))
    {
        return Err(ConsistencyViolation::GuestMissing(missing.id));
    }

    let mut vehicles = BTreeSet::new();
    for vehicle in state.groups().iter().filter_map(|group| group.selected_vehicle.as_ref()) {
        if !vehicles.insert(vehicle.id) {
            return Err(ConsistencyViolation::VehicleShared(vehicle.id));
        }
    }

    Ok(())
}

/// Runs [`check_consistency`] and reports a violation.
///
/// Debug builds treat a violation as fatal. Release builds log it at error
/// level and carry on with the state untouched.
pub fn assert_consistent(state: &AllocationState, context: &str) {
    let result = check_consistency(state);
    if let Err(violation) = &result {
        tracing::error!(%violation, context, "Allocation invariant violated");
    }
    debug_assert!(
        result.is_ok(),
        "allocation invariant violated after {context}: {result:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Capacity, Guest, Location, Vehicle, VehicleId};

    fn state_with(count: u64) -> AllocationState {
        let guests = (1..=count)
            .map(|id| Guest::new(GuestId::new(id), format!("Guest {id}")))
            .collect();
        AllocationState::initialize(guests, None)
    }

    #[test]
    fn initialized_state_is_consistent() {
        assert_eq!(check_consistency(&state_with(4)), Ok(()));
    }

    #[test]
    fn moves_keep_the_state_consistent() {
        let mut state = state_with(3);
        let group = state.groups()[0].id;
        let van = Vehicle::new(VehicleId::new(1), "VAN", Capacity::new(2));
        assert!(state.select_vehicle(group, Some(van)).is_ok());
        assert!(state
            .move_guest(GuestId::new(2), Location::Pool, Location::Group(group), None)
            .is_ok());

        assert_eq!(check_consistency(&state), Ok(()));
    }

    #[test]
    fn detects_duplicates() {
        let mut state = state_with(2);
        state.groups[0].assigned_guests.push(GuestId::new(1));

        assert_eq!(
            check_consistency(&state),
            Err(ConsistencyViolation::GuestDuplicated {
                guest_id: GuestId::new(1),
                occurrences: 2
            })
        );
    }

    #[test]
    fn detects_missing_guests() {
        let mut state = state_with(2);
        state.pool.retain(|id| *id != GuestId::new(2));

        assert_eq!(
            check_consistency(&state),
            Err(ConsistencyViolation::GuestMissing(GuestId::new(2)))
        );
    }

    #[test]
    fn detects_unknown_guests() {
        let mut state = state_with(1);
        state.pool.push(GuestId::new(50));

        assert_eq!(
            check_consistency(&state),
            Err(ConsistencyViolation::UnknownGuest(GuestId::new(50)))
        );
    }

    #[test]
    fn detects_shared_vehicles() {
        let mut state = state_with(1);
        let second = state.add_group();
        let van = Vehicle::new(VehicleId::new(3), "VAN", Capacity::new(2));
        state.groups[0].selected_vehicle = Some(van.clone());
        if let Some(group) = state.group_mut(second) {
            group.selected_vehicle = Some(van);
        }

        assert_eq!(
            check_consistency(&state),
            Err(ConsistencyViolation::VehicleShared(VehicleId::new(3)))
        );
    }
}
