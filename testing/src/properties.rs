//! proptest strategies for session gestures.
//!
//! Generated gestures deliberately include invalid ones (unknown groups,
//! wrong source locations, vehicles held elsewhere) so properties cover
//! the rejection paths as well as the happy path.

use crate::fixtures::{guests, vehicle};
use allocation_core::session::SessionAction;
use allocation_core::types::{GroupId, Guest, GuestId, Location, Vehicle};
use proptest::prelude::*;

/// Largest group id generated gestures refer to
pub const MAX_GROUP_ID: u32 = 6;

/// Largest vehicle id generated gestures refer to
pub const MAX_VEHICLE_ID: u64 = 5;

/// Between `0` and `max` guests with ids `1..=n`
pub fn arb_guests(max: u64) -> impl Strategy<Value = Vec<Guest>> {
    (0..=max).prop_map(guests)
}

/// The pool or one of the first [`MAX_GROUP_ID`] groups
pub fn arb_location() -> impl Strategy<Value = Location> {
    prop_oneof![
        1 => Just(Location::Pool),
        3 => (1..=MAX_GROUP_ID).prop_map(|id| Location::Group(GroupId::new(id))),
    ]
}

/// A vehicle from a small fleet, with a random seat count
pub fn arb_vehicle() -> impl Strategy<Value = Vehicle> {
    (1..=MAX_VEHICLE_ID, 0_u32..=4).prop_map(|(id, seats)| vehicle(id, seats))
}

/// One editing gesture for a session of up to `guest_count` guests
pub fn arb_gesture(guest_count: u64) -> impl Strategy<Value = SessionAction> {
    let guest_ids = 1..=guest_count.max(1);
    prop_oneof![
        1 => Just(SessionAction::AddGroup),
        1 => (1..=MAX_GROUP_ID).prop_map(|id| SessionAction::RemoveGroup {
            group_id: GroupId::new(id),
        }),
        2 => ((1..=MAX_GROUP_ID), proptest::option::weighted(0.85, arb_vehicle())).prop_map(
            |(id, vehicle)| SessionAction::SelectVehicle {
                group_id: GroupId::new(id),
                vehicle,
            }
        ),
        6 => (
            guest_ids,
            arb_location(),
            arb_location(),
            proptest::option::of(0_usize..6)
        )
            .prop_map(|(guest, from, to, target_index)| SessionAction::MoveGuest {
                guest_id: GuestId::new(guest),
                from,
                to,
                target_index,
            }),
    ]
}

/// A sequence of gestures
pub fn arb_gestures(guest_count: u64, max_len: usize) -> impl Strategy<Value = Vec<SessionAction>> {
    proptest::collection::vec(arb_gesture(guest_count), 0..=max_len)
}
