//! The Validation Engine: pure capacity and readiness checks.
//!
//! Nothing here mutates state or performs I/O, so the functions may be
//! called after every gesture to drive live feedback.

use crate::allocation::{AllocationGroup, AllocationState};
use crate::types::GroupId;
use serde::{Deserialize, Serialize};

/// How full a group is relative to its vehicle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapacityStatus {
    /// No vehicle selected, so capacity is unknown
    Unknown,
    /// Seats remain
    Under,
    /// Every seat is taken
    AtCapacity,
    /// More guests than seats
    ///
    /// Moves can never cause this, but switching to a smaller vehicle can.
    Over,
}

/// Classifies a group's load against its vehicle
#[must_use]
pub fn capacity_status(group: &AllocationGroup) -> CapacityStatus {
    let Some(capacity) = group.capacity() else {
        return CapacityStatus::Unknown;
    };

    match group.len().cmp(&capacity.seats()) {
        std::cmp::Ordering::Less => CapacityStatus::Under,
        std::cmp::Ordering::Equal => CapacityStatus::AtCapacity,
        std::cmp::Ordering::Greater => CapacityStatus::Over,
    }
}

/// A reason the current arrangement cannot be committed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    /// The session has no guests at all
    NoGuests,
    /// Every group has been removed
    NoGroups,
    /// Some guests are still unassigned
    PoolNotEmpty,
    /// A group has no vehicle
    GroupMissingVehicle(GroupId),
    /// A group holds more guests than its vehicle seats
    GroupOverCapacity(GroupId),
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoGuests => write!(f, "There are no guests to allocate"),
            Self::NoGroups => write!(f, "Add at least one vehicle group"),
            Self::PoolNotEmpty => write!(f, "Assign every guest to a vehicle"),
            Self::GroupMissingVehicle(id) => write!(f, "Select a vehicle for group {id}"),
            Self::GroupOverCapacity(id) => write!(f, "Group {id} exceeds its vehicle capacity"),
        }
    }
}

/// Commit-readiness of an arrangement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    /// `true` iff `reasons` is empty
    pub ok: bool,
    /// Every blocking reason, in a stable order
    pub reasons: Vec<Reason>,
}

impl Readiness {
    fn from_reasons(reasons: Vec<Reason>) -> Self {
        Self {
            ok: reasons.is_empty(),
            reasons,
        }
    }
}

/// Collects every reason the arrangement cannot be committed.
///
/// Session-wide reasons come first, then per-group reasons in group order.
#[must_use]
pub fn readiness(state: &AllocationState) -> Readiness {
    let mut reasons = Vec::new();

    if state.total_guests() == 0 {
        reasons.push(Reason::NoGuests);
    }
    if state.groups().is_empty() {
        reasons.push(Reason::NoGroups);
    }
    if !state.pool().is_empty() {
        reasons.push(Reason::PoolNotEmpty);
    }

    for group in state.groups() {
        match capacity_status(group) {
            CapacityStatus::Unknown => reasons.push(Reason::GroupMissingVehicle(group.id)),
            CapacityStatus::Over => reasons.push(Reason::GroupOverCapacity(group.id)),
            CapacityStatus::Under | CapacityStatus::AtCapacity => {}
        }
    }

    Readiness::from_reasons(reasons)
}
