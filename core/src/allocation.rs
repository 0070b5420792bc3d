//! The Allocation Store: canonical in-memory model of one allocation session.
//!
//! Every guest id lives in exactly one location at a time: the pool or one
//! group's assigned list. The operations in this module and in
//! [`crate::reconcile`] are the only way to change placements, and each of
//! them either applies completely or leaves the state untouched.

use crate::error::AllocationError;
use crate::types::{
    Capacity, ExistingSchedule, GroupId, Guest, GuestId, Location, ScheduleId, Vehicle, VehicleId,
};
use std::collections::{BTreeMap, BTreeSet};

/// A session-local pairing of at most one vehicle with a list of guests
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationGroup {
    /// Session-local identifier
    pub id: GroupId,
    /// Vehicle bound to this group, if one has been picked
    pub selected_vehicle: Option<Vehicle>,
    /// Guests seated in this group, in display order
    pub assigned_guests: Vec<GuestId>,
    /// Persisted schedule this group was seeded from (edit mode)
    pub schedule_id: Option<ScheduleId>,
}

impl AllocationGroup {
    /// Creates an empty group without a vehicle
    #[must_use]
    pub const fn new(id: GroupId) -> Self {
        Self {
            id,
            selected_vehicle: None,
            assigned_guests: Vec::new(),
            schedule_id: None,
        }
    }

    /// Number of guests seated in this group
    #[must_use]
    pub fn len(&self) -> usize {
        self.assigned_guests.len()
    }

    /// Returns `true` if no guest is seated in this group
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned_guests.is_empty()
    }

    /// Capacity of the selected vehicle
    #[must_use]
    pub fn capacity(&self) -> Option<Capacity> {
        self.selected_vehicle.as_ref().map(|vehicle| vehicle.capacity)
    }

    /// Seats still free, or `None` without a vehicle
    #[must_use]
    pub fn remaining_seats(&self) -> Option<usize> {
        self.capacity()
            .map(|capacity| capacity.seats().saturating_sub(self.len()))
    }

    /// Returns `true` if the guest is seated in this group
    #[must_use]
    pub fn contains(&self, guest_id: GuestId) -> bool {
        self.assigned_guests.contains(&guest_id)
    }
}

/// Pool plus groups for one session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationState {
    pub(crate) roster: BTreeMap<GuestId, Guest>,
    pub(crate) pool: Vec<GuestId>,
    pub(crate) groups: Vec<AllocationGroup>,
    pub(crate) next_group_id: u32,
}

impl AllocationState {
    /// Seeds a session.
    ///
    /// With non-empty `existing_schedules` (edit mode) one group is created
    /// per schedule, carrying its vehicle and guests, and every guest not
    /// referenced by a schedule goes to the pool. Otherwise (create mode) a
    /// single empty group is created and every guest goes to the pool.
    ///
    /// Guests listed by a schedule but missing from `guests` join the roster.
    /// A guest listed twice is seated once, in the first place it appears. A
    /// vehicle recorded on two schedules stays on the first group only.
    #[must_use]
    pub fn initialize(guests: Vec<Guest>, existing_schedules: Option<Vec<ExistingSchedule>>) -> Self {
        let mut state = Self::default();
        let mut order = Vec::with_capacity(guests.len());

        for guest in guests {
            if state.roster.contains_key(&guest.id) {
                tracing::warn!(guest_id = %guest.id, "Duplicate guest in session input, keeping first");
                continue;
            }
            order.push(guest.id);
            state.roster.insert(guest.id, guest);
        }

        let schedules = existing_schedules.unwrap_or_default();
        let mut placed = BTreeSet::new();

        for schedule in schedules {
            let group_id = state.add_group();
            let vehicle = schedule.vehicle.filter(|vehicle| {
                let taken = state.vehicle_holder(vehicle.id).is_some();
                if taken {
                    tracing::warn!(
                        vehicle_id = %vehicle.id,
                        schedule_id = %schedule.schedule_id,
                        "Vehicle already seeded on an earlier schedule, leaving group without vehicle"
                    );
                }
                !taken
            });

            let mut assigned = Vec::with_capacity(schedule.guests.len());
            for guest in schedule.guests {
                if !placed.insert(guest.id) {
                    tracing::warn!(
                        guest_id = %guest.id,
                        schedule_id = %schedule.schedule_id,
                        "Guest already seated on an earlier schedule"
                    );
                    continue;
                }
                assigned.push(guest.id);
                state.roster.entry(guest.id).or_insert(guest);
            }

            if let Some(group) = state.group_mut(group_id) {
                group.selected_vehicle = vehicle;
                group.assigned_guests = assigned;
                group.schedule_id = Some(schedule.schedule_id);
            }
        }

        if state.groups.is_empty() {
            state.add_group();
        }

        state.pool = order.into_iter().filter(|id| !placed.contains(id)).collect();

        tracing::debug!(
            guests = state.roster.len(),
            groups = state.groups.len(),
            pool = state.pool.len(),
            "Allocation initialized"
        );

        state
    }

    /// Appends an empty group without a vehicle and returns its id
    pub fn add_group(&mut self) -> GroupId {
        self.next_group_id += 1;
        let id = GroupId::new(self.next_group_id);
        self.groups.push(AllocationGroup::new(id));
        id
    }

    /// Deletes a group and returns its guests to the end of the pool.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::GroupNotFound`] if no such group exists.
    pub fn remove_group(&mut self, group_id: GroupId) -> Result<AllocationGroup, AllocationError> {
        let index = self
            .groups
            .iter()
            .position(|group| group.id == group_id)
            .ok_or(AllocationError::GroupNotFound(group_id))?;

        let group = self.groups.remove(index);
        self.pool.extend(group.assigned_guests.iter().copied());
        Ok(group)
    }

    /// Binds a vehicle to a group, or clears it with `None`.
    ///
    /// Re-selecting the vehicle a group already holds succeeds without
    /// change. Clearing a vehicle keeps the group's guests.
    ///
    /// # Errors
    ///
    /// - [`AllocationError::GroupNotFound`] if no such group exists
    /// - [`AllocationError::VehicleAlreadyAssigned`] if another group holds the vehicle
    pub fn select_vehicle(
        &mut self,
        group_id: GroupId,
        vehicle: Option<Vehicle>,
    ) -> Result<(), AllocationError> {
        if self.group(group_id).is_none() {
            return Err(AllocationError::GroupNotFound(group_id));
        }

        if let Some(vehicle) = &vehicle {
            if let Some(holder) = self.vehicle_holder(vehicle.id) {
                if holder != group_id {
                    return Err(AllocationError::VehicleAlreadyAssigned {
                        vehicle_id: vehicle.id,
                        assigned_to: holder,
                    });
                }
            }
        }

        if let Some(group) = self.group_mut(group_id) {
            group.selected_vehicle = vehicle;
        }
        Ok(())
    }

    /// Guests in the unassigned pool, in order
    #[must_use]
    pub fn pool(&self) -> &[GuestId] {
        &self.pool
    }

    /// Groups in display order
    #[must_use]
    pub fn groups(&self) -> &[AllocationGroup] {
        &self.groups
    }

    /// Looks up a group by id
    #[must_use]
    pub fn group(&self, group_id: GroupId) -> Option<&AllocationGroup> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub(crate) fn group_mut(&mut self, group_id: GroupId) -> Option<&mut AllocationGroup> {
        self.groups.iter_mut().find(|group| group.id == group_id)
    }

    /// Looks up a guest record by id
    #[must_use]
    pub fn guest(&self, guest_id: GuestId) -> Option<&Guest> {
        self.roster.get(&guest_id)
    }

    /// Every guest known to the session, ordered by id
    pub fn guests(&self) -> impl Iterator<Item = &Guest> {
        self.roster.values()
    }

    /// Guest records of the pool, in pool order
    pub fn pool_guests(&self) -> impl Iterator<Item = &Guest> {
        self.pool.iter().filter_map(|id| self.roster.get(id))
    }

    /// Guest records seated in a group, in seating order
    #[must_use]
    pub fn group_guests(&self, group_id: GroupId) -> Vec<&Guest> {
        self.group(group_id)
            .map(|group| {
                group
                    .assigned_guests
                    .iter()
                    .filter_map(|id| self.roster.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of guests supplied when the session was initialized
    #[must_use]
    pub fn total_guests(&self) -> usize {
        self.roster.len()
    }

    /// Number of guests currently placed anywhere
    #[must_use]
    pub fn placed_guests(&self) -> usize {
        self.pool.len() + self.groups.iter().map(AllocationGroup::len).sum::<usize>()
    }

    /// Current location of a guest
    #[must_use]
    pub fn location_of(&self, guest_id: GuestId) -> Option<Location> {
        if self.pool.contains(&guest_id) {
            return Some(Location::Pool);
        }
        self.groups
            .iter()
            .find(|group| group.contains(guest_id))
            .map(|group| Location::Group(group.id))
    }

    /// Ids of all vehicles currently selected by some group
    #[must_use]
    pub fn used_vehicle_ids(&self) -> BTreeSet<VehicleId> {
        self.groups
            .iter()
            .filter_map(|group| group.selected_vehicle.as_ref().map(|vehicle| vehicle.id))
            .collect()
    }

    /// Group currently holding a vehicle
    #[must_use]
    pub fn vehicle_holder(&self, vehicle_id: VehicleId) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|group| {
                group
                    .selected_vehicle
                    .as_ref()
                    .is_some_and(|vehicle| vehicle.id == vehicle_id)
            })
            .map(|group| group.id)
    }
}
