//! The Reconciler: moving a guest between the pool and groups.
//!
//! Every drag-and-drop gesture and every "assign"/"remove" button reduces to
//! [`AllocationState::move_guest`]. All checks run before anything is
//! touched, so a rejected move leaves the state exactly as it was and an
//! accepted move removes and inserts in one step.

use crate::allocation::AllocationState;
use crate::error::AllocationError;
use crate::types::{GuestId, Location};

/// Result of an accepted move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing changed: same location without a new position, or the
    /// guest already sat there
    Unchanged,
    /// The guest now sits at `index` in the destination list
    Moved {
        /// Position in the destination list
        index: usize,
    },
}

impl AllocationState {
    /// Moves a guest from one location to another.
    ///
    /// The guest is appended to the destination, or inserted at
    /// `target_index` when that index is within `0..=len`.
    ///
    /// When `from == to`, a `target_index` reorders the guest inside that
    /// list (clamped to its end) without any vehicle or capacity check,
    /// since the head count does not change. Without one the call is a no-op.
    ///
    /// # Errors
    ///
    /// Checked in this order, each leaving the state unchanged:
    ///
    /// - [`AllocationError::GroupNotFound`] if `to` names an unknown group
    /// - [`AllocationError::VehicleRequired`] if the `to` group has no vehicle
    /// - [`AllocationError::CapacityReached`] if the `to` group is full
    /// - [`AllocationError::GroupNotFound`] if `from` names an unknown group
    /// - [`AllocationError::GuestNotFoundAtSource`] if the guest is not in `from`
    pub fn move_guest(
        &mut self,
        guest_id: GuestId,
        from: Location,
        to: Location,
        target_index: Option<usize>,
    ) -> Result<MoveOutcome, AllocationError> {
        if from == to {
            return match target_index {
                Some(index) => self.reorder(guest_id, from, index),
                None => Ok(MoveOutcome::Unchanged),
            };
        }

        if let Location::Group(group_id) = to {
            let group = self
                .group(group_id)
                .ok_or(AllocationError::GroupNotFound(group_id))?;
            let capacity = group
                .capacity()
                .ok_or(AllocationError::VehicleRequired(group_id))?;
            if group.len() >= capacity.seats() {
                return Err(AllocationError::CapacityReached {
                    group_id,
                    capacity: capacity.value(),
                });
            }
        }

        let source_index = self
            .list(from)
            .ok_or_else(|| match from {
                Location::Group(group_id) => AllocationError::GroupNotFound(group_id),
                Location::Pool => AllocationError::GuestNotFoundAtSource { guest_id, from },
            })?
            .iter()
            .position(|id| *id == guest_id)
            .ok_or(AllocationError::GuestNotFoundAtSource { guest_id, from })?;

        // Both lists were validated above, so neither lookup below can miss.
        let Some(source) = self.list_mut(from) else {
            return Err(AllocationError::GuestNotFoundAtSource { guest_id, from });
        };
        let moved = source.remove(source_index);

        let Some(destination) = self.list_mut(to) else {
            return Err(AllocationError::GuestNotFoundAtSource { guest_id, from });
        };
        let index = match target_index {
            Some(index) if index <= destination.len() => index,
            _ => destination.len(),
        };
        destination.insert(index, moved);

        tracing::debug!(guest_id = %guest_id, %from, %to, index, "Guest moved");
        Ok(MoveOutcome::Moved { index })
    }

    fn reorder(
        &mut self,
        guest_id: GuestId,
        location: Location,
        target_index: usize,
    ) -> Result<MoveOutcome, AllocationError> {
        let list = self.list_mut(location).ok_or_else(|| match location {
            Location::Group(group_id) => AllocationError::GroupNotFound(group_id),
            Location::Pool => AllocationError::GuestNotFoundAtSource {
                guest_id,
                from: location,
            },
        })?;
        let current = list
            .iter()
            .position(|id| *id == guest_id)
            .ok_or(AllocationError::GuestNotFoundAtSource {
                guest_id,
                from: location,
            })?;

        let index = target_index.min(list.len() - 1);
        if index == current {
            return Ok(MoveOutcome::Unchanged);
        }
        let moved = list.remove(current);
        list.insert(index, moved);

        tracing::debug!(guest_id = %guest_id, %location, from_index = current, index, "Guest reordered");
        Ok(MoveOutcome::Moved { index })
    }

    fn list(&self, location: Location) -> Option<&Vec<GuestId>> {
        match location {
            Location::Pool => Some(&self.pool),
            Location::Group(group_id) => self.group(group_id).map(|group| &group.assigned_guests),
        }
    }

    fn list_mut(&mut self, location: Location) -> Option<&mut Vec<GuestId>> {
        match location {
            Location::Pool => Some(&mut self.pool),
            Location::Group(group_id) => self
                .group_mut(group_id)
                .map(|group| &mut group.assigned_guests),
        }
    }
}
