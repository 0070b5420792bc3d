//! Domain types shared by the allocation engine.
//!
//! Guests and vehicles arrive from the outside world and are treated as
//! immutable records for the lifetime of a session. Groups reference guests
//! by [`GuestId`] only, so a guest record exists exactly once in memory.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "`")]
            #[must_use]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the raw identifier value
            #[must_use]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Backend identifier of a guest (passenger)
    GuestId(u64)
);

numeric_id!(
    /// Backend identifier of a vehicle
    VehicleId(u64)
);

numeric_id!(
    /// Backend identifier of a persisted schedule (edit mode only)
    ScheduleId(u64)
);

numeric_id!(
    /// Numeric route reference decoded from an opaque route token
    RouteId(u64)
);

numeric_id!(
    /// Session-local identifier of an allocation group.
    ///
    /// Generated when the group is created and never sent to the backend.
    GroupId(u32)
);

/// Identifier of one allocation session.
///
/// Results of asynchronous work are tagged with the session that started
/// them, so a result that outlives its session can be recognised and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random `SessionId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `SessionId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A passenger to be seated in a vehicle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    /// Stable, unique identifier
    pub id: GuestId,
    /// Display name
    pub name: String,
    /// Contact phone number
    #[serde(default)]
    pub phone: String,
    /// Seat label on the booking, if any
    #[serde(default)]
    pub seat_number: Option<String>,
    /// Booking status as reported by the backend
    #[serde(default)]
    pub status: String,
}

impl Guest {
    /// Creates a guest with only an id and a name
    #[must_use]
    pub fn new(id: GuestId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phone: String::new(),
            seat_number: None,
            status: String::new(),
        }
    }
}

/// Seat capacity of a vehicle
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capacity(pub u32);

impl Capacity {
    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns the capacity as a guest count
    #[must_use]
    pub const fn seats(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operational status of a vehicle in the catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    /// Available for allocation
    Active,
    /// Temporarily withdrawn
    Inactive,
    /// In the workshop
    Maintenance,
    /// Any status this engine does not know about
    #[serde(other)]
    Unknown,
}

impl VehicleStatus {
    /// Returns the wire representation used in catalog queries
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Maintenance => "maintenance",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vehicle as returned by the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Catalog identifier
    pub id: VehicleId,
    /// Registration or fleet number
    pub number: String,
    /// Vehicle type (bus, van, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Number of guest seats
    pub capacity: Capacity,
    /// Catalog status at query time
    pub status: VehicleStatus,
}

impl Vehicle {
    /// Creates an active vehicle with the given seat count
    #[must_use]
    pub fn new(id: VehicleId, number: impl Into<String>, capacity: Capacity) -> Self {
        Self {
            id,
            number: number.into(),
            kind: String::new(),
            capacity,
            status: VehicleStatus::Active,
        }
    }

    /// Sets the vehicle type
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

/// A schedule persisted by an earlier commit, used to seed edit mode
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingSchedule {
    /// Backend schedule identifier
    pub schedule_id: ScheduleId,
    /// Vehicle bound to the schedule, if one was recorded
    pub vehicle: Option<Vehicle>,
    /// Guests seated on the schedule
    pub guests: Vec<Guest>,
}

/// Where a guest currently sits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    /// The unassigned pool
    Pool,
    /// An allocation group
    Group(GroupId),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool => f.write_str("pool"),
            Self::Group(id) => write!(f, "group {id}"),
        }
    }
}
