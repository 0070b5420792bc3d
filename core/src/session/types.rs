use crate::allocation::AllocationState;
use crate::commit::CommitMode;
use crate::error::{AllocationError, CatalogError, CommitError, SessionError};
use crate::search::{self, VehicleOption, VehicleSearch};
use crate::types::{ExistingSchedule, GroupId, Guest, GuestId, Location, SessionId, Vehicle, VehicleStatus};
use crate::validation::{self, Readiness, Reason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a session
///
/// `Initializing → Editing → Validating → Submitting → Committed`, with a
/// failed validation or commit falling back to `Editing`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Not opened yet
    #[default]
    Initializing,
    /// Steady state, every mutation is allowed
    Editing,
    /// Readiness is being evaluated for a confirm
    Validating,
    /// The commit call is in flight; the allocation is frozen
    Submitting,
    /// The allocation was persisted (terminal)
    Committed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Editing => write!(f, "editing"),
            Self::Validating => write!(f, "validating"),
            Self::Submitting => write!(f, "submitting"),
            Self::Committed => write!(f, "committed"),
        }
    }
}

/// Complete state of one allocation session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Identity of the open session; `None` before `Open`
    pub session_id: Option<SessionId>,
    /// Bumped by every `Open`; commit results carry the value they were
    /// submitted under
    pub epoch: u64,
    /// Current lifecycle phase
    pub phase: SessionPhase,
    /// Create or update, fixed when the session is opened
    pub mode: CommitMode,
    /// Opaque route reference supplied when the session was opened
    pub route_token: String,
    /// Free-text remarks for the commit
    pub remarks: String,
    /// Pool and groups
    pub allocation: AllocationState,
    /// Rejection of the most recent gesture, cleared by the next success
    pub last_feedback: Option<AllocationError>,
    /// Reasons the last confirm was blocked, kept current while editing
    pub blocking_reasons: Vec<Reason>,
    /// Decode or commit failure of the last confirm
    pub last_error: Option<SessionError>,
    /// Vehicle search box
    pub search: VehicleSearch,
    /// `true` once the session was closed
    pub closed: bool,
    /// When the commit succeeded
    pub committed_at: Option<DateTime<Utc>>,
    /// Confirmation text returned by the backend
    pub commit_message: Option<String>,
}

impl SessionState {
    /// Creates an unopened session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while the commit call is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase == SessionPhase::Submitting
    }

    /// Returns `true` once the allocation was persisted
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.phase == SessionPhase::Committed
    }

    /// Live readiness of the current arrangement
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        validation::readiness(&self.allocation)
    }

    /// Latest search results annotated for the picker of `group_id`
    #[must_use]
    pub fn vehicle_options(&self, group_id: Option<GroupId>) -> Vec<VehicleOption> {
        search::options(&self.search.results, &self.allocation, group_id)
    }

    /// Message to show for the last confirm failure, if any
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.last_error.as_ref().map(SessionError::user_message)
    }
}

/// Commands and events of a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    // Commands
    /// Start a session, replacing whatever was open before
    Open {
        /// Identity of the new session
        session_id: SessionId,
        /// Guests to allocate
        guests: Vec<Guest>,
        /// Persisted schedules when editing an earlier allocation
        existing_schedules: Option<Vec<ExistingSchedule>>,
        /// Opaque route reference
        route_token: String,
    },
    /// Append an empty group
    AddGroup,
    /// Delete a group, returning its guests to the pool
    RemoveGroup {
        /// Group to delete
        group_id: GroupId,
    },
    /// Bind or clear a group's vehicle
    SelectVehicle {
        /// Group to update
        group_id: GroupId,
        /// New vehicle, or `None` to clear
        vehicle: Option<Vehicle>,
    },
    /// Move one guest between the pool and groups
    MoveGuest {
        /// Guest to move
        guest_id: GuestId,
        /// Where the caller believes the guest is
        from: Location,
        /// Destination
        to: Location,
        /// Position in the destination; appended when absent or out of range
        target_index: Option<usize>,
    },
    /// Replace the remarks
    SetRemarks {
        /// New remarks text
        remarks: String,
    },
    /// Issue a vehicle query; debounced per the session config
    SearchVehicles {
        /// Free-text term
        term: String,
        /// Status filter; the configured default applies when absent
        status: Option<VehicleStatus>,
    },
    /// Debounce elapsed for query `seq`
    RunSearch {
        /// Sequence number of the query
        seq: u64,
    },
    /// Validate and, if ready, submit
    Confirm,
    /// Close the session and notify the observer
    Close,

    // Events
    /// Vehicle lookup for query `seq` finished
    VehiclesLoaded {
        /// Sequence number of the query
        seq: u64,
        /// Lookup outcome
        result: Result<Vec<Vehicle>, CatalogError>,
    },
    /// The backend accepted the allocation
    CommitSucceeded {
        /// Session that submitted
        session_id: SessionId,
        /// Epoch of the submit
        epoch: u64,
        /// Confirmation text, if any
        message: Option<String>,
    },
    /// The commit call failed
    CommitFailed {
        /// Session that submitted
        session_id: SessionId,
        /// Epoch of the submit
        epoch: u64,
        /// Failure
        error: CommitError,
    },
}

impl SessionAction {
    /// Short name used in logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open { .. } => "Open",
            Self::AddGroup => "AddGroup",
            Self::RemoveGroup { .. } => "RemoveGroup",
            Self::SelectVehicle { .. } => "SelectVehicle",
            Self::MoveGuest { .. } => "MoveGuest",
            Self::SetRemarks { .. } => "SetRemarks",
            Self::SearchVehicles { .. } => "SearchVehicles",
            Self::RunSearch { .. } => "RunSearch",
            Self::Confirm => "Confirm",
            Self::Close => "Close",
            Self::VehiclesLoaded { .. } => "VehiclesLoaded",
            Self::CommitSucceeded { .. } => "CommitSucceeded",
            Self::CommitFailed { .. } => "CommitFailed",
        }
    }

    /// Returns `true` for actions that change the allocation or remarks
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::AddGroup
                | Self::RemoveGroup { .. }
                | Self::SelectVehicle { .. }
                | Self::MoveGuest { .. }
                | Self::SetRemarks { .. }
        )
    }
}
