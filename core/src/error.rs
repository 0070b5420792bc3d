//! Error types for the allocation engine.
//!
//! Errors are grouped by how the caller is expected to react:
//!
//! - [`AllocationError`]: recoverable, inline feedback for a single gesture
//! - [`DecodeError`]: the route token is unusable, no network call is made
//! - [`CommitError`]: the backend call failed, state is preserved for retry
//! - [`CatalogError`]: a vehicle lookup failed, allocation state is untouched
//! - [`ConsistencyViolation`]: an invariant break inside the engine itself
//! - [`ConfigError`]: a configuration value could not be parsed

use crate::types::{GroupId, GuestId, Location, VehicleId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback shown when a failed commit carries no backend message
pub const COMMIT_FALLBACK_MESSAGE: &str = "Failed to save vehicle allocation. Please try again.";

/// Rejection of a single store or reconciler operation.
///
/// These are returned as values and leave the allocation untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationError {
    /// No group with this id exists in the session
    #[error("Group {0} not found")]
    GroupNotFound(GroupId),

    /// The vehicle is already selected by another group
    #[error("Vehicle {vehicle_id} is already assigned to group {assigned_to}")]
    VehicleAlreadyAssigned {
        /// Vehicle that was requested
        vehicle_id: VehicleId,
        /// Group that currently holds it
        assigned_to: GroupId,
    },

    /// The target group has no vehicle selected yet
    #[error("Select a vehicle for group {0} before assigning guests")]
    VehicleRequired(GroupId),

    /// The target group is already full
    #[error("Group {group_id} has reached its capacity of {capacity}")]
    CapacityReached {
        /// Group that rejected the guest
        group_id: GroupId,
        /// Seat count of the group's vehicle
        capacity: u32,
    },

    /// The guest is not where the caller thinks it is
    #[error("Guest {guest_id} is not in {from}")]
    GuestNotFoundAtSource {
        /// Guest that was requested
        guest_id: GuestId,
        /// Location the caller named as the source
        from: Location,
    },

    /// A commit is in flight and the allocation is frozen until it settles
    #[error("A submit is already in progress")]
    SubmitInProgress,
}

/// The route token could not be turned into a route reference
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeError {
    /// Token is not valid encoded text or does not carry a positive integer
    #[error("Invalid route token: {0}")]
    InvalidRouteToken(String),
}

/// Failure of the commit call
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitError {
    /// Another submit for this session has not finished yet
    #[error("A submit is already in progress")]
    SubmitInProgress,

    /// The request never produced a response
    #[error("Request failed: {0}")]
    Transport(String),

    /// The request timed out
    #[error("Request timed out")]
    Timeout,

    /// The backend answered with a non-success status code
    #[error("Backend returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body, if any
        message: Option<String>,
    },

    /// The backend answered but reported `success: false`
    #[error("Backend rejected the allocation")]
    Rejected {
        /// Message from the backend, if any
        message: Option<String>,
    },
}

impl CommitError {
    /// Backend message verbatim when present, otherwise the generic fallback
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            }
            | Self::Rejected {
                message: Some(message),
            } if !message.trim().is_empty() => message.clone(),
            Self::SubmitInProgress => self.to_string(),
            _ => COMMIT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// Failure of a vehicle lookup
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogError {
    /// The request never produced a response
    #[error("Vehicle search failed: {0}")]
    Transport(String),

    /// The catalog answered with a non-success status code
    #[error("Vehicle search returned status {0}")]
    Status(u16),

    /// The response body could not be parsed
    #[error("Vehicle search response could not be parsed: {0}")]
    Parse(String),
}

/// An invariant of the allocation model does not hold.
///
/// Never user-facing. Reported loudly and never repaired, because a repair
/// would hide a defect in the reconciler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyViolation {
    /// A known guest is in no location at all
    #[error("Guest {0} is missing from every location")]
    GuestMissing(GuestId),

    /// A guest is present in more than one location, or twice in one
    #[error("Guest {guest_id} appears {occurrences} times")]
    GuestDuplicated {
        /// Guest that is duplicated
        guest_id: GuestId,
        /// How many times it was found
        occurrences: usize,
    },

    /// A location references a guest the session never received
    #[error("Guest {0} is placed but unknown to the session")]
    UnknownGuest(GuestId),

    /// Two groups hold the same vehicle
    #[error("Vehicle {0} is selected by more than one group")]
    VehicleShared(VehicleId),
}

/// Errors raised while loading [`SessionConfig`](crate::config::SessionConfig)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds an unusable value
    #[error("Invalid value for {var}: {value}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
}

/// Error attached to the session after a failed confirm
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    /// Route token could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Commit call failed
    #[error(transparent)]
    Commit(#[from] CommitError),
}

impl SessionError {
    /// Message suitable for presenting to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Decode(_) => {
                "This route link is no longer valid. Reload the route and try again.".to_string()
            }
            Self::Commit(error) => error.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_is_surfaced_verbatim() {
        let error = CommitError::Rejected {
            message: Some("Vehicle 12 is booked on another route".to_string()),
        };
        assert_eq!(error.user_message(), "Vehicle 12 is booked on another route");

        let error = CommitError::Status {
            status: 422,
            message: Some("Route is closed".to_string()),
        };
        assert_eq!(error.user_message(), "Route is closed");
    }

    #[test]
    fn missing_or_blank_message_falls_back() {
        assert_eq!(CommitError::Timeout.user_message(), COMMIT_FALLBACK_MESSAGE);
        assert_eq!(
            CommitError::Rejected {
                message: Some("   ".to_string())
            }
            .user_message(),
            COMMIT_FALLBACK_MESSAGE
        );
        assert_eq!(
            CommitError::Status {
                status: 500,
                message: None
            }
            .user_message(),
            COMMIT_FALLBACK_MESSAGE
        );
    }

    #[test]
    fn decode_errors_point_at_reloading() {
        let error = SessionError::from(DecodeError::InvalidRouteToken("bad".to_string()));
        assert!(error.user_message().contains("Reload"));
    }
}
