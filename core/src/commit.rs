//! The Commit Service: wire payload, route token decoding, and the
//! single-flight submit guard.

use crate::allocation::AllocationState;
use crate::environment::CommitGateway;
use crate::error::{CommitError, DecodeError};
use crate::types::{GroupId, GuestId, RouteId, VehicleId};
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Whether the commit creates allocations or replaces persisted ones
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitMode {
    /// First allocation for the route
    #[default]
    Create,
    /// Session was seeded from existing schedules
    Update,
}

/// One group as sent to the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAllocation {
    /// Vehicle bound to the group
    pub vehicle_id: VehicleId,
    /// Seated guests, in seating order
    pub guest_ids: Vec<GuestId>,
}

/// Body of the create/update request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPayload {
    /// Route this allocation belongs to
    pub route_id: RouteId,
    /// Free-text remarks, never empty
    pub remarks: String,
    /// One entry per group, in group order
    pub allocations: Vec<GroupAllocation>,
}

/// Successful backend answer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    /// Confirmation message from the backend, if any
    pub message: Option<String>,
}

/// Reasons a payload cannot be built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The route token is unusable
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A group has no vehicle and cannot be expressed on the wire
    #[error("Group {0} has no vehicle")]
    GroupMissingVehicle(GroupId),
}

/// Decodes an opaque route token into a route reference.
///
/// A token is the base64 encoding (URL-safe or standard alphabet, padding
/// optional) of a positive decimal integer.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidRouteToken`] for anything else.
pub fn decode_route_token(token: &str) -> Result<RouteId, DecodeError> {
    let unpadded = token.trim().trim_end_matches('=');
    if unpadded.is_empty() {
        return Err(DecodeError::InvalidRouteToken("token is empty".to_string()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(unpadded)
        .or_else(|_| STANDARD_NO_PAD.decode(unpadded))
        .map_err(|error| DecodeError::InvalidRouteToken(error.to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| DecodeError::InvalidRouteToken("token is not text".to_string()))?;
    let id: u64 = text
        .trim()
        .parse()
        .map_err(|_| DecodeError::InvalidRouteToken(format!("{text:?} is not a route number")))?;

    if id == 0 {
        return Err(DecodeError::InvalidRouteToken("route number must be positive".to_string()));
    }
    Ok(RouteId::new(id))
}

/// Encodes a route reference as an opaque token
#[must_use]
pub fn encode_route_token(route_id: RouteId) -> String {
    URL_SAFE_NO_PAD.encode(route_id.value().to_string())
}

/// Builds the wire payload.
///
/// Empty groups are kept (a reserved but empty vehicle). Blank remarks are
/// replaced by `default_remark`.
///
/// # Errors
///
/// - [`PayloadError::Decode`] if the route token is invalid; nothing else is checked
/// - [`PayloadError::GroupMissingVehicle`] if a group has no vehicle
pub fn build_payload(
    state: &AllocationState,
    route_token: &str,
    remarks: &str,
    default_remark: &str,
) -> Result<CommitPayload, PayloadError> {
    let route_id = decode_route_token(route_token)?;

    let allocations = state
        .groups()
        .iter()
        .map(|group| {
            let vehicle = group
                .selected_vehicle
                .as_ref()
                .ok_or(PayloadError::GroupMissingVehicle(group.id))?;
            Ok(GroupAllocation {
                vehicle_id: vehicle.id,
                guest_ids: group.assigned_guests.clone(),
            })
        })
        .collect::<Result<Vec<_>, PayloadError>>()?;

    let trimmed = remarks.trim();
    let remarks = if trimmed.is_empty() {
        default_remark.to_string()
    } else {
        trimmed.to_string()
    };

    Ok(CommitPayload {
        route_id,
        remarks,
        allocations,
    })
}

/// Single-flight wrapper around a [`CommitGateway`].
///
/// Clones share the busy flag, so at most one commit per service instance
/// is in flight at any time.
#[derive(Clone)]
pub struct CommitService {
    gateway: Arc<dyn CommitGateway>,
    busy: Arc<AtomicBool>,
}

impl CommitService {
    /// Creates a service over the given gateway
    #[must_use]
    pub fn new(gateway: Arc<dyn CommitGateway>) -> Self {
        Self {
            gateway,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns `true` while a submit is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Sends the payload with exactly one gateway call.
    ///
    /// # Errors
    ///
    /// - [`CommitError::SubmitInProgress`] if another submit has not finished;
    ///   the gateway is not called
    /// - any error returned by the gateway
    pub async fn submit(
        &self,
        mode: CommitMode,
        payload: CommitPayload,
    ) -> Result<CommitReceipt, CommitError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(route_id = %payload.route_id, "Rejected submit: another submit is in flight");
            return Err(CommitError::SubmitInProgress);
        }
        let _busy = BusyGuard(Arc::clone(&self.busy));

        tracing::info!(
            route_id = %payload.route_id,
            ?mode,
            groups = payload.allocations.len(),
            "Submitting allocation"
        );

        let result = self.gateway.commit(mode, payload).await;
        match &result {
            Ok(_) => tracing::info!("Allocation committed"),
            Err(error) => tracing::error!(%error, "Allocation commit failed"),
        }
        result
    }
}

impl std::fmt::Debug for CommitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitService")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Clears the busy flag on drop, including when the submit future is dropped
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::environment::BoxFuture;
    use crate::types::{Capacity, Guest, Location, Vehicle};
    use tokio::sync::Notify;

    fn ready_state() -> AllocationState {
        let guests = (1..=3)
            .map(|id| Guest::new(GuestId::new(id), format!("Guest {id}")))
            .collect();
        let mut state = AllocationState::initialize(guests, None);
        let first = state.groups()[0].id;
        let second = state.add_group();
        let _ = state.select_vehicle(first, Some(Vehicle::new(VehicleId::new(10), "A", Capacity::new(4))));
        let _ = state.select_vehicle(second, Some(Vehicle::new(VehicleId::new(11), "B", Capacity::new(4))));
        for id in [3, 1] {
            let _ = state.move_guest(GuestId::new(id), Location::Pool, Location::Group(first), None);
        }
        state
    }

    #[test]
    fn decodes_url_safe_and_standard_tokens() {
        assert_eq!(decode_route_token("MTIz"), Ok(RouteId::new(123)));
        assert_eq!(decode_route_token("NDI="), Ok(RouteId::new(42)));
        assert_eq!(decode_route_token(" NDI "), Ok(RouteId::new(42)));
        assert_eq!(decode_route_token(&encode_route_token(RouteId::new(9001))), Ok(RouteId::new(9001)));
    }

    #[test]
    fn rejects_malformed_tokens() {
        for token in ["", "   ", "!!!", "YWJj", "MA", "LTU"] {
            assert!(
                matches!(decode_route_token(token), Err(DecodeError::InvalidRouteToken(_))),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn payload_carries_every_group_in_order() {
        let state = ready_state();

        let payload = build_payload(&state, "MTIz", "  Airport run  ", "Vehicle allocation").unwrap();

        assert_eq!(payload.route_id, RouteId::new(123));
        assert_eq!(payload.remarks, "Airport run");
        assert_eq!(
            payload.allocations,
            vec![
                GroupAllocation {
                    vehicle_id: VehicleId::new(10),
                    guest_ids: vec![GuestId::new(3), GuestId::new(1)],
                },
                GroupAllocation {
                    vehicle_id: VehicleId::new(11),
                    guest_ids: vec![],
                },
            ]
        );
    }

    #[test]
    fn blank_remarks_use_the_default() {
        let payload = build_payload(&ready_state(), "MTIz", " \n ", "Vehicle allocation").unwrap();
        assert_eq!(payload.remarks, "Vehicle allocation");
    }

    #[test]
    fn invalid_token_aborts_payload() {
        let result = build_payload(&ready_state(), "not a token", "", "x");
        assert!(matches!(result, Err(PayloadError::Decode(_))));
    }

    #[test]
    fn payload_serializes_camel_case() {
        let payload = build_payload(&ready_state(), "MTIz", "", "Vehicle allocation").unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["routeId"], 123);
        assert_eq!(json["allocations"][0]["vehicleId"], 10);
        assert_eq!(json["allocations"][0]["guestIds"], serde_json::json!([3, 1]));
    }

    struct BlockingGateway {
        release: Arc<Notify>,
    }

    impl CommitGateway for BlockingGateway {
        fn commit(
            &self,
            _mode: CommitMode,
            _payload: CommitPayload,
        ) -> BoxFuture<Result<CommitReceipt, CommitError>> {
            let release = Arc::clone(&self.release);
            Box::pin(async move {
                release.notified().await;
                Ok(CommitReceipt::default())
            })
        }
    }

    #[tokio::test]
    async fn second_submit_is_rejected_while_first_is_in_flight() {
        let release = Arc::new(Notify::new());
        let service = CommitService::new(Arc::new(BlockingGateway {
            release: Arc::clone(&release),
        }));
        let payload = build_payload(&ready_state(), "MTIz", "", "x").unwrap();

        let first = {
            let service = service.clone();
            let payload = payload.clone();
            tokio::spawn(async move { service.submit(CommitMode::Create, payload).await })
        };
        while !service.is_busy() {
            tokio::task::yield_now().await;
        }

        let second = service.submit(CommitMode::Create, payload).await;
        assert_eq!(second, Err(CommitError::SubmitInProgress));

        release.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert!(!service.is_busy());
    }
}
