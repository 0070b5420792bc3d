//! Environment module - dependency injection traits
//!
//! Everything the session reducer needs from the outside world is behind a
//! trait and injected through [`crate::session::SessionEnvironment`]. Async
//! methods return boxed futures so the traits stay object-safe.

use crate::commit::{CommitMode, CommitPayload, CommitReceipt};
use crate::error::{CatalogError, CommitError};
use crate::types::{Vehicle, VehicleStatus};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future returned by environment traits
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Read-only vehicle lookup.
///
/// Every returned list is authoritative for availability at query time.
/// Exclusivity against vehicles already picked in the session is enforced by
/// the engine, not by the catalog.
pub trait VehicleCatalog: Send + Sync {
    /// Searches vehicles by free text, optionally filtered by status
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the lookup fails.
    fn search(
        &self,
        term: &str,
        status: Option<VehicleStatus>,
    ) -> BoxFuture<Result<Vec<Vehicle>, CatalogError>>;
}

/// Backend endpoint that persists an allocation
pub trait CommitGateway: Send + Sync {
    /// Performs exactly one create or update call
    ///
    /// # Errors
    ///
    /// Returns [`CommitError`] for transport failures, timeouts, non-success
    /// statuses, and `success: false` answers.
    fn commit(
        &self,
        mode: CommitMode,
        payload: CommitPayload,
    ) -> BoxFuture<Result<CommitReceipt, CommitError>>;
}

/// Receives the session's output contract
pub trait SessionObserver: Send + Sync {
    /// Called once when the session closes.
    ///
    /// Downstream data should only be refreshed when `committed` is `true`.
    fn session_closed(&self, committed: bool);
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn session_closed(&self, _committed: bool) {}
}
