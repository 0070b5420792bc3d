//! In-memory collaborators for session tests
//!
//! - [`FixedClock`]: deterministic time
//! - [`MockVehicleCatalog`]: filterable fleet with scripted failures and latency
//! - [`MockCommitGateway`]: scripted outcomes, call recording, optional hold
//! - [`RecordingObserver`]: captures close notifications

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Locks only panic when poisoned

use allocation_core::commit::{CommitMode, CommitPayload, CommitReceipt};
use allocation_core::environment::{
    BoxFuture, Clock, CommitGateway, SessionObserver, VehicleCatalog,
};
use allocation_core::error::{CatalogError, CommitError};
use allocation_core::types::{Vehicle, VehicleStatus};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Notify;

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use allocation_testing::mocks::FixedClock;
/// use allocation_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
///
/// # Panics
///
/// This function will panic if the hardcoded timestamp fails to parse,
/// which should never happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

/// A recorded catalog query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Search term
    pub term: String,
    /// Status filter
    pub status: Option<VehicleStatus>,
}

/// In-memory vehicle catalog.
///
/// Matches a term case-insensitively against vehicle number and type. Clones
/// share the fleet, the scripted failure, and the query log.
#[derive(Clone, Debug, Default)]
pub struct MockVehicleCatalog {
    fleet: Arc<RwLock<Vec<Vehicle>>>,
    failure: Arc<RwLock<Option<CatalogError>>>,
    latency: Arc<RwLock<HashMap<String, Duration>>>,
    queries: Arc<Mutex<Vec<CatalogQuery>>>,
}

impl MockVehicleCatalog {
    /// Creates a catalog over the given fleet
    #[must_use]
    pub fn new(fleet: Vec<Vehicle>) -> Self {
        Self {
            fleet: Arc::new(RwLock::new(fleet)),
            ..Self::default()
        }
    }

    /// Makes every following search fail
    pub fn fail_with(&self, error: CatalogError) {
        *self.failure.write().unwrap() = Some(error);
    }

    /// Clears a scripted failure
    pub fn recover(&self) {
        *self.failure.write().unwrap() = None;
    }

    /// Delays answers for `term`, to simulate out-of-order responses
    pub fn delay_term(&self, term: impl Into<String>, latency: Duration) {
        self.latency.write().unwrap().insert(term.into(), latency);
    }

    /// Every query received, in order
    #[must_use]
    pub fn queries(&self) -> Vec<CatalogQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Number of queries received
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    fn matches(vehicle: &Vehicle, term: &str, status: Option<VehicleStatus>) -> bool {
        if status.is_some_and(|status| vehicle.status != status) {
            return false;
        }
        let term = term.trim().to_lowercase();
        term.is_empty()
            || vehicle.number.to_lowercase().contains(&term)
            || vehicle.kind.to_lowercase().contains(&term)
    }
}

impl VehicleCatalog for MockVehicleCatalog {
    fn search(
        &self,
        term: &str,
        status: Option<VehicleStatus>,
    ) -> BoxFuture<Result<Vec<Vehicle>, CatalogError>> {
        self.queries.lock().unwrap().push(CatalogQuery {
            term: term.to_string(),
            status,
        });

        let result = match self.failure.read().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(self
                .fleet
                .read()
                .unwrap()
                .iter()
                .filter(|vehicle| Self::matches(vehicle, term, status))
                .cloned()
                .collect()),
        };
        let latency = self.latency.read().unwrap().get(term).copied();

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            result
        })
    }
}

/// A recorded commit call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitCall {
    /// Create or update
    pub mode: CommitMode,
    /// Body that was sent
    pub payload: CommitPayload,
}

/// Scripted commit endpoint.
///
/// Answers with queued outcomes in order, then with an empty success.
/// After [`MockCommitGateway::hold`], calls wait until the returned
/// [`Notify`] is signalled.
#[derive(Clone, Debug, Default)]
pub struct MockCommitGateway {
    outcomes: Arc<Mutex<VecDeque<Result<CommitReceipt, CommitError>>>>,
    calls: Arc<Mutex<Vec<CommitCall>>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl MockCommitGateway {
    /// Creates a gateway that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful answer
    pub fn succeed_next(&self, message: Option<&str>) {
        self.outcomes.lock().unwrap().push_back(Ok(CommitReceipt {
            message: message.map(str::to_string),
        }));
    }

    /// Queues a failure
    pub fn fail_next(&self, error: CommitError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    /// Makes following calls wait until the returned handle is notified
    #[must_use]
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Every call received, in order
    #[must_use]
    pub fn calls(&self) -> Vec<CommitCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls received
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Body of the most recent call
    #[must_use]
    pub fn last_payload(&self) -> Option<CommitPayload> {
        self.calls.lock().unwrap().last().map(|call| call.payload.clone())
    }
}

impl CommitGateway for MockCommitGateway {
    fn commit(
        &self,
        mode: CommitMode,
        payload: CommitPayload,
    ) -> BoxFuture<Result<CommitReceipt, CommitError>> {
        self.calls.lock().unwrap().push(CommitCall { mode, payload });
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CommitReceipt::default()));
        let gate = self.gate.lock().unwrap().clone();

        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            outcome
        })
    }
}

/// Observer that records every close notification
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    closes: Arc<Mutex<Vec<bool>>>,
}

impl RecordingObserver {
    /// Creates an observer with no recorded notifications
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The `committed` flag of every notification, in order
    #[must_use]
    pub fn notifications(&self) -> Vec<bool> {
        self.closes.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn session_closed(&self, committed: bool) {
        self.closes.lock().unwrap().push(committed);
    }
}
