//! # Allocation Testing
//!
//! Testing utilities for the allocation engine.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - In-memory collaborators ([`mocks`]) and a fixed clock
//! - Builders for guests, vehicles, and environments ([`fixtures`])
//! - proptest strategies for session gestures ([`properties`])
//!
//! ## Example
//!
//! ```
//! use allocation_core::session::SessionAction;
//! use allocation_testing::{ReducerTest, TestBackends, assertions, fixtures};
//! use allocation_core::session::{SessionReducer, SessionState};
//!
//! ReducerTest::new(SessionReducer::new())
//!     .with_env(TestBackends::new().environment())
//!     .given_state(SessionState::new())
//!     .given_actions(vec![fixtures::open_action(fixtures::guests(5), None)])
//!     .when_action(SessionAction::AddGroup)
//!     .then_state(|state| {
//!         assert_eq!(state.allocation.groups().len(), 2);
//!         assert_eq!(state.allocation.pool().len(), 5);
//!     })
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```

pub mod fixtures;
pub mod mocks;
pub mod properties;

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Routes `tracing` output through the test writer.
    ///
    /// Honors `RUST_LOG`; safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use fixtures::TestBackends;
pub use mocks::{
    FixedClock, MockCommitGateway, MockVehicleCatalog, RecordingObserver, test_clock,
};
pub use reducer_test::{ReducerTest, assertions};
