//! The session state machine.
//!
//! A session is opened with the guests of one route, edited through
//! [`SessionAction`] commands, and confirmed or closed. [`SessionReducer`]
//! holds every transition rule; side effects (vehicle lookups, the commit
//! call, the close notification) are returned as effects.

mod reducer;
mod types;

pub use reducer::{SessionEnvironment, SessionReducer};
pub use types::{SessionAction, SessionPhase, SessionState};
