//! # Allocation Core
//!
//! Headless engine for partitioning a fixed set of guests into transport
//! groups, each bound to one vehicle with a finite seat capacity.
//!
//! The engine is a reducer: every user gesture (drag a guest, pick a
//! vehicle, confirm) is an action, and the reducer turns it into a state
//! change plus a list of effect descriptions. The runtime crate executes
//! those effects and feeds their results back in as actions.
//!
//! ## Building Blocks
//!
//! - **Allocation Store** ([`allocation`]): the pool and the groups, with
//!   group and vehicle operations
//! - **Reconciler** ([`reconcile`]): `move_guest`, the single placement primitive
//! - **Validation Engine** ([`validation`]): pure capacity and readiness checks
//! - **Commit Service** ([`commit`]): payload building, route token decoding,
//!   and the single-flight submit guard
//! - **Session** ([`session`]): the state machine gluing it all together
//!
//! ## Example
//!
//! ```
//! use allocation_core::allocation::AllocationState;
//! use allocation_core::types::{Capacity, Guest, GuestId, Location, Vehicle, VehicleId};
//! use allocation_core::validation::readiness;
//!
//! let guests = vec![Guest::new(GuestId::new(1), "Asha"), Guest::new(GuestId::new(2), "Ben")];
//! let mut state = AllocationState::initialize(guests, None);
//! let group = state.groups()[0].id;
//!
//! let van = Vehicle::new(VehicleId::new(10), "KA-01", Capacity::new(4));
//! assert!(state.select_vehicle(group, Some(van)).is_ok());
//!
//! for id in [1, 2] {
//!     let moved = state.move_guest(GuestId::new(id), Location::Pool, Location::Group(group), None);
//!     assert!(moved.is_ok());
//! }
//!
//! assert!(readiness(&state).ok);
//! ```

// Re-export commonly used types
pub use smallvec::{smallvec, SmallVec};

pub mod allocation;
pub mod commit;
pub mod config;
pub mod environment;
pub mod error;
pub mod invariants;
pub mod reconcile;
pub mod search;
pub mod session;
pub mod types;
pub mod validation;

mod effect_macros;

/// Reducer module - the core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They validate the action, update state in place, and describe any I/O as
/// effects instead of performing it.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for SessionReducer {
    ///     type State = SessionState;
    ///     type Action = SessionAction;
    ///     type Environment = SessionEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut SessionState,
    ///         action: SessionAction,
    ///         env: &SessionEnvironment,
    ///     ) -> SmallVec<[Effect<SessionAction>; 4]> {
    ///         match action {
    ///             SessionAction::AddGroup => {
    ///                 state.allocation.add_group();
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Must not perform I/O. Anything asynchronous is returned as an
        /// [`Effect`] for the runtime to execute.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values returned by reducers. The runtime executes them and
/// feeds any resulting action back into the reducer.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Dispatch an action after a delay (debounce, timeouts)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after the delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if `Some`, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run concurrently
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Returns `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}
