use super::types::{SessionAction, SessionPhase, SessionState};
use crate::allocation::AllocationState;
use crate::commit::{self, CommitMode, CommitService, PayloadError};
use crate::config::SessionConfig;
use crate::effect::Effect;
use crate::environment::{Clock, SessionObserver, VehicleCatalog};
use crate::error::{AllocationError, CommitError, SessionError};
use crate::invariants;
use crate::reducer::Reducer;
use crate::types::{ExistingSchedule, Guest, SessionId};
use crate::validation::Reason;
use crate::{SmallVec, async_effect, delay, smallvec};
use std::sync::Arc;

/// Dependencies of a session
#[derive(Clone)]
pub struct SessionEnvironment {
    /// Timestamps for commits
    pub clock: Arc<dyn Clock>,
    /// Vehicle lookup
    pub catalog: Arc<dyn VehicleCatalog>,
    /// Single-flight commit wrapper
    pub commit: CommitService,
    /// Receives the close notification
    pub observer: Arc<dyn SessionObserver>,
    /// Tunables
    pub config: SessionConfig,
}

impl SessionEnvironment {
    /// Creates a session environment
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        catalog: Arc<dyn VehicleCatalog>,
        commit: CommitService,
        observer: Arc<dyn SessionObserver>,
        config: SessionConfig,
    ) -> Self {
        Self {
            clock,
            catalog,
            commit,
            observer,
            config,
        }
    }
}

/// Reducer implementing the session state machine
///
/// Gestures go through the Allocation Store and the Reconciler; a rejected
/// gesture leaves the allocation untouched and is recorded in
/// [`SessionState::last_feedback`]. `Confirm` runs readiness, builds the
/// payload, and hands it to the commit service as an effect.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionReducer;

impl SessionReducer {
    /// Creates a new session reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn open(
        state: &mut SessionState,
        session_id: SessionId,
        guests: Vec<Guest>,
        existing_schedules: Option<Vec<ExistingSchedule>>,
        route_token: String,
    ) {
        if let Some(previous) = state.session_id {
            if !state.closed {
                tracing::info!(%previous, "Abandoning open session");
            }
        }

        let mode = if existing_schedules
            .as_ref()
            .is_some_and(|schedules| !schedules.is_empty())
        {
            CommitMode::Update
        } else {
            CommitMode::Create
        };

        let mut search = std::mem::take(&mut state.search);
        search.reset();
        let epoch = state.epoch.wrapping_add(1);

        *state = SessionState {
            session_id: Some(session_id),
            epoch,
            phase: SessionPhase::Editing,
            mode,
            route_token,
            allocation: AllocationState::initialize(guests, existing_schedules),
            search,
            ..SessionState::default()
        };

        invariants::assert_consistent(&state.allocation, "Open");
        tracing::info!(%session_id, epoch, ?mode, "Session opened");
    }

    /// Whether the session accepts a mutating gesture right now
    fn accepts_mutation(state: &mut SessionState, action: &'static str) -> bool {
        if state.closed {
            tracing::debug!(action, "Ignoring action on closed session");
            return false;
        }

        match state.phase {
            SessionPhase::Editing | SessionPhase::Validating => true,
            SessionPhase::Initializing => {
                tracing::warn!(action, "Ignoring action before the session was opened");
                false
            },
            SessionPhase::Committed => {
                tracing::debug!(action, "Ignoring action on committed session");
                false
            },
            SessionPhase::Submitting => {
                tracing::warn!(action, "Rejected: allocation is frozen while submitting");
                state.last_feedback = Some(AllocationError::SubmitInProgress);
                false
            },
        }
    }

    fn mutate<F>(state: &mut SessionState, action: &'static str, operation: F)
    where
        F: FnOnce(&mut SessionState) -> Result<(), AllocationError>,
    {
        if !Self::accepts_mutation(state, action) {
            return;
        }

        match operation(state) {
            Ok(()) => {
                state.last_feedback = None;
                if !state.blocking_reasons.is_empty() {
                    state.blocking_reasons = state.readiness().reasons;
                }
                invariants::assert_consistent(&state.allocation, action);
            },
            Err(error) => {
                tracing::warn!(action, %error, "Operation rejected");
                state.last_feedback = Some(error);
            },
        }
    }

    const fn is_live(state: &SessionState) -> bool {
        state.session_id.is_some() && !state.closed
    }

    fn lookup(state: &SessionState, env: &SessionEnvironment, seq: u64) -> Effect<SessionAction> {
        let catalog = Arc::clone(&env.catalog);
        let term = state.search.term.clone();
        let status = state.search.status;

        async_effect! {
            let result = catalog.search(&term, status).await;
            Some(SessionAction::VehiclesLoaded { seq, result })
        }
    }

    fn confirm(state: &mut SessionState, env: &SessionEnvironment) -> SmallVec<[Effect<SessionAction>; 4]> {
        if state.closed {
            tracing::debug!("Ignoring confirm on closed session");
            return smallvec![Effect::None];
        }
        let Some(session_id) = state.session_id else {
            tracing::warn!("Ignoring confirm before the session was opened");
            return smallvec![Effect::None];
        };
        match state.phase {
            SessionPhase::Editing => {},
            SessionPhase::Submitting => {
                tracing::warn!(%session_id, "Rejected confirm: a submit is already in progress");
                state.last_feedback = Some(AllocationError::SubmitInProgress);
                return smallvec![Effect::None];
            },
            SessionPhase::Initializing | SessionPhase::Validating | SessionPhase::Committed => {
                tracing::debug!(phase = %state.phase, "Ignoring confirm");
                return smallvec![Effect::None];
            },
        }

        state.phase = SessionPhase::Validating;
        let readiness = state.readiness();
        if !readiness.ok {
            tracing::info!(%session_id, reasons = ?readiness.reasons, "Confirm blocked");
            state.blocking_reasons = readiness.reasons;
            state.phase = SessionPhase::Editing;
            return smallvec![Effect::None];
        }
        state.blocking_reasons.clear();

        let payload = match commit::build_payload(
            &state.allocation,
            &state.route_token,
            &state.remarks,
            &env.config.default_remark,
        ) {
            Ok(payload) => payload,
            Err(PayloadError::Decode(error)) => {
                tracing::warn!(%session_id, %error, "Route token rejected, nothing sent");
                state.last_error = Some(SessionError::Decode(error));
                state.phase = SessionPhase::Editing;
                return smallvec![Effect::None];
            },
            Err(PayloadError::GroupMissingVehicle(group_id)) => {
                tracing::error!(%session_id, %group_id, "Ready allocation has a group without vehicle");
                state.blocking_reasons = vec![Reason::GroupMissingVehicle(group_id)];
                state.phase = SessionPhase::Editing;
                return smallvec![Effect::None];
            },
        };

        state.last_error = None;
        state.last_feedback = None;
        state.phase = SessionPhase::Submitting;

        let service = env.commit.clone();
        let mode = state.mode;
        let epoch = state.epoch;
        smallvec![async_effect! {
            match service.submit(mode, payload).await {
                Ok(receipt) => Some(SessionAction::CommitSucceeded {
                    session_id,
                    epoch,
                    message: receipt.message,
                }),
                Err(error) => Some(SessionAction::CommitFailed {
                    session_id,
                    epoch,
                    error,
                }),
            }
        }]
    }

    /// Whether a commit result belongs to the submit this session is waiting on
    ///
    /// Session ids come from the caller and may be reused, so the epoch
    /// decides.
    fn awaits_commit(state: &SessionState, session_id: SessionId, epoch: u64) -> bool {
        if state.session_id != Some(session_id) || state.epoch != epoch {
            tracing::warn!(%session_id, epoch, "Discarding commit result from an abandoned session");
            return false;
        }
        if state.closed {
            tracing::info!(%session_id, "Commit finished after the session was closed");
            return false;
        }
        if state.phase != SessionPhase::Submitting {
            tracing::warn!(%session_id, phase = %state.phase, "Unexpected commit result");
            return false;
        }
        true
    }

    fn commit_failed(state: &mut SessionState, error: CommitError) {
        tracing::warn!(%error, "Commit failed, allocation kept for retry");
        state.phase = SessionPhase::Editing;
        state.last_error = Some(SessionError::Commit(error));
    }
}

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            SessionAction::Open {
                session_id,
                guests,
                existing_schedules,
                route_token,
            } => {
                Self::open(state, session_id, guests, existing_schedules, route_token);
                smallvec![Effect::None]
            },

            SessionAction::AddGroup => {
                Self::mutate(state, "AddGroup", |state| {
                    let group_id = state.allocation.add_group();
                    tracing::debug!(%group_id, "Group added");
                    Ok(())
                });
                smallvec![Effect::None]
            },

            SessionAction::RemoveGroup { group_id } => {
                Self::mutate(state, "RemoveGroup", |state| {
                    let removed = state.allocation.remove_group(group_id)?;
                    tracing::debug!(%group_id, returned = removed.len(), "Group removed");
                    Ok(())
                });
                smallvec![Effect::None]
            },

            SessionAction::SelectVehicle { group_id, vehicle } => {
                Self::mutate(state, "SelectVehicle", |state| {
                    state.allocation.select_vehicle(group_id, vehicle)
                });
                smallvec![Effect::None]
            },

            SessionAction::MoveGuest {
                guest_id,
                from,
                to,
                target_index,
            } => {
                Self::mutate(state, "MoveGuest", |state| {
                    state
                        .allocation
                        .move_guest(guest_id, from, to, target_index)
                        .map(|_| ())
                });
                smallvec![Effect::None]
            },

            SessionAction::SetRemarks { remarks } => {
                Self::mutate(state, "SetRemarks", |state| {
                    state.remarks = remarks;
                    Ok(())
                });
                smallvec![Effect::None]
            },

            SessionAction::SearchVehicles { term, status } => {
                if !Self::is_live(state) {
                    tracing::debug!("Ignoring vehicle search outside an open session");
                    return smallvec![Effect::None];
                }

                let status = status.or(env.config.default_status_filter);
                let seq = state.search.issue(term, status);

                if env.config.search_debounce.is_zero() {
                    smallvec![Self::lookup(state, env, seq)]
                } else {
                    smallvec![delay! {
                        duration: env.config.search_debounce,
                        action: SessionAction::RunSearch { seq }
                    }]
                }
            },

            SessionAction::RunSearch { seq } => {
                if !Self::is_live(state) || !state.search.is_latest(seq) {
                    tracing::debug!(seq, "Skipping superseded vehicle search");
                    return smallvec![Effect::None];
                }
                smallvec![Self::lookup(state, env, seq)]
            },

            SessionAction::Confirm => Self::confirm(state, env),

            SessionAction::Close => {
                if state.closed {
                    tracing::debug!("Session already closed");
                    return smallvec![Effect::None];
                }

                state.closed = true;
                let committed = state.is_committed();
                if state.is_busy() {
                    tracing::info!("Session closed while a commit is in flight");
                }
                tracing::info!(session_id = ?state.session_id, committed, "Session closed");

                let observer = Arc::clone(&env.observer);
                smallvec![async_effect! {
                    observer.session_closed(committed);
                    None
                }]
            },

            // ========== Events ==========
            SessionAction::VehiclesLoaded { seq, result } => {
                if Self::is_live(state) {
                    state.search.apply(seq, result);
                }
                smallvec![Effect::None]
            },

            SessionAction::CommitSucceeded {
                session_id,
                epoch,
                message,
            } => {
                if Self::awaits_commit(state, session_id, epoch) {
                    state.phase = SessionPhase::Committed;
                    state.committed_at = Some(env.clock.now());
                    state.commit_message = message;
                    tracing::info!(%session_id, "Allocation committed");
                }
                smallvec![Effect::None]
            },

            SessionAction::CommitFailed {
                session_id,
                epoch,
                error,
            } => {
                if Self::awaits_commit(state, session_id, epoch) {
                    Self::commit_failed(state, error);
                }
                smallvec![Effect::None]
            },
        }
    }
}
