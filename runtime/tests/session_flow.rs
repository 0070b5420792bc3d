//! End-to-end session flows through the Store
//!
//! These drive real effects: mock catalog lookups, delayed searches, and
//! commit calls feed their results back into the session.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use allocation_core::commit::CommitMode;
use allocation_core::config::SessionConfig;
use allocation_core::error::{AllocationError, CommitError};
use allocation_core::session::{SessionAction, SessionPhase};
use allocation_core::types::{GroupId, GuestId, Location, VehicleId};
use allocation_runtime::{session_store, SessionStore, StoreError};
use allocation_testing::fixtures::{guests, open_action, vehicle};
use allocation_testing::helpers::init_tracing;
use allocation_testing::TestBackends;
use std::time::Duration;

const FIRST: GroupId = GroupId(1);
const WAIT: Duration = Duration::from_secs(2);

fn fleet() -> Vec<allocation_core::types::Vehicle> {
    vec![vehicle(1, 4), vehicle(2, 2), vehicle(3, 7)]
}

/// Opens a session with two guests seated in the first group
async fn ready_store(backends: &TestBackends) -> SessionStore {
    init_tracing();
    let store = session_store(backends.environment());
    store.send(open_action(guests(2), None)).await.unwrap();
    store
        .send(SessionAction::SelectVehicle {
            group_id: FIRST,
            vehicle: Some(vehicle(1, 4)),
        })
        .await
        .unwrap();
    for id in [1, 2] {
        store
            .send(SessionAction::MoveGuest {
                guest_id: GuestId::new(id),
                from: Location::Pool,
                to: Location::Group(FIRST),
                target_index: None,
            })
            .await
            .unwrap();
    }
    store
}

fn is_commit_outcome(action: &SessionAction) -> bool {
    matches!(
        action,
        SessionAction::CommitSucceeded { .. } | SessionAction::CommitFailed { .. }
    )
}

#[tokio::test]
async fn confirm_commits_and_reaches_terminal_phase() {
    let backends = TestBackends::new();
    backends.gateway.succeed_next(Some("Allocation saved"));
    let store = ready_store(&backends).await;

    let outcome = store
        .send_and_wait_for(SessionAction::Confirm, is_commit_outcome, WAIT)
        .await
        .unwrap();
    assert!(matches!(outcome, SessionAction::CommitSucceeded { .. }));

    // The broadcast precedes the feedback send; wait for the reducer to catch up
    tokio::time::sleep(Duration::from_millis(20)).await;
    let (phase, message) = store
        .state(|s| (s.phase, s.commit_message.clone()))
        .await;
    assert_eq!(phase, SessionPhase::Committed);
    assert_eq!(message.as_deref(), Some("Allocation saved"));

    let calls = backends.gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].mode, CommitMode::Create);
    assert_eq!(calls[0].payload.route_id.value(), 42);
    assert_eq!(calls[0].payload.allocations.len(), 1);
    assert_eq!(calls[0].payload.allocations[0].vehicle_id, VehicleId::new(1));
}

#[tokio::test]
async fn failed_commit_keeps_the_allocation_for_retry() {
    let backends = TestBackends::new();
    backends.gateway.fail_next(CommitError::Status {
        status: 500,
        message: None,
    });
    let store = ready_store(&backends).await;

    let mut handle = store.send(SessionAction::Confirm).await.unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();

    let (phase, seated, message) = store
        .state(|s| (s.phase, s.allocation.placed_guests(), s.error_message()))
        .await;
    assert_eq!(phase, SessionPhase::Editing);
    assert_eq!(seated, 2);
    assert_eq!(
        message.as_deref(),
        Some("Failed to save vehicle allocation. Please try again.")
    );

    let mut handle = store.send(SessionAction::Confirm).await.unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();

    assert_eq!(store.state(|s| s.phase).await, SessionPhase::Committed);
    assert_eq!(backends.gateway.call_count(), 2);
}

#[tokio::test]
async fn second_confirm_while_submitting_is_not_sent() {
    let backends = TestBackends::new();
    let gate = backends.gateway.hold();
    let store = ready_store(&backends).await;

    let mut first = store.send(SessionAction::Confirm).await.unwrap();
    let _ = store.send(SessionAction::Confirm).await.unwrap();
    let _ = store
        .send(SessionAction::RemoveGroup { group_id: FIRST })
        .await
        .unwrap();

    let (phase, feedback, groups) = store
        .state(|s| (s.phase, s.last_feedback.clone(), s.allocation.groups().len()))
        .await;
    assert_eq!(phase, SessionPhase::Submitting);
    assert_eq!(feedback, Some(AllocationError::SubmitInProgress));
    assert_eq!(groups, 1);

    gate.notify_one();
    first.wait_with_timeout(WAIT).await.unwrap();

    assert_eq!(backends.gateway.call_count(), 1);
    assert_eq!(store.state(|s| s.phase).await, SessionPhase::Committed);
}

#[tokio::test]
async fn result_for_an_abandoned_session_is_discarded() {
    let backends = TestBackends::new();
    let gate = backends.gateway.hold();
    let store = ready_store(&backends).await;

    let mut pending = store.send(SessionAction::Confirm).await.unwrap();
    store.send(open_action(guests(3), None)).await.unwrap();

    gate.notify_one();
    pending.wait_with_timeout(WAIT).await.unwrap();

    let (phase, pool, committed_at) = store
        .state(|s| (s.phase, s.allocation.pool().len(), s.committed_at))
        .await;
    assert_eq!(phase, SessionPhase::Editing);
    assert_eq!(pool, 3);
    assert!(committed_at.is_none());
}

#[tokio::test]
async fn latest_search_wins_over_a_slow_earlier_one() {
    init_tracing();
    let backends = TestBackends::new().with_fleet(fleet());
    backends.catalog.delay_term("van", Duration::from_millis(60));
    let store = session_store(backends.environment());
    store.send(open_action(guests(1), None)).await.unwrap();

    let mut slow = store
        .send(SessionAction::SearchVehicles {
            term: "van".to_string(),
            status: None,
        })
        .await
        .unwrap();
    let mut fast = store
        .send(SessionAction::SearchVehicles {
            term: "0003".to_string(),
            status: None,
        })
        .await
        .unwrap();
    fast.wait_with_timeout(WAIT).await.unwrap();
    slow.wait_with_timeout(WAIT).await.unwrap();

    let (term, ids, loading) = store
        .state(|s| {
            (
                s.search.term.clone(),
                s.search.results.iter().map(|v| v.id).collect::<Vec<_>>(),
                s.search.loading,
            )
        })
        .await;
    assert_eq!(term, "0003");
    assert_eq!(ids, vec![VehicleId::new(3)]);
    assert!(!loading);
    assert_eq!(backends.catalog.query_count(), 2);
}

#[tokio::test]
async fn debounced_searches_issue_one_query() {
    init_tracing();
    let backends = TestBackends::new()
        .with_fleet(fleet())
        .with_config(SessionConfig::default().with_search_debounce(Duration::from_millis(20)));
    let store = session_store(backends.environment());
    store.send(open_action(guests(1), None)).await.unwrap();

    let mut handles = Vec::new();
    for term in ["k", "ka", "ka-01-0002"] {
        handles.push(
            store
                .send(SessionAction::SearchVehicles {
                    term: term.to_string(),
                    status: None,
                })
                .await
                .unwrap(),
        );
    }
    for handle in &mut handles {
        handle.wait_with_timeout(WAIT).await.unwrap();
    }
    // Let the surviving lookup feed back
    tokio::time::sleep(Duration::from_millis(30)).await;

    let queries = backends.catalog.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].term, "ka-01-0002");
    let ids = store
        .state(|s| s.search.results.iter().map(|v| v.id).collect::<Vec<_>>())
        .await;
    assert_eq!(ids, vec![VehicleId::new(2)]);
}

#[tokio::test]
async fn close_notifies_the_observer_once() {
    let backends = TestBackends::new();
    let store = ready_store(&backends).await;

    let mut handle = store.send(SessionAction::Close).await.unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();
    let mut again = store.send(SessionAction::Close).await.unwrap();
    again.wait_with_timeout(WAIT).await.unwrap();

    assert_eq!(backends.observer.notifications(), vec![false]);
    assert!(store.state(|s| s.closed).await);
}

#[tokio::test]
async fn shutdown_waits_for_an_outstanding_commit() {
    let backends = TestBackends::new();
    let gate = backends.gateway.hold();
    let store = ready_store(&backends).await;

    let _ = store.send(SessionAction::Confirm).await.unwrap();
    assert_eq!(store.pending_effects(), 1);

    let timed_out = store.shutdown(Duration::from_millis(20)).await;
    assert!(matches!(timed_out, Err(StoreError::ShutdownTimeout(1))));

    gate.notify_one();
    assert!(store.shutdown(WAIT).await.is_ok());
    assert!(matches!(
        store.send(SessionAction::AddGroup).await,
        Err(StoreError::ShutdownInProgress)
    ));
}
