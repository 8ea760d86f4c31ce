//! Integration tests for Store action broadcasting and the middleware chain
//!
//! Tests the action observation features used to wait for request outcomes,
//! and checks that middleware stages are purely additive.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use tokenflow_core::middleware::{Handled, Middleware};
use tokenflow_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use tokenflow_runtime::{Store, StoreError};
use tokio::sync::Mutex;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TestAction {
    /// Start a multi-step fetch with correlation ID
    Fetch { id: u64 },
    /// Fetch step completed
    StepCompleted { id: u64, step: u32 },
    /// Fetch finished (terminal action)
    Fetched { id: u64 },
    /// Emitted by the audit middleware
    Audited { id: u64 },
    /// Simple increment command
    Increment,
    /// Incremented event
    Incremented { value: u32 },
}

#[derive(Debug, Clone, Default)]
struct TestState {
    counter: u32,
    steps: Vec<u32>,
    seen: Vec<TestAction>,
}

#[derive(Clone)]
struct TestEnvironment;

#[derive(Clone)]
struct TestReducer;

impl Reducer for TestReducer {
    type State = TestState;
    type Action = TestAction;
    type Environment = TestEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        state.seen.push(action.clone());

        match action {
            TestAction::Fetch { id } => smallvec![Effect::Future(Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Some(TestAction::StepCompleted { id, step: 1 })
            }))],

            TestAction::StepCompleted { id, step } => {
                state.steps.push(step);

                if step < 3 {
                    smallvec![Effect::Future(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Some(TestAction::StepCompleted { id, step: step + 1 })
                    }))]
                } else {
                    smallvec![Effect::Future(Box::pin(async move {
                        Some(TestAction::Fetched { id })
                    }))]
                }
            },

            TestAction::Increment => {
                state.counter += 1;
                let value = state.counter;
                smallvec![Effect::Future(Box::pin(async move {
                    Some(TestAction::Incremented { value })
                }))]
            },

            TestAction::Fetched { .. } | TestAction::Audited { .. } | TestAction::Incremented { .. } => {
                smallvec![Effect::None]
            },
        }
    }
}

/// Emits `Audited` for every `Fetch` it observes
struct AuditMiddleware;

impl Middleware for AuditMiddleware {
    type Action = TestAction;

    fn handle(&self, action: &TestAction) -> Handled<TestAction> {
        match action {
            TestAction::Fetch { id } => {
                let id = *id;
                Handled::none()
                    .with_effect(Effect::Future(Box::pin(async move { Some(TestAction::Audited { id }) })))
            },
            _ => Handled::none(),
        }
    }
}

fn store() -> Store<TestState, TestAction, TestEnvironment, TestReducer> {
    Store::new(TestState::default(), TestReducer, TestEnvironment)
}

// ============================================================================
// Tests
// ============================================================================

/// Verifies that we can send an action and wait for a terminal action
/// that is produced immediately.
#[tokio::test]
async fn test_send_and_wait_for_immediate() {
    let store = store();

    let result = store
        .send_and_wait_for(
            TestAction::Increment,
            |action| matches!(action, TestAction::Incremented { .. }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.unwrap(), TestAction::Incremented { value: 1 });
}

/// Verifies that we can wait for a terminal action from a multi-step flow
#[tokio::test]
async fn test_send_and_wait_for_multi_step() {
    let store = store();

    let result = store
        .send_and_wait_for(
            TestAction::Fetch { id: 42 },
            |action| matches!(action, TestAction::Fetched { id: 42 }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.unwrap(), TestAction::Fetched { id: 42 });
    assert_eq!(store.state(|s| s.steps.clone()).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_send_and_wait_for_timeout() {
    let store = store();

    let result = store
        .send_and_wait_for(
            TestAction::Fetch { id: 99 },
            |action| matches!(action, TestAction::Audited { id: 99 }),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result.unwrap_err(), StoreError::Timeout));
}

/// Verifies that predicates can filter actions by correlation ID, so
/// concurrent callers each receive their own terminal action.
#[tokio::test]
async fn test_correlation_id_filtering() {
    let store = Arc::new(store());

    let mut tasks = vec![];
    for id in 1..=5 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store
                .send_and_wait_for(
                    TestAction::Fetch { id },
                    move |action| matches!(action, TestAction::Fetched { id: done } if *done == id),
                    Duration::from_secs(2),
                )
                .await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let id = i as u64 + 1;
        let result = task.await.expect("Task panicked");
        assert_eq!(result.unwrap(), TestAction::Fetched { id });
    }

    assert_eq!(store.state(|s| s.steps.len()).await, 15);
}

/// Verifies that subscribers receive every effect-produced action in order
#[tokio::test]
async fn test_subscribe_actions_streaming() {
    let store = store();
    let mut rx = store.subscribe_actions();

    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = Arc::clone(&received);

    let collector = tokio::spawn(async move {
        // StepCompleted(1, 2, 3) then Fetched
        for _ in 0..4 {
            if let Ok(action) = rx.recv().await {
                received_clone.lock().await.push(action);
            }
        }
    });

    store.send(TestAction::Fetch { id: 100 }).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), collector).await.unwrap().unwrap();

    let actions = received.lock().await;
    assert_eq!(
        *actions,
        vec![
            TestAction::StepCompleted { id: 100, step: 1 },
            TestAction::StepCompleted { id: 100, step: 2 },
            TestAction::StepCompleted { id: 100, step: 3 },
            TestAction::Fetched { id: 100 },
        ]
    );
}

/// Verifies that slow subscribers skip old actions without blocking the store
#[tokio::test]
async fn test_lagging_subscriber() {
    let store = Store::with_broadcast_capacity(TestState::default(), TestReducer, TestEnvironment, 4);
    let mut rx = store.subscribe_actions();

    let mut handles = Vec::new();
    for _ in 0..20 {
        handles.push(store.send(TestAction::Increment).await.unwrap());
    }
    for mut handle in handles {
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
    }

    let mut received = 0;
    let mut lagged = false;
    loop {
        match rx.try_recv() {
            Ok(_) => received += 1,
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => lagged = true,
            Err(_) => break,
        }
    }

    assert!(lagged, "Expected subscriber to lag");
    assert!(received > 0 && received < 20);
    assert_eq!(store.state(|s| s.counter).await, 20);
}

// ============================================================================
// Middleware chain
// ============================================================================

/// The reducer sees the original action even when middleware reacts to it
#[tokio::test]
async fn test_middleware_is_additive() {
    let store = store().with_middleware(AuditMiddleware);

    let result = store
        .send_and_wait_for(
            TestAction::Fetch { id: 7 },
            |action| matches!(action, TestAction::Fetched { id: 7 }),
            Duration::from_secs(1),
        )
        .await;
    assert!(result.is_ok());

    let seen = store.state(|s| s.seen.clone()).await;
    assert_eq!(seen.first(), Some(&TestAction::Fetch { id: 7 }));
    assert_eq!(
        seen.iter().filter(|a| **a == TestAction::Fetch { id: 7 }).count(),
        1,
        "original action must reach the reducer exactly once"
    );
    assert!(seen.contains(&TestAction::Audited { id: 7 }));
}

/// Actions the middleware does not own pass through with no extra effects
#[tokio::test]
async fn test_middleware_ignores_unowned_actions() {
    let store = store().with_middleware(AuditMiddleware);
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(TestAction::Increment).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(rx.try_recv().unwrap(), TestAction::Incremented { value: 1 });
    assert!(rx.try_recv().is_err());
}

/// Every stage in the chain observes each action
#[tokio::test]
async fn test_multiple_middleware_stages() {
    let store = store().with_middleware(AuditMiddleware).with_middleware(AuditMiddleware);

    assert_eq!(
        store.health().metadata.iter().find(|(k, _)| k == "middleware").map(|(_, v)| v.as_str()),
        Some("2")
    );

    let mut handle = store.send(TestAction::Fetch { id: 3 }).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    let audited = store
        .state(|s| s.seen.iter().filter(|a| matches!(a, TestAction::Audited { id: 3 })).count())
        .await;
    assert_eq!(audited, 2);
}

#[tokio::test]
async fn test_shutdown_waits_for_pending_effects() {
    let store = store();

    store.send(TestAction::Fetch { id: 1 }).await.unwrap();
    store.shutdown(Duration::from_secs(2)).await.unwrap();

    assert!(matches!(
        store.send(TestAction::Increment).await,
        Err(StoreError::ShutdownInProgress)
    ));
}
