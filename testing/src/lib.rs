//! # Tokenflow Testing
//!
//! Testing utilities and helpers for the Tokenflow dispatch pipeline.
//!
//! This crate provides:
//! - [`ReducerTest`], a Given-When-Then helper for reducers
//! - Assertion helpers for effect lists
//! - [`run_effects`] and [`run_handled`], which drive effect values without a
//!   Store so that middleware can be tested in isolation
//!
//! ## Example
//!
//! ```ignore
//! use tokenflow_testing::run_handled;
//!
//! #[tokio::test]
//! async fn emits_start_then_success() {
//!     let handled = interceptor.handle(&AppAction::from(authenticated_request(payload)));
//!     let actions = run_handled(handled).await;
//!     assert_eq!(actions, vec![AppAction::Started, AppAction::Loaded(user)]);
//! }
//! ```

use futures::StreamExt;
use futures::future::BoxFuture;
use tokenflow_core::effect::Effect;
use tokenflow_core::middleware::Handled;


pub use reducer_test::{ReducerTest, assertions};

/// Drive effects to completion and collect the actions they produce
///
/// Effects run one after another in list order; `Parallel` children also run
/// in order, and stream items are collected as they arrive. Produced actions
/// are only collected, never fed back: this observes what a middleware or
/// reducer asks the runtime to do, nothing more.
pub async fn run_effects<A, I>(effects: I) -> Vec<A>
where
    A: Send + 'static,
    I: IntoIterator<Item = Effect<A>>,
{
    let mut actions = Vec::new();
    for effect in effects {
        collect_effect(effect, &mut actions).await;
    }
    actions
}

/// Collect what a middleware contributed for one action
///
/// Actions dispatched ahead come first, in order, followed by everything the
/// effects produce as collected by [`run_effects`].
pub async fn run_handled<A>(handled: Handled<A>) -> Vec<A>
where
    A: Send + 'static,
{
    let mut actions = handled.actions.into_vec();
    actions.extend(run_effects(handled.effects).await);
    actions
}

fn collect_effect<A>(effect: Effect<A>, actions: &mut Vec<A>) -> BoxFuture<'_, ()>
where
    A: Send + 'static,
{
    Box::pin(async move {
        match effect {
            Effect::None => {},
            Effect::Future(fut) => {
                if let Some(action) = fut.await {
                    actions.push(action);
                }
            },
            Effect::Stream(mut stream) => {
                while let Some(action) = stream.next().await {
                    actions.push(action);
                }
            },
            Effect::Parallel(children) => {
                for child in children {
                    collect_effect(child, actions).await;
                }
            },
        }
    })
}
