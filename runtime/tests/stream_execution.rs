//! Integration tests for `Effect::Stream` execution in the Store runtime
//!
//! Streams model multi-step async work (start, progress, outcome). Each item
//! must be fed back through the pipeline, in order, before the next is polled.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::stream;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokenflow_core::middleware::{Handled, Middleware};
use tokenflow_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use tokenflow_runtime::Store;

#[derive(Clone, Debug, Default, PartialEq)]
struct StreamState {
    items_received: Vec<String>,
    completed: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum StreamAction {
    StartStream { items: Vec<String> },
    StartSlowStream { items: Vec<String> },
    StreamItem { text: String },
    StreamComplete,
}

#[derive(Clone)]
struct StreamReducer;

impl Reducer for StreamReducer {
    type State = StreamState;
    type Action = StreamAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            StreamAction::StartStream { items } => {
                smallvec![Effect::Stream(Box::pin(stream::iter(
                    items
                        .into_iter()
                        .map(|text| StreamAction::StreamItem { text })
                        .chain(std::iter::once(StreamAction::StreamComplete)),
                )))]
            },
            StreamAction::StartSlowStream { items } => {
                smallvec![Effect::Stream(Box::pin(delayed_stream(items)))]
            },
            StreamAction::StreamItem { text } => {
                state.items_received.push(text);
                smallvec![Effect::None]
            },
            StreamAction::StreamComplete => {
                state.completed = true;
                smallvec![Effect::None]
            },
        }
    }
}

/// A stream whose items arrive with a delay in between
fn delayed_stream(items: Vec<String>) -> impl futures::Stream<Item = StreamAction> + Send {
    stream::unfold(items.into_iter(), |mut rest| async move {
        let text = rest.next()?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        Some((StreamAction::StreamItem { text }, rest))
    })
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_stream_basic_execution() {
    let store = Store::new(StreamState::default(), StreamReducer, ());

    let mut handle = store
        .send(StreamAction::StartStream { items: texts(&["item1", "item2", "item3"]) })
        .await
        .unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    let state = store.state(Clone::clone).await;
    assert_eq!(state.items_received, texts(&["item1", "item2", "item3"]));
    assert!(state.completed);
}

#[tokio::test]
async fn test_stream_empty() {
    let store = Store::new(StreamState::default(), StreamReducer, ());

    let mut handle = store.send(StreamAction::StartStream { items: vec![] }).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    let state = store.state(Clone::clone).await;
    assert!(state.items_received.is_empty());
    assert!(state.completed);
}

#[tokio::test]
async fn test_stream_with_delays_keeps_arrival_order() {
    let store = Store::new(StreamState::default(), StreamReducer, ());

    let items: Vec<String> = (0..20).map(|i| format!("chunk-{i}")).collect();
    let mut handle = store
        .send(StreamAction::StartSlowStream { items: items.clone() })
        .await
        .unwrap();
    handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

    assert_eq!(store.state(|s| s.items_received.clone()).await, items);
}

#[tokio::test]
async fn test_stream_items_are_broadcast() {
    let store = Store::new(StreamState::default(), StreamReducer, ());
    let mut rx = store.subscribe_actions();

    let mut handle = store
        .send(StreamAction::StartStream { items: texts(&["a", "b"]) })
        .await
        .unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    let mut observed = Vec::new();
    while let Ok(action) = rx.try_recv() {
        observed.push(action);
    }

    assert_eq!(
        observed,
        vec![
            StreamAction::StreamItem { text: "a".into() },
            StreamAction::StreamItem { text: "b".into() },
            StreamAction::StreamComplete,
        ]
    );
}

/// Logs when a stream item reaches the pipeline, so ordering can be checked
/// against work the stream does between items.
struct ArrivalLog {
    log: Arc<Mutex<Vec<String>>>,
}

impl Middleware for ArrivalLog {
    type Action = StreamAction;

    fn handle(&self, action: &StreamAction) -> Handled<StreamAction> {
        if let StreamAction::StreamItem { text } = action {
            self.log.lock().unwrap().push(format!("dispatched {text}"));
        }
        Handled::none()
    }
}

#[tokio::test]
async fn test_next_item_not_polled_until_previous_processed() {
    let log = Arc::new(Mutex::new(Vec::new()));

    #[derive(Clone)]
    struct LoggingReducer {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Reducer for LoggingReducer {
        type State = StreamState;
        type Action = StreamAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            if let StreamAction::StartStream { items } = action {
                let log = Arc::clone(&self.log);
                let produced = logged_stream(items, log);
                return smallvec![Effect::Stream(Box::pin(produced))];
            }
            StreamReducer.reduce(state, action, env)
        }
    }

    fn logged_stream(
        items: Vec<String>,
        log: Arc<Mutex<Vec<String>>>,
    ) -> impl futures::Stream<Item = StreamAction> + Send {
        stream::unfold(items.into_iter(), move |mut rest| {
            let log = Arc::clone(&log);
            async move {
                let text = rest.next()?;
                log.lock().unwrap().push(format!("polled {text}"));
                Some((StreamAction::StreamItem { text }, rest))
            }
        })
    }

    let store = Store::new(
        StreamState::default(),
        LoggingReducer { log: Arc::clone(&log) },
        (),
    )
    .with_middleware(ArrivalLog { log: Arc::clone(&log) });

    let mut handle = store
        .send(StreamAction::StartStream { items: texts(&["1", "2"]) })
        .await
        .unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["polled 1", "dispatched 1", "polled 2", "dispatched 2"]
    );
}
