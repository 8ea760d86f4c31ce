//! # Tokenflow Core
//!
//! Core traits and types for the Tokenflow dispatch pipeline.
//!
//! Every state change in an application built on Tokenflow is an *action* that
//! travels through a unidirectional pipeline:
//!
//! ```text
//! send(action) → Middleware* → Reducer → Effects → more actions → send(...)
//! ```
//!
//! ## Core Concepts
//!
//! - **Action**: A value describing something that happened or should happen
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Middleware**: A stage that observes every action before the reducer and
//!   may contribute additional effects (it never swallows or rewrites the action)
//! - **Effect**: Side effect descriptions (not execution)
//!
//! ## Example
//!
//! ```ignore
//! use tokenflow_core::*;
//!
//! impl Reducer for ProfileReducer {
//!     type State = ProfileState;
//!     type Action = ProfileAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ProfileState,
//!         action: ProfileAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<ProfileAction>; 4]> {
//!         match action {
//!             ProfileAction::Loaded(user) => state.user = Some(user),
//!             _ => {}
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use futures::Stream;
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future that may produce a single action
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Boxed stream of actions
    pub type EffectStream<Action> = Pin<Box<dyn Stream<Item = Action> + Send>>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and middleware and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the pipeline
        Future(EffectFuture<Action>),

        /// Ordered sequence of actions produced over time
        ///
        /// Each item is fed back into the pipeline, and fully processed, before the
        /// next item is polled.
        Stream(EffectStream<Action>),
    }

    // Manual Debug implementation since Future and Stream don't implement Debug
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
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Stream(_) => write!(f, "Effect::Stream(<stream>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
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

/// Middleware module - pipeline stages that run ahead of the reducer
///
/// A middleware sees every action sent to a Store, by reference, before the
/// reducer does. It can perform immediate side effects, dispatch actions that
/// must be reduced before the one it is looking at, and describe additional
/// asynchronous work as effects. It has no way to suppress or alter the action
/// itself: the Store always forwards the original action unchanged.
pub mod middleware {
    use super::SmallVec;
    use super::effect::Effect;

    /// What a middleware contributes for one action
    ///
    /// - `actions` are dispatched synchronously, in order, and fully reduced
    ///   before the action that produced them
    /// - `effects` are executed by the runtime once the action has reached
    ///   the reducer
    #[derive(Debug)]
    pub struct Handled<Action> {
        /// Actions dispatched ahead of the handled action
        pub actions: SmallVec<[Action; 1]>,
        /// Asynchronous work started after the handled action is reduced
        pub effects: SmallVec<[Effect<Action>; 4]>,
    }

    impl<Action> Handled<Action> {
        /// Nothing to add
        #[must_use]
        pub fn none() -> Self {
            Self {
                actions: SmallVec::new(),
                effects: SmallVec::new(),
            }
        }

        /// Dispatch `action` before the handled one
        #[must_use]
        pub fn dispatch(mut self, action: Action) -> Self {
            self.actions.push(action);
            self
        }

        /// Run `effect` after the handled action is reduced
        #[must_use]
        pub fn with_effect(mut self, effect: Effect<Action>) -> Self {
            self.effects.push(effect);
            self
        }

        /// Whether neither actions nor effects were contributed
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.actions.is_empty() && self.effects.is_empty()
        }
    }

    impl<Action> Default for Handled<Action> {
        fn default() -> Self {
            Self::none()
        }
    }

    /// A stage in the dispatch pipeline
    ///
    /// # Example
    ///
    /// ```ignore
    /// struct AuditMiddleware;
    ///
    /// impl Middleware for AuditMiddleware {
    ///     type Action = AppAction;
    ///
    ///     fn handle(&self, action: &AppAction) -> Handled<AppAction> {
    ///         tracing::info!(?action, "dispatched");
    ///         Handled::none()
    ///     }
    /// }
    /// ```
    pub trait Middleware: Send + Sync {
        /// The action type flowing through the pipeline
        type Action;

        /// Inspect an action on its way to the reducer
        ///
        /// Dispatched actions re-enter the pipeline from the first stage and
        /// are reduced before `action`. Effects run once `action` has reached
        /// the reducer; actions they produce also re-enter from the first
        /// stage. A stage must not dispatch, for the actions it dispatches,
        /// further actions without end.
        fn handle(&self, action: &Self::Action) -> Handled<Self::Action>;
    }
}
