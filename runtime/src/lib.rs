//! # Wayfarer Runtime
//!
//! Runtime implementation for the Wayfarer lifecycle architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Action Broadcast**: Lets observers wait for effect-produced actions
//!   (the basis of request/response patterns over a store)
//!
//! ## Example
//!
//! ```ignore
//! use wayfarer_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use wayfarer_core::effect::Effect;
use wayfarer_core::reducer::Reducer;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// An effect execution failed
        ///
        /// This error is logged but does not halt the store.
        #[error("Effect execution failed: {0}")]
        EffectFailed(String),

        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        ///
        /// The action broadcast channel was closed, typically because the
        /// store is shutting down.
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;
pub use store::Store;

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{Arc, AtomicBool, Effect, Ordering, Reducer, RwLock, StoreError};
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Every action is reduced under the state write lock, so all mutations
    /// of one store are serialized: of two racing commands, exactly one is
    /// applied first and the second observes the post-transition state.
    /// Reads through [`Store::state`] take the read lock and run
    /// concurrently.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        /// Action broadcast channel for observing actions produced by effects.
        ///
        /// All actions produced by effects (e.g., from `Effect::Future`) are
        /// broadcast to observers. This enables HTTP request-response
        /// patterns: a handler sends a command and waits for the matching
        /// reply action.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Creates a Store with the default action broadcast capacity of 16
        /// (increase with [`Store::with_broadcast_capacity`] when many
        /// observers subscribe).
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
        }

        /// Create a new Store with custom action broadcast capacity
        ///
        /// Use this constructor for high-throughput scenarios where slow
        /// observers would otherwise lag behind the broadcast channel.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                action_broadcast,
            }
        }

        /// Send an action through the reducer and execute its effects
        ///
        /// The reduce step runs synchronously under the state write lock
        /// before this method returns; effects are spawned onto the runtime
        /// and complete asynchronously.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownInProgress`]: the store no longer accepts
        ///   actions
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::SeqCst) {
                return Err(StoreError::ShutdownInProgress);
            }

            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, action, &self.environment)
            };

            for effect in effects {
                self.spawn_effect(effect);
            }

            Ok(())
        }

        /// Send an action and wait for a matching result action
        ///
        /// This method is designed for request-response patterns (HTTP, RPC).
        /// It subscribes to the action broadcast, sends the initial action,
        /// then waits for an action matching the predicate.
        ///
        /// Subscribing happens BEFORE sending, so a reply produced while the
        /// command is still being reduced cannot be missed. Only actions
        /// produced by effects are broadcast (not the initial action); use
        /// correlation ids to distinguish concurrent requests.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: timeout expired before a matching
        ///   action was received
        /// - [`StoreError::ChannelClosed`]: broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut receiver = self.action_broadcast.subscribe();

            self.send(action).await?;

            let wait = async {
                loop {
                    match receiver.recv().await {
                        Ok(candidate) if predicate(&candidate) => return Ok(candidate),
                        // Not the reply we are waiting for
                        Ok(_) => {},
                        // Dropped actions cannot match retroactively; keep
                        // waiting and let the timeout catch a lost reply
                        Err(broadcast::error::RecvError::Lagged(_)) => {},
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            };

            match tokio::time::timeout(timeout, wait).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout),
            }
        }

        /// Subscribe to actions produced by effects
        ///
        /// Returns a broadcast receiver observing every action that effects
        /// feed back into this store.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read a value derived from the current state
        ///
        /// Takes the read lock; concurrent reads proceed in parallel and
        /// only block while a reduce step holds the write lock.
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Stop accepting actions
        ///
        /// In-flight effects finish on the runtime; subsequent `send` calls
        /// fail with [`StoreError::ShutdownInProgress`].
        pub fn shutdown(&self) {
            self.shutdown.store(true, Ordering::SeqCst);
        }

        /// Feed an effect-produced action back through the reducer
        ///
        /// The action is broadcast to observers first, then reduced; effects
        /// it produces are executed the same way (the feedback loop).
        async fn feedback(&self, action: A) {
            // Send errors only mean there are currently no subscribers
            let _ = self.action_broadcast.send(action.clone());

            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }

            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, action, &self.environment)
            };

            for effect in effects {
                self.spawn_effect(effect);
            }
        }

        /// Spawn an effect onto the runtime
        fn spawn_effect(&self, effect: Effect<A>) {
            if matches!(effect, Effect::None) {
                return;
            }
            let store = self.clone();
            tokio::spawn(async move {
                store.execute_effect(effect).await;
            });
        }

        /// Execute a single effect, recursing into composite effects
        fn execute_effect(
            &self,
            effect: Effect<A>,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
            Box::pin(async move {
                match effect {
                    Effect::None => {},
                    Effect::Parallel(effects) => {
                        futures::future::join_all(effects.into_iter().map(|inner| {
                            let store = self.clone();
                            async move { store.execute_effect(inner).await }
                        }))
                        .await;
                    },
                    Effect::Sequential(effects) => {
                        for inner in effects {
                            self.execute_effect(inner).await;
                        }
                    },
                    Effect::Delay { duration, action } => {
                        tokio::time::sleep(duration).await;
                        self.feedback(*action).await;
                    },
                    Effect::Future(future) => {
                        if let Some(action) = future.await {
                            self.feedback(action).await;
                        }
                    },
                }
            })
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}
