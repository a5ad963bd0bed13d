//! The Store - runtime coordinator for a reducer.
//!
//! The Store owns the reducer state behind an async `RwLock`. Every action is
//! reduced while holding the write lock, so reducer steps never interleave:
//! the lock is the single logical execution context the orchestrator relies
//! on. Effects run outside the lock in spawned tasks and feed their resulting
//! action back through [`Store::send`].

use odata_source_core::{effect::Effect, reducer::Reducer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Guard that decrements the pending effect counter on drop
///
/// Keeps the counter accurate even if an effect panics.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The Store - runtime coordinator for a reducer
///
/// # Example
///
/// ```ignore
/// let store = Store::new(OrchestratorState::new(projections), OrchestratorReducer::new(), env);
///
/// store.send(DataSourceAction::Triggered { pipeline: 1 }).await;
/// let generation = store.state(|s| s.generation()).await;
/// ```
pub struct Store<R: Reducer> {
    state: Arc<RwLock<R::State>>,
    reducer: Arc<R>,
    environment: Arc<R::Environment>,
    pending_effects: Arc<AtomicUsize>,
}

impl<R> Store<R>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Send + Sync + 'static,
    R::Action: Send + 'static,
    R::Environment: Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R, environment: R::Environment) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer: Arc::new(reducer),
            environment: Arc::new(environment),
            pending_effects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Send an action to the store
    ///
    /// 1. Acquires the write lock on state
    /// 2. Calls the reducer with (state, action, environment)
    /// 3. Releases the lock and starts the returned effects
    ///
    /// `send()` returns once effects have been started, not when they finish.
    /// Effects may complete in any order; the reducer decides what a late
    /// completion means.
    ///
    /// # Panics
    ///
    /// Spawning effects requires a Tokio runtime. If the reducer panics, the
    /// panic propagates to the caller.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: R::Action) {
        let effects = {
            let mut state = self.state.write().await;
            tracing::trace!("Acquired write lock on state");
            self.reducer.reduce(&mut state, action, &self.environment)
        };

        tracing::trace!("Reducer returned {} effects", effects.len());
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let generation = store.state(|s| s.generation()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Number of effects currently running
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending_effects.load(Ordering::SeqCst)
    }

    /// Execute one effect
    ///
    /// `Effect::Future` runs in a spawned task; a produced action is sent back
    /// to this store.
    fn execute_effect(&self, effect: Effect<R::Action>) {
        match effect {
            Effect::None => {
                tracing::trace!("Executing Effect::None (no-op)");
            },
            Effect::Future(fut) => {
                tracing::trace!("Executing Effect::Future");
                metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let guard = PendingGuard(Arc::clone(&self.pending_effects));
                let store = self.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    if let Some(action) = fut.await {
                        tracing::trace!("Effect::Future produced an action, sending to store");
                        store.send(action).await;
                    } else {
                        tracing::trace!("Effect::Future completed with no action");
                    }
                });
            },
        }
    }
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: Arc::clone(&self.reducer),
            environment: Arc::clone(&self.environment),
            pending_effects: Arc::clone(&self.pending_effects),
        }
    }
}
