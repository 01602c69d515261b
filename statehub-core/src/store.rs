//! Centralized state store with serialized reducer application

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::cache::StateCache;
use crate::engine::{Counters, Engine, StateEq};
use crate::error::{ReducerError, StoreError};
use crate::fault::{FaultSink, FnFaultSink, TracingFaultSink};
use crate::hub::{BroadcastHub, Subscription, SubscriptionHandle};
use crate::middleware::{ComposedMiddleware, Middleware};
use crate::reducer::Reducer;
use crate::Action;

const DEFAULT_STORE_NAME: &str = "store";

/// Settings a store was built with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name recorded on the store's tracing span
    pub name: String,
    /// Whether commits equal to the current state are suppressed
    pub distinct: bool,
    /// Number of middleware wrapped around the reducer
    pub middleware: usize,
}

/// Point-in-time counters for a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Actions admitted to the queue
    pub dispatched: u64,
    /// Reductions that produced a committed state
    pub committed: u64,
    /// Reductions that failed (state left unchanged)
    pub failed: u64,
    /// Reductions whose result equalled the current state and was not
    /// committed (only with `distinct_until_changed`)
    pub suppressed: u64,
    /// Actions dispatched after shutdown and never admitted
    pub discarded: u64,
}

impl StoreStats {
    /// Admitted actions the engine has finished with
    pub fn processed(&self) -> u64 {
        self.committed + self.failed + self.suppressed
    }

    /// Whether every admitted action has been processed
    pub fn is_idle(&self) -> bool {
        self.processed() >= self.dispatched
    }
}

/// Single-writer, multi-reader state store
///
/// Any number of threads may [`dispatch`](Store::dispatch) actions. A single
/// worker task applies the reducer to them one at a time, in the order they
/// were queued, and publishes each resulting state. Readers either take a
/// snapshot with [`current_state`](Store::current_state) or
/// [`subscribe`](Store::subscribe) to a stream of states.
///
/// `Store` is a cheap handle; clones share the same store. The worker exits
/// on [`shutdown`](Store::shutdown) or once every handle has been dropped,
/// after reducing everything already queued.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// enum Counter {
///     Add(i64),
/// }
///
/// let store = Store::new(
///     0_i64,
///     reducer::from_fn(|action: &Counter, state: &i64| match action {
///         Counter::Add(n) => state + n,
///     }),
/// )?;
///
/// let mut updates = store.subscribe()?;
/// store.dispatch(Counter::Add(2));
///
/// assert_eq!(*updates.recv().await.unwrap(), 0); // replayed
/// assert_eq!(*updates.recv().await.unwrap(), 2);
/// ```
pub struct Store<S, A> {
    inner: Arc<Inner<S, A>>,
}

struct Inner<S, A> {
    config: StoreConfig,
    cache: Arc<StateCache<S>>,
    hub: Arc<BroadcastHub>,
    actions: mpsc::UnboundedSender<A>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
    counters: Arc<Counters>,
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.inner.config)
            .field("subscribers", &self.inner.hub.len())
            .field("shut_down", &self.inner.shutdown.is_cancelled())
            .field("stopped", &self.inner.hub.is_closed())
            .finish()
    }
}

impl<S, A> Store<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    /// Create a store with an initial state and a reducer
    ///
    /// Must be called from within a tokio runtime; the worker task is
    /// spawned on it.
    pub fn new(initial: S, reducer: Reducer<S, A>) -> Result<Self, StoreError> {
        Self::builder(initial).reducer(reducer).build()
    }

    /// Create a store whose reducer is wrapped by `middleware`
    pub fn with_middleware<M>(
        initial: S,
        reducer: Reducer<S, A>,
        middleware: M,
    ) -> Result<Self, StoreError>
    where
        M: Middleware<S, A>,
    {
        Self::builder(initial)
            .reducer(reducer)
            .middleware(middleware)
            .build()
    }

    /// Start configuring a store
    pub fn builder(initial: S) -> StoreBuilder<S, A> {
        StoreBuilder::new(initial)
    }

    /// Queue an action for reduction
    ///
    /// Returns immediately; the action is reduced later on the store's
    /// worker. Never fails: reduction errors go to the fault sink, and an
    /// action dispatched after shutdown is discarded with a warning.
    pub fn dispatch(&self, action: A) {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            self.discard(&action);
            return;
        }

        // Counted before sending so `stats()` never shows more processed
        // than dispatched
        Counters::bump(&inner.counters.dispatched);
        if let Err(mpsc::error::SendError(action)) = inner.actions.send(action) {
            inner.counters.dispatched.fetch_sub(1, Ordering::Relaxed);
            self.discard(&action);
        }
    }

    /// Queue several actions; they are reduced in iteration order
    pub fn dispatch_all<I>(&self, actions: I)
    where
        I: IntoIterator<Item = A>,
    {
        for action in actions {
            self.dispatch(action);
        }
    }

    fn discard(&self, action: &A) {
        Counters::bump(&self.inner.counters.discarded);
        tracing::warn!(
            store = %self.inner.config.name,
            action = %action.name(),
            "Store is shut down; action discarded"
        );
    }

    /// Subscribe to committed states
    ///
    /// The subscription first yields the current state, then each state
    /// committed afterwards. Fails with [`StoreError::ShutDown`] once the
    /// store has been shut down.
    pub fn subscribe(&self) -> Result<Subscription<S>, StoreError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(StoreError::ShutDown);
        }
        self.inner.hub.subscribe(&self.inner.cache)
    }
}

impl<S, A> Store<S, A> {
    /// The most recently committed state
    ///
    /// Never waits for queued actions.
    pub fn current_state(&self) -> Arc<S> {
        self.inner.cache.current()
    }

    /// Stop delivery to a subscription. Idempotent.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        handle.unsubscribe();
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.hub.len()
    }

    /// Stop accepting actions
    ///
    /// Actions already queued are still reduced; afterwards every
    /// subscription ends. Idempotent.
    pub fn shutdown(&self) {
        if !self.inner.shutdown.is_cancelled() {
            tracing::debug!(store = %self.inner.config.name, "Shutdown requested");
        }
        self.inner.shutdown.cancel();
    }

    /// Whether [`shutdown`](Store::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Wait until the worker has exited
    pub async fn closed(&self) {
        self.inner.stopped.cancelled().await;
    }

    /// Snapshot of the store's counters
    pub fn stats(&self) -> StoreStats {
        let counters = &self.inner.counters;
        StoreStats {
            dispatched: counters.dispatched.load(Ordering::Acquire),
            committed: counters.committed.load(Ordering::Acquire),
            failed: counters.failed.load(Ordering::Acquire),
            suppressed: counters.suppressed.load(Ordering::Acquire),
            discarded: counters.discarded.load(Ordering::Acquire),
        }
    }

    /// The settings this store was built with
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }
}

/// Builder for [`Store`]
pub struct StoreBuilder<S, A> {
    initial: S,
    name: String,
    reducer: Option<Reducer<S, A>>,
    middleware: ComposedMiddleware<S, A>,
    fault_sink: Option<Arc<dyn FaultSink<S, A>>>,
    distinct: Option<StateEq<S>>,
}

impl<S, A> fmt::Debug for StoreBuilder<S, A>
where
    S: 'static,
    A: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBuilder")
            .field("name", &self.name)
            .field("has_reducer", &self.reducer.is_some())
            .field("middleware", &self.middleware.len())
            .field("distinct", &self.distinct.is_some())
            .finish()
    }
}

impl<S, A> StoreBuilder<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    /// Start with the state the store is created with
    pub fn new(initial: S) -> Self {
        Self {
            initial,
            name: DEFAULT_STORE_NAME.to_string(),
            reducer: None,
            middleware: ComposedMiddleware::new(),
            fault_sink: None,
            distinct: None,
        }
    }

    /// Name used in the store's tracing span and log lines
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The reducer (required)
    pub fn reducer(mut self, reducer: Reducer<S, A>) -> Self {
        self.reducer = Some(reducer);
        self
    }

    /// Append a middleware; the first one added is the outermost
    pub fn middleware<M: Middleware<S, A>>(mut self, middleware: M) -> Self {
        self.middleware.add(middleware);
        self
    }

    /// Where reduction failures are reported
    ///
    /// Defaults to [`TracingFaultSink`].
    pub fn fault_sink<F: FaultSink<S, A>>(mut self, sink: F) -> Self {
        self.fault_sink = Some(Arc::new(sink));
        self
    }

    /// Report reduction failures to a closure
    pub fn on_fault<F>(self, f: F) -> Self
    where
        F: Fn(&A, &S, &ReducerError) + Send + Sync + 'static,
    {
        self.fault_sink(FnFaultSink::new(f))
    }

    /// Skip committing (and broadcasting) a state equal to the current one
    ///
    /// Off by default: every successful reduction is committed.
    pub fn distinct_until_changed(mut self) -> Self
    where
        S: PartialEq,
    {
        self.distinct = Some(Arc::new(|current: &S, next: &S| current == next));
        self
    }

    /// Build the store and spawn its worker on the current tokio runtime
    pub fn build(self) -> Result<Store<S, A>, StoreError> {
        let reducer = self.reducer.ok_or(StoreError::MissingReducer)?;
        let runtime = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;

        let config = StoreConfig {
            name: self.name,
            distinct: self.distinct.is_some(),
            middleware: self.middleware.len(),
        };
        let cache = Arc::new(StateCache::new(self.initial));
        let hub = Arc::new(BroadcastHub::new());
        let counters = Arc::new(Counters::default());
        let shutdown = CancellationToken::new();
        let stopped = CancellationToken::new();
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();

        let fault_sink: Arc<dyn FaultSink<S, A>> = match self.fault_sink {
            Some(sink) => sink,
            None => Arc::new(TracingFaultSink),
        };
        let engine = Engine {
            reducer: self.middleware.compose(reducer),
            cache: Arc::clone(&cache),
            hub: Arc::clone(&hub),
            fault_sink,
            distinct: self.distinct,
            counters: Arc::clone(&counters),
        };
        let span = tracing::info_span!("store", name = %config.name);
        runtime.spawn(
            engine
                .run(actions_rx, shutdown.clone(), stopped.clone())
                .instrument(span),
        );

        Ok(Store {
            inner: Arc::new(Inner {
                config,
                cache,
                hub,
                actions: actions_tx,
                shutdown,
                stopped,
                counters,
            }),
        })
    }
}
