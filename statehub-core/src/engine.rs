//! The serialized transition engine
//!
//! One tokio task per store drains the action queue in arrival order and is
//! the only writer of the [`StateCache`]. Reductions therefore never overlap,
//! and states are committed in the order their actions were queued.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cache::StateCache;
use crate::error::ReducerError;
use crate::fault::FaultSink;
use crate::hub::BroadcastHub;
use crate::reducer::Reducer;
use crate::Action;

/// Equality used to suppress commits of a state equal to the current one
pub(crate) type StateEq<S> = Arc<dyn Fn(&S, &S) -> bool + Send + Sync>;

/// Counters shared between the engine and store handles
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) dispatched: AtomicU64,
    pub(crate) committed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) suppressed: AtomicU64,
    pub(crate) discarded: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Release);
    }
}

pub(crate) struct Engine<S, A> {
    pub(crate) reducer: Reducer<S, A>,
    pub(crate) cache: Arc<StateCache<S>>,
    pub(crate) hub: Arc<BroadcastHub>,
    pub(crate) fault_sink: Arc<dyn FaultSink<S, A>>,
    pub(crate) distinct: Option<StateEq<S>>,
    pub(crate) counters: Arc<Counters>,
}

/// Closes the hub and marks the engine stopped however the task ends,
/// including when the runtime drops it mid-flight
struct StopGuard {
    hub: Arc<BroadcastHub>,
    stopped: CancellationToken,
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.hub.close();
        self.stopped.cancel();
    }
}

impl<S, A> Engine<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    /// Drain actions until shutdown or until every sender is gone
    ///
    /// On shutdown the queue is closed and whatever was admitted before is
    /// still reduced.
    pub(crate) async fn run(
        self,
        mut actions: mpsc::UnboundedReceiver<A>,
        shutdown: CancellationToken,
        stopped: CancellationToken,
    ) {
        let _guard = StopGuard {
            hub: Arc::clone(&self.hub),
            stopped,
        };
        // The engine's own copy of the last commit is the input to the next
        // reduction, never a read of the shared cell
        let mut current = self.cache.current();
        tracing::info!("Transition engine started");

        loop {
            tokio::select! {
                biased;
                action = actions.recv() => match action {
                    Some(action) => current = self.apply(action, current),
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            }
        }

        actions.close();
        let mut drained = 0_usize;
        while let Ok(action) = actions.try_recv() {
            current = self.apply(action, current);
            drained += 1;
        }

        tracing::info!(drained, "Transition engine stopped");
    }

    /// Reduce one action against `current`, returning the state to carry
    /// forward
    fn apply(&self, action: A, current: Arc<S>) -> Arc<S> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            (self.reducer)(&action, &*current)
        }))
        .unwrap_or_else(|payload| Err(ReducerError::from_panic(payload)));

        match outcome {
            Ok(next) => {
                if let Some(eq) = &self.distinct {
                    if eq(&*current, &next) {
                        Counters::bump(&self.counters.suppressed);
                        tracing::trace!(
                            action = %action.name(),
                            "State unchanged; commit suppressed"
                        );
                        return current;
                    }
                }
                let next = Arc::new(next);
                self.cache.commit(Arc::clone(&next));
                Counters::bump(&self.counters.committed);
                tracing::debug!(action = %action.name(), "State committed");
                next
            }
            Err(error) => {
                // Counted only once the sink has returned, so an idle store
                // has reported every failure
                self.report(&action, &current, &error);
                Counters::bump(&self.counters.failed);
                current
            }
        }
    }

    fn report(&self, action: &A, previous: &S, error: &ReducerError) {
        let reported = panic::catch_unwind(AssertUnwindSafe(|| {
            self.fault_sink.report(action, previous, error)
        }));
        if reported.is_err() {
            tracing::error!(
                action = %action.name(),
                %error,
                "Fault sink panicked while reporting"
            );
        }
    }
}
