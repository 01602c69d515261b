//! Test utilities for stores
//!
//! - [`RecordingFaultSink`]: fault sink that keeps every report for assertions
//! - [`wait_for_state`] / [`wait_for_idle`]: await the worker instead of sleeping
//! - [`collect_n`]: gather states from a subscription with a deadline
//! - [`assert_faulted!`](crate::assert_faulted): assert a fault was reported
//!
//! # Example
//!
//! ```ignore
//! use statehub::testing::{wait_for_state, RecordingFaultSink};
//!
//! let faults = RecordingFaultSink::new();
//! let store = Store::builder(0)
//!     .reducer(reducer)
//!     .fault_sink(faults.clone())
//!     .build()?;
//!
//! store.dispatch(Action::DivideBy(0));
//! store.dispatch(Action::Add(1));
//! wait_for_state(&store, Duration::from_secs(1), |s| *s == 1).await;
//!
//! assert_faulted!(faults, Action::DivideBy(0));
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::ReducerError;
use crate::fault::FaultSink;
use crate::hub::Subscription;
use crate::store::Store;
use crate::Action;

/// One reduction failure captured by [`RecordingFaultSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFault<S, A> {
    /// The action whose reduction failed
    pub action: A,
    /// The state it was reduced against
    pub previous: S,
    /// The error, rendered with `Display`
    pub error: String,
    /// Whether the reducer panicked
    pub panicked: bool,
}

/// Fault sink that records every report
///
/// Clones share the same record, so keep one clone for assertions and hand
/// another to the store.
pub struct RecordingFaultSink<S, A> {
    faults: Arc<Mutex<Vec<RecordedFault<S, A>>>>,
}

impl<S, A> Clone for RecordingFaultSink<S, A> {
    fn clone(&self) -> Self {
        Self {
            faults: Arc::clone(&self.faults),
        }
    }
}

impl<S, A> Default for RecordingFaultSink<S, A> {
    fn default() -> Self {
        Self {
            faults: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<S, A> std::fmt::Debug for RecordingFaultSink<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingFaultSink")
            .field("len", &self.len())
            .finish()
    }
}

impl<S, A> RecordingFaultSink<S, A> {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedFault<S, A>>> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of recorded faults
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl<S: Clone, A: Clone> RecordingFaultSink<S, A> {
    /// Copy of every recorded fault, oldest first
    pub fn faults(&self) -> Vec<RecordedFault<S, A>> {
        self.lock().clone()
    }

    /// Actions of every recorded fault, oldest first
    pub fn actions(&self) -> Vec<A> {
        self.lock().iter().map(|f| f.action.clone()).collect()
    }
}

impl<S, A> FaultSink<S, A> for RecordingFaultSink<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    fn report(&self, action: &A, previous: &S, error: &ReducerError) {
        self.lock().push(RecordedFault {
            action: action.clone(),
            previous: previous.clone(),
            error: error.to_string(),
            panicked: error.is_panic(),
        });
    }
}

/// Wait until the store's current state satisfies `predicate`
///
/// Returns the matching state.
///
/// # Panics
///
/// Panics if `timeout` elapses first, or if the store stops with a state
/// that never matched.
pub async fn wait_for_state<S, A, F>(
    store: &Store<S, A>,
    timeout: Duration,
    predicate: F,
) -> Arc<S>
where
    S: std::fmt::Debug + Send + Sync + 'static,
    A: Action,
    F: Fn(&S) -> bool,
{
    let current = store.current_state();
    if predicate(&current) {
        return current;
    }

    let Ok(mut states) = store.subscribe() else {
        panic!("store shut down with non-matching state {:?}", current);
    };
    let waiting = async {
        let mut last = current;
        while let Some(state) = states.recv().await {
            if predicate(&state) {
                return state;
            }
            last = state;
        }
        panic!("store shut down with non-matching state {:?}", last);
    };
    match tokio::time::timeout(timeout, waiting).await {
        Ok(state) => state,
        Err(_) => panic!(
            "timed out after {:?} waiting for state; current: {:?}",
            timeout,
            store.current_state()
        ),
    }
}

/// Wait until every dispatched action has been reduced
///
/// Failed reductions count as done only after the fault sink has returned,
/// so faults are visible to the caller once this resolves.
///
/// # Panics
///
/// Panics if `timeout` elapses first.
pub async fn wait_for_idle<S, A>(store: &Store<S, A>, timeout: Duration) {
    let waiting = async {
        while !store.stats().is_idle() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };
    if tokio::time::timeout(timeout, waiting).await.is_err() {
        panic!(
            "timed out after {:?} waiting for idle store: {:?}",
            timeout,
            store.stats()
        );
    }
}

/// Receive up to `n` states from a subscription
///
/// Stops early if the subscription ends or `timeout` elapses, so the result
/// may be shorter than `n`.
pub async fn collect_n<S>(
    subscription: &mut Subscription<S>,
    n: usize,
    timeout: Duration,
) -> Vec<Arc<S>>
where
    S: Send + Sync + 'static,
{
    let mut states = Vec::with_capacity(n);
    let _ = tokio::time::timeout(timeout, async {
        while states.len() < n {
            match subscription.recv().await {
                Some(state) => states.push(state),
                None => break,
            }
        }
    })
    .await;
    states
}

/// Assert that a [`RecordingFaultSink`] recorded a fault for an action
/// matching the pattern
///
/// # Example
///
/// ```ignore
/// assert_faulted!(faults, Action::DivideBy(0));
/// assert_faulted!(faults, Action::Toggle(i) if *i >= 3);
/// ```
#[macro_export]
macro_rules! assert_faulted {
    ($sink:expr, $pattern:pat $(if $guard:expr)?) => {{
        let actions = $sink.actions();
        assert!(
            actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected a fault for action matching `{}`, but faults were for: {:?}",
            stringify!($pattern),
            actions
        );
    }};
}

/// Assert that a [`RecordingFaultSink`] recorded no faults
#[macro_export]
macro_rules! assert_no_faults {
    ($sink:expr) => {{
        let faults = $sink.faults();
        assert!(faults.is_empty(), "Expected no faults, got: {:?}", faults);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Add(i32),
        Fail,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Add(_) => "Add",
                TestAction::Fail => "Fail",
            }
        }
    }

    fn test_reducer() -> crate::Reducer<i32, TestAction> {
        reducer::fallible(|action: &TestAction, state: &i32| match action {
            TestAction::Add(n) => Ok(state + n),
            TestAction::Fail => Err(ReducerError::rejected("nope")),
        })
    }

    #[test]
    fn test_recording_sink_records_reports() {
        let sink = RecordingFaultSink::<i32, TestAction>::new();
        let copy = sink.clone();
        copy.report(&TestAction::Fail, &7, &ReducerError::rejected("nope"));

        assert_eq!(sink.len(), 1);
        assert_eq!(
            sink.faults()[0],
            RecordedFault {
                action: TestAction::Fail,
                previous: 7,
                error: "action rejected: nope".to_string(),
                panicked: false,
            }
        );
        assert_faulted!(sink, TestAction::Fail);

        sink.clear();
        assert!(sink.is_empty());
        assert_no_faults!(sink);
    }

    #[tokio::test]
    async fn test_wait_for_state_and_idle() {
        let sink = RecordingFaultSink::new();
        let store = Store::builder(0)
            .reducer(test_reducer())
            .fault_sink(sink.clone())
            .build()
            .unwrap();

        store.dispatch(TestAction::Add(2));
        store.dispatch(TestAction::Fail);
        store.dispatch(TestAction::Add(3));

        let state = wait_for_state(&store, Duration::from_secs(2), |s| *s == 5).await;
        assert_eq!(*state, 5);

        wait_for_idle(&store, Duration::from_secs(2)).await;
        assert_faulted!(sink, TestAction::Fail);
    }

    #[tokio::test]
    async fn test_collect_n_stops_at_timeout() {
        let store = Store::new(1, test_reducer()).unwrap();
        let mut sub = store.subscribe().unwrap();

        let states = collect_n(&mut sub, 3, Duration::from_millis(50)).await;
        assert_eq!(states.len(), 1);
        assert_eq!(*states[0], 1);
    }
}
