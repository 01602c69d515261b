//! Fault reporting for failed reductions

use std::fmt;

use crate::error::ReducerError;
use crate::Action;

/// Receives every reduction failure
///
/// Called on the store's worker with the action that failed, the state it
/// was reduced against (which remains the current state), and the error.
/// Sinks must not block for long: the next action waits behind them.
pub trait FaultSink<S, A>: Send + Sync + 'static {
    /// Report a failed reduction
    fn report(&self, action: &A, previous: &S, error: &ReducerError);
}

/// Default sink: logs failures at `warn` through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFaultSink;

impl<S, A: Action> FaultSink<S, A> for TracingFaultSink {
    fn report(&self, action: &A, _previous: &S, error: &ReducerError) {
        tracing::warn!(
            action = %action.name(),
            %error,
            "Reduction failed; state left unchanged"
        );
    }
}

/// Sink built from a closure
pub struct FnFaultSink<F> {
    f: F,
}

impl<F> FnFaultSink<F> {
    /// Wrap a closure as a fault sink
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnFaultSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFaultSink").finish_non_exhaustive()
    }
}

impl<S, A, F> FaultSink<S, A> for FnFaultSink<F>
where
    F: Fn(&A, &S, &ReducerError) + Send + Sync + 'static,
{
    fn report(&self, action: &A, previous: &S, error: &ReducerError) {
        (self.f)(action, previous, error)
    }
}
