//! Error types for store construction, subscription and reduction

use std::any::Any;
use std::error::Error as StdError;

use thiserror::Error;

/// Errors returned by store construction and subscription
#[derive(Debug, Error)]
pub enum StoreError {
    /// `StoreBuilder::build` was called without a reducer
    #[error("store requires a reducer")]
    MissingReducer,
    /// The store was created outside of a tokio runtime
    #[error("store must be created from within a tokio runtime")]
    NoRuntime,
    /// The store has been shut down
    #[error("store has been shut down")]
    ShutDown,
}

/// A reduction failure
///
/// Returned by a reducer (or produced by the store when a reducer panics).
/// Failures never reach the dispatcher: the store reports them to its
/// [`FaultSink`](crate::FaultSink) and leaves the current state in place.
#[derive(Debug, Error)]
pub enum ReducerError {
    /// The reducer refused the action for the given state
    #[error("action rejected: {0}")]
    Rejected(String),
    /// The reducer panicked; carries the panic message
    #[error("reducer panicked: {0}")]
    Panicked(String),
    /// Any other error raised while reducing
    #[error("reducer failed: {0}")]
    Other(#[source] Box<dyn StdError + Send + Sync>),
}

impl ReducerError {
    /// Reject an action with a reason
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// Wrap an arbitrary error
    pub fn other<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }

    /// Whether this failure came from a caught panic
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}
