//! Core types for statehub
//!
//! A store holds one value of application state. Any number of threads
//! dispatch actions into it; a single worker applies a pure reducer to them
//! one at a time and publishes each resulting state to readers.
//!
//! # Core Concepts
//!
//! - **Action**: Describes an intended state change
//! - **Reducer**: `(action, state) -> Result<state>`, never mutates in place
//! - **Middleware**: Wraps the reducer, outermost first
//! - **Store**: Queue, worker, state cache and broadcast hub behind one handle
//! - **Subscription**: Replays the current state, then yields each commit
//! - **FaultSink**: Receives failed reductions; the store keeps running
//!
//! # Basic Example
//!
//! ```ignore
//! use statehub_core::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! impl Action for CounterAction {
//!     fn name(&self) -> &'static str {
//!         match self {
//!             CounterAction::Increment => "Increment",
//!             CounterAction::Decrement => "Decrement",
//!         }
//!     }
//! }
//!
//! let store = Store::new(
//!     0_i32,
//!     reducer::from_fn(|action: &CounterAction, count: &i32| match action {
//!         CounterAction::Increment => count + 1,
//!         CounterAction::Decrement => count - 1,
//!     }),
//! )?;
//!
//! let mut counts = store.subscribe()?;
//! store.dispatch(CounterAction::Increment);
//!
//! while let Some(count) = counts.recv().await {
//!     println!("count = {count}");
//! }
//! ```
//!
//! # Ordering
//!
//! Actions dispatched from one thread are reduced in the order they were
//! dispatched. Actions from different threads interleave in the order they
//! reached the queue. Every subscriber sees commits in that same order,
//! though a slow subscriber may skip intermediate states: each subscriber
//! holds at most one undelivered state and a newer commit replaces it.

pub mod action;
pub mod action_logger;
pub mod cache;
mod engine;
pub mod error;
pub mod fault;
pub mod hub;
pub mod middleware;
pub mod reducer;
pub mod store;
pub mod testing;

// Core trait exports
pub use action::{Action, ActionSummary};
pub use error::{ReducerError, StoreError};
pub use fault::{FaultSink, FnFaultSink, TracingFaultSink};

// Reducer and middleware exports
pub use middleware::{
    ComposedMiddleware, FnMiddleware, HookMiddleware, LoggingMiddleware, Middleware,
    NoopMiddleware,
};
pub use reducer::{ReduceResult, Reducer};

// Action log exports
pub use action_logger::{
    ActionLog, ActionLogConfig, ActionLogEntry, ActionLoggerConfig, ActionLoggerMiddleware,
    ActionOutcome, SharedActionLog,
};

// Store exports
pub use cache::StateCache;
pub use hub::{Subscription, SubscriptionHandle, SubscriptionId};
pub use store::{Store, StoreBuilder, StoreConfig, StoreStats};

// Testing exports
pub use testing::{
    collect_n, wait_for_idle, wait_for_state, RecordedFault, RecordingFaultSink,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionSummary};
    pub use crate::error::{ReducerError, StoreError};
    pub use crate::fault::{FaultSink, TracingFaultSink};
    pub use crate::middleware::{
        ComposedMiddleware, HookMiddleware, LoggingMiddleware, Middleware, NoopMiddleware,
    };
    pub use crate::reducer::{self, ReduceResult, Reducer};
    pub use crate::store::{Store, StoreBuilder, StoreStats};
    pub use crate::hub::{Subscription, SubscriptionHandle};
}
