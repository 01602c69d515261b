//! statehub: a single-writer, multi-reader state store
//!
//! Like Redux, but for threads. Any thread may dispatch actions; one worker
//! applies a pure reducer to them in order and every subscriber observes the
//! committed states in that same order.
//!
//! # Example
//! ```ignore
//! use statehub::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//!     Add(i64),
//! }
//!
//! let store = Store::new(
//!     0_i64,
//!     reducer::from_fn(|action: &CounterAction, count: &i64| match action {
//!         CounterAction::Increment => count + 1,
//!         CounterAction::Add(n) => count + n,
//!     }),
//! )?;
//!
//! let mut counts = store.subscribe()?;
//! store.dispatch(CounterAction::Add(41));
//! store.dispatch(CounterAction::Increment);
//! ```

// Re-export everything from core
pub use statehub_core::*;

// Re-export derive macros
pub use statehub_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use statehub_core::{Action, ActionSummary, FaultSink, Middleware};

    // Reducers
    pub use statehub_core::reducer::{self, ReduceResult, Reducer};

    // Store
    pub use statehub_core::{
        ReducerError, Store, StoreBuilder, StoreError, StoreStats, Subscription,
        SubscriptionHandle,
    };

    // Middleware
    pub use statehub_core::{
        ActionLoggerConfig, ActionLoggerMiddleware, ComposedMiddleware, HookMiddleware,
        LoggingMiddleware, NoopMiddleware,
    };

    // Derive macros
    pub use statehub_macros::Action;
}
