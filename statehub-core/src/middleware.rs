//! Middleware: reducer-to-reducer wrappers for cross-cutting behavior
//!
//! A middleware takes the next reducer in the chain and returns a reducer of
//! the same shape. Middleware are composed once, when the store is built,
//! never per dispatch.
//!
//! With middleware `M1` registered before `M2`, the composed reducer is
//! `M1(M2(base))`: a reduction enters `M1` first, and `M1` sees the result
//! last.

use std::fmt;
use std::sync::Arc;

use crate::reducer::{ReduceResult, Reducer};
use crate::Action;

/// Middleware trait for wrapping reducers
///
/// Implement this trait to add logging, instrumentation, or other
/// cross-cutting concerns to your store without changing the reducer.
pub trait Middleware<S, A>: Send + Sync + 'static {
    /// Wrap `next`, returning a reducer with the same contract
    fn wrap(&self, next: Reducer<S, A>) -> Reducer<S, A>;
}

/// Middleware built from a closure (see [`from_fn`])
#[derive(Clone)]
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}

/// Turn a `Fn(Reducer) -> Reducer` closure into a middleware
pub fn from_fn<S, A, F>(f: F) -> FnMiddleware<F>
where
    F: Fn(Reducer<S, A>) -> Reducer<S, A> + Send + Sync + 'static,
{
    FnMiddleware { f }
}

impl<S, A, F> Middleware<S, A> for FnMiddleware<F>
where
    F: Fn(Reducer<S, A>) -> Reducer<S, A> + Send + Sync + 'static,
{
    fn wrap(&self, next: Reducer<S, A>) -> Reducer<S, A> {
        (self.f)(next)
    }
}

/// A no-op middleware that returns the reducer unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<S, A> Middleware<S, A> for NoopMiddleware {
    fn wrap(&self, next: Reducer<S, A>) -> Reducer<S, A> {
        next
    }
}

/// Middleware that logs reductions through `tracing`
///
/// Successful reductions are logged at `debug`, failures at `warn`.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    /// Whether to log before the reducer runs
    pub log_before: bool,
    /// Whether to log after the reducer succeeds
    pub log_after: bool,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl<S, A> Middleware<S, A> for LoggingMiddleware
where
    S: 'static,
    A: Action,
{
    fn wrap(&self, next: Reducer<S, A>) -> Reducer<S, A> {
        let log_before = self.log_before;
        let log_after = self.log_after;
        Arc::new(move |action: &A, state: &S| -> ReduceResult<S> {
            if log_before {
                tracing::debug!(action = %action.name(), "Reducing action");
            }
            let result = next(action, state);
            match &result {
                Ok(_) if log_after => {
                    tracing::debug!(action = %action.name(), "Action reduced");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(action = %action.name(), %error, "Action failed");
                }
            }
            result
        })
    }
}

type BeforeHook<S, A> = Arc<dyn Fn(&A, &S) + Send + Sync>;
type AfterHook<S, A> = Arc<dyn Fn(&A, &ReduceResult<S>) + Send + Sync>;

/// Middleware running callbacks around each reduction
///
/// Useful for instrumentation: `before` sees the action and the input state,
/// `after` sees the action and the reducer's result.
pub struct HookMiddleware<S, A> {
    before: Option<BeforeHook<S, A>>,
    after: Option<AfterHook<S, A>>,
}

impl<S, A> Default for HookMiddleware<S, A> {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
        }
    }
}

impl<S, A> Clone for HookMiddleware<S, A> {
    fn clone(&self) -> Self {
        Self {
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }
}

impl<S, A> fmt::Debug for HookMiddleware<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookMiddleware")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

impl<S, A> HookMiddleware<S, A> {
    /// Create a hook middleware with no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` before the wrapped reducer
    pub fn before<F>(mut self, f: F) -> Self
    where
        F: Fn(&A, &S) + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(f));
        self
    }

    /// Run `f` after the wrapped reducer, with its result
    pub fn after<F>(mut self, f: F) -> Self
    where
        F: Fn(&A, &ReduceResult<S>) + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(f));
        self
    }
}

impl<S, A> Middleware<S, A> for HookMiddleware<S, A>
where
    S: 'static,
    A: 'static,
{
    fn wrap(&self, next: Reducer<S, A>) -> Reducer<S, A> {
        let before = self.before.clone();
        let after = self.after.clone();
        Arc::new(move |action: &A, state: &S| -> ReduceResult<S> {
            if let Some(before) = &before {
                before(action, state);
            }
            let result = next(action, state);
            if let Some(after) = &after {
                after(action, &result);
            }
            result
        })
    }
}

/// Compose multiple middleware into a single middleware
///
/// The first middleware added is the outermost wrapper. A composition is
/// itself a middleware, so nesting compositions gives the same reducer as
/// flattening them. An empty composition is the identity.
pub struct ComposedMiddleware<S, A> {
    middlewares: Vec<Arc<dyn Middleware<S, A>>>,
}

impl<S, A> fmt::Debug for ComposedMiddleware<S, A>
where
    S: 'static,
    A: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl<S, A> Default for ComposedMiddleware<S, A>
where
    S: 'static,
    A: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> Clone for ComposedMiddleware<S, A>
where
    S: 'static,
    A: 'static,
{
    fn clone(&self) -> Self {
        Self {
            middlewares: self.middlewares.clone(),
        }
    }
}

impl<S, A> ComposedMiddleware<S, A>
where
    S: 'static,
    A: 'static,
{
    /// Create a new composed middleware
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware to the composition
    pub fn add<M: Middleware<S, A>>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Builder-style [`add`](Self::add)
    pub fn with<M: Middleware<S, A>>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }

    /// Number of middleware in the composition
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the composition is empty
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Build the composed reducer around `base`
    pub fn compose(&self, base: Reducer<S, A>) -> Reducer<S, A> {
        // Fold right to left so the first middleware ends up outermost
        self.middlewares
            .iter()
            .rev()
            .fold(base, |next, middleware| middleware.wrap(next))
    }
}

impl<S, A> Middleware<S, A> for ComposedMiddleware<S, A>
where
    S: 'static,
    A: 'static,
{
    fn wrap(&self, next: Reducer<S, A>) -> Reducer<S, A> {
        self.compose(next)
    }
}
