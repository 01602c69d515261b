//! Reducers and reducer combinators
//!
//! A reducer is a pure function `(action, state) -> state`. Reducers never
//! mutate the state they are given; they return the next state and the store
//! swaps it in atomically.
//!
//! Reducers are fallible: returning `Err` (or panicking) leaves the current
//! state untouched and reports the failure to the store's fault sink.
//!
//! # Example
//!
//! ```
//! use statehub_core::reducer::{self, Reducer};
//! use statehub_core::ReducerError;
//!
//! #[derive(Clone, Debug)]
//! enum CalcAction {
//!     Add(i64),
//!     Div(i64),
//! }
//!
//! let add = reducer::on(
//!     |action: &CalcAction| match action {
//!         CalcAction::Add(n) => Some(n),
//!         _ => None,
//!     },
//!     |n: &i64, state: &i64| Ok(state + n),
//! );
//! let div = reducer::on(
//!     |action: &CalcAction| match action {
//!         CalcAction::Div(n) => Some(n),
//!         _ => None,
//!     },
//!     |n: &i64, state: &i64| {
//!         state
//!             .checked_div(*n)
//!             .ok_or_else(|| ReducerError::rejected("division by zero"))
//!     },
//! );
//!
//! let calc: Reducer<i64, CalcAction> = reducer::combine([add, div]);
//! assert_eq!(calc(&CalcAction::Add(10), &0).unwrap(), 10);
//! assert!(calc(&CalcAction::Div(0), &10).is_err());
//! ```

use std::sync::Arc;

use crate::error::ReducerError;

/// Result of a single reduction
pub type ReduceResult<S> = Result<S, ReducerError>;

/// A shared, type-erased reducer
///
/// Takes the action and the current state, returns the next state.
pub type Reducer<S, A> = Arc<dyn Fn(&A, &S) -> ReduceResult<S> + Send + Sync>;

/// Lift a fallible closure into a [`Reducer`]
pub fn fallible<S, A, F>(f: F) -> Reducer<S, A>
where
    F: Fn(&A, &S) -> ReduceResult<S> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Lift an infallible closure into a [`Reducer`]
pub fn from_fn<S, A, F>(f: F) -> Reducer<S, A>
where
    S: 'static,
    A: 'static,
    F: Fn(&A, &S) -> S + Send + Sync + 'static,
{
    Arc::new(move |action: &A, state: &S| -> ReduceResult<S> {
        Ok(f(action, state))
    })
}

/// Reducer that returns the state unchanged for every action
pub fn identity<S, A>() -> Reducer<S, A>
where
    S: Clone + 'static,
    A: 'static,
{
    Arc::new(|_: &A, state: &S| -> ReduceResult<S> { Ok(state.clone()) })
}

/// Reducer that only handles the actions `select` projects a payload out of
///
/// For every other action the state is returned unchanged. This is the usual
/// way to build one reducer per action variant and [`combine`] them.
pub fn on<S, A, T, P, F>(select: P, f: F) -> Reducer<S, A>
where
    S: Clone + 'static,
    A: 'static,
    T: ?Sized + 'static,
    P: for<'a> Fn(&'a A) -> Option<&'a T> + Send + Sync + 'static,
    F: Fn(&T, &S) -> ReduceResult<S> + Send + Sync + 'static,
{
    Arc::new(move |action: &A, state: &S| -> ReduceResult<S> {
        match select(action) {
            Some(payload) => f(payload, state),
            None => Ok(state.clone()),
        }
    })
}

/// Run reducers one after another, threading the state through
///
/// Reducers run in the order given. The first failure aborts the whole
/// reduction (the store then keeps the pre-action state). An empty list is
/// the identity reducer.
pub fn combine<S, A, I>(reducers: I) -> Reducer<S, A>
where
    S: Clone + 'static,
    A: 'static,
    I: IntoIterator<Item = Reducer<S, A>>,
{
    let reducers: Vec<Reducer<S, A>> = reducers.into_iter().collect();
    match reducers.len() {
        0 => identity(),
        1 => reducers.into_iter().next().unwrap_or_else(identity),
        _ => Arc::new(move |action: &A, state: &S| -> ReduceResult<S> {
            let mut next = reducers[0](action, state)?;
            for reducer in &reducers[1..] {
                next = reducer(action, &next)?;
            }
            Ok(next)
        }),
    }
}
