//! The current-state cell

use std::sync::Arc;

use tokio::sync::watch;

/// Holds the latest committed state
///
/// Backed by a `watch` channel: a commit replaces the stored `Arc<S>` in one
/// step and bumps the channel version, so readers see either the old or the
/// new state and never anything in between. The same cell is what every
/// subscription's receiver watches, which keeps `current()` and broadcast
/// delivery on one sequence of states.
///
/// Only the store's transition engine commits.
#[derive(Debug)]
pub struct StateCache<S> {
    tx: watch::Sender<Arc<S>>,
}

impl<S> StateCache<S> {
    /// Create a cache holding `initial`
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// The most recently committed state
    ///
    /// Only holds the cell's read lock long enough to clone the `Arc`.
    pub fn current(&self) -> Arc<S> {
        self.tx.borrow().clone()
    }

    /// Publish `next` as the current state, returning the state it replaced
    pub(crate) fn commit(&self, next: Arc<S>) -> Arc<S> {
        self.tx.send_replace(next)
    }

    /// A receiver positioned at the current version
    pub(crate) fn watch(&self) -> watch::Receiver<Arc<S>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_initial_state() {
        let cache = StateCache::new(vec![1, 2]);
        assert_eq!(*cache.current(), vec![1, 2]);
    }

    #[test]
    fn test_commit_replaces_state() {
        let cache = StateCache::new(1);
        let previous = cache.commit(Arc::new(2));
        assert_eq!(*previous, 1);
        assert_eq!(*cache.current(), 2);
    }

    #[test]
    fn test_watchers_see_commits() {
        let cache = StateCache::new(0);
        let mut rx = cache.watch();
        assert!(!rx.has_changed().unwrap());

        cache.commit(Arc::new(5));
        assert!(rx.has_changed().unwrap());
        assert_eq!(**rx.borrow_and_update(), 5);
    }
}
