//! Broadcast hub: replay-latest-then-live subscriptions
//!
//! Every [`Subscription`] owns a `watch` receiver on the store's
//! [`StateCache`]. A receiver is a single-slot mailbox with its own version
//! cursor: committing overwrites the slot and wakes the subscriber, and the
//! writer never waits for anybody to read.
//!
//! # Backpressure
//!
//! Delivery is **conflated**. A subscriber that reads slower than states are
//! committed skips the intermediate states and receives the newest one when
//! it next polls. States a subscriber does receive always arrive in commit
//! order, without duplicates.
//!
//! # Cancellation
//!
//! [`SubscriptionHandle::unsubscribe`] can be called from any thread, any
//! number of times. Once it has returned, the subscription yields no further
//! states. The one tolerated race: a `poll_next` that had already passed its
//! cancellation check when `unsubscribe` ran may still return the state it
//! was about to return.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::cache::StateCache;
use crate::error::StoreError;

/// Identifies a subscription within its store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw id value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Cloneable handle that cancels a subscription
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    token: CancellationToken,
    hub_closed: CancellationToken,
    registry: Arc<Registry>,
}

impl SubscriptionHandle {
    /// The subscription's id
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop delivery to the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        self.token.cancel();
        self.registry.remove(self.id);
    }

    /// Whether the subscription is still live
    ///
    /// False once it has been unsubscribed or its store has shut down.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.hub_closed.is_cancelled()
    }
}

#[derive(Debug, Default)]
struct Registry {
    live: Mutex<HashMap<SubscriptionId, CancellationToken>>,
}

impl Registry {
    fn live(&self) -> MutexGuard<'_, HashMap<SubscriptionId, CancellationToken>> {
        // The map holds no invariants a panicking holder could break
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: SubscriptionId) {
        self.live().remove(&id);
    }
}

/// Registry of live subscriptions for one store
#[derive(Debug)]
pub(crate) struct BroadcastHub {
    registry: Arc<Registry>,
    next_id: AtomicU64,
    closed: CancellationToken,
}

impl BroadcastHub {
    pub(crate) fn new() -> Self {
        Self {
            registry: Arc::default(),
            next_id: AtomicU64::new(0),
            closed: CancellationToken::new(),
        }
    }

    /// Register a subscription whose first item is the cache's current state
    pub(crate) fn subscribe<S>(
        &self,
        cache: &StateCache<S>,
    ) -> Result<Subscription<S>, StoreError>
    where
        S: Send + Sync + 'static,
    {
        if self.closed.is_cancelled() {
            return Err(StoreError::ShutDown);
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();

        let mut rx = cache.watch();
        // Capturing the replay marks this version as seen, so the live
        // stream starts strictly after it
        let replay = Arc::clone(&rx.borrow_and_update());

        self.registry.live().insert(id, token.clone());
        tracing::debug!(subscription = %id, "Subscribed");

        Ok(Subscription {
            replay: Some(replay),
            updates: WatchStream::from_changes(rx),
            unsubscribed: Box::pin(token.clone().cancelled_owned()),
            closed: Box::pin(self.closed.clone().cancelled_owned()),
            handle: SubscriptionHandle {
                id,
                token,
                hub_closed: self.closed.clone(),
                registry: Arc::clone(&self.registry),
            },
        })
    }

    /// Number of live subscriptions
    pub(crate) fn len(&self) -> usize {
        self.registry.live().len()
    }

    /// End every subscription once it has drained the states it has not seen
    pub(crate) fn close(&self) {
        self.closed.cancel();
        let live = std::mem::take(&mut *self.registry.live());
        tracing::debug!(subscriptions = live.len(), "Broadcast hub closed");
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// A stream of committed states
///
/// Yields the state that was current at subscribe time, then every state
/// committed afterwards in commit order (subject to conflation, see the
/// [module docs](self)). Ends when unsubscribed or when the store shuts
/// down.
///
/// Dropping the subscription unsubscribes it.
pub struct Subscription<S> {
    replay: Option<Arc<S>>,
    updates: WatchStream<Arc<S>>,
    unsubscribed: Pin<Box<WaitForCancellationFutureOwned>>,
    closed: Pin<Box<WaitForCancellationFutureOwned>>,
    handle: SubscriptionHandle,
}

impl<S> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.handle.id)
            .field("active", &self.handle.is_active())
            .finish_non_exhaustive()
    }
}

impl<S> Subscription<S>
where
    S: Send + Sync + 'static,
{
    /// Wait for the next state; `None` once the subscription has ended
    pub async fn recv(&mut self) -> Option<Arc<S>> {
        self.next().await
    }
}

impl<S> Subscription<S> {
    /// The subscription's id
    pub fn id(&self) -> SubscriptionId {
        self.handle.id
    }

    /// A handle that can cancel this subscription from elsewhere
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Stop delivery. Idempotent.
    pub fn unsubscribe(&self) {
        self.handle.unsubscribe();
    }

    /// Whether the subscription is still live
    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }
}

impl<S> Stream for Subscription<S>
where
    S: Send + Sync + 'static,
{
    type Item = Arc<S>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.unsubscribed.as_mut().poll(cx).is_ready() {
            this.replay = None;
            return Poll::Ready(None);
        }

        if let Some(state) = this.replay.take() {
            return Poll::Ready(Some(state));
        }

        if let Poll::Ready(item) = Pin::new(&mut this.updates).poll_next(cx) {
            return Poll::Ready(item);
        }

        if this.closed.as_mut().poll(cx).is_ready() {
            // The final commit happens before close; poll once more so it
            // is not lost to the ordering of the two wakeups
            return match Pin::new(&mut this.updates).poll_next(cx) {
                Poll::Ready(item) => Poll::Ready(item),
                Poll::Pending => Poll::Ready(None),
            };
        }

        Poll::Pending
    }
}

impl<S> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn next_within(sub: &mut Subscription<u32>) -> Option<Arc<u32>> {
        tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timed out waiting for state")
    }

    #[tokio::test]
    async fn test_replays_current_then_live() {
        let cache = StateCache::new(1_u32);
        let hub = BroadcastHub::new();
        cache.commit(Arc::new(2));

        let mut sub = hub.subscribe(&cache).unwrap();
        assert_eq!(*next_within(&mut sub).await.unwrap(), 2);

        cache.commit(Arc::new(3));
        assert_eq!(*next_within(&mut sub).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_conflates_for_slow_subscribers() {
        let cache = StateCache::new(0_u32);
        let hub = BroadcastHub::new();
        let mut sub = hub.subscribe(&cache).unwrap();
        assert_eq!(*next_within(&mut sub).await.unwrap(), 0);

        for n in 1..=10 {
            cache.commit(Arc::new(n));
        }

        assert_eq!(*next_within(&mut sub).await.unwrap(), 10);
        let pending = tokio::time::timeout(Duration::from_millis(50), sub.recv()).await;
        assert!(pending.is_err(), "no duplicate delivery of the latest state");
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let cache = StateCache::new(0_u32);
        let hub = BroadcastHub::new();
        let mut sub = hub.subscribe(&cache).unwrap();
        let handle = sub.handle();
        assert_eq!(hub.len(), 1);

        handle.unsubscribe();
        handle.unsubscribe();
        sub.unsubscribe();

        assert!(!sub.is_active());
        assert_eq!(hub.len(), 0);

        cache.commit(Arc::new(1));
        // Cancelled before the replay was taken: nothing at all is delivered
        assert_eq!(next_within(&mut sub).await, None);
        assert_eq!(next_within(&mut sub).await, None);
    }

    #[tokio::test]
    async fn test_drop_deregisters() {
        let cache = StateCache::new(0_u32);
        let hub = BroadcastHub::new();
        let first = hub.subscribe(&cache).unwrap();
        let second = hub.subscribe(&cache).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(hub.len(), 2);

        drop(first);
        assert_eq!(hub.len(), 1);
        drop(second);
        assert_eq!(hub.len(), 0);
    }

    #[tokio::test]
    async fn test_close_drains_unseen_state_then_ends() {
        let cache = StateCache::new(0_u32);
        let hub = BroadcastHub::new();
        let mut sub = hub.subscribe(&cache).unwrap();
        assert_eq!(*next_within(&mut sub).await.unwrap(), 0);

        cache.commit(Arc::new(7));
        let handle = sub.handle();
        assert!(handle.is_active());
        hub.close();
        assert!(!handle.is_active());
        assert!(!sub.is_active());

        assert_eq!(*next_within(&mut sub).await.unwrap(), 7);
        assert_eq!(next_within(&mut sub).await, None);
        assert!(hub.is_closed());
        assert!(matches!(hub.subscribe(&cache), Err(StoreError::ShutDown)));
    }
}
