//! Cache change notifications.
//!
//! The store broadcasts an event whenever an entry is written, invalidated or
//! evicted. Views hold a [`Subscription`] per key they render; while at least
//! one subscription is alive the entry is exempt from idle pruning.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::keys::QueryKey;
use super::store::QueryStore;

/// Monotonic invalidation counter.
///
/// Every call to `invalidate` advances the epoch. Fetches remember the epoch
/// they started at so a late response can tell whether it was overtaken by a
/// mutation.
pub type Epoch = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A fresh value was stored.
    Updated,
    /// The entry was marked stale and will be refetched on next read.
    Invalidated,
    /// The entry was dropped from the store.
    Evicted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: QueryKey,
    pub kind: EventKind,
    pub epoch: Epoch,
}

/// Live interest in one cache key.
pub struct Subscription {
    key: QueryKey,
    receiver: broadcast::Receiver<CacheEvent>,
    store: Arc<QueryStore>,
}

impl Subscription {
    pub(super) fn new(
        key: QueryKey,
        receiver: broadcast::Receiver<CacheEvent>,
        store: Arc<QueryStore>,
    ) -> Self {
        Self {
            key,
            receiver,
            store,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Wait for the next event concerning this subscription's key.
    ///
    /// Returns `None` only if the notification channel has closed. If the
    /// subscriber fell behind, missed events are skipped and the wait
    /// continues; callers should re-read the store rather than rely on every
    /// event arriving.
    pub async fn changed(&mut self) -> Option<CacheEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.key == self.key => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(key = %self.key, skipped, "Cache subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::changed`].
    pub fn try_changed(&mut self) -> Option<CacheEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.key == self.key => return Some(event),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.store.release(&self.key);
    }
}
