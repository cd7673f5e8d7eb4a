//! Shelfmark query cache.
//!
//! Read results are stored under a [`QueryKey`] and tagged with the entities
//! they depend on. Mutations invalidate tags; every entry carrying an
//! invalidated tag is marked stale and refetched on its next read.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! max_entries = 256
//! keep_unused_seconds = 60
//! ```

mod config;
mod events;
mod keys;
mod lock;
mod registry;
mod store;

pub use config::CacheConfig;
pub use events::{CacheEvent, Epoch, EventKind, Subscription};
pub use keys::{CachedValue, QueryKey, Tag};
pub use registry::TagRegistry;
pub use store::{CacheLookup, FetchTicket, QueryStore};

pub(crate) use lock::mutex_lock;
pub(crate) use store::{
    METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED, METRIC_CACHE_MISS,
};
