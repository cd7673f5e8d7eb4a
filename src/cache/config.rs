//! Cache configuration.
//!
//! Controls the query store via the `[cache]` section of `shelfmark.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_MAX_ENTRIES: usize = 256;
const DEFAULT_KEEP_UNUSED_SECS: u64 = 60;
const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of query results held before LRU eviction.
    pub max_entries: usize,
    /// How long an entry with no subscriber survives before pruning.
    pub keep_unused: Duration,
    /// Buffered change notifications per subscriber.
    pub event_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            keep_unused: Duration::from_secs(DEFAULT_KEEP_UNUSED_SECS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            max_entries: settings.max_entries.get(),
            keep_unused: settings.keep_unused,
            ..Self::default()
        }
    }
}

impl CacheConfig {
    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the event buffer size, clamping to 1 if zero.
    pub fn event_capacity_non_zero(&self) -> usize {
        self.event_capacity.max(1)
    }
}
