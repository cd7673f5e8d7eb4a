//! Query result storage.
//!
//! Holds the last-known result of every cached read together with its tag
//! set. Entries, tag mappings, invalidation epochs and subscriber counts all
//! live behind one mutex so an invalidation is visible to the very next read.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use lru::LruCache;
use metrics::counter;
use tokio::sync::broadcast;
use tracing::debug;

use super::config::CacheConfig;
use super::events::{CacheEvent, Epoch, EventKind, Subscription};
use super::keys::{CachedValue, QueryKey, Tag};
use super::lock::mutex_lock;
use super::registry::TagRegistry;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "shelfmark_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "shelfmark_cache_miss_total";
pub(crate) const METRIC_CACHE_INVALIDATED: &str = "shelfmark_cache_invalidated_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "shelfmark_cache_evict_total";

/// A cached value together with its freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    pub value: CachedValue,
    pub stale: bool,
}

/// Marks the invalidation epoch a network read started at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(Epoch);

impl FetchTicket {
    pub fn epoch(self) -> Epoch {
        self.0
    }
}

struct CacheEntry {
    value: CachedValue,
    stale: bool,
    /// Set while nobody is subscribed; pruning measures idleness from here.
    idle_since: Option<Instant>,
}

struct StoreState {
    entries: LruCache<QueryKey, CacheEntry>,
    max_entries: usize,
    registry: TagRegistry,
    epoch: Epoch,
    /// Epoch of the most recent invalidation of each tag.
    tag_epochs: HashMap<Tag, Epoch>,
    subscribers: HashMap<QueryKey, usize>,
}

impl StoreState {
    fn is_subscribed(&self, key: &QueryKey) -> bool {
        self.subscribers.get(key).copied().unwrap_or(0) > 0
    }

    fn invalidated_since(&self, tag: &Tag, ticket: FetchTicket) -> bool {
        self.tag_epochs
            .get(tag)
            .is_some_and(|epoch| *epoch > ticket.0)
    }

    /// Insert or replace an entry, returning the keys evicted to make room.
    fn put(
        &mut self,
        key: QueryKey,
        value: CachedValue,
        tags: HashSet<Tag>,
        stale: bool,
    ) -> Vec<QueryKey> {
        let idle_since = (!self.is_subscribed(&key)).then(Instant::now);
        self.registry.register(key.clone(), tags);

        let mut evicted = if self.entries.contains(&key) {
            Vec::new()
        } else {
            self.make_room()
        };

        let entry = CacheEntry {
            value,
            stale,
            idle_since,
        };
        if let Some((pushed_out, _)) = self.entries.push(key.clone(), entry)
            && pushed_out != key
        {
            self.registry.unregister(&pushed_out);
            evicted.push(pushed_out);
        }
        evicted
    }

    /// Evict least recently used unsubscribed entries until one more fits.
    ///
    /// Subscribed entries are never evicted; when only those remain the
    /// underlying LRU grows past `max_entries` instead.
    fn make_room(&mut self) -> Vec<QueryKey> {
        let mut evicted = Vec::new();
        while self.entries.len() >= self.max_entries {
            let victim = self
                .entries
                .iter()
                .rev()
                .map(|(key, _)| key)
                .find(|key| !self.is_subscribed(key))
                .cloned();
            let Some(victim) = victim else {
                break;
            };
            self.entries.pop(&victim);
            self.registry.unregister(&victim);
            evicted.push(victim);
        }

        if self.entries.len() >= self.entries.cap().get() {
            let grown = self.entries.cap().saturating_add(1);
            self.entries.resize(grown);
        }
        evicted
    }
}

/// In-memory query cache with tag-driven invalidation.
///
/// Create one per application (or per test) and share it behind an `Arc`.
pub struct QueryStore {
    config: CacheConfig,
    state: Mutex<StoreState>,
    events: broadcast::Sender<CacheEvent>,
}

impl QueryStore {
    pub fn new(config: CacheConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity_non_zero());
        let state = StoreState {
            entries: LruCache::new(config.max_entries_non_zero()),
            max_entries: config.max_entries_non_zero().get(),
            registry: TagRegistry::new(),
            epoch: 0,
            tag_epochs: HashMap::new(),
            subscribers: HashMap::new(),
        };

        Self {
            config,
            state: Mutex::new(state),
            events,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached value for `key` if present and fresh.
    pub fn read(&self, key: &QueryKey) -> Option<CachedValue> {
        let mut state = mutex_lock(&self.state, SOURCE, "read");
        match state.entries.get(key) {
            Some(entry) if !entry.stale => {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(%key, "Cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                counter!(METRIC_CACHE_MISS, "reason" => "stale").increment(1);
                debug!(%key, "Cache entry stale");
                None
            }
            None => {
                counter!(METRIC_CACHE_MISS, "reason" => "absent").increment(1);
                debug!(%key, "Cache miss");
                None
            }
        }
    }

    /// Return the cached value for `key` regardless of freshness.
    pub fn lookup(&self, key: &QueryKey) -> Option<CacheLookup> {
        let state = mutex_lock(&self.state, SOURCE, "lookup");
        state.entries.peek(key).map(|entry| CacheLookup {
            value: entry.value.clone(),
            stale: entry.stale,
        })
    }

    /// Store `value` under `key` as fresh, replacing any previous value and
    /// tag set.
    pub fn write(&self, key: QueryKey, value: CachedValue, tags: HashSet<Tag>) {
        let (epoch, evicted) = {
            let mut state = mutex_lock(&self.state, SOURCE, "write");
            let evicted = state.put(key.clone(), value, tags, false);
            (state.epoch, evicted)
        };

        for key in evicted {
            self.note_evicted(key, epoch);
        }
        self.notify(key, EventKind::Updated, epoch);
    }

    /// Start tracking a network read. The ticket is handed back to
    /// [`QueryStore::complete_fetch`].
    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket(mutex_lock(&self.state, SOURCE, "begin_fetch").epoch)
    }

    /// True when a mutation invalidated `key` after `ticket` was issued, so
    /// a fetch started under that ticket may carry pre-mutation data.
    pub fn is_superseded(&self, key: &QueryKey, ticket: FetchTicket) -> bool {
        mutex_lock(&self.state, SOURCE, "is_superseded").invalidated_since(&key.primary_tag(), ticket)
    }

    /// Store the result of a network read started under `ticket`.
    ///
    /// If any of `tags` was invalidated while the read was in flight the
    /// value is kept but marked stale, so the next read goes back to the
    /// network. Returns whether the value was stored as fresh.
    pub fn complete_fetch(
        &self,
        key: QueryKey,
        value: CachedValue,
        tags: HashSet<Tag>,
        ticket: FetchTicket,
    ) -> bool {
        let (epoch, evicted, fresh) = {
            let mut state = mutex_lock(&self.state, SOURCE, "complete_fetch");
            let superseded = tags.iter().any(|tag| state.invalidated_since(tag, ticket));
            let evicted = state.put(key.clone(), value, tags, superseded);
            (state.epoch, evicted, !superseded)
        };

        for key in evicted {
            self.note_evicted(key, epoch);
        }
        if fresh {
            self.notify(key, EventKind::Updated, epoch);
        } else {
            debug!(%key, ticket = ticket.0, epoch, "Fetched value superseded by invalidation");
            self.notify(key, EventKind::Invalidated, epoch);
        }
        fresh
    }

    /// Mark every entry tagged with `tag` stale. Returns the affected keys.
    pub fn invalidate(&self, tag: &Tag) -> HashSet<QueryKey> {
        self.invalidate_tags(std::slice::from_ref(tag))
    }

    /// Mark every entry tagged with any of `tags` stale in one step.
    pub fn invalidate_tags(&self, tags: &[Tag]) -> HashSet<QueryKey> {
        let (epoch, affected) = {
            let mut state = mutex_lock(&self.state, SOURCE, "invalidate_tags");
            state.epoch += 1;
            let epoch = state.epoch;

            let mut affected = HashSet::new();
            for tag in tags {
                state.tag_epochs.insert(tag.clone(), epoch);
                affected.extend(state.registry.keys_for_tag(tag));
            }
            for key in &affected {
                if let Some(entry) = state.entries.peek_mut(key) {
                    entry.stale = true;
                }
            }
            (epoch, affected)
        };

        counter!(METRIC_CACHE_INVALIDATED).increment(affected.len() as u64);
        debug!(
            tags = ?tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
            affected = affected.len(),
            epoch,
            "Cache tags invalidated"
        );
        for key in &affected {
            self.notify(key.clone(), EventKind::Invalidated, epoch);
        }
        affected
    }

    /// Register interest in `key`. The entry is exempt from idle pruning
    /// until every subscription for it has been dropped.
    pub fn subscribe(self: &Arc<Self>, key: QueryKey) -> Subscription {
        let receiver = self.events.subscribe();
        {
            let mut state = mutex_lock(&self.state, SOURCE, "subscribe");
            *state.subscribers.entry(key.clone()).or_insert(0) += 1;
            if let Some(entry) = state.entries.peek_mut(&key) {
                entry.idle_since = None;
            }
        }
        Subscription::new(key, receiver, Arc::clone(self))
    }

    pub(super) fn release(&self, key: &QueryKey) {
        let mut state = mutex_lock(&self.state, SOURCE, "release");
        let remaining = match state.subscribers.get_mut(key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };
        if remaining == 0 {
            state.subscribers.remove(key);
            if let Some(entry) = state.entries.peek_mut(key) {
                entry.idle_since = Some(Instant::now());
            }
        }
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        mutex_lock(&self.state, SOURCE, "subscriber_count")
            .subscribers
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Evict entries nobody has subscribed to for longer than the configured
    /// keep-unused window. Returns the number of evicted entries.
    pub fn prune_unused(&self) -> usize {
        let now = Instant::now();
        let keep_unused = self.config.keep_unused;
        let (epoch, evicted) = {
            let mut state = mutex_lock(&self.state, SOURCE, "prune_unused");
            let expired: Vec<QueryKey> = state
                .entries
                .iter()
                .filter(|(_, entry)| {
                    entry
                        .idle_since
                        .is_some_and(|since| now.duration_since(since) >= keep_unused)
                })
                .map(|(key, _)| key.clone())
                .collect();

            for key in &expired {
                state.entries.pop(key);
                state.registry.unregister(key);
            }
            (state.epoch, expired)
        };

        let count = evicted.len();
        for key in evicted {
            self.note_evicted(key, epoch);
        }
        count
    }

    /// Tags currently associated with `key`.
    pub fn tags_for(&self, key: &QueryKey) -> HashSet<Tag> {
        mutex_lock(&self.state, SOURCE, "tags_for")
            .registry
            .tags_for_key(key)
    }

    /// Drop every entry and tag mapping. Subscriptions stay registered.
    pub fn clear(&self) {
        let mut state = mutex_lock(&self.state, SOURCE, "clear");
        state.entries.clear();
        state.registry.clear();
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn note_evicted(&self, key: QueryKey, epoch: Epoch) {
        counter!(METRIC_CACHE_EVICT).increment(1);
        debug!(%key, "Cache entry evicted");
        self.notify(key, EventKind::Evicted, epoch);
    }

    fn notify(&self, key: QueryKey, kind: EventKind, epoch: Epoch) {
        // No receivers is the common case for one-shot commands.
        let _ = self.events.send(CacheEvent { key, kind, epoch });
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::time::Duration;

    use shelfmark_api_types::{Book, BookId, BorrowSummaryEntry, Genre};

    use super::*;

    fn sample_book(id: &str, copies: u32) -> Book {
        Book {
            id: BookId::new(id),
            title: format!("Book {id}"),
            author: "Author".to_string(),
            genre: Genre::Fantasy,
            isbn: format!("isbn-{id}"),
            copies,
            available: copies > 0,
            description: None,
        }
    }

    fn store() -> Arc<QueryStore> {
        Arc::new(QueryStore::new(CacheConfig::default()))
    }

    fn write_list(store: &QueryStore, books: Vec<Book>) {
        let value = CachedValue::Books(books);
        let tags = QueryKey::Books.provided_tags(&value);
        store.write(QueryKey::Books, value, tags);
    }

    #[test]
    fn read_returns_fresh_value() {
        let store = store();
        assert!(store.read(&QueryKey::Books).is_none());

        write_list(&store, vec![sample_book("a", 1)]);

        let cached = store.read(&QueryKey::Books).expect("cached list");
        assert_eq!(cached.into_books().map(|books| books.len()), Some(1));
    }

    #[test]
    fn invalidate_marks_tagged_entries_stale() {
        let store = store();
        write_list(&store, vec![sample_book("a", 1), sample_book("b", 2)]);
        let single = CachedValue::Book(sample_book("a", 1));
        let key_a = QueryKey::Book(BookId::new("a"));
        store.write(key_a.clone(), single.clone(), key_a.provided_tags(&single));
        store.write(
            QueryKey::BorrowSummary,
            CachedValue::BorrowSummary(Vec::new()),
            HashSet::from([Tag::BorrowSummary]),
        );

        let affected = store.invalidate(&Tag::Book(BookId::new("a")));

        assert_eq!(affected, HashSet::from([QueryKey::Books, key_a.clone()]));
        assert!(store.read(&QueryKey::Books).is_none());
        assert!(store.read(&key_a).is_none());
        assert!(store.read(&QueryKey::BorrowSummary).is_some());

        let stale = store.lookup(&QueryKey::Books).expect("stale entry kept");
        assert!(stale.stale);
    }

    #[test]
    fn write_after_invalidate_is_fresh_again() {
        let store = store();
        write_list(&store, vec![sample_book("a", 1)]);
        store.invalidate(&Tag::BookList);
        assert!(store.read(&QueryKey::Books).is_none());

        write_list(&store, vec![sample_book("a", 1), sample_book("c", 0)]);
        assert!(store.read(&QueryKey::Books).is_some());
    }

    #[test]
    fn fetch_overtaken_by_invalidation_is_stored_stale() {
        let store = store();
        let ticket = store.begin_fetch();

        store.invalidate(&Tag::BookList);
        assert!(store.is_superseded(&QueryKey::Books, ticket));

        let value = CachedValue::Books(vec![sample_book("a", 3)]);
        let tags = QueryKey::Books.provided_tags(&value);
        let fresh = store.complete_fetch(QueryKey::Books, value, tags, ticket);

        assert!(!fresh);
        assert!(store.read(&QueryKey::Books).is_none());
        assert!(store.lookup(&QueryKey::Books).is_some());
    }

    #[test]
    fn unrelated_invalidation_does_not_supersede_fetch() {
        let store = store();
        let ticket = store.begin_fetch();

        store.invalidate(&Tag::BorrowSummary);
        assert!(!store.is_superseded(&QueryKey::Books, ticket));

        let value = CachedValue::Books(vec![sample_book("a", 3)]);
        let tags = QueryKey::Books.provided_tags(&value);
        assert!(store.complete_fetch(QueryKey::Books, value, tags, ticket));
        assert!(store.read(&QueryKey::Books).is_some());
    }

    #[test]
    fn lru_capacity_evicts_and_unregisters() {
        let store = Arc::new(QueryStore::new(CacheConfig {
            max_entries: 2,
            ..Default::default()
        }));

        for id in ["a", "b", "c"] {
            let key = QueryKey::Book(BookId::new(id));
            let value = CachedValue::Book(sample_book(id, 1));
            let tags = key.provided_tags(&value);
            store.write(key, value, tags);
        }

        assert_eq!(store.len(), 2);
        assert!(store.lookup(&QueryKey::Book(BookId::new("a"))).is_none());
        assert!(store.invalidate(&Tag::Book(BookId::new("a"))).is_empty());
        assert!(store.tags_for(&QueryKey::Book(BookId::new("a"))).is_empty());
    }

    #[test]
    fn lru_capacity_spares_subscribed_entries() {
        let store = Arc::new(QueryStore::new(CacheConfig {
            max_entries: 2,
            ..Default::default()
        }));
        let key_a = QueryKey::Book(BookId::new("a"));
        let watched = store.subscribe(key_a.clone());

        for id in ["a", "b", "c"] {
            let key = QueryKey::Book(BookId::new(id));
            let value = CachedValue::Book(sample_book(id, 1));
            let tags = key.provided_tags(&value);
            store.write(key, value, tags);
        }

        assert_eq!(store.len(), 2);
        assert!(store.lookup(&key_a).is_some());
        assert!(store.lookup(&QueryKey::Book(BookId::new("b"))).is_none());

        // Only subscribed entries left to evict: the store grows instead.
        let watched_c = store.subscribe(QueryKey::Book(BookId::new("c")));
        write_list(&store, vec![sample_book("a", 1)]);
        assert_eq!(store.len(), 3);
        assert!(store.lookup(&key_a).is_some());

        drop(watched);
        drop(watched_c);
        let key_d = QueryKey::Book(BookId::new("d"));
        let value = CachedValue::Book(sample_book("d", 1));
        let tags = key_d.provided_tags(&value);
        store.write(key_d.clone(), value, tags);

        assert_eq!(store.len(), 2);
        assert!(store.lookup(&key_d).is_some());
    }

    #[tokio::test]
    async fn subscribers_receive_key_events() {
        let store = store();
        let mut subscription = store.subscribe(QueryKey::BorrowSummary);

        write_list(&store, vec![sample_book("a", 1)]);
        store.write(
            QueryKey::BorrowSummary,
            CachedValue::BorrowSummary(vec![BorrowSummaryEntry {
                book_title: "Book a".to_string(),
                isbn: "isbn-a".to_string(),
                total_quantity_borrowed: 1,
            }]),
            HashSet::from([Tag::BorrowSummary]),
        );
        store.invalidate(&Tag::BorrowSummary);

        let first = subscription.changed().await.expect("update event");
        assert_eq!(first.key, QueryKey::BorrowSummary);
        assert_eq!(first.kind, EventKind::Updated);

        let second = subscription.changed().await.expect("invalidation event");
        assert_eq!(second.kind, EventKind::Invalidated);
        assert!(subscription.try_changed().is_none());
    }

    #[test]
    fn prune_skips_subscribed_entries() {
        let store = Arc::new(QueryStore::new(CacheConfig {
            keep_unused: Duration::ZERO,
            ..Default::default()
        }));
        let subscription = store.subscribe(QueryKey::Books);
        assert_eq!(store.subscriber_count(&QueryKey::Books), 1);

        write_list(&store, vec![sample_book("a", 1)]);
        store.write(
            QueryKey::BorrowSummary,
            CachedValue::BorrowSummary(Vec::new()),
            HashSet::from([Tag::BorrowSummary]),
        );

        assert_eq!(store.prune_unused(), 1);
        assert!(store.lookup(&QueryKey::Books).is_some());
        assert!(store.lookup(&QueryKey::BorrowSummary).is_none());

        drop(subscription);
        assert_eq!(store.subscriber_count(&QueryKey::Books), 0);
        assert_eq!(store.prune_unused(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn entries_within_keep_window_survive_prune() {
        let store = store();
        write_list(&store, vec![sample_book("a", 1)]);
        assert_eq!(store.prune_unused(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = store();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.state.lock().expect("state lock should be acquired");
            panic!("poison store lock");
        }));

        write_list(&store, vec![sample_book("a", 1)]);
        assert!(store.read(&QueryKey::Books).is_some());
    }
}
