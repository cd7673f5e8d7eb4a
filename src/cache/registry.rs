//! Bidirectional tag registry.
//!
//! Tracks the relationship between tags and cache keys, enabling efficient
//! invalidation when an entity changes. The registry holds no lock of its
//! own; the store mutates it under the same guard as the entries so both
//! mappings always change together.

use std::collections::{HashMap, HashSet};

use super::keys::{QueryKey, Tag};

/// Tracks tag → keys and key → tags mappings.
#[derive(Debug, Default)]
pub struct TagRegistry {
    /// Maps tags to all cache keys that depend on them
    tag_to_keys: HashMap<Tag, HashSet<QueryKey>>,
    /// Maps cache keys to all tags they depend on
    key_to_tags: HashMap<QueryKey, HashSet<Tag>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache key with its tags, replacing any previous tag set.
    pub fn register(&mut self, key: QueryKey, tags: HashSet<Tag>) {
        self.unregister(&key);

        for tag in &tags {
            self.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.key_to_tags.insert(key, tags);
    }

    /// Get all cache keys associated with a tag.
    pub fn keys_for_tag(&self, tag: &Tag) -> HashSet<QueryKey> {
        self.tag_to_keys.get(tag).cloned().unwrap_or_default()
    }

    /// Get all tags a cache key depends on.
    pub fn tags_for_key(&self, key: &QueryKey) -> HashSet<Tag> {
        self.key_to_tags.get(key).cloned().unwrap_or_default()
    }

    /// Remove a cache key and clean up tag mappings.
    ///
    /// Called when a cache entry is evicted.
    pub fn unregister(&mut self, key: &QueryKey) {
        if let Some(tags) = self.key_to_tags.remove(key) {
            for tag in tags {
                if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tag_to_keys.remove(&tag);
                    }
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.tag_to_keys.clear();
        self.key_to_tags.clear();
    }

    pub fn tag_count(&self) -> usize {
        self.tag_to_keys.len()
    }

    pub fn key_count(&self) -> usize {
        self.key_to_tags.len()
    }
}
