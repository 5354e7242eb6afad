//! Asset id to shared resource cache

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::{AssetId, AssetIndex};

/// Shared resources keyed by asset id
pub struct AssetCache<T> {
    assets: HashMap<AssetId, Rc<T>>,
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AssetCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetCache").field("len", &self.assets.len()).finish()
    }
}

impl<T> AssetCache<T> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
        }
    }

    /// Insert or overwrite the entry for `id`
    pub fn add(&mut self, id: AssetId, asset: Rc<T>) {
        self.assets.insert(id, asset);
    }

    /// Shared handle for `id`
    pub fn get(&self, id: AssetId) -> Option<Rc<T>> {
        self.assets.get(&id).cloned()
    }

    /// Whether `id` is cached
    pub fn contains(&self, id: AssetId) -> bool {
        self.assets.contains_key(&id)
    }

    /// Drop every entry the cache holds the only strong reference to
    ///
    /// Returns the number of entries removed. Weak references do not keep an
    /// entry alive.
    pub fn purge(&mut self) -> usize {
        let before = self.assets.len();
        self.assets.retain(|_, asset| Rc::strong_count(asset) > 1);
        before - self.assets.len()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Index and cache for one resource type
pub struct AssetStore<T> {
    index: AssetIndex,
    cache: AssetCache<T>,
}

impl<T> Default for AssetStore<T> {
    fn default() -> Self {
        Self {
            index: AssetIndex::new(),
            cache: AssetCache::new(),
        }
    }
}

impl<T> fmt::Debug for AssetStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetStore")
            .field("keys", &self.index.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl<T> AssetStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of a content key
    pub fn id(&mut self, key: &str) -> AssetId {
        self.index.get_id(key)
    }

    /// Id of a content key and its cached resource, if any
    pub fn lookup(&mut self, key: &str) -> (AssetId, Option<Rc<T>>) {
        let id = self.index.get_id(key);
        (id, self.cache.get(id))
    }

    /// Cached resource for `id`
    pub fn get(&self, id: AssetId) -> Option<Rc<T>> {
        self.cache.get(id)
    }

    /// Cache `asset` under `id`
    pub fn insert(&mut self, id: AssetId, asset: Rc<T>) {
        self.cache.add(id, asset);
    }

    /// See [`AssetCache::purge`]
    pub fn purge(&mut self) -> usize {
        self.cache.purge()
    }

    /// Number of cached resources
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_same_resource() {
        let mut index = AssetIndex::new();
        let mut cache = AssetCache::new();
        let id = index.get_id("greeting");
        let handle = Rc::new(String::from("hello"));

        cache.add(id, Rc::clone(&handle));
        let fetched = cache.get(id).unwrap();
        assert!(Rc::ptr_eq(&fetched, &handle));
        assert!(cache.get(index.get_id("other")).is_none());
    }

    #[test]
    fn test_purge_keeps_referenced_entries() {
        let mut index = AssetIndex::new();
        let mut cache = AssetCache::new();
        let kept_id = index.get_id("kept");
        let dropped_id = index.get_id("dropped");

        let kept = Rc::new(1);
        cache.add(kept_id, Rc::clone(&kept));
        cache.add(dropped_id, Rc::new(2));

        assert_eq!(cache.purge(), 1);
        assert!(cache.contains(kept_id));
        assert!(cache.get(dropped_id).is_none());

        drop(kept);
        assert_eq!(cache.purge(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_weak_references_do_not_pin() {
        let mut cache = AssetCache::new();
        let id = AssetIndex::new().get_id("weak");
        let asset = Rc::new(5u8);
        let weak = Rc::downgrade(&asset);
        cache.add(id, asset);

        assert_eq!(cache.purge(), 1);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_add_overwrites() {
        let mut cache = AssetCache::new();
        let id = AssetIndex::new().get_id("slot");
        cache.add(id, Rc::new("old"));
        cache.add(id, Rc::new("new"));
        assert_eq!(cache.len(), 1);
        assert_eq!(*cache.get(id).unwrap(), "new");
    }
}
