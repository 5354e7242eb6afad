//! Content key to asset id memoization

use std::collections::HashMap;
use std::fmt;

/// Stable identifier of one content key within an [`AssetIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    /// Raw integer value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// Assigns sequential ids to content keys on first lookup
///
/// Entries are never removed: a key keeps its id for the lifetime of the
/// index, even after the resource it named was purged.
#[derive(Debug)]
pub struct AssetIndex {
    next_id: u64,
    ids: HashMap<String, AssetId>,
}

impl Default for AssetIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ids: HashMap::new(),
        }
    }

    /// Id of `key`, allocated on first use
    pub fn get_id(&mut self, key: &str) -> AssetId {
        if let Some(id) = self.ids.get(key) {
            return *id;
        }

        let id = AssetId(self.next_id);
        self.next_id += 1;
        self.ids.insert(key.to_string(), id);
        id
    }

    /// Id of `key` if it was ever looked up
    pub fn find(&self, key: &str) -> Option<AssetId> {
        self.ids.get(key).copied()
    }

    /// Number of known keys
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no key was ever looked up
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
