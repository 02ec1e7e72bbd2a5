//! Injected key-value store abstraction.
//!
//! The registry's identity→context mapping and the profile writer's
//! identity→document mapping both go through this trait, so tests can
//! substitute an in-memory fake and production can substitute a
//! persistent store.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Minimal string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
}

/// Process-local in-memory store. Unbounded and lost on restart — entries
/// are never evicted.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries (for monitoring).
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        self.map.write().insert(key.to_owned(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get("absent").is_none());
    }

    #[test]
    fn put_overwrites() {
        let store = MemoryStore::new();
        store.put("k", "first".into());
        store.put("k", "second".into());
        assert_eq!(store.get("k").as_deref(), Some("second"));
        assert_eq!(store.len(), 1);
    }
}
