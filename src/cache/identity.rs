//! Weak-valued identity maps
//!
//! Hand out one shared instance per key for as long as any caller holds it.
//! Entries whose value has been dropped are treated as absent. They are
//! pruned when looked up again, and in bulk whenever the map has grown to
//! twice its live size since the last sweep.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

const MIN_SWEEP_SIZE: usize = 64;

struct Entries<K, V> {
    map: HashMap<K, Weak<V>>,
    sweep_at: usize,
}

impl<K: Eq + Hash, V> Entries<K, V> {
    fn sweep(&mut self) -> usize {
        self.map.retain(|_, v| v.strong_count() > 0);
        self.sweep_at = (self.map.len() * 2).max(MIN_SWEEP_SIZE);
        self.map.len()
    }

    fn insert(&mut self, key: K, value: Weak<V>) {
        self.map.insert(key, value);
        if self.map.len() >= self.sweep_at {
            self.sweep();
        }
    }
}

pub struct IdentityMap<K, V> {
    entries: Mutex<Entries<K, V>>,
}

impl<K: Eq + Hash + Clone, V> IdentityMap<K, V> {
    pub fn new() -> Self {
        IdentityMap {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                sweep_at: MIN_SWEEP_SIZE,
            }),
        }
    }

    /// Live value for the key, if one is still referenced
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut entries = self.entries.lock();
        match entries.map.get(key).map(Weak::upgrade) {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.map.remove(key);
                None
            }
            None => None,
        }
    }

    /// Register a value, unless a live value already exists for the key, and
    /// return whichever value is now registered
    pub fn insert(&self, key: K, value: Arc<V>) -> Arc<V> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.map.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        entries.insert(key, Arc::downgrade(&value));
        value
    }

    /// Register a value, replacing any existing one
    pub fn replace(&self, key: K, value: &Arc<V>) {
        self.entries.lock().insert(key, Arc::downgrade(value));
    }

    pub fn remove(&self, key: &K) {
        self.entries.lock().map.remove(key);
    }

    pub fn retain(&self, mut keep: impl FnMut(&K) -> bool) {
        self.entries.lock().map.retain(|k, _| keep(k));
    }

    /// Number of entries, dead ones included
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose value is gone; returns the number of live entries
    pub fn purge(&self) -> usize {
        self.entries.lock().sweep()
    }
}

impl<K: Eq + Hash + Clone, V> Default for IdentityMap<K, V> {
    fn default() -> Self {
        IdentityMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_instance_while_referenced() {
        let map: IdentityMap<u32, String> = IdentityMap::new();
        let first = map.insert(1, Arc::new("one".to_string()));
        let second = map.insert(1, Arc::new("uno".to_string()));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &map.get(&1).unwrap()));
    }

    #[test]
    fn test_dropped_values_are_reclaimed() {
        let map: IdentityMap<u32, String> = IdentityMap::new();
        let value = map.insert(1, Arc::new("one".to_string()));
        map.insert(2, Arc::new("two".to_string()));
        assert_eq!(map.purge(), 1);
        drop(value);
        assert!(map.get(&1).is_none());
        assert_eq!(map.purge(), 0);
    }

    #[test]
    fn test_dead_entries_do_not_accumulate() {
        let map: IdentityMap<u32, String> = IdentityMap::new();
        let kept = map.insert(0, Arc::new("kept".to_string()));
        for key in 1..1000 {
            map.insert(key, Arc::new(key.to_string()));
        }
        assert!(map.len() < MIN_SWEEP_SIZE, "{} entries retained", map.len());
        assert!(Arc::ptr_eq(&kept, &map.get(&0).unwrap()));

        for key in 1000..1100 {
            let value = Arc::new(key.to_string());
            map.replace(key, &value);
        }
        assert!(map.len() < MIN_SWEEP_SIZE);
    }
}
