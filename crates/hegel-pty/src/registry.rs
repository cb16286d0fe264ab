//! Session registry: the single owner of every live session.
//!
//! The map is shared between the command layer (create, destroy, input,
//! resize) and background threads, so every access goes through one mutex.
//! Lookups hand out a clone of the entry's `Arc` and release the map lock
//! immediately, which keeps a slow PTY write from blocking other sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared handle to one registry entry.
pub type Entry<T> = Arc<Mutex<T>>;

pub struct SessionRegistry<T> {
    entries: Arc<Mutex<HashMap<String, Entry<T>>>>,
}

impl<T> SessionRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // A panic while holding the map lock cannot leave the map half-updated,
    // so a poisoned lock is safe to keep using.
    fn map(&self) -> MutexGuard<'_, HashMap<String, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `value` under `id` unless the id is taken. On conflict the
    /// value is handed back untouched and the existing entry is kept.
    pub fn insert_if_absent(&self, id: &str, value: T) -> Result<Entry<T>, T> {
        let mut map = self.map();
        if map.contains_key(id) {
            return Err(value);
        }
        let entry = Arc::new(Mutex::new(value));
        map.insert(id.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    pub fn get(&self, id: &str) -> Option<Entry<T>> {
        self.map().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map().contains_key(id)
    }

    /// Remove and return an entry. The caller is responsible for tearing it down.
    pub fn remove(&self, id: &str) -> Option<Entry<T>> {
        self.map().remove(id)
    }

    /// Remove every entry, returning them for teardown.
    pub fn drain(&self) -> Vec<(String, Entry<T>)> {
        self.map().drain().collect()
    }

    /// All registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.map().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}

impl<T> Clone for SessionRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a registry entry, recovering from poisoning.
pub(crate) fn lock_entry<T>(entry: &Entry<T>) -> MutexGuard<'_, T> {
    entry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_insert_and_get() {
        let registry = SessionRegistry::new();
        registry.insert_if_absent("a", 1).unwrap();

        let entry = registry.get("a").unwrap();
        assert_eq!(*entry.lock().unwrap(), 1);
        assert!(registry.get("b").is_none());
        assert!(registry.contains("a"));
    }

    #[test]
    fn test_insert_rejects_duplicate_and_keeps_original() {
        let registry = SessionRegistry::new();
        registry.insert_if_absent("a", 1).unwrap();

        let rejected = registry.insert_if_absent("a", 2);
        assert_eq!(rejected.err(), Some(2));
        assert_eq!(*registry.get("a").unwrap().lock().unwrap(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_returns_entry_once() {
        let registry = SessionRegistry::new();
        registry.insert_if_absent("a", 1).unwrap();

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = SessionRegistry::new();
        registry.insert_if_absent("b", 2).unwrap();
        registry.insert_if_absent("a", 1).unwrap();

        let mut drained: Vec<String> = registry.drain().into_iter().map(|(id, _)| id).collect();
        drained.sort();
        assert_eq!(drained, vec!["a", "b"]);
        assert!(registry.is_empty());
        assert!(registry.drain().is_empty());
    }

    #[test]
    fn test_ids_sorted() {
        let registry = SessionRegistry::new();
        for id in ["tab-2", "primary", "tab-1"] {
            registry.insert_if_absent(id, ()).unwrap();
        }
        assert_eq!(registry.ids(), vec!["primary", "tab-1", "tab-2"]);
    }

    #[test]
    fn test_concurrent_inserts_admit_one_winner_per_id() {
        let registry = SessionRegistry::new();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || registry.insert_if_absent(&format!("s{}", i % 4), i).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 4);
        assert_eq!(registry.len(), 4);
    }
}
