//! In-memory list store.

use super::traits::TacticStore;
use crate::Result;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    lists: HashMap<String, Vec<String>>,
    maps: HashMap<String, HashMap<String, String>>,
}

/// In-memory list store.
///
/// All records sit behind one mutex, so compound writes are atomic.
/// Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of fields in the map at `key`.
    #[must_use]
    pub fn field_count(&self, key: &str) -> usize {
        self.lock().maps.get(key).map_or(0, HashMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("In-memory store mutex was poisoned, recovering");
                poisoned.into_inner()
            },
        }
    }
}

impl TacticStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn read_list(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.lock().lists.get(key).cloned().unwrap_or_default())
    }

    fn append(&self, key: &str, items: &[String]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.lock()
            .lists
            .entry(key.to_string())
            .or_default()
            .extend(items.iter().cloned());
        Ok(())
    }

    fn get_fields(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        let state = self.lock();
        let map = state.maps.get(key);
        Ok(fields
            .iter()
            .map(|field| map.and_then(|m| m.get(field).cloned()))
            .collect())
    }

    fn put_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.lock()
            .maps
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, keys: &[&str]) -> Result<()> {
        let mut state = self.lock();
        for key in keys {
            state.lists.remove(*key);
            state.maps.remove(*key);
        }
        Ok(())
    }

    fn list_keys(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .lock()
            .lists
            .iter()
            .filter(|(key, list)| {
                !list.is_empty()
                    && key.len() >= prefix.len() + suffix.len()
                    && key.starts_with(prefix)
                    && key.ends_with(suffix)
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    fn append_entry(&self, list_key: &str, item: &str, map_key: &str, value: &str) -> Result<()> {
        let mut state = self.lock();
        state
            .lists
            .entry(list_key.to_string())
            .or_default()
            .push(item.to_string());
        state
            .maps
            .entry(map_key.to_string())
            .or_default()
            .insert(item.to_string(), value.to_string());
        Ok(())
    }

    fn replace_entries(
        &self,
        list_key: &str,
        map_key: &str,
        entries: &[(String, String)],
    ) -> Result<()> {
        let mut state = self.lock();
        state.lists.remove(list_key);
        state.maps.remove(map_key);
        if entries.is_empty() {
            return Ok(());
        }
        state.lists.insert(
            list_key.to_string(),
            entries.iter().map(|(item, _)| item.clone()).collect(),
        );
        state
            .maps
            .insert(map_key.to_string(), entries.iter().cloned().collect());
        Ok(())
    }

    fn remove_entry(&self, list_key: &str, map_key: &str, item: &str) -> Result<bool> {
        let mut state = self.lock();
        let removed = state.lists.get_mut(list_key).is_some_and(|list| {
            let before = list.len();
            list.retain(|existing| existing != item);
            list.len() != before
        });
        if let Some(map) = state.maps.get_mut(map_key) {
            map.remove(item);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_missing_list_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.read_list("nope").unwrap().is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let store = InMemoryStore::new();
        store.append("l", &["a".to_string(), "b".to_string()]).unwrap();
        store.append("l", &["c".to_string()]).unwrap();
        assert_eq!(store.read_list("l").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_get_fields_aligned() {
        let store = InMemoryStore::new();
        store.put_field("m", "a", "1").unwrap();
        let values = store
            .get_fields("m", &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(values, vec![Some("1".to_string()), None]);
    }

    #[test]
    fn test_append_entry_writes_both() {
        let store = InMemoryStore::new();
        store.append_entry("l", "a", "m", "v").unwrap();
        assert_eq!(store.read_list("l").unwrap(), vec!["a"]);
        assert_eq!(store.field_count("m"), 1);
    }

    #[test]
    fn test_replace_entries_drops_stale_fields() {
        let store = InMemoryStore::new();
        store.append_entry("l", "a", "m", "1").unwrap();
        store.append_entry("l", "b", "m", "2").unwrap();
        store
            .replace_entries("l", "m", &entries(&[("b", "2")]))
            .unwrap();
        assert_eq!(store.read_list("l").unwrap(), vec!["b"]);
        assert_eq!(store.field_count("m"), 1);
    }

    #[test]
    fn test_replace_with_nothing_deletes() {
        let store = InMemoryStore::new();
        store.append_entry("l", "a", "m", "1").unwrap();
        store.replace_entries("l", "m", &[]).unwrap();
        assert!(store.read_list("l").unwrap().is_empty());
        assert_eq!(store.field_count("m"), 0);
    }

    #[test]
    fn test_remove_entry() {
        let store = InMemoryStore::new();
        store.append_entry("l", "a", "m", "1").unwrap();
        store.append_entry("l", "b", "m", "2").unwrap();
        assert!(store.remove_entry("l", "m", "a").unwrap());
        assert!(!store.remove_entry("l", "m", "a").unwrap());
        assert_eq!(store.read_list("l").unwrap(), vec!["b"]);
        assert_eq!(store.field_count("m"), 1);
    }

    #[test]
    fn test_list_keys_skips_maps_and_emptied_lists() {
        let store = InMemoryStore::new();
        store.append_entry("session:2:tactics", "a", "session:2:tactics:vecs", "1").unwrap();
        store.append_entry("session:1:tactics", "b", "session:1:tactics:vecs", "1").unwrap();
        store.append_entry("session:3:tactics", "c", "session:3:tactics:vecs", "1").unwrap();
        store.remove_entry("session:3:tactics", "session:3:tactics:vecs", "c").unwrap();
        store.put_field("session:4:tactics", "d", "1").unwrap();

        assert_eq!(
            store.list_keys("session:", ":tactics").unwrap(),
            vec!["session:1:tactics", "session:2:tactics"]
        );
    }

    #[test]
    fn test_delete_multiple_keys() {
        let store = InMemoryStore::new();
        store.append_entry("l", "a", "m", "1").unwrap();
        store.delete(&["l", "m"]).unwrap();
        assert!(store.read_list("l").unwrap().is_empty());
        assert_eq!(store.field_count("m"), 0);
    }
}
