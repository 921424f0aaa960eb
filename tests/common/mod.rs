//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tactic_dedupe::embedding::Embedder;
use tactic_dedupe::storage::{InMemoryStore, TacticStore};
use tactic_dedupe::{Error, Result};

/// Embedder returning fixed vectors for known texts and counting calls.
pub struct MapEmbedder {
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
    model: String,
}

impl MapEmbedder {
    /// Embedder over `(text, vector)` pairs.
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self::with_model(entries, "map-v1")
    }

    /// Same as [`MapEmbedder::new`] with a given model id.
    pub fn with_model(entries: &[(&str, Vec<f32>)], model: &str) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(text, vector)| ((*text).to_string(), vector.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
            model: model.to_string(),
        }
    }

    /// Number of texts embedded so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for MapEmbedder {
    fn dimensions(&self) -> usize {
        self.table.values().next().map_or(2, Vec::len)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| Error::embedding("embed", format!("unknown text '{text}'")))
    }
}

/// Unit vector at angle `theta` (radians).
pub fn at(theta: f32) -> Vec<f32> {
    vec![theta.cos(), theta.sin()]
}

/// Unit vector whose cosine with `[1, 0]` is `similarity`.
pub fn with_similarity(similarity: f32) -> Vec<f32> {
    vec![similarity, (1.0 - similarity * similarity).sqrt()]
}

/// In-memory store that counts reads and writes.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.reads() + self.writes()
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl TacticStore for CountingStore {
    fn backend_name(&self) -> &'static str {
        "counting"
    }

    fn read_list(&self, key: &str) -> Result<Vec<String>> {
        self.read();
        self.inner.read_list(key)
    }

    fn append(&self, key: &str, items: &[String]) -> Result<()> {
        self.write();
        self.inner.append(key, items)
    }

    fn get_fields(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        self.read();
        self.inner.get_fields(key, fields)
    }

    fn put_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.write();
        self.inner.put_field(key, field, value)
    }

    fn delete(&self, keys: &[&str]) -> Result<()> {
        self.write();
        self.inner.delete(keys)
    }

    fn list_keys(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        self.read();
        self.inner.list_keys(prefix, suffix)
    }

    fn append_entry(&self, list_key: &str, item: &str, map_key: &str, value: &str) -> Result<()> {
        self.write();
        self.inner.append_entry(list_key, item, map_key, value)
    }

    fn replace_entries(
        &self,
        list_key: &str,
        map_key: &str,
        entries: &[(String, String)],
    ) -> Result<()> {
        self.write();
        self.inner.replace_entries(list_key, map_key, entries)
    }

    fn remove_entry(&self, list_key: &str, map_key: &str, item: &str) -> Result<bool> {
        self.write();
        self.inner.remove_entry(list_key, map_key, item)
    }
}

/// Seeds the raw list at `key` without going through the engine.
pub fn raw_list(store: &dyn TacticStore, key: &str, items: &[&str]) {
    let items: Vec<String> = items.iter().map(ToString::to_string).collect();
    store.append(key, &items).unwrap();
}
