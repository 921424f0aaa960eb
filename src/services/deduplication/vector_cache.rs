//! Per-list cache of tactic embeddings.
//!
//! Vectors live in the field map `<list key>:vecs`, one field per tactic
//! text, each holding a JSON record tagged with the model that produced it.
//! The cache is advisory: a missing, undecodable, or foreign-model record is
//! a miss and the vector is recomputed.

use crate::models::ListKey;
use crate::storage::TacticStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct CachedVector {
    model: String,
    vector: Vec<f32>,
}

/// Embedding cache backed by a [`TacticStore`] field map.
pub struct VectorCache<S: TacticStore + ?Sized> {
    store: Arc<S>,
    model_id: String,
    dimensions: usize,
}

impl<S: TacticStore + ?Sized> VectorCache<S> {
    /// Creates a cache for vectors from the model `model_id`.
    #[must_use]
    pub fn new(store: Arc<S>, model_id: impl Into<String>, dimensions: usize) -> Self {
        Self {
            store,
            model_id: model_id.into(),
            dimensions,
        }
    }

    /// Returns the cached vectors of `texts` that are usable.
    ///
    /// Texts without a usable record are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_many(&self, key: &ListKey, texts: &[String]) -> Result<HashMap<String, Vec<f32>>> {
        if texts.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.store.get_fields(&key.vecs_key(), texts)?;
        Ok(texts
            .iter()
            .zip(records)
            .filter_map(|(text, record)| {
                let vector = self.decode(text, record.as_deref()?)?;
                Some((text.clone(), vector))
            })
            .collect())
    }

    /// Caches `vector` as the embedding of `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    pub fn put(&self, key: &ListKey, text: &str, vector: &[f32]) -> Result<()> {
        let record = self.encode(vector)?;
        self.store.put_field(&key.vecs_key(), text, &record)
    }

    /// Deletes every cached vector of the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear(&self, key: &ListKey) -> Result<()> {
        self.store.delete(&[key.vecs_key().as_str()])
    }

    /// Serializes `vector` into a cache record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if serialization fails.
    pub fn encode(&self, vector: &[f32]) -> Result<String> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            model: &'a str,
            vector: &'a [f32],
        }

        serde_json::to_string(&Borrowed {
            model: &self.model_id,
            vector,
        })
        .map_err(|e| Error::OperationFailed {
            operation: "encode_vector".to_string(),
            cause: e.to_string(),
        })
    }

    fn decode(&self, text: &str, record: &str) -> Option<Vec<f32>> {
        let cached: CachedVector = match serde_json::from_str(record) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(tactic = text, error = %e, "Discarding undecodable cached vector");
                return None;
            },
        };
        if cached.model != self.model_id {
            tracing::debug!(
                tactic = text,
                cached_model = %cached.model,
                model = %self.model_id,
                "Cached vector from another model"
            );
            return None;
        }
        if cached.vector.len() != self.dimensions {
            tracing::warn!(
                tactic = text,
                len = cached.vector.len(),
                expected = self.dimensions,
                "Discarding cached vector with wrong dimensions"
            );
            return None;
        }
        Some(cached.vector)
    }
}
