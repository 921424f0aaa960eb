//! Deduplication engine.
//!
//! Keeps each tactic list free of semantic near-duplicates:
//! 1. **Admission**: a candidate is rejected if it equals an existing tactic
//!    or its embedding reaches the similarity threshold against one
//! 2. **Compaction**: an existing list is folded in order, keeping the first
//!    occurrence of every near-duplicate group
//!
//! A list and its vector cache are always rewritten together through the
//! store's compound writes.

use crate::Result;
use crate::embedding::Embedder;
use crate::models::{ListKey, Tactic};
use crate::storage::TacticStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use super::config::validate_threshold;
use super::semantic::{SimilarityMatcher, cosine_similarity};
use super::types::{AdmitOutcome, CompactionSummary, DuplicateReason, MergeSummary};
use super::vector_cache::VectorCache;

/// Vectors for a set of tactics, plus which of them were computed just now.
struct LoadedVectors {
    vectors: HashMap<String, Vec<f32>>,
    computed: Vec<String>,
}

/// Semantic deduplication engine for tactic lists.
///
/// Owns shared handles to an [`Embedder`] and a [`TacticStore`]; both are
/// constructed by the caller and may be shared by several engines.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tactic_dedupe::embedding::FastEmbedEmbedder;
/// use tactic_dedupe::models::ListKey;
/// use tactic_dedupe::services::deduplication::DedupeEngine;
/// use tactic_dedupe::storage::InMemoryStore;
///
/// let engine = DedupeEngine::new(
///     Arc::new(FastEmbedEmbedder::try_new()?),
///     Arc::new(InMemoryStore::new()),
/// );
/// let key = ListKey::tactics();
/// assert!(engine.admit(&key, "Cite policy.", 0.92)?.is_added());
/// assert!(engine.admit(&key, "", 0.92)?.is_skip());
/// assert_eq!(engine.compact(&key, 0.92)?.removed, 0);
/// # Ok::<(), tactic_dedupe::Error>(())
/// ```
pub struct DedupeEngine<E: Embedder + ?Sized, S: TacticStore + ?Sized> {
    embedder: Arc<E>,
    store: Arc<S>,
    cache: VectorCache<S>,
    matcher: SimilarityMatcher<E>,
}

impl<E: Embedder + ?Sized, S: TacticStore + ?Sized> DedupeEngine<E, S> {
    /// Creates an engine over `store` using `embedder`.
    #[must_use]
    pub fn new(embedder: Arc<E>, store: Arc<S>) -> Self {
        let cache = VectorCache::new(
            Arc::clone(&store),
            embedder.model_id(),
            embedder.dimensions(),
        );
        let matcher = SimilarityMatcher::new(Arc::clone(&embedder));
        Self {
            embedder,
            store,
            cache,
            matcher,
        }
    }

    /// Returns the store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the embedder.
    #[must_use]
    pub const fn embedder(&self) -> &Arc<E> {
        &self.embedder
    }

    /// Admits `candidate` into the list at `key` unless it duplicates an
    /// existing tactic.
    ///
    /// The candidate is trimmed first. A blank candidate is
    /// [`AdmitOutcome::Skip`] and touches neither the store nor the embedder.
    /// Cached vectors missing for existing tactics are computed and cached
    /// before comparison, so every tactic takes part in the check.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for a threshold outside [0, 1],
    /// [`crate::Error::StoreUnavailable`] if the store fails, and
    /// [`crate::Error::Embedding`] if an embedding cannot be computed. The
    /// list is unchanged in every error case.
    #[instrument(
        skip(self, candidate),
        fields(
            operation = "admit",
            key = %key,
            candidate_length = candidate.len()
        )
    )]
    pub fn admit(&self, key: &ListKey, candidate: &str, threshold: f32) -> Result<AdmitOutcome> {
        let start = Instant::now();

        let Some(candidate) = Tactic::parse(candidate) else {
            tracing::debug!("Blank candidate skipped");
            record_admit(&AdmitOutcome::Skip, start);
            return Ok(AdmitOutcome::Skip);
        };
        let threshold = validate_threshold(threshold)?;

        let result = self.admit_trimmed(key, candidate.as_str(), threshold);
        match &result {
            Ok(outcome) => {
                tracing::info!(outcome = %outcome, "Admission checked");
                record_admit(outcome, start);
            },
            Err(e) => {
                tracing::warn!(error = %e, "Admission failed");
                metrics::counter!("tactic_dedupe_errors_total", "operation" => "admit")
                    .increment(1);
            },
        }
        result
    }

    fn admit_trimmed(&self, key: &ListKey, candidate: &str, threshold: f32) -> Result<AdmitOutcome> {
        let existing = self.store.read_list(key.as_str())?;

        if existing.iter().any(|text| text == candidate) {
            return Ok(AdmitOutcome::Duplicate {
                reason: DuplicateReason::ExactMatch,
                matched: candidate.to_string(),
                score: None,
            });
        }

        let loaded = self.load_vectors(key, &existing)?;
        self.persist_computed(key, &loaded)?;

        let check =
            self.matcher
                .is_near_duplicate(candidate, &existing, &loaded.vectors, threshold)?;
        if let Some(found) = check.matched {
            return Ok(AdmitOutcome::Duplicate {
                reason: DuplicateReason::SemanticSimilar,
                matched: found.text,
                score: Some(found.score),
            });
        }

        let record = self.cache.encode(&check.vector)?;
        self.store
            .append_entry(key.as_str(), candidate, &key.vecs_key(), &record)?;
        Ok(AdmitOutcome::Added)
    }

    /// Admits `candidates` one after another, in order.
    ///
    /// Later candidates are checked against earlier ones that were added.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error; earlier admissions stay applied.
    pub fn admit_all<T: AsRef<str>>(
        &self,
        key: &ListKey,
        candidates: &[T],
        threshold: f32,
    ) -> Result<Vec<AdmitOutcome>> {
        candidates
            .iter()
            .map(|candidate| self.admit(key, candidate.as_ref(), threshold))
            .collect()
    }

    /// Removes near-duplicates from the list at `key`.
    ///
    /// Walks the list in order and keeps an entry only if it is neither equal
    /// to nor at least `threshold` similar to an entry kept before it. Blank
    /// entries are dropped. When something is removed, the list and its
    /// cache are replaced in one write; otherwise only vectors that were
    /// missing from the cache are written.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is invalid, the store fails, or an
    /// embedding cannot be computed; the list is unchanged then.
    #[instrument(skip(self), fields(operation = "compact", key = %key))]
    pub fn compact(&self, key: &ListKey, threshold: f32) -> Result<CompactionSummary> {
        let threshold = validate_threshold(threshold)?;
        let start = Instant::now();

        let items = self.store.read_list(key.as_str())?;
        if items.is_empty() {
            return Ok(CompactionSummary::default());
        }

        let loaded = self.load_vectors(key, &items)?;
        let kept = fold_unique(&items, &loaded.vectors, threshold);
        let summary = CompactionSummary {
            removed: items.len() - kept.len(),
            kept: kept.len(),
            embedded: loaded.computed.len(),
        };

        if summary.removed == 0 {
            self.persist_computed(key, &loaded)?;
        } else {
            let entries = kept
                .into_iter()
                .map(|(text, vector)| Ok((text.clone(), self.cache.encode(vector)?)))
                .collect::<Result<Vec<_>>>()?;
            self.store
                .replace_entries(key.as_str(), &key.vecs_key(), &entries)?;
            metrics::counter!("tactic_compact_removed_total").increment(as_u64(summary.removed));
        }

        tracing::info!(
            removed = summary.removed,
            kept = summary.kept,
            embedded = summary.embedded,
            duration_ms = elapsed_ms(start),
            "Compaction finished"
        );
        Ok(summary)
    }

    /// Replaces the list at `key` with `tactics`, near-duplicates removed.
    ///
    /// Every tactic is embedded; the list and a fresh cache are written in
    /// one operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is invalid, the store fails, or an
    /// embedding cannot be computed; the list is unchanged then.
    #[instrument(skip(self, tactics), fields(operation = "seed", key = %key, count = tactics.len()))]
    pub fn seed<T: AsRef<str>>(
        &self,
        key: &ListKey,
        tactics: &[T],
        threshold: f32,
    ) -> Result<CompactionSummary> {
        let threshold = validate_threshold(threshold)?;

        let texts: Vec<String> = tactics
            .iter()
            .filter_map(|t| Tactic::parse(t.as_ref()))
            .map(Tactic::into_string)
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&refs)?;
        metrics::counter!("tactic_embed_computed_total").increment(as_u64(refs.len()));

        let vectors: HashMap<String, Vec<f32>> = texts.iter().cloned().zip(embeddings).collect();
        let kept = fold_unique(&texts, &vectors, threshold);
        let entries = kept
            .into_iter()
            .map(|(text, vector)| Ok((text.clone(), self.cache.encode(vector)?)))
            .collect::<Result<Vec<_>>>()?;

        self.store
            .replace_entries(key.as_str(), &key.vecs_key(), &entries)?;

        let summary = CompactionSummary {
            removed: tactics.len() - entries.len(),
            kept: entries.len(),
            embedded: refs.len(),
        };
        tracing::info!(kept = summary.kept, removed = summary.removed, "List seeded");
        Ok(summary)
    }

    /// Admits every entry of `source` into `target`, in order, then deletes
    /// `source` and its cache.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the lists are the same. On
    /// any other error `source` is kept, so the merge can be re-run;
    /// entries already admitted are recognized as duplicates then.
    #[instrument(skip(self), fields(operation = "merge", source = %source, target = %target))]
    pub fn merge(&self, source: &ListKey, target: &ListKey, threshold: f32) -> Result<MergeSummary> {
        if source == target {
            return Err(crate::Error::InvalidInput(format!(
                "cannot merge list '{source}' into itself"
            )));
        }
        let threshold = validate_threshold(threshold)?;

        let items = self.store.read_list(source.as_str())?;
        let mut summary = MergeSummary::default();
        for item in &items {
            summary.record(&self.admit(target, item, threshold)?);
        }

        self.store
            .delete(&[source.as_str(), source.vecs_key().as_str()])?;

        tracing::info!(
            added = summary.added,
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            "Lists merged"
        );
        Ok(summary)
    }

    /// Removes `text` (trimmed) from the list at `key` together with its
    /// cached vector.
    ///
    /// Returns `true` if the list contained it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self, text), fields(operation = "remove", key = %key))]
    pub fn remove(&self, key: &ListKey, text: &str) -> Result<bool> {
        let Some(tactic) = Tactic::parse(text) else {
            return Ok(false);
        };
        let removed = self
            .store
            .remove_entry(key.as_str(), &key.vecs_key(), tactic.as_str())?;
        tracing::info!(removed, "Tactic removal processed");
        Ok(removed)
    }

    /// Returns the tactics of the list at `key`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list(&self, key: &ListKey) -> Result<Vec<String>> {
        self.store.read_list(key.as_str())
    }

    /// Finds every non-empty `session:<id>:tactics` list, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned.
    pub fn session_lists(&self) -> Result<Vec<ListKey>> {
        let keys = self
            .store
            .list_keys(ListKey::SESSION_PREFIX, ListKey::SESSION_SUFFIX)?;
        Ok(keys.into_iter().filter_map(|key| ListKey::new(key).ok()).collect())
    }

    /// Discards the list's cache and recomputes a vector for every tactic.
    ///
    /// Returns the number of vectors written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or an embedding cannot be
    /// computed. The cache may then be partially filled; later calls
    /// recompute what is missing.
    #[instrument(skip(self), fields(operation = "rebuild_cache", key = %key))]
    pub fn rebuild_cache(&self, key: &ListKey) -> Result<usize> {
        let items = self.store.read_list(key.as_str())?;
        let texts = unique_embeddable(&items, |_| true);
        let embeddings = self.embedder.embed_batch(&texts)?;
        metrics::counter!("tactic_embed_computed_total").increment(as_u64(texts.len()));

        self.cache.clear(key)?;
        for (text, vector) in texts.iter().zip(&embeddings) {
            self.cache.put(key, text, vector)?;
        }

        tracing::info!(vectors = texts.len(), "Vector cache rebuilt");
        Ok(texts.len())
    }

    /// Fetches cached vectors for `texts` and computes the missing ones.
    ///
    /// Blank texts get no vector.
    fn load_vectors(&self, key: &ListKey, texts: &[String]) -> Result<LoadedVectors> {
        let mut vectors = self.cache.get_many(key, texts)?;
        let missing = unique_embeddable(texts, |text| !vectors.contains_key(text));

        if missing.is_empty() {
            return Ok(LoadedVectors {
                vectors,
                computed: Vec::new(),
            });
        }

        tracing::debug!(missing = missing.len(), "Computing uncached vectors");
        let embeddings = self.embedder.embed_batch(&missing)?;
        metrics::counter!("tactic_embed_computed_total").increment(as_u64(missing.len()));

        let computed: Vec<String> = missing.iter().map(|text| (*text).to_string()).collect();
        vectors.extend(computed.iter().cloned().zip(embeddings));
        Ok(LoadedVectors { vectors, computed })
    }

    fn persist_computed(&self, key: &ListKey, loaded: &LoadedVectors) -> Result<()> {
        for text in &loaded.computed {
            if let Some(vector) = loaded.vectors.get(text) {
                self.cache.put(key, text, vector)?;
            }
        }
        Ok(())
    }
}

/// Distinct non-blank texts accepted by `include`, in first-seen order.
fn unique_embeddable<'a>(texts: &'a [String], include: impl Fn(&str) -> bool) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    texts
        .iter()
        .map(String::as_str)
        .filter(|text| !text.trim().is_empty() && include(text) && seen.insert(*text))
        .collect()
}

/// Keeps the first occurrence of every near-duplicate group, in order.
///
/// Entries without a vector are dropped.
fn fold_unique<'a>(
    items: &'a [String],
    vectors: &'a HashMap<String, Vec<f32>>,
    threshold: f32,
) -> Vec<(&'a String, &'a Vec<f32>)> {
    let mut kept: Vec<(&String, &Vec<f32>)> = Vec::new();
    for item in items {
        let Some(vector) = vectors.get(item) else {
            continue;
        };
        let duplicate = kept.iter().any(|(text, existing)| {
            *text == item || cosine_similarity(vector, existing) >= threshold
        });
        if !duplicate {
            kept.push((item, vector));
        }
    }
    kept
}

fn record_admit(outcome: &AdmitOutcome, start: Instant) {
    metrics::counter!("tactic_admit_total", "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!("tactic_dedupe_check_duration_ms")
        .record(start.elapsed().as_secs_f64() * 1000.0);
}

fn as_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
