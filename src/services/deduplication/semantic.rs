//! Semantic similarity matching.
//!
//! Embeds candidates and compares them against existing tactics by cosine
//! similarity. Vectors from [`Embedder`] are unit length, so the similarity
//! is a plain dot product.

use crate::Result;
use crate::embedding::Embedder;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Cosine similarity of two unit vectors.
///
/// Returns `0.0` when either vector is empty or the lengths differ.
///
/// # Example
///
/// ```rust
/// use tactic_dedupe::services::deduplication::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < f32::EPSILON);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
/// assert_eq!(cosine_similarity(&[], &[]), 0.0);
/// ```
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// An existing tactic that a candidate matched.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarMatch {
    /// The existing tactic.
    pub text: String,
    /// Cosine similarity between candidate and `text`.
    pub score: f32,
}

/// Result of checking one candidate against a list.
#[derive(Debug, Clone)]
pub struct NearDuplicateCheck {
    /// First existing tactic, in list order, at or above the threshold.
    pub matched: Option<SimilarMatch>,
    /// The candidate's embedding, for caching when it is admitted.
    pub vector: Vec<f32>,
}

impl NearDuplicateCheck {
    /// Returns `true` if the candidate matched an existing tactic.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        self.matched.is_some()
    }
}

/// Matcher comparing candidates against existing tactics.
pub struct SimilarityMatcher<E: Embedder + ?Sized> {
    embedder: Arc<E>,
}

impl<E: Embedder + ?Sized> SimilarityMatcher<E> {
    /// Creates a matcher using `embedder`.
    #[must_use]
    pub const fn new(embedder: Arc<E>) -> Self {
        Self { embedder }
    }

    /// Embeds `candidate` and compares it against `existing_texts`.
    ///
    /// Only texts with an entry in `existing_vectors` are compared; the
    /// caller is responsible for filling the map beforehand.
    ///
    /// # Errors
    ///
    /// Returns an error if the candidate cannot be embedded.
    #[instrument(skip_all, fields(existing = existing_texts.len(), threshold = threshold))]
    pub fn is_near_duplicate(
        &self,
        candidate: &str,
        existing_texts: &[String],
        existing_vectors: &HashMap<String, Vec<f32>>,
        threshold: f32,
    ) -> Result<NearDuplicateCheck> {
        let vector = self.embedder.embed(candidate)?;
        let matched = first_match(&vector, existing_texts, existing_vectors, threshold);
        Ok(NearDuplicateCheck { matched, vector })
    }
}

/// Returns the first text, in order, whose vector reaches `threshold`.
#[must_use]
pub fn first_match(
    vector: &[f32],
    texts: &[String],
    vectors: &HashMap<String, Vec<f32>>,
    threshold: f32,
) -> Option<SimilarMatch> {
    texts.iter().find_map(|text| {
        let existing = vectors.get(text)?;
        let score = cosine_similarity(vector, existing);
        (score >= threshold).then(|| SimilarMatch {
            text: text.clone(),
            score,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::FastEmbedEmbedder;
    use proptest::prelude::*;

    fn unit(v: &[f32]) -> Vec<f32> {
        let mut v = v.to_vec();
        crate::embedding::normalize_in_place(&mut v);
        v
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_first_match_respects_order() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let mut vectors = HashMap::new();
        vectors.insert("a".to_string(), unit(&[1.0, 0.1]));
        vectors.insert("b".to_string(), unit(&[1.0, 0.0]));

        let found = first_match(&unit(&[1.0, 0.0]), &texts, &vectors, 0.9).unwrap();
        assert_eq!(found.text, "a");
    }

    #[test]
    fn test_first_match_skips_texts_without_vectors() {
        let texts = vec!["a".to_string()];
        assert!(first_match(&[1.0], &texts, &HashMap::new(), 0.0).is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let texts = vec!["a".to_string()];
        let mut vectors = HashMap::new();
        vectors.insert("a".to_string(), vec![0.5, 0.5]);
        let score = cosine_similarity(&[1.0, 0.0], &[0.5, 0.5]);
        assert!(first_match(&[1.0, 0.0], &texts, &vectors, score).is_some());
    }

    #[test]
    fn test_is_near_duplicate_returns_vector() {
        let matcher = SimilarityMatcher::new(Arc::new(FastEmbedEmbedder::try_new().unwrap()));
        let texts = vec!["Stay calm and factual.".to_string()];
        let check = matcher
            .is_near_duplicate("Stay calm and factual.", &texts, &HashMap::new(), 0.92)
            .unwrap();
        assert!(!check.is_duplicate());
        assert!(!check.vector.is_empty());
    }

    fn vector_strategy() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-1.0f32..1.0, 1..32)
            .prop_filter("non-zero", |v| v.iter().any(|x| x.abs() > 1e-3))
            .prop_map(|v| unit(&v))
    }

    proptest! {
        #[test]
        fn prop_reflexive(v in vector_strategy()) {
            prop_assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-4);
        }

        #[test]
        fn prop_symmetric((a, b) in (1usize..32).prop_flat_map(|n| (
            prop::collection::vec(-1.0f32..1.0, n),
            prop::collection::vec(-1.0f32..1.0, n),
        ))) {
            let (a, b) = (unit(&a), unit(&b));
            prop_assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-6);
        }

        #[test]
        fn prop_bounded(v in vector_strategy(), w in vector_strategy()) {
            let s = cosine_similarity(&v, &w);
            prop_assert!((-1.0001..=1.0001).contains(&s));
        }
    }
}
