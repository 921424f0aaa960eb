//! FastEmbed-based embedder.
//!
//! Provides semantic embeddings using the all-MiniLM-L6-v2 model via fastembed-rs.
//! When the `fastembed-embeddings` feature is enabled, this uses real ONNX-based
//! semantic embeddings. Otherwise, falls back to deterministic hash-based pseudo-embeddings.

use super::{DEFAULT_DIMENSIONS, DEFAULT_MODEL, Embedder, normalize_in_place};
use crate::{Error, Result};

// ============================================================================
// Native FastEmbed Implementation (with feature)
// ============================================================================

#[cfg(feature = "fastembed-embeddings")]
mod native {
    use super::{DEFAULT_DIMENSIONS, DEFAULT_MODEL, Embedder, Error, Result, normalize_in_place};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Mutex;
    use std::time::Instant;

    /// `FastEmbed` embedder using all-MiniLM-L6-v2.
    ///
    /// The ONNX model is loaded when the embedder is constructed and owned by
    /// it. Build one per process and share it.
    pub struct FastEmbedEmbedder {
        model: Mutex<fastembed::TextEmbedding>,
    }

    impl FastEmbedEmbedder {
        /// Default embedding dimensions for all-MiniLM-L6-v2.
        pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

        /// Loads the embedding model.
        ///
        /// Blocks while the model is downloaded (first run) and loaded.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Embedding`] if the model cannot be loaded.
        pub fn try_new() -> Result<Self> {
            tracing::info!(model = DEFAULT_MODEL, "Loading embedding model");
            let start = Instant::now();

            let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(false);

            let model = fastembed::TextEmbedding::try_new(options)
                .map_err(|e| Error::embedding("load_embedding_model", e))?;

            tracing::info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                model = DEFAULT_MODEL,
                "Embedding model loaded"
            );

            Ok(Self {
                model: Mutex::new(model),
            })
        }

        fn run(&self, operation: &str, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            let batch_size = texts.len();
            let mut model = self
                .model
                .lock()
                .map_err(|e| Error::embedding(operation, format!("model lock poisoned: {e}")))?;

            // ONNX runtime can panic on internal errors; surface that as an error.
            let result = catch_unwind(AssertUnwindSafe(|| model.embed(texts, None)));

            let mut embeddings = result
                .map_err(|panic_info| {
                    let panic_msg = panic_info
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic_info.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        panic_message = %panic_msg,
                        batch_size,
                        "ONNX runtime panicked during embedding"
                    );
                    Error::embedding(operation, format!("ONNX runtime panic: {panic_msg}"))
                })?
                .map_err(|e| Error::embedding(operation, e))?;

            for embedding in &mut embeddings {
                normalize_in_place(embedding);
            }
            Ok(embeddings)
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dimensions(&self) -> usize {
            Self::DEFAULT_DIMENSIONS
        }

        fn model_id(&self) -> &str {
            DEFAULT_MODEL
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.trim().is_empty() {
                return Err(Error::InvalidInput("Cannot embed empty text".to_string()));
            }

            self.run("embed", vec![text.to_string()])?
                .into_iter()
                .next()
                .ok_or_else(|| Error::embedding("embed", "No embedding returned from model"))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            if texts.iter().any(|t| t.trim().is_empty()) {
                return Err(Error::InvalidInput("Cannot embed empty text".to_string()));
            }

            let owned: Vec<String> = texts.iter().map(|s| (*s).to_string()).collect();
            let embeddings = self.run("embed_batch", owned)?;
            if embeddings.len() != texts.len() {
                return Err(Error::embedding(
                    "embed_batch",
                    format!("expected {} embeddings, got {}", texts.len(), embeddings.len()),
                ));
            }
            Ok(embeddings)
        }
    }
}

// ============================================================================
// Fallback Implementation (without feature)
// ============================================================================

#[cfg(not(feature = "fastembed-embeddings"))]
mod fallback {
    use super::{DEFAULT_DIMENSIONS, Embedder, Error, Result, normalize_in_place};
    use sha2::{Digest, Sha256};

    /// Model identity of the hash-based pseudo-embeddings.
    ///
    /// Bump the version whenever `word_hash` or the vector layout changes,
    /// so vectors cached by an older build are recomputed.
    pub(super) const PSEUDO_MODEL: &str = "pseudo-sha256-v2";

    /// First eight bytes of the SHA-256 digest of `word`, little-endian.
    ///
    /// Stable across platforms and toolchains, unlike `std`'s `DefaultHasher`.
    pub(super) fn word_hash(word: &str) -> u64 {
        let digest = Sha256::digest(word.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }

    /// `FastEmbed` embedder using hash-based pseudo-embeddings.
    ///
    /// Generates deterministic pseudo-embeddings from word hashes. For
    /// production use, enable the `fastembed-embeddings` feature.
    ///
    /// Note: Hash-based embeddings do NOT capture semantic similarity.
    /// Texts sharing most of their words score high; paraphrases do not.
    pub struct FastEmbedEmbedder {
        /// Embedding dimensions.
        dimensions: usize,
    }

    impl FastEmbedEmbedder {
        /// Default embedding dimensions for all-MiniLM-L6-v2.
        pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

        /// Creates a new pseudo embedder.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                dimensions: Self::DEFAULT_DIMENSIONS,
            }
        }

        /// Creates the embedder; mirrors the fallible constructor of the native model.
        ///
        /// # Errors
        ///
        /// Never fails; the signature matches the `fastembed-embeddings` build.
        pub fn try_new() -> Result<Self> {
            Ok(Self::new())
        }

        /// Creates a new embedder with custom dimensions.
        #[must_use]
        pub const fn with_dimensions(dimensions: usize) -> Self {
            Self { dimensions }
        }

        fn pseudo_embed(&self, text: &str) -> Vec<f32> {
            // Bound work on very long inputs.
            const MAX_WORDS: usize = 1000;
            let mut embedding = vec![0.0f32; self.dimensions];

            for (i, word) in text.split_whitespace().take(MAX_WORDS).enumerate() {
                Self::distribute_hash(&mut embedding, word_hash(word), i, self.dimensions);
            }

            normalize_in_place(&mut embedding);
            embedding
        }

        /// Distributes a hash value across embedding dimensions.
        fn distribute_hash(embedding: &mut [f32], hash: u64, word_idx: usize, dimensions: usize) {
            let dims = dimensions as u64;
            let offset = word_idx as u64 % dims;
            for j in 0..8 {
                // Both terms are below `dims`, so the sum cannot overflow.
                let idx = ((hash >> (j * 8)) % dims + offset) % dims;
                let value = ((hash >> (j * 4)) & 0xFF) as f32 / 255.0 - 0.5;
                embedding[idx as usize] += value;
            }
        }
    }

    impl Default for FastEmbedEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_id(&self) -> &str {
            PSEUDO_MODEL
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.dimensions == 0 {
                return Err(Error::embedding("embed", "embedder has zero dimensions"));
            }

            if text.trim().is_empty() {
                return Err(Error::InvalidInput("Cannot embed empty text".to_string()));
            }

            tracing::trace!("Using pseudo-embedding (fastembed-embeddings feature not enabled)");
            Ok(self.pseudo_embed(text))
        }
    }
}

// ============================================================================
// Public Re-exports
// ============================================================================

#[cfg(feature = "fastembed-embeddings")]
pub use native::FastEmbedEmbedder;

#[cfg(not(feature = "fastembed-embeddings"))]
pub use fallback::FastEmbedEmbedder;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::deduplication::cosine_similarity;

    fn embedder() -> FastEmbedEmbedder {
        FastEmbedEmbedder::try_new().unwrap()
    }

    #[test]
    fn test_embedder_dimensions() {
        assert_eq!(embedder().dimensions(), FastEmbedEmbedder::DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_embed_empty_text() {
        let embedder = embedder();
        assert!(matches!(embedder.embed(""), Err(Error::InvalidInput(_))));
        assert!(matches!(embedder.embed("   "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_embed_batch_empty_list() {
        let result = embedder().embed_batch(&[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_embed_deterministic() {
        let embedder = embedder();
        let a = embedder.embed("Stay calm and factual.").unwrap();
        let b = embedder.embed("Stay calm and factual.").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_embed_normalized() {
        let v = embedder().embed("Request a partial gesture.").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
    }

    #[test]
    fn test_embed_self_similarity() {
        let v = embedder().embed("Ask for a supervisor.").unwrap();
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_model_id_not_empty() {
        assert!(!embedder().model_id().is_empty());
    }

    #[cfg(not(feature = "fastembed-embeddings"))]
    mod pseudo {
        use super::super::fallback::word_hash;
        use super::*;

        #[test]
        fn test_pseudo_model_id_differs_from_onnx_model() {
            assert_ne!(FastEmbedEmbedder::new().model_id(), DEFAULT_MODEL);
        }

        #[test]
        fn test_custom_dimensions() {
            let embedder = FastEmbedEmbedder::with_dimensions(16);
            assert_eq!(embedder.embed("Mention loyalty.").unwrap().len(), 16);
        }

        #[test]
        fn test_zero_dimensions_fails() {
            let embedder = FastEmbedEmbedder::with_dimensions(0);
            assert!(matches!(
                embedder.embed("Mention loyalty."),
                Err(Error::Embedding { .. })
            ));
        }

        #[test]
        fn test_word_hash_is_sha256_prefix() {
            // SHA-256("abc") = ba7816bf 8f01cfea ...
            assert_eq!(word_hash("abc"), 0xeacf_018f_bf16_78ba);
        }

        #[test]
        fn test_pinned_vector() {
            let v = FastEmbedEmbedder::with_dimensions(8).embed("abc").unwrap();
            let expected = [
                0.051_115, 0.504_484, 0.808_953, 0.0, 0.0, 0.0, -0.033_336, -0.295_579,
            ];
            for (got, want) in v.iter().zip(expected) {
                assert!((got - want).abs() < 1e-5, "got {v:?}");
            }
        }

        #[test]
        fn test_pseudo_model_id_versioned() {
            assert_eq!(FastEmbedEmbedder::new().model_id(), "pseudo-sha256-v2");
        }

        #[test]
        fn test_word_order_matters() {
            let embedder = FastEmbedEmbedder::new();
            let a = embedder.embed("supervisor ask").unwrap();
            let b = embedder.embed("ask supervisor").unwrap();
            assert_ne!(a, b);
        }
    }
}
