//! # tactic-dedupe
//!
//! Semantic deduplication for growing lists of short tactic recommendations.
//!
//! A tactic list only grows when a candidate says something new. Each candidate
//! is embedded, compared by cosine similarity against the cached vectors of the
//! entries already kept, and admitted only when nothing in the list is at or
//! above the configured threshold. Existing lists can be compacted under the
//! same rule, keeping the earliest entry of every near-duplicate cluster.
//!
//! ## Features
//!
//! - Incremental admission with an exact-match fast path
//! - Idempotent, order-preserving compaction
//! - Per-list vector cache tagged with the embedding model identity
//! - Pluggable list stores (in-memory, `SQLite`, Redis) with atomic list+cache writes
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tactic_dedupe::embedding::FastEmbedEmbedder;
//! use tactic_dedupe::models::ListKey;
//! use tactic_dedupe::storage::InMemoryStore;
//! use tactic_dedupe::{AdmitOutcome, DedupeEngine};
//!
//! let embedder = Arc::new(FastEmbedEmbedder::try_new()?);
//! let engine = DedupeEngine::new(embedder, Arc::new(InMemoryStore::new()));
//! let key = ListKey::new("agent:tactics")?;
//!
//! let first = engine.admit(&key, "Cite policy.", 0.92)?;
//! assert_eq!(first, AdmitOutcome::Added);
//! let second = engine.admit(&key, "  Cite policy.  ", 0.92)?;
//! assert!(second.is_duplicate());
//! # Ok::<(), tactic_dedupe::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod embedding;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::TacticConfig;
pub use embedding::Embedder;
pub use models::{ListKey, Tactic};
pub use services::deduplication::{
    AdmitOutcome, CompactionSummary, DedupeConfig, DedupeEngine, DuplicateReason, MergeSummary,
};
pub use storage::TacticStore;

/// Error type for tactic deduplication.
///
/// Empty candidates and duplicates are not errors: they surface as
/// [`AdmitOutcome::Skip`] and [`AdmitOutcome::Duplicate`]. Only store and
/// embedder failures abort an operation.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Threshold outside [0, 1], empty list key, empty text handed to an embedder |
/// | `StoreUnavailable` | Connection, query or transaction failure in a list store |
/// | `Embedding` | Model load or inference failure |
/// | `OperationFailed` | Config file, log file or subscriber initialization failures |
/// | `FeatureNotEnabled` | Selecting a backend that was not compiled in |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The list store could not complete an operation.
    ///
    /// Raised when:
    /// - The Redis server is unreachable or a command fails
    /// - A `SQLite` statement or transaction fails
    /// - A stored value cannot be decoded
    #[error("store operation '{operation}' failed: {cause}")]
    StoreUnavailable {
        /// The store operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The embedding provider failed.
    ///
    /// Raised when:
    /// - The ONNX model cannot be downloaded or loaded
    /// - Inference fails or returns no vector
    #[error("embedding operation '{operation}' failed: {cause}")]
    Embedding {
        /// The embedding operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A non-store operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

impl Error {
    /// Builds a [`Error::StoreUnavailable`] from any displayable cause.
    pub fn store(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Builds an [`Error::Embedding`] from any displayable cause.
    pub fn embedding(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Embedding {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Returns true for errors that abort an operation without a partial write.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::Embedding { .. })
    }
}

/// Result type alias for tactic operations.
pub type Result<T> = std::result::Result<T, Error>;
