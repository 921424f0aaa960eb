//! Semantic deduplication of tactic lists.
//!
//! Two texts are near-duplicates when the cosine similarity of their
//! embeddings reaches the threshold (default 0.92). The engine applies that
//! rule at admission time and as a batch compaction of existing lists.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      DedupeEngine                        │
//! │  ┌──────────────────┐  ┌───────────────┐  ┌───────────┐  │
//! │  │ SimilarityMatcher│  │ VectorCache   │  │ Tactic-   │  │
//! │  │                  │  │               │  │ Store     │  │
//! │  │ embed + cosine   │  │ <key>:vecs    │  │ list +    │  │
//! │  │ first match      │  │ model-tagged  │  │ field map │  │
//! │  └──────────────────┘  └───────────────┘  └───────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tactic_dedupe::embedding::FastEmbedEmbedder;
//! use tactic_dedupe::models::ListKey;
//! use tactic_dedupe::services::deduplication::{DedupeConfig, DedupeEngine};
//! use tactic_dedupe::storage::InMemoryStore;
//!
//! let config = DedupeConfig::default();
//! let engine = DedupeEngine::new(
//!     Arc::new(FastEmbedEmbedder::try_new()?),
//!     Arc::new(InMemoryStore::new()),
//! );
//!
//! let key = ListKey::winning();
//! let outcome = engine.admit(&key, "Ask to speak to a supervisor.", config.threshold)?;
//! println!("{outcome}");
//! # Ok::<(), tactic_dedupe::Error>(())
//! ```

mod config;
mod semantic;
mod service;
mod types;
mod vector_cache;

pub use config::{DEFAULT_SIMILARITY_THRESHOLD, DedupeConfig, validate_threshold};
pub use semantic::{
    NearDuplicateCheck, SimilarMatch, SimilarityMatcher, cosine_similarity, first_match,
};
pub use service::DedupeEngine;
pub use types::{AdmitOutcome, CompactionSummary, DuplicateReason, MergeSummary};
pub use vector_cache::VectorCache;
