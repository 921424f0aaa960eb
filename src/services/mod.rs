//! Business logic services.
//!
//! Services orchestrate the embedder and storage backends and provide the
//! high-level tactic list operations.

mod backend_factory;
pub mod deduplication;

pub use backend_factory::{BackendFactory, DefaultEngine};
