//! Rebuild-cache CLI command.

use super::io_error;
use crate::Result;
use crate::embedding::Embedder;
use crate::models::ListKey;
use crate::services::deduplication::DedupeEngine;
use crate::storage::TacticStore;
use std::io::Write;

/// Rebuild-cache command handler.
pub struct RebuildCacheCommand {
    keys: Vec<ListKey>,
}

impl RebuildCacheCommand {
    /// Creates a rebuild of the caches of `keys`.
    #[must_use]
    pub const fn new(keys: Vec<ListKey>) -> Self {
        Self { keys }
    }

    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or a tactic cannot be embedded.
    pub fn run<E, S>(&self, engine: &DedupeEngine<E, S>, out: &mut dyn Write) -> Result<()>
    where
        E: Embedder + ?Sized,
        S: TacticStore + ?Sized,
    {
        for key in &self.keys {
            let count = engine.rebuild_cache(key)?;
            writeln!(
                out,
                "{key}: {count} vectors ({})",
                engine.embedder().model_id()
            )
            .map_err(|e| io_error("rebuild_cache", e))?;
        }
        Ok(())
    }
}
