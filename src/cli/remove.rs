//! Remove CLI command.

use super::io_error;
use crate::Result;
use crate::embedding::Embedder;
use crate::models::ListKey;
use crate::services::deduplication::DedupeEngine;
use crate::storage::TacticStore;
use std::io::Write;

/// Remove command handler.
pub struct RemoveCommand {
    key: ListKey,
    text: String,
}

impl RemoveCommand {
    /// Creates a removal of `text` from the list at `key`.
    #[must_use]
    pub const fn new(key: ListKey, text: String) -> Self {
        Self { key, text }
    }

    /// Runs the command and returns whether the tactic was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn run<E, S>(&self, engine: &DedupeEngine<E, S>, out: &mut dyn Write) -> Result<bool>
    where
        E: Embedder + ?Sized,
        S: TacticStore + ?Sized,
    {
        let removed = engine.remove(&self.key, &self.text)?;
        let verb = if removed { "removed" } else { "not found" };
        writeln!(out, "{verb}: {}", self.text.trim()).map_err(|e| io_error("remove", e))?;
        Ok(removed)
    }
}
