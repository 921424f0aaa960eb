//! Compact CLI command.

use super::io_error;
use crate::Result;
use crate::embedding::Embedder;
use crate::models::ListKey;
use crate::services::deduplication::{CompactionSummary, DedupeEngine};
use crate::storage::TacticStore;
use std::io::Write;

/// Compact command handler.
pub struct CompactCommand {
    keys: Vec<ListKey>,
}

impl CompactCommand {
    /// Creates a compact command for `keys`, processed in order.
    #[must_use]
    pub const fn new(keys: Vec<ListKey>) -> Self {
        Self { keys }
    }

    /// Runs the command and returns the summary of each list.
    ///
    /// # Errors
    ///
    /// Stops at the first list that fails; lists compacted before it keep
    /// their new contents.
    pub fn run<E, S>(
        &self,
        engine: &DedupeEngine<E, S>,
        threshold: f32,
        out: &mut dyn Write,
    ) -> Result<Vec<CompactionSummary>>
    where
        E: Embedder + ?Sized,
        S: TacticStore + ?Sized,
    {
        let mut summaries = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let summary = engine.compact(key, threshold)?;
            writeln!(
                out,
                "{key}: kept {}, removed {}, embedded {}",
                summary.kept, summary.removed, summary.embedded
            )
            .map_err(|e| io_error("compact", e))?;
            summaries.push(summary);
        }
        Ok(summaries)
    }
}
