//! Merge CLI command.

use super::io_error;
use crate::Result;
use crate::embedding::Embedder;
use crate::models::ListKey;
use crate::services::deduplication::{DedupeEngine, MergeSummary};
use crate::storage::TacticStore;
use std::io::Write;

/// Merge command handler.
///
/// Folds a source list (typically a session's tactics) into a target list
/// and deletes the source.
pub struct MergeCommand {
    source: ListKey,
    target: ListKey,
}

impl MergeCommand {
    /// Creates a merge of `source` into `target`.
    #[must_use]
    pub const fn new(source: ListKey, target: ListKey) -> Self {
        Self { source, target }
    }

    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the lists are the same or the merge fails; the
    /// source list is kept on failure.
    pub fn run<E, S>(
        &self,
        engine: &DedupeEngine<E, S>,
        threshold: f32,
        out: &mut dyn Write,
    ) -> Result<MergeSummary>
    where
        E: Embedder + ?Sized,
        S: TacticStore + ?Sized,
    {
        let summary = engine.merge(&self.source, &self.target, threshold)?;
        writeln!(
            out,
            "{} -> {}: {} added, {} duplicate, {} skipped",
            self.source, self.target, summary.added, summary.duplicates, summary.skipped
        )
        .map_err(|e| io_error("merge", e))?;
        Ok(summary)
    }
}
