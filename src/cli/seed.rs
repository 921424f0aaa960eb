//! Seed CLI command.

use super::io_error;
use crate::Result;
use crate::embedding::Embedder;
use crate::models::{DEFAULT_TACTICS, ListKey};
use crate::services::deduplication::{CompactionSummary, DedupeEngine};
use crate::storage::TacticStore;
use std::io::Write;

/// Seed command handler.
///
/// Replaces a list with a fixed tactic set.
pub struct SeedCommand {
    key: ListKey,
    tactics: Vec<String>,
}

impl SeedCommand {
    /// Creates a seed of the list at `key` with the built-in default tactics.
    #[must_use]
    pub fn defaults(key: ListKey) -> Self {
        Self::new(key, DEFAULT_TACTICS.iter().map(ToString::to_string).collect())
    }

    /// Creates a seed of the list at `key` with `tactics`.
    #[must_use]
    pub const fn new(key: ListKey, tactics: Vec<String>) -> Self {
        Self { key, tactics }
    }

    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns an error if seeding fails; the list is unchanged then.
    pub fn run<E, S>(
        &self,
        engine: &DedupeEngine<E, S>,
        threshold: f32,
        out: &mut dyn Write,
    ) -> Result<CompactionSummary>
    where
        E: Embedder + ?Sized,
        S: TacticStore + ?Sized,
    {
        let summary = engine.seed(&self.key, &self.tactics, threshold)?;
        writeln!(
            out,
            "{}: seeded {} tactics ({} dropped as duplicates or blank)",
            self.key, summary.kept, summary.removed
        )
        .map_err(|e| io_error("seed", e))?;
        Ok(summary)
    }
}
