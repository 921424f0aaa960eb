//! Add CLI command.

use super::io_error;
use crate::embedding::Embedder;
use crate::models::ListKey;
use crate::services::deduplication::{AdmitOutcome, DedupeEngine, MergeSummary};
use crate::storage::TacticStore;
use crate::{Error, Result};
use serde::Serialize;
use std::io::Write;

/// Add command handler.
///
/// Admits each tactic in order and reports one line per tactic.
pub struct AddCommand {
    key: ListKey,
    tactics: Vec<String>,
    json: bool,
}

/// One JSON report line.
#[derive(Serialize)]
struct AddReport<'a> {
    tactic: &'a str,
    #[serde(flatten)]
    outcome: &'a AdmitOutcome,
}

impl AddCommand {
    /// Creates an add command for `tactics` into the list at `key`.
    #[must_use]
    pub const fn new(key: ListKey, tactics: Vec<String>) -> Self {
        Self {
            key,
            tactics,
            json: false,
        }
    }

    /// Reports outcomes as JSON lines.
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Stops at the first admission error; tactics admitted before it stay
    /// in the list.
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
        let mut summary = MergeSummary::default();
        for tactic in &self.tactics {
            let outcome = engine.admit(&self.key, tactic, threshold)?;
            summary.record(&outcome);
            self.report(out, tactic.trim(), &outcome)?;
        }

        if !self.json {
            writeln!(
                out,
                "{}: {} added, {} duplicate, {} skipped",
                self.key, summary.added, summary.duplicates, summary.skipped
            )
            .map_err(|e| io_error("add", e))?;
        }
        Ok(summary)
    }

    fn report(&self, out: &mut dyn Write, tactic: &str, outcome: &AdmitOutcome) -> Result<()> {
        if self.json {
            let line = serde_json::to_string(&AddReport { tactic, outcome }).map_err(|e| {
                Error::OperationFailed {
                    operation: "add_report".to_string(),
                    cause: e.to_string(),
                }
            })?;
            writeln!(out, "{line}")
        } else {
            writeln!(out, "{outcome}: {tactic}")
        }
        .map_err(|e| io_error("add", e))
    }
}
