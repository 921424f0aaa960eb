//! Status CLI command.

use super::{io_error, write_list};
use crate::Result;
use crate::embedding::Embedder;
use crate::models::ListKey;
use crate::services::deduplication::DedupeEngine;
use crate::storage::TacticStore;
use std::io::Write;

/// Status command handler.
///
/// Compacts the winning and failed lists, then prints the backend, the
/// embedding model, every well-known list and every pending session list.
pub struct StatusCommand {
    sessions: Vec<ListKey>,
}

impl StatusCommand {
    /// Creates a status command.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sessions: Vec::new(),
        }
    }

    /// Also prints the given session lists, even when they are empty.
    #[must_use]
    pub fn with_sessions(mut self, sessions: Vec<ListKey>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns an error if compaction, the session scan or a store read fails.
    pub fn run<E, S>(
        &self,
        engine: &DedupeEngine<E, S>,
        threshold: f32,
        out: &mut dyn Write,
    ) -> Result<()>
    where
        E: Embedder + ?Sized,
        S: TacticStore + ?Sized,
    {
        let compacted = [ListKey::winning(), ListKey::failed()];
        let mut removed = 0;
        for key in &compacted {
            removed += engine.compact(key, threshold)?.removed;
        }

        let mut sessions = self.sessions.clone();
        for key in engine.session_lists()? {
            if !sessions.contains(&key) {
                sessions.push(key);
            }
        }

        let mut write = || -> std::io::Result<()> {
            writeln!(out, "backend:   {}", engine.store().backend_name())?;
            writeln!(out, "model:     {}", engine.embedder().model_id())?;
            writeln!(out, "threshold: {threshold}")?;
            writeln!(out, "compacted: {removed} removed")?;
            writeln!(out, "sessions:  {}", sessions.len())?;
            Ok(())
        };
        write().map_err(|e| io_error("status", e))?;

        let lists = std::iter::once(ListKey::tactics())
            .chain(compacted)
            .chain(sessions);
        for key in lists {
            let items = engine.list(&key)?;
            writeln!(out).map_err(|e| io_error("status", e))?;
            write_list(out, &key, &items).map_err(|e| io_error("status", e))?;
        }
        Ok(())
    }
}

impl Default for StatusCommand {
    fn default() -> Self {
        Self::new()
    }
}
