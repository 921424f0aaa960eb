//! List CLI command.

use super::{io_error, write_list};
use crate::Result;
use crate::embedding::Embedder;
use crate::models::ListKey;
use crate::services::deduplication::DedupeEngine;
use crate::storage::TacticStore;
use std::io::Write;

/// List command handler.
pub struct ListCommand {
    keys: Vec<ListKey>,
}

impl ListCommand {
    /// Creates a list command for `keys`.
    #[must_use]
    pub const fn new(keys: Vec<ListKey>) -> Self {
        Self { keys }
    }

    /// Prints every list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn run<E, S>(&self, engine: &DedupeEngine<E, S>, out: &mut dyn Write) -> Result<()>
    where
        E: Embedder + ?Sized,
        S: TacticStore + ?Sized,
    {
        for key in &self.keys {
            let items = engine.list(key)?;
            write_list(out, key, &items).map_err(|e| io_error("list", e))?;
        }
        Ok(())
    }
}
