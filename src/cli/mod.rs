//! CLI command implementations.
//!
//! This module provides the command-line interface for tactic-dedupe. Each
//! submodule implements one command against a [`DedupeEngine`] and writes its
//! report to a caller-supplied writer, so commands run the same in the binary
//! and in tests.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `add` | Admit tactics from arguments, a file or stdin |
//! | `compact` | Remove near-duplicates from one or more lists |
//! | `list` | Print lists |
//! | `status` | Compact the winning and failed lists, then print all lists |
//! | `seed` | Reset a list to the default (or given) tactics |
//! | `merge` | Admit a source list into a target list, then delete the source |
//! | `remove` | Remove one tactic and its cached vector |
//! | `rebuild-cache` | Drop and recompute a list's vector cache |
//!
//! # Example Usage
//!
//! ```bash
//! # Add a tactic to the default list
//! tactic-dedupe add "Ask for a supervisor."
//!
//! # Fold a session's tactics into the winning list
//! tactic-dedupe merge --session 42 --into agent:winning_tactics
//!
//! # Clean up after changing the threshold
//! tactic-dedupe --threshold 0.9 compact agent:tactics
//! ```

mod add;
mod compact;
mod list;
mod merge;
mod rebuild;
mod remove;
mod seed;
mod status;

pub use add::AddCommand;
pub use compact::CompactCommand;
pub use list::ListCommand;
pub use merge::MergeCommand;
pub use rebuild::RebuildCacheCommand;
pub use remove::RemoveCommand;
pub use seed::SeedCommand;
pub use status::StatusCommand;

use crate::models::ListKey;
use crate::{Error, Result};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Resolves the list a command targets.
///
/// A session id wins over an explicit key; with neither, the shared
/// `agent:tactics` list is used.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an empty key or session id.
pub fn resolve_key(key: Option<&str>, session: Option<&str>) -> Result<ListKey> {
    match (session, key) {
        (Some(session), _) => ListKey::session(session),
        (None, Some(key)) => ListKey::new(key),
        (None, None) => Ok(ListKey::tactics()),
    }
}

/// Reads tactics one per line.
///
/// Lines are trimmed; blank lines and `#` comments are dropped.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the reader fails.
pub fn read_tactics(reader: impl BufRead) -> Result<Vec<String>> {
    let mut tactics = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| io_error("read_tactics", e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        tactics.push(line.to_string());
    }
    Ok(tactics)
}

/// Reads tactics one per line from the file at `path`.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the file cannot be opened or read.
pub fn read_tactics_file(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path).map_err(|e| Error::OperationFailed {
        operation: "open_tactics_file".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    read_tactics(BufReader::new(file))
}

/// Maps a failed write to the report writer.
pub(crate) fn io_error(operation: &str, err: std::io::Error) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: err.to_string(),
    }
}

/// Writes a list as numbered lines, or `(empty)`.
pub(crate) fn write_list(
    out: &mut dyn std::io::Write,
    key: &ListKey,
    items: &[String],
) -> std::io::Result<()> {
    writeln!(out, "{key} ({} tactics)", items.len())?;
    if items.is_empty() {
        writeln!(out, "  (empty)")?;
    }
    for (i, item) in items.iter().enumerate() {
        writeln!(out, "  {:>3}. {item}", i + 1)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixed-vector embedder for command tests.

    use crate::embedding::Embedder;
    use crate::services::deduplication::DedupeEngine;
    use crate::storage::InMemoryStore;
    use crate::{Error, Result};
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Embeds known texts to unit vectors at fixed angles.
    pub struct AngleEmbedder {
        table: HashMap<String, Vec<f32>>,
    }

    impl AngleEmbedder {
        /// Builds an embedder from `(text, angle in radians)` pairs.
        pub fn new(entries: &[(&str, f32)]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(text, theta)| ((*text).to_string(), vec![theta.cos(), theta.sin()]))
                    .collect(),
            }
        }
    }

    impl Embedder for AngleEmbedder {
        fn dimensions(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "angle-v1"
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.table
                .get(text)
                .cloned()
                .ok_or_else(|| Error::embedding("embed", format!("unknown text '{text}'")))
        }
    }

    /// Engine over a fresh in-memory store.
    pub fn engine(entries: &[(&str, f32)]) -> DedupeEngine<AngleEmbedder, InMemoryStore> {
        DedupeEngine::new(
            Arc::new(AngleEmbedder::new(entries)),
            Arc::new(InMemoryStore::new()),
        )
    }

    /// Runs `f` against a byte buffer and returns what it wrote.
    pub fn capture(f: impl FnOnce(&mut dyn std::io::Write) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    #[test]
    fn test_resolve_key_default() {
        assert_eq!(resolve_key(None, None).unwrap(), ListKey::tactics());
    }

    #[test]
    fn test_resolve_key_session_wins() {
        let key = resolve_key(Some("agent:tactics"), Some("42")).unwrap();
        assert_eq!(key.as_str(), "session:42:tactics");
    }

    #[test]
    fn test_resolve_key_rejects_empty() {
        assert!(resolve_key(Some("  "), None).is_err());
    }

    #[test]
    fn test_read_tactics_skips_blank_and_comments() {
        let input = Cursor::new("# seed\n  Cite policy.  \n\n\tAsk for a supervisor.\n");
        let tactics = read_tactics(input).unwrap();
        assert_eq!(tactics, vec!["Cite policy.", "Ask for a supervisor."]);
    }

    #[test]
    fn test_read_tactics_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Stay calm.").unwrap();
        writeln!(file, "Mention loyalty.").unwrap();
        let tactics = read_tactics_file(file.path()).unwrap();
        assert_eq!(tactics.len(), 2);
    }

    #[test]
    fn test_read_tactics_missing_file() {
        let result = read_tactics_file(Path::new("/nonexistent/tactics.txt"));
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_write_list_empty() {
        let mut buf = Vec::new();
        write_list(&mut buf, &ListKey::failed(), &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("agent:failed_tactics (0 tactics)"));
        assert!(text.contains("(empty)"));
    }
}
