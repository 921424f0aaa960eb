//! Tactic text and list key types.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to a list key to name its vector cache.
pub const VECS_SUFFIX: &str = ":vecs";

/// A trimmed, non-empty tactic.
///
/// Equality is literal, case-sensitive string equality on the trimmed text.
/// This is the comparison used by the exact-match fast path.
///
/// # Example
///
/// ```rust
/// use tactic_dedupe::models::Tactic;
///
/// let tactic = Tactic::parse("  Mention loyalty.  ").unwrap();
/// assert_eq!(tactic.as_str(), "Mention loyalty.");
/// assert!(Tactic::parse("   ").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tactic(String);

impl Tactic {
    /// Trims `text` and wraps it, or returns `None` when nothing is left.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the tactic text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the tactic and returns the owned text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Tactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tactic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Store key naming one tactic list.
///
/// The list's vector cache lives under [`ListKey::vecs_key`], so a list key
/// may never itself end in [`VECS_SUFFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListKey(String);

impl ListKey {
    /// Base tactic list used by the agent.
    pub const TACTICS: &'static str = "agent:tactics";
    /// Tactics from sessions that succeeded.
    pub const WINNING: &'static str = "agent:winning_tactics";
    /// Tactics from sessions that failed.
    pub const FAILED: &'static str = "agent:failed_tactics";
    /// Prefix of per-session list keys.
    pub const SESSION_PREFIX: &'static str = "session:";
    /// Suffix of per-session list keys.
    pub const SESSION_SUFFIX: &'static str = ":tactics";

    /// Creates a list key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the key is empty after trimming,
    /// or if it ends in [`VECS_SUFFIX`] and would alias another list's cache.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("list key must not be empty".to_string()));
        }
        if trimmed.ends_with(VECS_SUFFIX) {
            return Err(Error::InvalidInput(format!(
                "list key '{trimmed}' ends in '{VECS_SUFFIX}', which names a vector cache"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Key of the base tactic list (`agent:tactics`).
    #[must_use]
    pub fn tactics() -> Self {
        Self(Self::TACTICS.to_string())
    }

    /// Key of the winning tactic list (`agent:winning_tactics`).
    #[must_use]
    pub fn winning() -> Self {
        Self(Self::WINNING.to_string())
    }

    /// Key of the failed tactic list (`agent:failed_tactics`).
    #[must_use]
    pub fn failed() -> Self {
        Self(Self::FAILED.to_string())
    }

    /// Key of the tactics recorded during one session (`session:<id>:tactics`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the session id is empty.
    pub fn session(session_id: &str) -> Result<Self> {
        let id = session_id.trim();
        if id.is_empty() {
            return Err(Error::InvalidInput("session id must not be empty".to_string()));
        }
        Ok(Self(format!("{}{id}{}", Self::SESSION_PREFIX, Self::SESSION_SUFFIX)))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key of this list's vector cache.
    #[must_use]
    pub fn vecs_key(&self) -> String {
        format!("{}{VECS_SUFFIX}", self.0)
    }
}

impl TryFrom<String> for ListKey {
    type Error = Error;

    fn try_from(key: String) -> Result<Self> {
        Self::new(key)
    }
}

impl From<ListKey> for String {
    fn from(key: ListKey) -> Self {
        key.0
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
