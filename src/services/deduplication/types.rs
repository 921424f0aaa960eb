//! Deduplication result types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of admitting one candidate tactic into a list.
///
/// # Example
///
/// ```rust
/// use tactic_dedupe::services::deduplication::{AdmitOutcome, DuplicateReason};
///
/// let outcome = AdmitOutcome::Duplicate {
///     reason: DuplicateReason::ExactMatch,
///     matched: "Cite policy.".to_string(),
///     score: None,
/// };
/// assert!(outcome.is_duplicate());
/// assert_eq!(outcome.as_str(), "duplicate");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdmitOutcome {
    /// The candidate was appended and its vector cached.
    Added,
    /// The candidate matched an existing tactic; nothing was written.
    Duplicate {
        /// Why the candidate was rejected.
        reason: DuplicateReason,
        /// The existing tactic it matched.
        matched: String,
        /// Cosine similarity for semantic matches.
        score: Option<f32>,
    },
    /// The candidate was empty after trimming; nothing was read or written.
    Skip,
}

impl AdmitOutcome {
    /// Returns `true` for [`AdmitOutcome::Added`].
    #[must_use]
    pub const fn is_added(&self) -> bool {
        matches!(self, Self::Added)
    }

    /// Returns `true` for [`AdmitOutcome::Duplicate`].
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Returns `true` for [`AdmitOutcome::Skip`].
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    /// Returns the outcome label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Duplicate { .. } => "duplicate",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for AdmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate {
                reason,
                matched,
                score: Some(score),
            } => write!(f, "duplicate ({reason}, {score:.3}) of \"{matched}\""),
            Self::Duplicate {
                reason, matched, ..
            } => write!(f, "duplicate ({reason}) of \"{matched}\""),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Reason a candidate was identified as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
    /// The trimmed candidate equals an existing tactic byte for byte.
    ExactMatch,
    /// Cosine similarity reached the threshold.
    SemanticSimilar,
}

impl DuplicateReason {
    /// Returns the reason label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::SemanticSimilar => "semantic_similar",
        }
    }
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of compacting (or seeding) a list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionSummary {
    /// Entries dropped as duplicates of an earlier entry.
    pub removed: usize,
    /// Entries left in the list.
    pub kept: usize,
    /// Vectors computed because the cache lacked them.
    pub embedded: usize,
}

/// Result of merging one list into another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    /// Source entries appended to the target.
    pub added: usize,
    /// Source entries rejected as duplicates.
    pub duplicates: usize,
    /// Blank source entries.
    pub skipped: usize,
}

impl MergeSummary {
    /// Counts one admission outcome.
    pub fn record(&mut self, outcome: &AdmitOutcome) {
        match outcome {
            AdmitOutcome::Added => self.added += 1,
            AdmitOutcome::Duplicate { .. } => self.duplicates += 1,
            AdmitOutcome::Skip => self.skipped += 1,
        }
    }
}
