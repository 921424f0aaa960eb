//! Deduplication configuration.

use crate::{Error, Result};

/// Default cosine similarity at or above which two tactics are duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.92;

/// Configuration for the deduplication engine.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `TACTIC_DEDUP_THRESHOLD` | f32 | `0.92` | Similarity threshold in [0, 1] |
///
/// # Example
///
/// ```rust
/// use tactic_dedupe::services::deduplication::DedupeConfig;
///
/// let config = DedupeConfig::default();
/// assert!((config.threshold - 0.92).abs() < f32::EPSILON);
///
/// let strict = DedupeConfig::default().with_threshold(0.98);
/// assert!((strict.threshold - 0.98).abs() < f32::EPSILON);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupeConfig {
    /// Similarity threshold; a candidate whose cosine similarity to an
    /// existing tactic reaches it is a duplicate.
    pub threshold: f32,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl DedupeConfig {
    /// Creates a configuration from environment variables.
    ///
    /// Invalid values are ignored with a warning and the default is kept.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("TACTIC_DEDUP_THRESHOLD") {
            match raw.trim().parse::<f32>() {
                Ok(parsed) => match validate_threshold(parsed) {
                    Ok(valid) => self.threshold = valid,
                    Err(e) => tracing::warn!(error = %e, "Ignoring TACTIC_DEDUP_THRESHOLD"),
                },
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring TACTIC_DEDUP_THRESHOLD"),
            }
        }
        self
    }

    /// Sets the similarity threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Checks the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the threshold is outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold).map(|_| ())
    }
}

/// Returns `threshold` if it is a finite value in [0, 1].
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] otherwise.
pub fn validate_threshold(threshold: f32) -> Result<f32> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(Error::InvalidInput(format!(
            "similarity threshold must be within [0, 1], got {threshold}"
        )))
    }
}
