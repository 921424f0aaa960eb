//! Data models for tactic lists.

mod tactic;

pub use tactic::{ListKey, Tactic, VECS_SUFFIX};

/// Tactics written by `seed` when no seed file is given.
pub const DEFAULT_TACTICS: [&str; 5] = [
    "Mention long-term loyalty (e.g. I have been a loyal customer for 10 years).",
    "Ask to speak to a supervisor or retention team if the first agent refuses.",
    "Stay calm and factual; cite policy or precedent if you know it.",
    "Request a partial gesture (e.g. credit or voucher) if full refund is denied.",
    "If they say no, ask what they can do rather than demanding a specific outcome.",
];
