//! Storage layer.
//!
//! Every tactic list is an ordered list of texts plus a field map holding its
//! vector cache. [`TacticStore`] abstracts the backends that hold both:
//! in-memory, `SQLite`, and Redis (feature `redis`). [`ResilientStore`] adds
//! retry and circuit breaking in front of any of them.

// Allow significant_drop_tightening - connection guards are held for whole statements.
#![allow(clippy::significant_drop_tightening)]

mod memory;
#[cfg(feature = "redis")]
mod redis;
pub mod resilience;
pub mod sqlite;
mod traits;

pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
pub use resilience::{ResilientStore, StoreResilienceConfig, retry_connection};
pub use sqlite::SqliteStore;
pub use traits::TacticStore;
