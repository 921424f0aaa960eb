//! `SQLite` list store.
//!
//! ## Module Structure
//!
//! - [`connection`]: lock acquisition with poison recovery, pragma setup
//! - [`metrics`]: per-operation counters and latency histograms
//! - `store`: the [`SqliteStore`] backend

mod connection;
mod metrics;
mod store;

pub use connection::{acquire_lock, configure_connection};
pub use metrics::record_operation_metrics;
pub use store::SqliteStore;
