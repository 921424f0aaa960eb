//! Backend factory for engine initialization.
//!
//! ```text
//! BackendFactory
//!   ├── create_embedder() → Arc<FastEmbedEmbedder>
//!   └── create_store(&StoreConfig) → Arc<dyn TacticStore>
//! ```
//!
//! Persistent backends are wrapped in [`ResilientStore`] so transient
//! failures are retried and a dead backend is short-circuited.

use crate::config::{StoreBackendKind, StoreConfig};
use crate::embedding::FastEmbedEmbedder;
use crate::services::deduplication::DedupeEngine;
use crate::storage::{InMemoryStore, ResilientStore, SqliteStore, TacticStore};
use crate::{Error, Result};
use std::sync::Arc;

/// Engine type built by the binary: the default embedder over any store.
pub type DefaultEngine = DedupeEngine<FastEmbedEmbedder, dyn TacticStore>;

/// Factory for creating engines and their backends.
pub struct BackendFactory;

impl BackendFactory {
    /// Creates the embedder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Embedding`] if the model cannot be loaded.
    pub fn create_embedder() -> Result<Arc<FastEmbedEmbedder>> {
        FastEmbedEmbedder::try_new().map(Arc::new)
    }

    /// Creates the store selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the store cannot be opened,
    /// [`Error::InvalidInput`] if the Redis backend has no URL, and
    /// [`Error::FeatureNotEnabled`] if Redis support was not compiled in.
    pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn TacticStore>> {
        match config.backend {
            StoreBackendKind::Memory => {
                tracing::debug!("Using in-memory tactic store");
                Ok(Arc::new(InMemoryStore::new()))
            },
            StoreBackendKind::Sqlite => {
                let store = SqliteStore::new(&config.sqlite_path)?;
                tracing::debug!(path = %config.sqlite_path.display(), "Created SQLite tactic store");
                Ok(Arc::new(ResilientStore::new(store, config.resilience.clone())))
            },
            StoreBackendKind::Redis => Self::create_redis_store(config),
        }
    }

    #[cfg(feature = "redis")]
    fn create_redis_store(config: &StoreConfig) -> Result<Arc<dyn TacticStore>> {
        let url = config.redis_url.as_deref().ok_or_else(|| {
            Error::InvalidInput("redis backend selected but REDIS_URL is not set".to_string())
        })?;
        let store = crate::storage::RedisStore::new(url)?;
        tracing::debug!("Created Redis tactic store");
        Ok(Arc::new(ResilientStore::new(store, config.resilience.clone())))
    }

    #[cfg(not(feature = "redis"))]
    fn create_redis_store(_config: &StoreConfig) -> Result<Arc<dyn TacticStore>> {
        Err(Error::FeatureNotEnabled("redis".to_string()))
    }

    /// Creates an engine from the embedder and the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if either backend cannot be created.
    pub fn create_engine(config: &StoreConfig) -> Result<DefaultEngine> {
        let store = Self::create_store(config)?;
        let embedder = Self::create_embedder()?;
        Ok(DedupeEngine::new(embedder, store))
    }
}
