//! Module declaration and lifecycle

use crate::config::Config;
use crate::domain::clock::Clock;
use crate::infra::storage::{EntityRegistry, SeaOrmEntityStorage};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use sea_orm::{ConnectionTrait, Database};
use std::sync::Arc;

/// Entity storage module
pub struct EntityStorageModule {
    config: RwLock<Config>,
    storage: RwLock<Option<Arc<SeaOrmEntityStorage>>>,
}

impl Default for EntityStorageModule {
    fn default() -> Self {
        Self {
            config: RwLock::new(Config::default()),
            storage: RwLock::new(None),
        }
    }
}

impl EntityStorageModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect, ensure tables for `registry` and build the gateway
    pub async fn init(
        &self,
        config: Config,
        registry: &EntityRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<()> {
        let db = Database::connect(config.connect_options())
            .await
            .with_context(|| format!("failed to connect to {}", config.dsn))?;
        tracing::info!(
            backend = ?db.get_database_backend(),
            version_check = config.version_check,
            "Entity storage connected"
        );

        if config.ensure_schema {
            if registry.is_empty() {
                tracing::warn!("No entities registered, no tables will be created");
            }
            registry
                .ensure_schema(&db)
                .await
                .context("failed to ensure entity tables")?;
        }

        let storage = SeaOrmEntityStorage::new(Arc::new(db), clock)
            .with_version_check(config.version_check);
        *self.storage.write() = Some(Arc::new(storage));
        *self.config.write() = config;

        tracing::info!(tables = ?registry.tables(), "Entity storage initialized");
        Ok(())
    }

    /// Gateway built by [`init`](Self::init)
    pub fn storage(&self) -> Result<Arc<SeaOrmEntityStorage>> {
        self.storage
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Entity storage not initialized"))
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }
}
