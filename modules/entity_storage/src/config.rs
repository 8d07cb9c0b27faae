//! Configuration for entity storage module

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use sea_orm::ConnectOptions;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix, e.g. `ENTITY_STORAGE_DSN`
pub const ENV_PREFIX: &str = "ENTITY_STORAGE_";

/// Entity storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database URL
    #[serde(default = "default_dsn")]
    pub dsn: String,

    /// Pool size; in-memory SQLite is pinned to one connection when unset
    #[serde(default)]
    pub max_connections: Option<u32>,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Log every statement through sqlx
    #[serde(default)]
    pub sqlx_logging: bool,

    /// Create tables of registered entities at init
    #[serde(default = "default_true")]
    pub ensure_schema: bool,

    /// Compare-and-swap on the version column for single-row updates
    #[serde(default)]
    pub version_check: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dsn: default_dsn(),
            max_connections: None,
            connect_timeout: default_connect_timeout(),
            sqlx_logging: false,
            ensure_schema: true,
            version_check: false,
        }
    }
}

impl Config {
    /// Load from an optional YAML file, overridden by `ENTITY_STORAGE_*`
    /// environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX)).extract()
    }

    pub fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.dsn.clone());
        options
            .connect_timeout(self.connect_timeout)
            .sqlx_logging(self.sqlx_logging);

        if let Some(max) = self.max_connections {
            options.max_connections(max);
        } else if self.is_in_memory() {
            // every pooled connection would get its own database
            options.max_connections(1);
        }
        options
    }

    pub fn is_in_memory(&self) -> bool {
        self.dsn.contains(":memory:") || self.dsn.contains("mode=memory")
    }
}

fn default_dsn() -> String {
    "sqlite::memory:".to_owned()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}
