//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Open data API settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Document store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Sync loop behavior
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override values from a key lookup, normally the process environment.
    ///
    /// Recognized keys: `NYC_API_URL`, `NYC_API_APP_TOKEN`, `MONGODB_URI`,
    /// `MONGODB_DATABASE`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("NYC_API_URL") {
            self.source.base_url = url;
        }
        if let Some(token) = get("NYC_API_APP_TOKEN") {
            self.source.app_token = token;
        }
        if let Some(uri) = get("MONGODB_URI") {
            self.store.uri = uri;
        }
        if let Some(database) = get("MONGODB_DATABASE") {
            self.store.database = database;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.base_url.trim().is_empty() {
            return Err(AppError::validation("source.base_url is empty"));
        }
        url::Url::parse(&self.source.base_url)?;
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.source.page_size == Some(0) {
            return Err(AppError::validation("source.page_size must be > 0"));
        }
        if self.store.uri.trim().is_empty() {
            return Err(AppError::validation("store.uri is empty"));
        }
        if self.store.database.trim().is_empty() {
            return Err(AppError::validation("store.database is empty"));
        }
        if self.store.collection.trim().is_empty() {
            return Err(AppError::validation("store.collection is empty"));
        }
        Ok(())
    }
}

/// Open data API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Dataset resource URL
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Sent as `X-App-Token`
    #[serde(default)]
    pub app_token: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Rows per page (`$limit`); the API default applies when unset
    #[serde(default)]
    pub page_size: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            app_token: String::new(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: None,
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection string
    #[serde(default = "defaults::store_uri")]
    pub uri: String,

    #[serde(default = "defaults::database")]
    pub database: String,

    #[serde(default = "defaults::collection")]
    pub collection: String,

    /// Server selection / connect timeout in seconds
    #[serde(default = "defaults::connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: defaults::store_uri(),
            database: defaults::database(),
            collection: defaults::collection(),
            connect_timeout_secs: defaults::connect_timeout(),
        }
    }
}

/// Sync loop behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Pause between batches in milliseconds
    #[serde(default = "defaults::batch_delay")]
    pub batch_delay_ms: u64,

    /// Meter numbers that get their raw rows logged during normalization
    #[serde(default = "defaults::watched_meters")]
    pub watched_meters: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_delay_ms: defaults::batch_delay(),
            watched_meters: defaults::watched_meters(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn base_url() -> String {
        "https://data.cityofnewyork.us/resource/693u-uax6.json".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; meter-sync/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Store defaults
    pub fn store_uri() -> String {
        "mongodb://localhost:27017".into()
    }
    pub fn database() -> String {
        "parkit".into()
    }
    pub fn collection() -> String {
        "parking_meters".into()
    }
    pub fn connect_timeout() -> u64 {
        10
    }

    // Sync defaults
    pub fn batch_delay() -> u64 {
        100
    }
    pub fn watched_meters() -> Vec<String> {
        vec!["4863002".into()]
    }
}
