// src/config.rs

//! Configuration loading utilities.
//!
//! Startup wiring only: reads the `.env` file, the TOML file and the process
//! environment once, and hands a plain [`Config`] to everything else.

use std::path::Path;

use crate::models::Config;

/// Load variables from a `.env` file in the working directory, if present.
pub fn load_env_file() {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
    }
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides.
///
/// A missing or invalid file falls back to defaults.
pub fn load_config(path: Option<&Path>) -> Config {
    let mut config = match path {
        Some(path) => Config::load_or_default(path),
        None => Config::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    config
}
