// src/pipeline/validate.rs

use crate::error::Result;
use crate::models::Config;

/// Validate configuration and log the effective values.
pub fn run_validate(config: &Config) -> Result<()> {
    log::info!("Validating configuration...");

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    log::info!("✓ Config OK");
    log::info!("    Source: {}", config.source.base_url);
    log::info!(
        "    App token: {}",
        if config.source.app_token.is_empty() {
            "not set"
        } else {
            "set"
        }
    );
    log::info!("    Timeout: {}s", config.source.timeout_secs);
    match config.source.page_size {
        Some(size) => log::info!("    Page size: {}", size),
        None => log::info!("    Page size: source default"),
    }
    log::info!(
        "    Store: {}.{}",
        config.store.database,
        config.store.collection
    );
    log::info!("    Batch delay: {}ms", config.sync.batch_delay_ms);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(run_validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_reports_error() {
        let mut config = Config::default();
        config.store.database = String::new();
        assert!(run_validate(&config).is_err());
    }
}
