//! AWS Lambda entry point for meter-sync
//!
//! Deploy with `cargo lambda build --release --features lambda`
//! and trigger it from an EventBridge schedule.
//!
//! ## Environment Variables
//!
//! - `NYC_API_URL`, `NYC_API_APP_TOKEN`: open data source
//! - `MONGODB_URI`, `MONGODB_DATABASE`: store
//! - `CONFIG_PATH`: optional TOML file bundled with the function
//! - `RUST_LOG`: Log level (e.g., `info`, `debug`)

use lambda_runtime::{Error as LambdaError, service_fn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meter_sync::lambda::handler;

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("meter-sync Lambda starting...");
    lambda_runtime::run(service_fn(handler)).await
}
