// src/lambda/mod.rs

//! AWS Lambda handler for the sync job.
//!
//! Meant to be triggered on a schedule. Each invocation:
//! 1. Loads configuration from defaults, `CONFIG_PATH` and the environment
//! 2. Connects to MongoDB and ensures the indexes
//! 3. Runs one full sync
//! 4. Shuts the MongoDB client down, whatever the outcome

use std::path::Path;
use std::time::Instant;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::load_config;
use crate::error::Result;
use crate::pipeline::{SyncReport, run_sync};
use crate::storage::MongoStore;

/// Lambda invocation payload. Scheduler events deserialize to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Override the pause between batches
    #[serde(default)]
    pub batch_delay_ms: Option<u64>,
}

/// Lambda response payload for a finished sync.
///
/// A failed sync is returned as an invocation error instead, so the
/// scheduler's retry and error metrics see it.
#[derive(Debug, Default, Serialize)]
pub struct SyncResponse {
    /// Row count reported by the source
    pub total_count: u64,

    /// Records written to the store
    pub total_processed: u64,

    /// Rows dropped during normalization
    pub total_skipped: u64,

    pub batches: usize,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl SyncResponse {
    fn from_report(report: &SyncReport) -> Self {
        Self {
            total_count: report.total_count,
            total_processed: report.total_processed,
            total_skipped: report.total_skipped,
            batches: report.batches,
            execution_time_ms: report.elapsed.as_millis() as u64,
        }
    }
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<SyncRequest>,
) -> std::result::Result<SyncResponse, LambdaError> {
    let start = Instant::now();
    let (request, _context) = event.into_parts();

    info!("Starting sync: batch_delay_ms={:?}", request.batch_delay_ms);

    respond(run(&request).await, start)
}

fn respond(
    result: Result<SyncReport>,
    start: Instant,
) -> std::result::Result<SyncResponse, LambdaError> {
    match result {
        Ok(report) => {
            let response = SyncResponse::from_report(&report);
            info!(
                "Sync completed: {} processed, {} skipped in {}ms",
                response.total_processed, response.total_skipped, response.execution_time_ms
            );
            Ok(response)
        }
        Err(e) => {
            error!(
                "Sync failed after {}ms: {}",
                start.elapsed().as_millis(),
                e
            );
            Err(e.into())
        }
    }
}

/// Internal sync logic.
async fn run(request: &SyncRequest) -> Result<SyncReport> {
    let config_path = std::env::var("CONFIG_PATH").ok();
    let mut config = load_config(config_path.as_deref().map(Path::new));
    if let Some(delay) = request.batch_delay_ms {
        config.sync.batch_delay_ms = delay;
    }
    config.validate()?;

    let store = MongoStore::connect(&config.store).await?;
    let result = run_sync(&config, &store).await;
    store.shutdown().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::pipeline::SyncState;
    use std::time::Duration;

    #[test]
    fn test_scheduler_event_uses_defaults() {
        let request: SyncRequest = serde_json::from_str(
            r#"{"source": "aws.events", "detail-type": "Scheduled Event", "detail": {}}"#,
        )
        .unwrap();
        assert!(request.batch_delay_ms.is_none());
    }

    #[test]
    fn test_response_from_report() {
        let report = SyncReport {
            state: SyncState::Done,
            total_count: 15_000,
            total_processed: 14_950,
            total_fetched: 15_000,
            total_skipped: 50,
            batches: 15,
            elapsed: Duration::from_millis(2_500),
        };

        let response = respond(Ok(report), Instant::now()).unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["total_processed"], 14_950);
        assert_eq!(value["execution_time_ms"], 2_500);
    }

    #[test]
    fn test_failed_sync_is_invocation_error() {
        let cause = AppError::decode("row count", "no count result returned");
        let failure = AppError::sync(SyncState::Counting, 0, cause);

        let err = respond(Err(failure), Instant::now()).unwrap_err();
        assert!(err.to_string().starts_with("Sync failed while counting"), "{err}");
    }
}
