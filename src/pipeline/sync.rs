// src/pipeline/sync.rs

//! Full-dataset sync loop.
//!
//! ```text
//! Init -> Counting -> Fetching -> Writing -> (Advancing -> Fetching)* -> Done
//!             \           \          \
//!              +-----------+----------+--> Failed
//! ```
//!
//! Batches run strictly one after another. The offset advances by the raw
//! page size so pagination stays aligned with the source no matter how many
//! rows normalization drops. An empty page always ends the run, even when the
//! reported total has not been reached.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{AppError, Result};
use crate::models::{Config, SyncConfig};
use crate::services::{MeterSource, Normalizer, OpenDataClient};
use crate::storage::MeterStore;
use crate::utils::{format_elapsed, percent};

/// Where a sync run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Init,
    Counting,
    Fetching,
    Writing,
    Advancing,
    Done,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Init => "init",
            SyncState::Counting => "counting",
            SyncState::Fetching => "fetching",
            SyncState::Writing => "writing",
            SyncState::Advancing => "advancing",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Summary of a finished sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub state: SyncState,
    /// Row count the source reported up front
    pub total_count: u64,
    /// Records handed to the store
    pub total_processed: u64,
    /// Raw rows received
    pub total_fetched: u64,
    /// Raw rows dropped by normalization
    pub total_skipped: u64,
    /// Non-empty pages written
    pub batches: usize,
    pub elapsed: Duration,
}

impl SyncReport {
    fn new(total_count: u64) -> Self {
        Self {
            state: SyncState::Init,
            total_count,
            total_processed: 0,
            total_fetched: 0,
            total_skipped: 0,
            batches: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Drives one full pass over the source dataset into a store.
pub struct MeterSync<'a> {
    source: &'a dyn MeterSource,
    store: &'a dyn MeterStore,
    normalizer: Normalizer,
    batch_delay: Duration,
    state: SyncState,
}

impl<'a> MeterSync<'a> {
    pub fn new(source: &'a dyn MeterSource, store: &'a dyn MeterStore, config: &SyncConfig) -> Self {
        Self {
            source,
            store,
            normalizer: Normalizer::from_config(config),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            state: SyncState::Init,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    fn transition(&mut self, next: SyncState) {
        log::debug!("Sync state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Record the failure and wrap the cause with the state it happened in.
    fn fail(&mut self, batch: usize, cause: AppError) -> AppError {
        let failed_in = self.state;
        self.transition(SyncState::Failed);
        AppError::sync(failed_in, batch, cause)
    }

    /// Run the sync to completion.
    pub async fn run(&mut self) -> Result<SyncReport> {
        let started = Instant::now();

        self.transition(SyncState::Counting);
        let total_count = match self.source.fetch_total_count().await {
            Ok(count) => count,
            Err(e) => return Err(self.fail(0, e)),
        };
        log::info!("Starting sync of {} parking meters...", total_count);

        let mut report = SyncReport::new(total_count);
        let mut offset: u64 = 0;
        let mut batch: usize = 1;

        loop {
            self.transition(SyncState::Fetching);
            log::info!(
                "Fetching batch {} (offset: {}, progress: {:.1}%)...",
                batch,
                offset,
                percent(report.total_processed, total_count)
            );

            let rows = match self.source.fetch_page(offset).await {
                Ok(rows) => rows,
                Err(e) => return Err(self.fail(batch, e)),
            };

            if rows.is_empty() {
                log::info!("Empty page at offset {}, source exhausted", offset);
                break;
            }

            let page = self.normalizer.normalize_page(&rows);

            self.transition(SyncState::Writing);
            if let Err(e) = self.store.upsert(&page.records).await {
                return Err(self.fail(batch, e));
            }

            self.transition(SyncState::Advancing);
            offset += rows.len() as u64;
            report.total_fetched += rows.len() as u64;
            report.total_processed += page.records.len() as u64;
            report.total_skipped += page.skipped_count() as u64;
            report.batches = batch;

            log::info!(
                "Processed batch {}: {} meters, {} skipped (total: {}, {:.1}% complete, {} elapsed)",
                batch,
                page.records.len(),
                page.skipped_count(),
                report.total_processed,
                percent(report.total_processed, total_count),
                format_elapsed(started.elapsed())
            );

            if report.total_processed >= total_count {
                break;
            }

            batch += 1;
            if !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        self.transition(SyncState::Done);
        report.state = SyncState::Done;
        report.elapsed = started.elapsed();

        log::info!(
            "Sync completed. Processed {} meters ({} skipped) in {}",
            report.total_processed,
            report.total_skipped,
            format_elapsed(report.elapsed)
        );

        Ok(report)
    }
}

/// Sync the configured open data source into `store`.
pub async fn run_sync(config: &Config, store: &dyn MeterStore) -> Result<SyncReport> {
    let source = OpenDataClient::new(&config.source)?;
    MeterSync::new(&source, store, &config.sync).run().await
}
