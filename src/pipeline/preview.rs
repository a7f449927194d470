// src/pipeline/preview.rs

//! Single-page dry run.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::services::{MeterSource, NormalizedPage, Normalizer};

/// Fetch the page at `offset`, normalize it and report what would be
/// written. Nothing is stored.
pub async fn run_preview(
    source: &dyn MeterSource,
    normalizer: &Normalizer,
    offset: u64,
) -> Result<NormalizedPage> {
    let rows = source.fetch_page(offset).await?;
    let page = normalizer.normalize_page(&rows);

    log::info!(
        "Page at offset {}: {} rows, {} normalized, {} skipped",
        offset,
        rows.len(),
        page.records.len(),
        page.skipped_count()
    );

    let mut reasons: BTreeMap<String, usize> = BTreeMap::new();
    for (_, reason) in &page.skipped {
        *reasons.entry(reason.to_string()).or_default() += 1;
    }
    for (reason, count) in &reasons {
        log::info!("    {count} skipped: {reason}");
    }

    Ok(page)
}
