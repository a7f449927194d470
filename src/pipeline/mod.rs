//! Pipeline entry points for sync operations.
//!
//! - `run_sync`: Pull the whole dataset and upsert it into a store
//! - `run_preview`: Fetch and normalize a single page without writing
//! - `run_validate`: Check configuration values

pub mod preview;
pub mod sync;
pub mod validate;

pub use preview::run_preview;
pub use sync::{MeterSync, SyncReport, SyncState, run_sync};
pub use validate::run_validate;
