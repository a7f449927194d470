//! Storage abstractions for meter persistence.
//!
//! Every backend upserts by `objectId`: a record with a known id fully
//! replaces the stored document, an unknown id is inserted. Nothing is ever
//! deleted.
//!
//! - `MongoStore`: the `parking_meters` collection, with a unique index on
//!   `objectId` and a `2dsphere` index on `location`
//! - `LocalStore`: a single JSON file, for development and offline runs

pub mod local;
#[cfg(feature = "mongo")]
pub mod mongo;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::MeterRecord;

// Re-export for convenience
pub use local::LocalStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;

/// Counts reported by a bulk upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Records handed to the store
    pub requested: usize,
    /// Existing documents matched by `objectId`
    pub matched: u64,
    /// Matched documents whose content changed
    pub modified: u64,
    /// Documents inserted because no match existed
    pub upserted: u64,
}

/// Trait for meter storage backends.
#[async_trait]
pub trait MeterStore: Send + Sync {
    /// Replace-or-insert every record, keyed by `objectId`.
    ///
    /// An empty slice is a successful no-op. Operations that did succeed
    /// within a failing batch stay written.
    async fn upsert(&self, records: &[MeterRecord]) -> Result<WriteSummary>;
}
