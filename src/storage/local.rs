//! Local filesystem storage implementation.
//!
//! Keeps the whole collection in one JSON file for development and offline
//! runs. Production deployments should use `MongoStore`.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── {collection}.json     # { updated_at, count, meters: [...] } sorted by objectId
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::MeterRecord;
use crate::storage::{MeterStore, WriteSummary};

const DEFAULT_COLLECTION: &str = "parking_meters";

/// On-disk shape of the collection file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionData {
    /// ISO 8601 timestamp of last update
    pub updated_at: DateTime<Utc>,
    /// Total meter count
    pub count: usize,
    /// The meters, ordered by objectId
    pub meters: Vec<MeterRecord>,
}

impl CollectionData {
    pub fn new(meters: Vec<MeterRecord>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: meters.len(),
            meters,
        }
    }
}

/// Local filesystem storage backend.
pub struct LocalStore {
    root_dir: PathBuf,
    collection: String,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_collection(root_dir, DEFAULT_COLLECTION)
    }

    /// Create a LocalStore writing `{collection}.json`.
    pub fn with_collection(root_dir: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            collection: collection.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Full path of the collection file.
    pub fn path(&self) -> PathBuf {
        self.root_dir.join(format!("{}.json", self.collection))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let path = self.path();
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read the collection file, returning None if it doesn't exist.
    async fn read_collection(&self) -> Result<Option<CollectionData>> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Load every stored meter, ordered by objectId.
    pub async fn load_all(&self) -> Result<Vec<MeterRecord>> {
        Ok(self
            .read_collection()
            .await?
            .map(|data| data.meters)
            .unwrap_or_default())
    }
}

#[async_trait]
impl MeterStore for LocalStore {
    async fn upsert(&self, records: &[MeterRecord]) -> Result<WriteSummary> {
        let mut summary = WriteSummary {
            requested: records.len(),
            ..WriteSummary::default()
        };
        if records.is_empty() {
            return Ok(summary);
        }

        let _guard = self.write_lock.lock().await;

        let mut by_id: BTreeMap<i64, MeterRecord> = self
            .load_all()
            .await?
            .into_iter()
            .map(|meter| (meter.object_id, meter))
            .collect();

        for record in records {
            match by_id.insert(record.object_id, record.clone()) {
                Some(previous) => {
                    summary.matched += 1;
                    if previous != *record {
                        summary.modified += 1;
                    }
                }
                None => summary.upserted += 1,
            }
        }

        let data = CollectionData::new(by_id.into_values().collect());
        let bytes = serde_json::to_vec_pretty(&data)?;
        self.write_bytes(&bytes).await?;

        log::info!(
            "Local store: matched {}, modified {}, inserted {} ({} total in {})",
            summary.matched,
            summary.modified,
            summary.upserted,
            data.count,
            self.path().display()
        );

        Ok(summary)
    }
}
