//! MongoDB storage implementation.
//!
//! Writes go to one collection (default `parking_meters`) through a single
//! unordered bulk write per batch, one replace-with-upsert per record keyed
//! by `objectId`. Indexes are created at connect time:
//!
//! - `{ objectId: 1 }`, unique
//! - `{ location: "2dsphere" }`, for proximity queries

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{Document, doc, to_document};
use mongodb::error::{ErrorKind, PartialBulkWriteResult};
use mongodb::options::{ClientOptions, IndexOptions, ReplaceOneModel};
use mongodb::results::SummaryBulkWriteResult;
use mongodb::{Client, Collection, IndexModel};

use crate::error::{AppError, Result};
use crate::models::{MeterRecord, StoreConfig};
use crate::storage::{MeterStore, WriteSummary};

/// MongoDB-backed meter store.
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect and make sure the collection indexes exist.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.connect_timeout_secs);
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some("meter-sync".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options)?;
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);

        let store = Self { client, collection };
        if let Err(e) = store.ensure_indexes().await {
            store.shutdown().await;
            return Err(e);
        }

        log::info!(
            "Connected to MongoDB collection {}.{}",
            config.database,
            config.collection
        );
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let unique_key = IndexModel::builder()
            .keys(doc! { "objectId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let geo = IndexModel::builder()
            .keys(doc! { "location": "2dsphere" })
            .build();

        self.collection
            .create_indexes([unique_key, geo])
            .await
            .map_err(|e| AppError::store(format!("creating indexes failed: {e}")))?;
        Ok(())
    }

    /// Close all connections. Call once, after the last write.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        log::debug!("MongoDB client shut down");
    }
}

/// Full replacement document for a record.
fn replacement_document(record: &MeterRecord) -> Result<Document> {
    to_document(record).map_err(|e| {
        AppError::store(format!(
            "serializing objectId {} failed: {e}",
            record.object_id
        ))
    })
}

fn summary_of(requested: usize, result: &SummaryBulkWriteResult) -> WriteSummary {
    WriteSummary {
        requested,
        matched: result.matched_count as u64,
        modified: result.modified_count as u64,
        upserted: result.upserted_count as u64,
    }
}

/// One operation the server rejected, by position in the batch.
#[derive(Debug, Clone)]
struct RejectedOp {
    index: usize,
    code: i32,
    message: String,
}

/// Build the error for a failed bulk write.
///
/// Without per-operation failures (write concern or network errors) every
/// record of the batch is reported as failed.
fn write_failure(
    records: &[MeterRecord],
    mut rejected: Vec<RejectedOp>,
    succeeded: WriteSummary,
    fallback: String,
) -> AppError {
    if rejected.is_empty() {
        return AppError::Write {
            failed: records.len(),
            total: records.len(),
            object_ids: records.iter().map(|r| r.object_id).collect(),
            message: fallback,
            succeeded,
        };
    }

    rejected.sort_unstable_by_key(|op| op.index);
    for op in &rejected {
        log::error!(
            "MongoDB write error: {} (code: {}, index: {})",
            op.message,
            op.code,
            op.index
        );
    }

    AppError::Write {
        failed: rejected.len(),
        total: records.len(),
        object_ids: rejected
            .iter()
            .filter_map(|op| records.get(op.index).map(|r| r.object_id))
            .collect(),
        message: rejected[0].message.clone(),
        succeeded,
    }
}

#[async_trait]
impl MeterStore for MongoStore {
    async fn upsert(&self, records: &[MeterRecord]) -> Result<WriteSummary> {
        if records.is_empty() {
            return Ok(WriteSummary::default());
        }

        let namespace = self.collection.namespace();
        let mut models = Vec::with_capacity(records.len());
        for record in records {
            models.push(
                ReplaceOneModel::builder()
                    .namespace(namespace.clone())
                    .filter(doc! { "objectId": record.object_id })
                    .replacement(replacement_document(record)?)
                    .upsert(true)
                    .build(),
            );
        }

        let error = match self.client.bulk_write(models).ordered(false).await {
            Ok(result) => {
                let summary = summary_of(records.len(), &result);
                log::info!(
                    "MongoDB bulk write result - Matched: {}, Modified: {}, Inserted: {}",
                    summary.matched,
                    summary.modified,
                    summary.upserted
                );
                return Ok(summary);
            }
            Err(e) => e,
        };

        let mut succeeded = WriteSummary {
            requested: records.len(),
            ..WriteSummary::default()
        };
        let mut rejected = Vec::new();

        if let ErrorKind::BulkWrite(failure) = error.kind.as_ref() {
            rejected = failure
                .write_errors
                .iter()
                .map(|(index, write_error)| RejectedOp {
                    index: *index,
                    code: write_error.code,
                    message: write_error.message.clone(),
                })
                .collect();
            succeeded = match &failure.partial_result {
                Some(PartialBulkWriteResult::Summary(result)) => {
                    summary_of(records.len(), result)
                }
                Some(PartialBulkWriteResult::Verbose(result)) => {
                    summary_of(records.len(), &result.summary)
                }
                _ => succeeded,
            };
            log::warn!(
                "MongoDB bulk write partial result - Matched: {}, Modified: {}, Inserted: {}",
                succeeded.matched,
                succeeded.modified,
                succeeded.upserted
            );
        }

        Err(write_failure(records, rejected, succeeded, error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActiveDays, ActiveHours, Point, VehicleType};
    use chrono::NaiveTime;

    fn record(object_id: i64) -> MeterRecord {
        MeterRecord {
            object_id,
            meter_number: "4863002".to_string(),
            status: "Active".to_string(),
            pay_by_cell: "4863002".to_string(),
            vehicle_type: VehicleType::Passenger,
            duration_minutes: 60,
            active_days: ActiveDays::default(),
            active_hours: Some(ActiveHours {
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            }),
            is_off_street_facility: false,
            facility_name: String::new(),
            borough: "Brooklyn".to_string(),
            on_street: "ATLANTIC AVENUE".to_string(),
            from_street: "BOND STREET".to_string(),
            to_street: "NEVINS STREET".to_string(),
            side_of_street: "N".to_string(),
            location: Some(Point::new(-73.98, 40.68)),
        }
    }

    fn rejected(index: usize, message: &str) -> RejectedOp {
        RejectedOp {
            index,
            code: 11000,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_replacement_document_shape() {
        let document = replacement_document(&record(311)).unwrap();
        assert_eq!(document.get_i64("objectId").unwrap(), 311);
        assert_eq!(document.get_str("vehicleType").unwrap(), "PAS");

        let location = document.get_document("location").unwrap();
        assert_eq!(location.get_str("type").unwrap(), "Point");
        assert_eq!(location.get_array("coordinates").unwrap().len(), 2);
        assert!(!document.contains_key("_id"));
    }

    #[test]
    fn test_write_failure_maps_indexes_to_object_ids() {
        let records = [record(10), record(20), record(30)];
        let succeeded = WriteSummary {
            requested: 3,
            matched: 1,
            modified: 1,
            upserted: 0,
        };

        let err = write_failure(
            &records,
            vec![rejected(2, "second"), rejected(0, "first"), rejected(7, "stale")],
            succeeded,
            "bulk write failed".to_string(),
        );

        match err {
            AppError::Write {
                failed,
                total,
                object_ids,
                message,
                succeeded: applied,
            } => {
                assert_eq!(failed, 3);
                assert_eq!(total, 3);
                assert_eq!(object_ids, vec![10, 30]);
                assert_eq!(message, "first");
                assert_eq!(applied, succeeded);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_write_failure_without_rejected_ops_blames_whole_batch() {
        let records = [record(1), record(2)];
        let succeeded = WriteSummary {
            requested: 2,
            matched: 0,
            modified: 0,
            upserted: 2,
        };

        let err = write_failure(
            &records,
            Vec::new(),
            succeeded,
            "waiting for replication timed out".to_string(),
        );

        match err {
            AppError::Write {
                failed,
                object_ids,
                message,
                succeeded: applied,
                ..
            } => {
                assert_eq!(failed, 2);
                assert_eq!(object_ids, vec![1, 2]);
                assert_eq!(message, "waiting for replication timed out");
                assert_eq!(applied.upserted, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_write_error_message_reports_applied_counts() {
        let err = write_failure(
            &[record(5)],
            vec![rejected(0, "E11000 duplicate key error")],
            WriteSummary {
                requested: 1,
                ..WriteSummary::default()
            },
            String::new(),
        );
        let text = err.to_string();
        assert!(text.contains("1 of 1 operations failed"), "{text}");
        assert!(text.contains("0 matched and 0 inserted"), "{text}");
    }
}
