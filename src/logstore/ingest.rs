//! Log ingestion
//!
//! Normalizes entries and submits them as one bulk insert. Storage failures
//! are reported through the returned counts and never surface as errors, so
//! recording telemetry cannot break the caller's request path.

use super::error::ValidationError;
use super::model::{NewLogEntry, NormalizedEntry};
use super::storage::LogStorage;
use crate::metrics;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of an ingestion call; `accepted + failed` always equals the batch size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: u64,
    pub failed: u64,
}

impl IngestReport {
    pub fn total(&self) -> u64 {
        self.accepted + self.failed
    }
}

/// Batch ingester in front of the storage adapter
pub struct LogIngester {
    storage: Arc<dyn LogStorage>,
}

impl LogIngester {
    pub fn new(storage: Arc<dyn LogStorage>) -> Self {
        Self { storage }
    }

    /// Normalize and bulk-insert a batch
    ///
    /// The only error is a validation error (empty batch). Storage failures
    /// are folded into `IngestReport::failed`.
    pub async fn insert_many(
        &self,
        entries: Vec<NewLogEntry>,
    ) -> Result<IngestReport, ValidationError> {
        if entries.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }

        let now = Utc::now();
        let normalized: Vec<NormalizedEntry> =
            entries.into_iter().map(|entry| entry.normalize(now)).collect();

        Ok(self.insert_normalized(&normalized).await)
    }

    /// Ingest a single entry
    pub async fn insert_one(&self, entry: NewLogEntry) -> IngestReport {
        let normalized = [entry.normalize(Utc::now())];
        self.insert_normalized(&normalized).await
    }

    async fn insert_normalized(&self, entries: &[NormalizedEntry]) -> IngestReport {
        let submitted = entries.len() as u64;

        let report = match self.storage.insert_batch(entries).await {
            Ok(written) => {
                let accepted = written.min(submitted);
                IngestReport {
                    accepted,
                    failed: submitted - accepted,
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    count = submitted,
                    "Failed to insert log batch"
                );
                IngestReport {
                    accepted: 0,
                    failed: submitted,
                }
            }
        };

        tracing::debug!(
            accepted = report.accepted,
            failed = report.failed,
            "Ingested log batch"
        );
        metrics::record_ingested(report.accepted, report.failed);

        report
    }
}
