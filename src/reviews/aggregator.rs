//! Merging stored review batches into one result

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::ReviewRecord;
use super::storage::{ReviewStore, StorageError};

/// Every review found in intermediate storage at aggregation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Records from all batches, in store enumeration order
    pub records: Vec<ReviewRecord>,

    /// Where the result artifact was written
    pub artifact: String,
}

/// Consumes stored batches and persists the merged result
pub struct Aggregator<S> {
    store: Arc<S>,
}

impl<S: ReviewStore> Aggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Merge every stored batch and write the result artifact
    ///
    /// With `delete_after_read` each batch is removed right after it is
    /// loaded, so a second call without new batches yields an empty result.
    /// Deletion happens per batch, not after the whole merge: an interrupted
    /// aggregation leaves some batches consumed and others in place. A batch
    /// that cannot be decoded is skipped and left in the store. So is a batch
    /// that cannot be deleted, so a later aggregation never merges it twice.
    #[instrument(skip(self))]
    pub async fn aggregate(
        &self,
        result_name: &str,
        delete_after_read: bool,
    ) -> Result<AggregatedResult, StorageError> {
        let keys = self.store.batch_keys().await?;
        let mut records = Vec::new();

        for key in &keys {
            let batch = match self.store.load_batch(key).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping unreadable batch");
                    continue;
                }
            };

            if delete_after_read {
                if let Err(e) = self.store.delete_batch(key).await {
                    warn!(key = %key, error = %e, "Skipping batch that could not be consumed");
                    continue;
                }
            }

            records.extend(batch);
        }

        let artifact = self.store.write_result(result_name, &records).await?;
        info!(
            monotonic_counter.reviews_aggregated = records.len() as u64,
            batches = keys.len(),
            artifact = %artifact,
            "Aggregated reviews"
        );

        Ok(AggregatedResult { records, artifact })
    }
}
