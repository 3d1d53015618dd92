use std::sync::{Mutex, MutexGuard};

use chrono::Local;

use super::{BatchKey, Result, ReviewStore, StorageError, artifact_name};
use crate::reviews::{ReviewBatch, ReviewRecord};

/// In-process [`ReviewStore`]; keys enumerate in insertion order
#[derive(Debug, Default)]
pub struct MemoryStore {
    batches: Mutex<Vec<(BatchKey, ReviewBatch)>>,
    results: Mutex<Vec<(String, Vec<ReviewRecord>)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches currently held
    pub fn batch_count(&self) -> usize {
        lock(&self.batches).len()
    }

    /// Every result written so far, as `(artifact name, records)`
    pub fn results(&self) -> Vec<(String, Vec<ReviewRecord>)> {
        lock(&self.results).clone()
    }
}

impl ReviewStore for MemoryStore {
    async fn put_batch(&self, batch: &ReviewBatch) -> Result<BatchKey> {
        let key = BatchKey::generate();
        lock(&self.batches).push((key.clone(), batch.clone()));
        Ok(key)
    }

    async fn batch_keys(&self) -> Result<Vec<BatchKey>> {
        Ok(lock(&self.batches).iter().map(|(key, _)| key.clone()).collect())
    }

    async fn load_batch(&self, key: &BatchKey) -> Result<ReviewBatch> {
        lock(&self.batches)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, batch)| batch.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete_batch(&self, key: &BatchKey) -> Result<()> {
        let mut batches = lock(&self.batches);
        let position = batches
            .iter()
            .position(|(k, _)| k == key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        batches.remove(position);
        Ok(())
    }

    async fn write_result(&self, name: &str, records: &[ReviewRecord]) -> Result<String> {
        let artifact = artifact_name(name, Local::now());
        lock(&self.results).push((artifact.clone(), records.to_vec()));
        Ok(artifact)
    }
}
