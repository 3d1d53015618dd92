use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs;
use tracing::debug;

use super::{BatchKey, Result, ReviewStore, StorageError, artifact_name};
use crate::reviews::{ReviewBatch, ReviewRecord};

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding intermediate batches
    pub temp_dir: PathBuf,

    /// Directory holding aggregated results
    pub results_dir: PathBuf,
}

impl StorageConfig {
    /// Check that batches and results live in different directories
    ///
    /// Result artifacts are JSON files too, so a shared directory would let
    /// aggregation consume earlier results as batches.
    pub fn validate(&self) -> Result<()> {
        if self.temp_dir == self.results_dir {
            return Err(StorageError::InvalidConfig(format!(
                "temp_dir and results_dir are both {}",
                self.temp_dir.display()
            )));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from(".reviews/tmp"),
            results_dir: PathBuf::from(".reviews/results"),
        }
    }
}

/// Directory-backed [`ReviewStore`]
///
/// Batches live as `<temp_dir>/<key>.json`, results as
/// `<results_dir>/<name>_<yymmdd_HHMMSS>.json`. Keys are listed in whatever
/// order the filesystem returns directory entries.
#[derive(Debug, Clone, Default)]
pub struct FsStore {
    config: StorageConfig,
}

impl FsStore {
    /// Create a store with the default directories
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with custom directories
    pub fn with_config(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn batch_path(&self, key: &BatchKey) -> PathBuf {
        self.config.temp_dir.join(format!("{}.json", key))
    }

    fn partial_path(&self, key: &BatchKey) -> PathBuf {
        self.config.temp_dir.join(format!("{}.json.tmp", key))
    }

    async fn ensure_dir(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).await?;
        Ok(())
    }
}

impl ReviewStore for FsStore {
    async fn put_batch(&self, batch: &ReviewBatch) -> Result<BatchKey> {
        Self::ensure_dir(&self.config.temp_dir).await?;

        let key = BatchKey::generate();
        let json = serde_json::to_string(batch)?;

        // Written aside and renamed so listing never sees a partial batch
        let partial = self.partial_path(&key);
        fs::write(&partial, json).await?;
        fs::rename(&partial, self.batch_path(&key)).await?;

        debug!(key = %key, records = batch.len(), "Wrote batch file");
        Ok(key)
    }

    async fn batch_keys(&self) -> Result<Vec<BatchKey>> {
        if !fs::try_exists(&self.config.temp_dir).await? {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.config.temp_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match path.file_stem().and_then(|s| s.to_str()).map(BatchKey::parse) {
                    Some(Ok(key)) => keys.push(key),
                    _ => debug!("Skipping unreadable batch file {}", path.display()),
                }
            }
        }

        Ok(keys)
    }

    async fn load_batch(&self, key: &BatchKey) -> Result<ReviewBatch> {
        let path = self.batch_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    async fn delete_batch(&self, key: &BatchKey) -> Result<()> {
        fs::remove_file(self.batch_path(key)).await?;
        Ok(())
    }

    async fn write_result(&self, name: &str, records: &[ReviewRecord]) -> Result<String> {
        Self::ensure_dir(&self.config.results_dir).await?;

        let path = self
            .config
            .results_dir
            .join(artifact_name(name, Local::now()));
        let json = serde_json::to_string(records)?;
        fs::write(&path, json).await?;

        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FsStore {
        FsStore::with_config(StorageConfig {
            temp_dir: dir.path().join("tmp"),
            results_dir: dir.path().join("results"),
        })
    }

    fn record(name: &str) -> ReviewRecord {
        ReviewRecord {
            product: "Mouse".to_string(),
            name: name.to_string(),
            rating: "4".to_string(),
            heading: "Nice".to_string(),
            comment: "Clicks".to_string(),
        }
    }

    #[test]
    fn test_default_config() {
        let store = FsStore::new();
        assert_eq!(store.config().temp_dir, PathBuf::from(".reviews/tmp"));
        assert_eq!(store.config().results_dir, PathBuf::from(".reviews/results"));
    }

    #[tokio::test]
    async fn test_put_load_delete() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let key = store.put_batch(&vec![record("a"), record("b")]).await.unwrap();
        assert!(dir.path().join("tmp").join(format!("{}.json", key)).exists());

        assert_eq!(store.batch_keys().await.unwrap(), vec![key.clone()]);
        let batch = store.load_batch(&key).await.unwrap();
        assert_eq!(batch, vec![record("a"), record("b")]);

        store.delete_batch(&key).await.unwrap();
        assert!(store.batch_keys().await.unwrap().is_empty());
        assert!(matches!(
            store.load_batch(&key).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_shared_directory_is_rejected() {
        let config = StorageConfig {
            temp_dir: PathBuf::from("out"),
            results_dir: PathBuf::from("out"),
        };
        assert!(matches!(
            config.validate(),
            Err(StorageError::InvalidConfig(_))
        ));
        assert!(StorageConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_partial_batch_files_are_not_listed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let key = store.put_batch(&vec![record("a")]).await.unwrap();
        std::fs::write(dir.path().join("tmp").join("1-half.json.tmp"), "[{").unwrap();

        assert_eq!(store.batch_keys().await.unwrap(), vec![key.clone()]);
        assert!(!dir.path().join("tmp").join(format!("{}.json.tmp", key)).exists());
    }

    #[tokio::test]
    async fn test_missing_temp_dir_has_no_keys() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).batch_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_json_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.put_batch(&Vec::new()).await.unwrap();
        std::fs::write(dir.path().join("tmp").join("notes.txt"), "x").unwrap();

        assert_eq!(store.batch_keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_write_result() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let location = store
            .write_result("wireless mouse", &[record("a")])
            .await
            .unwrap();
        assert!(location.contains("wireless mouse_"));
        assert!(location.ends_with(".json"));

        let saved: Vec<ReviewRecord> =
            serde_json::from_str(&std::fs::read_to_string(&location).unwrap()).unwrap();
        assert_eq!(saved, vec![record("a")]);
    }

    #[tokio::test]
    async fn test_write_result_with_unusual_names() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let long = store
            .write_result(&"wireless mouse ".repeat(20), &[record("a")])
            .await
            .unwrap();
        assert!(std::path::Path::new(&long).exists());

        let nul = store.write_result("mouse\0pad", &[record("b")]).await.unwrap();
        assert!(nul.contains("mouse_pad_"));
        assert!(std::path::Path::new(&nul).exists());
    }
}
