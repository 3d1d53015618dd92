//! # Intermediate Review Storage
//!
//! Extraction jobs hand their batches to the aggregator through a
//! [`ReviewStore`]. The store is owned by the orchestrator and shared with
//! jobs and the aggregator by reference.
//!
//! ## Consistency
//!
//! - `put_batch` writes under a fresh [`BatchKey`], so concurrent writers
//!   never collide.
//! - The aggregator's list, load, delete sequence is not fenced against writers.
//!   A batch written while an aggregation is already listing keys may be
//!   missed, or consumed by a later aggregation. The orchestrator joins every
//!   job of its own run before aggregating, so this only concerns other runs
//!   or processes sharing the same store.
//! - Keys are enumerated in the backend's natural order; no sort is applied.

mod fs;
mod memory;

pub use fs::{FsStore, StorageConfig};
pub use memory::MemoryStore;

use std::fmt;
use std::future::Future;
use std::io;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ReviewBatch, ReviewRecord};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid batch key: {0}")]
    InvalidKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),
}

type Result<T> = std::result::Result<T, StorageError>;

/// Key of one stored batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchKey(String);

impl BatchKey {
    /// A key unique across concurrent writers: capture nanos plus a random uuid
    pub fn generate() -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        BatchKey(format!("{}-{}", nanos, Uuid::new_v4().simple()))
    }

    /// Wrap an existing key, rejecting anything that could escape a namespace
    pub fn parse(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(StorageError::InvalidKey(key));
        }
        Ok(BatchKey(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Longest name part of an artifact, in bytes
pub const MAX_ARTIFACT_NAME_BYTES: usize = 200;

/// Name of a result artifact: `<name>_<yymmdd_HHMMSS>.json`
///
/// Path separators and control characters in `name` are replaced so the
/// artifact stays inside the results namespace, and the name part is cut to
/// [`MAX_ARTIFACT_NAME_BYTES`] so the file name always fits the filesystem.
pub fn artifact_name(name: &str, captured_at: DateTime<Local>) -> String {
    let mut safe_name = String::with_capacity(name.len().min(MAX_ARTIFACT_NAME_BYTES));
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() {
            '_'
        } else {
            c
        };
        if safe_name.len() + c.len_utf8() > MAX_ARTIFACT_NAME_BYTES {
            break;
        }
        safe_name.push(c);
    }
    format!("{}{}.json", safe_name, captured_at.format("_%y%m%d_%H%M%S"))
}

/// Shared storage for review batches and aggregated results
///
/// `put_batch` must only make a batch visible to `batch_keys` once it is
/// complete, and must not keep writing after its future resolves. Callers
/// never cancel it midway: the orchestrator's job deadline covers fetching
/// and extraction, not the store write.
pub trait ReviewStore: Send + Sync + 'static {
    /// Commit a batch under a fresh key
    fn put_batch(&self, batch: &ReviewBatch) -> impl Future<Output = Result<BatchKey>> + Send;

    /// Keys of every stored batch, in enumeration order
    fn batch_keys(&self) -> impl Future<Output = Result<Vec<BatchKey>>> + Send;

    /// Load one batch
    fn load_batch(&self, key: &BatchKey) -> impl Future<Output = Result<ReviewBatch>> + Send;

    /// Remove one batch
    fn delete_batch(&self, key: &BatchKey) -> impl Future<Output = Result<()>> + Send;

    /// Persist an aggregated result and return the artifact's location
    fn write_result(
        &self,
        name: &str,
        records: &[ReviewRecord],
    ) -> impl Future<Output = Result<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generated_keys_are_unique() {
        let keys: std::collections::HashSet<BatchKey> =
            (0..100).map(|_| BatchKey::generate()).collect();
        assert_eq!(keys.len(), 100);
    }

    #[test]
    fn test_parse_key() {
        assert!(BatchKey::parse("1700000000-abc").is_ok());
        assert!(matches!(
            BatchKey::parse("../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(BatchKey::parse("").is_err());
        assert!(BatchKey::parse("..").is_err());
    }

    #[test]
    fn test_artifact_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            artifact_name("wireless mouse", at),
            "wireless mouse_240309_140507.json"
        );
        assert_eq!(artifact_name("usb/c hub", at), "usb_c hub_240309_140507.json");
    }

    #[test]
    fn test_artifact_name_replaces_control_characters() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            artifact_name("mouse\0pad\n", at),
            "mouse_pad__240309_140507.json"
        );
    }

    #[test]
    fn test_long_artifact_name_is_truncated() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let name = artifact_name(&"wireless mouse ".repeat(20), at);
        assert!(name.ends_with("_240309_140507.json"));
        assert!(name.len() <= MAX_ARTIFACT_NAME_BYTES + "_240309_140507.json".len());
        assert!(name.starts_with("wireless mouse wireless"));

        // Multi-byte characters are never split
        let name = artifact_name(&"é".repeat(150), at);
        let stem = name.trim_end_matches("_240309_140507.json");
        assert_eq!(stem.len(), MAX_ARTIFACT_NAME_BYTES);
        assert!(stem.chars().all(|c| c == 'é'));
    }
}
