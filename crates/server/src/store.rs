//! Content-addressed deduplication store.
//!
//! One JSON file per subscription name holds every record ever observed
//! for it. The file is read-then-merge-then-rewrite, not a log, so
//! readers always see a prior consistent snapshot between writes. The
//! scheduler guarantees no two ticks for the same subscription run
//! concurrently, which is what makes the lockless read-modify-write
//! safe.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use domain::{Record, Subscription};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct ContentStore {
    data_dir: PathBuf,
}

impl ContentStore {
    /// Open (and create if needed) the store root.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn file_path(&self, subscription: &Subscription) -> PathBuf {
        self.data_dir.join(format!("{}.json", subscription.name))
    }

    /// Load the full history for a subscription.
    ///
    /// A missing file (first run) or an unreadable/corrupt one yields an
    /// empty history, never an error.
    pub async fn load(&self, subscription: &Subscription) -> Vec<Record> {
        let path = self.file_path(subscription);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_slice(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "Content file {} is corrupt, treating history as empty: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Return the subset of candidates whose id has never been stored.
    ///
    /// First observation of a subscription is special: the entire
    /// candidate set is persisted immediately and an empty list is
    /// returned, so pre-existing items never flood the delivery actions.
    pub async fn check_new(
        &self,
        candidates: Vec<Record>,
        subscription: &Subscription,
    ) -> Result<Vec<Record>, StorageError> {
        let history = self.load(subscription).await;
        if history.is_empty() {
            self.persist(&candidates, subscription).await?;
            return Ok(Vec::new());
        }

        let seen: HashSet<&str> = history.iter().map(|r| r.id.as_str()).collect();
        Ok(candidates
            .into_iter()
            .filter(|record| !seen.contains(record.id.as_str()))
            .collect())
    }

    /// Merge records into the stored history, deduplicating by id, and
    /// rewrite the subscription's file in full.
    pub async fn persist(
        &self,
        records: &[Record],
        subscription: &Subscription,
    ) -> Result<(), StorageError> {
        let mut merged = self.load(subscription).await;
        let mut seen: HashSet<String> = merged.iter().map(|r| r.id.clone()).collect();
        for record in records {
            // Ids are content-addressed and records immutable, so the
            // first stored copy wins.
            if seen.insert(record.id.clone()) {
                merged.push(record.clone());
            }
        }

        let raw = serde_json::to_vec_pretty(&merged)?;
        tokio::fs::write(self.file_path(subscription), raw).await?;
        Ok(())
    }
}
