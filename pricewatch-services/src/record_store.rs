//! Record Store
//!
//! Persists per-item raw histories and collects the aggregate table that is
//! written once, at the end of a run.
//!
//! ## Layout
//!
//! - `{history_dir}/{sha1(identifier)}.json` - most recent raw points for one item
//! - `{snapshot_path}` - identifier → aggregate snapshot for every processed item

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pricewatch_core::{AggregateSnapshot, PricePoint};
use sha1::{Digest, Sha1};
use tracing::{debug, info};

/// Default number of raw points kept per item
pub const DEFAULT_HISTORY_RETENTION: usize = 500;

/// Identifier → snapshot, ordered by identifier
pub type AggregateTable = BTreeMap<String, AggregateSnapshot>;

/// File-backed store for raw histories and the aggregate snapshot
#[derive(Debug)]
pub struct RecordStore {
    history_dir: PathBuf,
    snapshot_path: PathBuf,
    retention: usize,
    aggregates: AggregateTable,
}

impl RecordStore {
    pub fn new(history_dir: impl Into<PathBuf>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            history_dir: history_dir.into(),
            snapshot_path: snapshot_path.into(),
            retention: DEFAULT_HISTORY_RETENTION,
            aggregates: AggregateTable::new(),
        }
    }

    /// Store layout under one output directory:
    /// `{root}/pricehistory/` and `{root}/prices/latest.json`
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(
            root.join("pricehistory"),
            root.join("prices").join("latest.json"),
        )
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    /// Create the history and snapshot directories if they don't exist
    pub async fn prepare(&self) -> Result<(), RecordStoreError> {
        tokio::fs::create_dir_all(&self.history_dir)
            .await
            .map_err(|e| RecordStoreError::io(&self.history_dir, e))?;

        if let Some(parent) = self.snapshot_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RecordStoreError::io(parent, e))?;
        }

        debug!(
            "Record store ready (history: {}, snapshot: {})",
            self.history_dir.display(),
            self.snapshot_path.display()
        );
        Ok(())
    }

    /// Where the raw history for `identifier` lives
    pub fn history_path(&self, identifier: &str) -> PathBuf {
        self.history_dir
            .join(format!("{}.json", history_file_stem(identifier)))
    }

    /// Write the most recent `retention` points of `series` for `identifier`.
    ///
    /// Truncation happens only here; callers aggregate the full series first.
    pub async fn record_raw_series(
        &self,
        identifier: &str,
        series: &[PricePoint],
    ) -> Result<PathBuf, RecordStoreError> {
        let retained = retain_recent(series, self.retention);
        let path = self.history_path(identifier);

        let json = serde_json::to_vec(retained)
            .map_err(|e| RecordStoreError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| RecordStoreError::io(&path, e))?;

        debug!(
            "Stored {} of {} points for {} at {}",
            retained.len(),
            series.len(),
            identifier,
            path.display()
        );
        Ok(path)
    }

    /// Add one item's snapshot to the table. Last write wins.
    pub fn record_aggregate(&mut self, identifier: impl Into<String>, snapshot: AggregateSnapshot) {
        self.aggregates.insert(identifier.into(), snapshot);
    }

    pub fn aggregates(&self) -> &AggregateTable {
        &self.aggregates
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Write the aggregate table and hand it back.
    ///
    /// Consumes the store, so the snapshot can only be written once.
    pub async fn flush(self) -> Result<AggregateTable, RecordStoreError> {
        let json = serde_json::to_vec_pretty(&self.aggregates)
            .map_err(|e| RecordStoreError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.snapshot_path, json)
            .await
            .map_err(|e| RecordStoreError::io(&self.snapshot_path, e))?;

        info!(
            "Wrote aggregate snapshot for {} items to {}",
            self.aggregates.len(),
            self.snapshot_path.display()
        );
        Ok(self.aggregates)
    }

    /// Hand back the table without writing anything
    pub fn into_aggregates(self) -> AggregateTable {
        self.aggregates
    }
}

/// Stable, filesystem-safe file stem for an identifier (SHA-1, lowercase hex)
pub fn history_file_stem(identifier: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(identifier.as_bytes());
    hex::encode(hasher.finalize())
}

/// The last `n` points of `series` (all of it if shorter)
pub fn retain_recent(series: &[PricePoint], n: usize) -> &[PricePoint] {
    &series[series.len().saturating_sub(n)..]
}

/// Errors that can occur during record store operations
#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("IO error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RecordStoreError {
    fn io(path: &Path, err: std::io::Error) -> Self {
        RecordStoreError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}
