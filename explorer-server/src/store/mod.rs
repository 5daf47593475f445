//! Record store boundary
//!
//! Append-only, per-collection versioned storage for ingested records. The
//! resolution layer never talks to a backend directly; it goes through the
//! `DatasetLoader`, which only needs this trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Collection, Record, StoredRecord, UploadReceipt, VersionSummary};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached (pool, network, I/O).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store query failed: {0}")]
    Query(String),
    /// `append` was given no records; no version is assigned.
    #[error("batch for {0} contains no records")]
    EmptyBatch(Collection),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records ordered by descending upload time, insertion order within a
    /// batch, capped at `limit`.
    async fn fetch(
        &self,
        collection: Collection,
        version: Option<i32>,
        limit: usize,
    ) -> StoreResult<Vec<StoredRecord>>;

    /// Insert one batch as `max(version) + 1`. All-or-nothing; an empty
    /// batch is rejected with `EmptyBatch` and consumes no version.
    async fn append(
        &self,
        collection: Collection,
        records: Vec<Record>,
        file_name: &str,
    ) -> StoreResult<UploadReceipt>;

    /// One summary per version, highest version first.
    async fn list_versions(&self, collection: Collection) -> StoreResult<Vec<VersionSummary>>;

    /// Highest assigned version, `None` for an empty collection.
    async fn latest_version(&self, collection: Collection) -> StoreResult<Option<i32>> {
        Ok(self
            .list_versions(collection)
            .await?
            .first()
            .map(|v| v.version))
    }

    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}
