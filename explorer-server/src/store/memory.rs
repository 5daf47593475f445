//! In-memory record store
//!
//! Not durable: everything is lost on restart. Batches are kept per
//! collection in upload order behind a `tokio::sync::RwLock`; an append takes
//! the write lock for the whole version-assign-and-insert step, so concurrent
//! uploads to one collection still get distinct, consecutive versions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{
    new_batch_id, Collection, Record, StoredRecord, UploadReceipt, VersionSummary,
};

#[derive(Debug, Clone)]
struct Batch {
    batch_id: String,
    version: i32,
    uploaded_at: DateTime<Utc>,
    file_name: String,
    records: Vec<Record>,
}

#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Batch>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn fetch(
        &self,
        collection: Collection,
        version: Option<i32>,
        limit: usize,
    ) -> StoreResult<Vec<StoredRecord>> {
        let guard = self.collections.read().await;
        let Some(batches) = guard.get(&collection) else {
            return Ok(Vec::new());
        };

        // Newest batch first; records keep their order inside a batch.
        let rows = batches
            .iter()
            .rev()
            .filter(|b| version.map_or(true, |v| b.version == v))
            .flat_map(|b| {
                b.records.iter().map(move |r| StoredRecord {
                    record: r.clone(),
                    batch_id: b.batch_id.clone(),
                    version: Some(b.version),
                    uploaded_at: b.uploaded_at,
                    file_name: b.file_name.clone(),
                })
            })
            .take(limit)
            .collect();
        Ok(rows)
    }

    async fn append(
        &self,
        collection: Collection,
        records: Vec<Record>,
        file_name: &str,
    ) -> StoreResult<UploadReceipt> {
        if records.is_empty() {
            return Err(StoreError::EmptyBatch(collection));
        }

        let mut guard = self.collections.write().await;
        let batches = guard.entry(collection).or_default();

        let version = batches.iter().map(|b| b.version).max().unwrap_or(0) + 1;
        let uploaded_at = Utc::now();
        let batch_id = new_batch_id(uploaded_at);
        let inserted_count = records.len();

        batches.push(Batch {
            batch_id: batch_id.clone(),
            version,
            uploaded_at,
            file_name: file_name.to_string(),
            records,
        });

        tracing::debug!("In-memory append: {} v{} ({} records)", collection, version, inserted_count);

        Ok(UploadReceipt {
            batch_id,
            version,
            inserted_count,
        })
    }

    async fn list_versions(&self, collection: Collection) -> StoreResult<Vec<VersionSummary>> {
        let guard = self.collections.read().await;
        let mut versions: Vec<VersionSummary> = guard
            .get(&collection)
            .map(|batches| {
                batches
                    .iter()
                    .map(|b| VersionSummary {
                        version: b.version,
                        batch_id: b.batch_id.clone(),
                        uploaded_at: b.uploaded_at,
                        file_name: b.file_name.clone(),
                        record_count: b.records.len() as i64,
                    })
                    .collect()
            })
            .unwrap_or_default();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    fn records(hrefs: &[&str]) -> Vec<Record> {
        hrefs
            .iter()
            .map(|h| Record::from_value(json!({ "href": h })).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_versions_are_monotonic() {
        let store = InMemoryStore::new();
        let a = assert_ok!(store.append(Collection::Workloads, records(&["/w/1", "/w/2"]), "a.csv").await);
        let b = assert_ok!(store.append(Collection::Workloads, records(&["/w/3"]), "b.csv").await);
        let c = assert_ok!(store.append(Collection::Workloads, records(&["/w/4"]), "c.csv").await);

        assert_eq!((a.version, b.version, c.version), (1, 2, 3));
        assert_eq!(a.inserted_count, 2);
        assert_ne!(a.batch_id, b.batch_id);
    }

    #[tokio::test]
    async fn test_versions_are_scoped_per_collection() {
        let store = InMemoryStore::new();
        assert_ok!(store.append(Collection::Workloads, records(&["/w/1"]), "w.csv").await);
        let labels = assert_ok!(store.append(Collection::Labels, records(&["/l/1"]), "l.csv").await);
        assert_eq!(labels.version, 1);
    }

    #[tokio::test]
    async fn test_fetch_orders_newest_first_and_filters() {
        let store = InMemoryStore::new();
        assert_ok!(store.append(Collection::Workloads, records(&["/w/1", "/w/2"]), "a.csv").await);
        assert_ok!(store.append(Collection::Workloads, records(&["/w/3", "/w/4"]), "b.csv").await);

        let all = assert_ok!(store.fetch(Collection::Workloads, None, 10_000).await);
        let hrefs: Vec<_> = all.iter().map(|r| r.record.href().unwrap()).collect();
        assert_eq!(hrefs, vec!["/w/3", "/w/4", "/w/1", "/w/2"]);

        let v1 = assert_ok!(store.fetch(Collection::Workloads, Some(1), 10_000).await);
        assert_eq!(v1.len(), 2);
        assert!(v1.iter().all(|r| r.version == Some(1) && r.file_name == "a.csv"));

        let capped = assert_ok!(store.fetch(Collection::Workloads, None, 3).await);
        assert_eq!(capped.len(), 3);

        let empty = assert_ok!(store.fetch(Collection::Services, None, 10).await);
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_consumes_no_version() {
        let store = InMemoryStore::new();
        let first = assert_ok!(store.append(Collection::Labels, records(&["/l/1"]), "a.json").await);

        let err = store.append(Collection::Labels, Vec::new(), "empty.json").await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyBatch(Collection::Labels)));

        let next = assert_ok!(store.append(Collection::Labels, records(&["/l/2"]), "b.json").await);
        assert_eq!((first.version, next.version), (1, 2));

        let versions = assert_ok!(store.list_versions(Collection::Labels).await);
        assert_eq!(versions.len(), 2);
        assert!(versions.iter().all(|v| v.file_name != "empty.json"));
    }

    #[tokio::test]
    async fn test_list_versions_descending() {
        let store = InMemoryStore::new();
        assert_ok!(store.append(Collection::Rulesets, records(&["/r/1"]), "r1.json").await);
        assert_ok!(store.append(Collection::Rulesets, records(&["/r/2", "/r/3"]), "r2.json").await);

        let versions = assert_ok!(store.list_versions(Collection::Rulesets).await);
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, 2);
        assert_eq!(versions[0].record_count, 2);
        assert_eq!(versions[0].file_name, "r2.json");
        assert_eq!(versions[1].version, 1);

        assert_eq!(assert_ok!(store.latest_version(Collection::Rulesets).await), Some(2));
        assert_eq!(assert_ok!(store.latest_version(Collection::Labels).await), None);
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_distinct_versions() {
        let store = Arc::new(InMemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .append(Collection::Labels, records(&["/l/x"]), &format!("{i}.json"))
                        .await
                })
            })
            .collect();

        let mut versions = Vec::new();
        for h in handles {
            versions.push(h.await.unwrap().unwrap().version);
        }
        versions.sort();
        assert_eq!(versions, (1..=8).collect::<Vec<_>>());
    }
}
