//! Dataset loader
//!
//! Reads collections out of the record store and shapes them for the
//! analysis layer: per-version batches for browsing, and a snapshot of the
//! latest version of several collections for cross-referencing.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Collection, Record, StoredRecord, VersionSummary, VersionedBatch};
use crate::store::{RecordStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct DatasetLoader {
    store: Arc<dyn RecordStore>,
    fetch_limit: usize,
}

/// Latest-version records of the collections needed by the analysis views.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    collections: HashMap<Collection, Vec<Record>>,
}

impl Snapshot {
    pub fn records(&self, collection: Collection) -> &[Record] {
        self.collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn workloads(&self) -> &[Record] {
        self.records(Collection::Workloads)
    }

    pub fn labels(&self) -> &[Record] {
        self.records(Collection::Labels)
    }

    pub fn rulesets(&self) -> &[Record] {
        self.records(Collection::Rulesets)
    }
}

impl DatasetLoader {
    pub fn new(store: Arc<dyn RecordStore>, fetch_limit: usize) -> Self {
        Self { store, fetch_limit }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Raw stamped records, newest upload first.
    pub async fn fetch(
        &self,
        collection: Collection,
        version: Option<i32>,
    ) -> StoreResult<Vec<StoredRecord>> {
        self.store.fetch(collection, version, self.fetch_limit).await
    }

    /// Records grouped by version, one batch per version, newest first.
    ///
    /// Batch metadata and `record_count` come from the store's version
    /// summaries; each version is fetched on its own so the fetch cap never
    /// splits one version across the result.
    pub async fn load(
        &self,
        collection: Collection,
        version: Option<i32>,
    ) -> StoreResult<Vec<VersionedBatch>> {
        let summaries = self
            .store
            .list_versions(collection)
            .await?
            .into_iter()
            .filter(|s| version.map_or(true, |v| s.version == v));

        let batches = try_join_all(summaries.map(|summary| async move {
            let rows = self.fetch(collection, Some(summary.version)).await?;
            if (rows.len() as i64) < summary.record_count {
                tracing::warn!(
                    "{} v{}: fetch cap returned {} of {} records",
                    collection, summary.version, rows.len(), summary.record_count
                );
            }
            Ok::<_, StoreError>(VersionedBatch {
                version: summary.version,
                batch_id: summary.batch_id,
                uploaded_at: summary.uploaded_at,
                file_name: summary.file_name,
                record_count: summary.record_count,
                records: rows.into_iter().map(|r| r.record).collect(),
            })
        }))
        .await?;

        tracing::debug!("Loaded {} as {} version batch(es)", collection, batches.len());
        Ok(batches)
    }

    /// Records of the newest version only; empty when nothing was uploaded.
    pub async fn latest(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        let Some(version) = self.store.latest_version(collection).await? else {
            return Ok(Vec::new());
        };
        let rows = self.fetch(collection, Some(version)).await?;
        Ok(rows.into_iter().map(|r| r.record).collect())
    }

    /// Load the latest version of every listed collection concurrently.
    /// Any single failure fails the whole snapshot.
    pub async fn snapshot(&self, collections: &[Collection]) -> StoreResult<Snapshot> {
        let loaded = try_join_all(collections.iter().map(|&c| async move {
            self.latest(c).await.map(|records| (c, records))
        }))
        .await?;

        Ok(Snapshot {
            collections: loaded.into_iter().collect(),
        })
    }

    /// Version history of every collection, fetched concurrently.
    pub async fn all_versions(&self) -> StoreResult<Vec<(Collection, Vec<VersionSummary>)>> {
        try_join_all(Collection::ALL.iter().map(|&c| async move {
            self.store.list_versions(c).await.map(|v| (c, v))
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadReceipt;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    fn record(href: &str) -> Record {
        Record::from_value(json!({ "href": href })).unwrap()
    }

    fn loader(store: impl RecordStore + 'static) -> DatasetLoader {
        DatasetLoader::new(Arc::new(store), 10_000)
    }

    /// Serves pre-built rows and summaries; fails every call for the
    /// collections in `broken`.
    struct FixedStore {
        rows: Vec<StoredRecord>,
        versions: Vec<VersionSummary>,
        broken: Vec<Collection>,
    }

    #[async_trait]
    impl RecordStore for FixedStore {
        async fn fetch(&self, c: Collection, _: Option<i32>, _: usize) -> StoreResult<Vec<StoredRecord>> {
            if self.broken.contains(&c) {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            Ok(self.rows.clone())
        }

        async fn append(&self, _: Collection, _: Vec<Record>, _: &str) -> StoreResult<UploadReceipt> {
            Err(StoreError::Unavailable("read only".to_string()))
        }

        async fn list_versions(&self, c: Collection) -> StoreResult<Vec<VersionSummary>> {
            if self.broken.contains(&c) {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            Ok(self.versions.clone())
        }

        async fn health_check(&self) -> StoreResult<()> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_load_groups_two_uploads() {
        let store = InMemoryStore::new();
        store.append(Collection::Workloads, vec![record("/w/1"), record("/w/2")], "a.csv").await.unwrap();
        store
            .append(Collection::Workloads, vec![record("/w/3"), record("/w/4"), record("/w/5")], "b.csv")
            .await
            .unwrap();

        let batches = loader(store).load(Collection::Workloads, None).await.unwrap();
        assert_eq!(batches.len(), 2);

        assert_eq!(batches[0].version, 2);
        assert_eq!(batches[0].record_count, 3);
        assert_eq!(batches[0].file_name, "b.csv");
        let hrefs: Vec<_> = batches[0].records.iter().map(|r| r.href().unwrap()).collect();
        assert_eq!(hrefs, vec!["/w/3", "/w/4", "/w/5"]);

        assert_eq!(batches[1].version, 1);
        assert_eq!(batches[1].record_count, 2);
    }

    #[tokio::test]
    async fn test_load_with_version_filter() {
        let store = InMemoryStore::new();
        store.append(Collection::Labels, vec![record("/l/1")], "a.json").await.unwrap();
        store.append(Collection::Labels, vec![record("/l/2")], "b.json").await.unwrap();

        let batches = loader(store).load(Collection::Labels, Some(1)).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].records[0].href(), Some("/l/1"));
    }

    #[tokio::test]
    async fn test_fetch_cap_never_splits_a_version() {
        let store = InMemoryStore::new();
        store.append(Collection::Workloads, vec![record("/w/1"), record("/w/2")], "a.csv").await.unwrap();
        store
            .append(Collection::Workloads, vec![record("/w/3"), record("/w/4"), record("/w/5")], "b.csv")
            .await
            .unwrap();

        // One capped fetch of everything would stop inside version 1.
        let loader = DatasetLoader::new(Arc::new(store), 4);
        let batches = loader.load(Collection::Workloads, None).await.unwrap();
        let versions = loader.store().list_versions(Collection::Workloads).await.unwrap();

        assert_eq!(batches.len(), 2);
        for (batch, summary) in batches.iter().zip(&versions) {
            assert_eq!(batch.version, summary.version);
            assert_eq!(batch.record_count, summary.record_count);
            assert_eq!(batch.records.len() as i64, summary.record_count);
        }
        assert_eq!(batches[1].records, vec![record("/w/1"), record("/w/2")]);
    }

    #[tokio::test]
    async fn test_unversioned_rows_load_as_version_one() {
        let now = Utc::now();
        let row = |href: &str, version: Option<i32>| StoredRecord {
            record: record(href),
            batch_id: "legacy".to_string(),
            version,
            uploaded_at: now,
            file_name: "old.csv".to_string(),
        };
        let store = FixedStore {
            rows: vec![row("/w/1", None), row("/w/2", Some(1)), row("/w/3", None)],
            versions: vec![VersionSummary {
                version: 1,
                batch_id: "legacy".to_string(),
                uploaded_at: now,
                file_name: "old.csv".to_string(),
                record_count: 3,
            }],
            broken: Vec::new(),
        };

        let batches = loader(store).load(Collection::Workloads, None).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].version, 1);
        assert_eq!(batches[0].record_count, 3);
        assert_eq!(batches[0].records.len(), 3);
        assert_eq!(batches[0].file_name, "old.csv");
    }

    #[tokio::test]
    async fn test_latest_and_snapshot() {
        let store = InMemoryStore::new();
        store.append(Collection::Workloads, vec![record("/w/old")], "a.csv").await.unwrap();
        store.append(Collection::Workloads, vec![record("/w/new")], "b.csv").await.unwrap();
        store.append(Collection::Labels, vec![record("/l/1")], "l.json").await.unwrap();
        let loader = loader(store);

        let latest = loader.latest(Collection::Workloads).await.unwrap();
        assert_eq!(latest, vec![record("/w/new")]);

        let snapshot = loader
            .snapshot(&[Collection::Workloads, Collection::Labels, Collection::Rulesets])
            .await
            .unwrap();
        assert_eq!(snapshot.workloads().len(), 1);
        assert_eq!(snapshot.labels().len(), 1);
        assert!(snapshot.rulesets().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = FixedStore {
            rows: Vec::new(),
            versions: Vec::new(),
            broken: vec![Collection::Labels],
        };
        let loader = loader(store);

        let err = loader.load(Collection::Labels, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        // One broken collection fails the whole fan-out.
        let err = loader
            .snapshot(&[Collection::Workloads, Collection::Labels])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        assert!(loader.all_versions().await.is_err());
        assert!(loader.load(Collection::Workloads, None).await.unwrap().is_empty());
    }
}
