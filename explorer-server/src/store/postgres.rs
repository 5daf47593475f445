//! PostgreSQL record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{
    new_batch_id, Collection, Record, StoredRecord, UploadReceipt, VersionSummary,
};

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn fetch(
        &self,
        collection: Collection,
        version: Option<i32>,
        limit: usize,
    ) -> StoreResult<Vec<StoredRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT data::text AS data, batch_id, version, uploaded_at, file_name
            FROM records
            WHERE collection = $1 AND ($2::INT4 IS NULL OR COALESCE(version, 1) = $2)
            ORDER BY uploaded_at DESC, batch_id, position ASC
            LIMIT $3
            "#
        )
        .bind(collection.as_str())
        .bind(version)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let data: String = r.get("data");
                let record: Record = serde_json::from_str(&data)
                    .map_err(|e| StoreError::Query(format!("corrupt record row: {e}")))?;
                Ok(StoredRecord {
                    record,
                    batch_id: r.get("batch_id"),
                    version: r.get::<Option<i32>, _>("version"),
                    uploaded_at: r.get::<DateTime<Utc>, _>("uploaded_at"),
                    file_name: r.get("file_name"),
                })
            })
            .collect()
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

        let payloads = records
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        // Serialize version assignment per collection for the life of the transaction.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(collection.as_str())
            .execute(&mut *tx)
            .await?;

        let latest: Option<i32> =
            sqlx::query_scalar("SELECT MAX(COALESCE(version, 1)) FROM records WHERE collection = $1")
                .bind(collection.as_str())
                .fetch_one(&mut *tx)
                .await?;
        let version = latest.unwrap_or(0) + 1;
        let uploaded_at = Utc::now();
        let batch_id = new_batch_id(uploaded_at);

        let result = sqlx::query(
            r#"
            INSERT INTO records (collection, batch_id, version, position, uploaded_at, file_name, data)
            SELECT $1, $2, $3, t.ord::INT4, $4, $5, t.data::json
            FROM UNNEST($6::text[]) WITH ORDINALITY AS t(data, ord)
            "#
        )
        .bind(collection.as_str())
        .bind(&batch_id)
        .bind(version)
        .bind(uploaded_at)
        .bind(file_name)
        .bind(payloads)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Appended {} records to {} as version {} ({})",
            result.rows_affected(), collection, version, batch_id
        );

        Ok(UploadReceipt {
            batch_id,
            version,
            inserted_count: result.rows_affected() as usize,
        })
    }

    async fn list_versions(&self, collection: Collection) -> StoreResult<Vec<VersionSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT
                COALESCE(version, 1) AS version,
                MIN(batch_id) AS batch_id,
                MIN(uploaded_at) AS uploaded_at,
                MIN(file_name) AS file_name,
                COUNT(*) AS record_count
            FROM records
            WHERE collection = $1
            GROUP BY COALESCE(version, 1)
            ORDER BY 1 DESC
            "#
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| VersionSummary {
            version: r.get("version"),
            batch_id: r.get("batch_id"),
            uploaded_at: r.get("uploaded_at"),
            file_name: r.get("file_name"),
            record_count: r.get("record_count"),
        }).collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
