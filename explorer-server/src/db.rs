//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
///
/// `data` is `JSON`, not `JSONB`: field order of uploaded records is kept,
/// which CSV export and table previews rely on.
const SCHEMA_SQL: &str = r#"
-- Ingested records, one row per record, append-only
CREATE TABLE IF NOT EXISTS records (
    id BIGSERIAL PRIMARY KEY,
    collection VARCHAR(32) NOT NULL,
    batch_id VARCHAR(64) NOT NULL,
    version INT,
    position INT NOT NULL DEFAULT 0,
    uploaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    file_name VARCHAR(512) NOT NULL DEFAULT '',
    data JSON NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_records_collection_version ON records(collection, version);
CREATE INDEX IF NOT EXISTS idx_records_collection_uploaded ON records(collection, uploaded_at DESC);
"#;
