//! Upload batch and version metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Record;

/// A record as persisted, stamped with its upload batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub record: Record,
    pub batch_id: String,
    /// `None` only for rows written before versioning existed.
    pub version: Option<i32>,
    pub uploaded_at: DateTime<Utc>,
    pub file_name: String,
}

impl StoredRecord {
    /// Unversioned rows count as version 1.
    pub fn effective_version(&self) -> i32 {
        self.version.unwrap_or(1)
    }

    /// Record fields merged with the batch stamps, the shape the data API returns.
    pub fn to_stamped_value(&self) -> serde_json::Value {
        let mut fields = self.record.fields().clone();
        fields.insert("_uploadId".to_string(), self.batch_id.clone().into());
        fields.insert("_version".to_string(), self.effective_version().into());
        fields.insert("_uploadedAt".to_string(), self.uploaded_at.to_rfc3339().into());
        fields.insert("_fileName".to_string(), self.file_name.clone().into());
        serde_json::Value::Object(fields)
    }
}

/// Result of a single `append` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub batch_id: String,
    pub version: i32,
    pub inserted_count: usize,
}

/// Per-version aggregate as reported by `list_versions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub version: i32,
    pub batch_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_name: String,
    pub record_count: i64,
}

/// All records of one collection version, grouped for downstream use.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedBatch {
    pub version: i32,
    pub batch_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_name: String,
    pub record_count: i64,
    pub records: Vec<Record>,
}

/// Generate an upload batch identifier: `upload_<millis>_<9 random chars>`.
pub fn new_batch_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("upload_{}_{}", now.timestamp_millis(), &suffix[..9])
}
