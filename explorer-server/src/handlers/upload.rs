//! Upload handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::ingest;
use crate::models::{Collection, Record, UploadReceipt};
use crate::{AppError, AppResult, AppState};

/// Pre-parsed upload: the client already decoded the file into records.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[validate(length(min = 1, max = 64))]
    pub file_type: String,
    #[validate(length(min = 1, message = "data must contain at least one record"))]
    pub data: Vec<Value>,
    #[serde(default)]
    #[validate(length(max = 512))]
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub upload_id: String,
    pub version: i32,
    pub inserted_count: usize,
    pub collection_name: &'static str,
}

impl UploadResponse {
    fn new(collection: Collection, receipt: UploadReceipt) -> Self {
        Self {
            success: true,
            upload_id: receipt.batch_id,
            version: receipt.version,
            inserted_count: receipt.inserted_count,
            collection_name: collection.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadParams {
    pub file_type: Option<String>,
}

/// Append a batch of already-decoded records
pub async fn upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> AppResult<Json<UploadResponse>> {
    req.validate()?;
    let collection: Collection = req.file_type.parse()?;

    let records = req
        .data
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            Record::from_value(v)
                .ok_or_else(|| AppError::MalformedRecord(format!("record {i} is not an object")))
        })
        .collect::<AppResult<Vec<_>>>()?;

    let receipt = state
        .loader
        .store()
        .append(collection, records, &req.file_name)
        .await?;

    tracing::info!(
        "Uploaded {} records to {} as version {} ({})",
        receipt.inserted_count, collection, receipt.version, req.file_name
    );

    Ok(Json(UploadResponse::new(collection, receipt)))
}

/// Upload a raw CSV/JSON export file; the body is the file content
pub async fn upload_file(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    Query(params): Query<FileUploadParams>,
    body: Bytes,
) -> AppResult<Json<UploadResponse>> {
    let declared = params
        .file_type
        .as_deref()
        .map(str::parse::<Collection>)
        .transpose()?;

    let file = ingest::ingest(&file_name, &body, declared)?;

    let receipt = state
        .loader
        .store()
        .append(file.collection, file.records, &file.file_name)
        .await?;

    tracing::info!(
        "Ingested {} ({:?}) into {} as version {}",
        file.file_name, file.format, file.collection, receipt.version
    );

    Ok(Json(UploadResponse::new(file.collection, receipt)))
}
