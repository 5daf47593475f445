//! Collection data handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Collection, VersionedBatch};
use crate::{AppResult, AppState};

#[derive(Debug, Deserialize, Default)]
pub struct VersionParams {
    pub version: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub success: bool,
    pub data: Vec<Value>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchesResponse {
    pub success: bool,
    pub collection: Collection,
    pub batches: Vec<VersionedBatch>,
}

/// Stamped records of a collection, newest upload first
pub async fn list(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<VersionParams>,
) -> AppResult<Json<DataResponse>> {
    let collection: Collection = collection.parse()?;
    let rows = state.loader.fetch(collection, params.version).await?;
    let data: Vec<Value> = rows.iter().map(|r| r.to_stamped_value()).collect();

    Ok(Json(DataResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// Records grouped into one logical file per version
pub async fn batches(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<VersionParams>,
) -> AppResult<Json<BatchesResponse>> {
    let collection: Collection = collection.parse()?;
    let batches = state.loader.load(collection, params.version).await?;

    Ok(Json(BatchesResponse {
        success: true,
        collection,
        batches,
    }))
}
