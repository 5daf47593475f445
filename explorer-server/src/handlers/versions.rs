//! Version history handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::models::{Collection, VersionSummary};
use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct CollectionVersions {
    pub collection: Collection,
    pub versions: Vec<VersionSummary>,
}

#[derive(Debug, Serialize)]
pub struct VersionsResponse {
    pub success: bool,
    pub collections: Vec<CollectionVersions>,
}

/// Version history of every collection
pub async fn list(State(state): State<AppState>) -> AppResult<Json<VersionsResponse>> {
    let collections = state
        .loader
        .all_versions()
        .await?
        .into_iter()
        .map(|(collection, versions)| CollectionVersions { collection, versions })
        .collect();

    Ok(Json(VersionsResponse {
        success: true,
        collections,
    }))
}
