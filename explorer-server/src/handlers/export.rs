//! Export handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::export::{export, ExportFormat};
use crate::models::{Collection, Record};
use crate::{AppResult, AppState};

#[derive(Debug, Deserialize, Default)]
pub struct ExportParams {
    pub version: Option<i32>,
    #[serde(default)]
    pub format: ExportFormat,
}

/// Serialize `items` and wrap them as a file download
pub fn download<T: Serialize>(items: &[T], format: ExportFormat, stem: &str) -> AppResult<Response> {
    let body = export(items, format)?;
    let disposition = format!("attachment; filename=\"{}.{}\"", stem, format.extension());

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Download a collection (optionally one version) as CSV or JSON
pub async fn collection(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let collection: Collection = collection.parse()?;
    let records: Vec<Record> = state
        .loader
        .fetch(collection, params.version)
        .await?
        .into_iter()
        .map(|r| r.record)
        .collect();

    let stem = match params.version {
        Some(v) => format!("{}-v{}", collection, v),
        None => collection.to_string(),
    };
    download(&records, params.format, &stem)
}
