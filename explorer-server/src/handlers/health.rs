//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: &'static str,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.loader.store();
    let status = match store.health_check().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            "degraded"
        }
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store: store.backend_name(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
