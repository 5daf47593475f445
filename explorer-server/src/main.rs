//! PCE Explorer Server
//!
//! Stores versioned policy-platform exports (workloads, labels, services,
//! IP lists, rulesets, label groups) and resolves the traffic relationships
//! they imply.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PCE EXPLORER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Ingest / │  │  Analysis               │ │
//! │  │  (Axum)   │  │  Export   │  │  (labels, entities,     │ │
//! │  │           │  │  CSV/JSON │  │   traffic, filters)     │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │DatasetLoader│                             │
//! │                └──────┬──────┘                             │
//! │                       ▼                                     │
//! │           ┌───────────────────────┐                         │
//! │           │ RecordStore (PG / mem)│                         │
//! │           └───────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod analysis;
mod config;
mod db;
mod error;
mod export;
mod handlers;
mod ingest;
mod loader;
mod models;
mod store;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

use config::{Config, StoreBackend};
use loader::DatasetLoader;
use store::{memory::InMemoryStore, postgres::PgRecordStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    init_tracing(&config);

    tracing::info!("PCE Explorer starting ({})...", config.environment);

    let store = build_store(&config).await?;
    tracing::info!("Record store: {}", store.backend_name());
    tracing::info!("Label association: {}", config.label_match.as_str());

    // Build application state
    let state = AppState {
        loader: DatasetLoader::new(store, config.fetch_limit),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pce_explorer=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            if config.is_production() {
                tracing::warn!("In-memory store in production: uploads are lost on restart");
            }
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Postgres => {
            tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

            let pool = db::create_pool(&config.database_url, config.database_max_connections)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;

            Ok(Arc::new(PgRecordStore::new(pool)))
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub loader: DatasetLoader,
    pub config: Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let upload_routes = Router::new()
        .route("/api/upload", post(handlers::upload::upload))
        .route("/api/files/:file_name", post(handlers::upload::upload_file))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    let data_routes = Router::new()
        .route("/api/data/:collection", get(handlers::data::list))
        .route("/api/data/:collection/batches", get(handlers::data::batches))
        .route("/api/versions", get(handlers::versions::list))
        .route("/api/export/:collection", get(handlers::export::collection));

    let analysis_routes = Router::new()
        .route("/api/analysis/workloads", get(handlers::analysis::workloads))
        .route("/api/analysis/workloads/export", get(handlers::analysis::export_workloads))
        .route("/api/analysis/workload", get(handlers::analysis::workload))
        .route("/api/analysis/ruleset", get(handlers::analysis::ruleset))
        .route("/api/analysis/filter-options", get(handlers::analysis::options))
        .route("/api/analysis/charts/environments", get(handlers::analysis::environments))
        .route("/api/analysis/charts/services", get(handlers::analysis::services));

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(upload_routes)
        .merge(data_routes)
        .merge(analysis_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
