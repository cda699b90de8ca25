//! # Moto POS API
//!
//! JSON-over-HTTP server for the pricing and inventory valuation engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Moto POS API Server                              │
//! │                                                                         │
//! │  POS / back office ───► axum (8080) ───► routes ───► services          │
//! │                           │                            │                │
//! │                           ▼                            ▼                │
//! │                     TraceLayer span           ProductCatalog            │
//! │                     AuthUser (JWT)            (per-product locks)       │
//! │                                                        │                │
//! │                                                        ▼                │
//! │                                            motopos-core  motopos-db     │
//! │                                            (pure logic)  (SQLite)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ApiConfig::load`]):
//! - `MOTOPOS_HOST`, `MOTOPOS_PORT` - Listen address (default: 0.0.0.0:8080)
//! - `DATABASE_PATH` - SQLite file (default: motopos.db)
//! - `DB_MAX_CONNECTIONS`, `DB_QUERY_TIMEOUT_MS` - Pool size and per-call bound
//! - `JWT_SECRET`, `JWT_LIFETIME_SECS` - Token signing
//! - `ADMIN_USERNAME`, `ADMIN_PASSWORD` - Account created by `/init`

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::services::ProductCatalog;
use motopos_db::{Database, DbResult};

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub catalog: Arc<ProductCatalog>,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        AppState {
            catalog: Arc::new(ProductCatalog::new(db.clone())),
            jwt: Arc::new(JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs)),
            config: Arc::new(config),
            db,
        }
    }

    /// Opens the database (running migrations) and builds the state.
    pub async fn connect(config: ApiConfig) -> DbResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(AppState::new(db, config))
    }
}

/// Builds the application router with request tracing.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
