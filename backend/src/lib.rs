//! # Coach Tracker Backend
//!
//! Reference remote store consumed by the coach tracker client:
//! - **Key/value slots** holding whole collection snapshots (`students`,
//!   `supplements`, `exercise-types`, ...)
//! - **Phone uniqueness lookups** over the stored students
//! - **Audit log** of user actions
//!
//! ```text
//! REST (rest.rs) → services (domain.rs) → SQLite (db.rs)
//! ```

pub mod config;
pub mod db;
pub mod domain;
pub mod rest;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::BackendConfig;
use crate::db::DbConnection;
use crate::domain::{HistoryService, StudentRegistry, ValueStore};

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub value_store: ValueStore,
    pub student_registry: StudentRegistry,
    pub history_service: HistoryService,
}

impl AppState {
    pub fn new(db: DbConnection) -> Self {
        let value_store = ValueStore::new(db.clone());
        Self {
            student_registry: StudentRegistry::new(value_store.clone()),
            history_service: HistoryService::new(db),
            value_store,
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &BackendConfig) -> Result<AppState> {
    info!("Setting up database at {}", config.database_url);
    let db = DbConnection::new(&config.database_url).await?;

    info!("Setting up application state");
    Ok(AppState::new(db))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, allowed_origin: HeaderValue) -> Router {
    // Credentialed requests need an explicit origin and header list
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let api_routes = Router::new()
        .route("/values", post(rest::put_value))
        .route("/values/:key", get(rest::get_value).delete(rest::delete_value))
        .route("/students/check-phone/:phone", get(rest::check_phone))
        .route("/students/:id", delete(rest::delete_student))
        .route("/supplements/:id", delete(rest::delete_supplement))
        .route(
            "/history",
            get(rest::list_history)
                .post(rest::append_history)
                .delete(rest::clear_history),
        );

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state)
}
