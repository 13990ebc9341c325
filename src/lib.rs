//! CRT analytics: weekly training reports, branch summaries with manual
//! overrides, an audit trail, and the HTTP API over them.

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod aggregation;
pub mod api;
pub mod attendance;
pub mod audit;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod ingest;
pub mod insights;
pub mod metrics;
pub mod models;
pub mod overrides;
pub mod report;
pub mod reports;
pub mod risk;
pub mod validation;

pub use config::ServeConfig;
pub use db::{MemoryStore, PgStore, Store};
pub use error::{Error, Result};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<ServeConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: ServeConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// In-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), ServeConfig::default())
    }
}

pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, patch, post};

    let api = Router::new()
        .route("/reports", get(api::list_reports).post(api::save_report))
        .route("/reports/bulk", post(api::bulk_save_reports))
        .route("/reports/:branch_code/:week_no/reopen", post(api::reopen_report))
        .route("/summary", get(api::get_summaries))
        .route("/summary/refresh", post(api::refresh_summaries))
        .route("/summary/update", post(api::update_summary))
        .route("/summary/revert", post(api::revert_summary))
        .route("/audit/:branch_code", get(api::get_audit_history))
        .route("/risk", get(api::get_risk_board))
        .route("/analytics", get(api::get_analytics))
        .route("/analytics/branch/:branch_code", get(api::get_branch_analytics))
        .route(
            "/crt/records",
            get(api::list_attendance).post(api::save_attendance),
        )
        .route("/ingest", post(api::ingest_sheet))
        .route("/users", get(api::list_users))
        .route("/users/:id", patch(api::update_user))
        .route("/branches", get(api::list_branches))
        .route("/weeks", get(api::list_weeks))
        .route(
            "/announcements",
            get(api::list_announcements).post(api::create_announcement),
        )
        .route(
            "/mitigation",
            get(api::list_mitigations).post(api::create_mitigation),
        )
        .route("/mitigation/:id", patch(api::update_mitigation));

    Router::new()
        .nest("/api", api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
