//! mqe-server library interface
//!
//! Meeting quality evaluation backend: a creator-driven phase state machine
//! over a shared meeting, with per-participant submissions aggregated into
//! task and participant analytics. Exposed as a library for integration
//! testing; the binary in `main.rs` only wires configuration and serving.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod validation;

pub use crate::error::{ApiError, ApiResult, ProtocolError, ProtocolResult};
pub use crate::services::{MeetingEngine, SessionContext};

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use mqe_common::events::EventBus;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: MeetingEngine,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self {
            engine: MeetingEngine::new(db, event_bus),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::user_routes())
        .merge(api::meeting_routes())
        .merge(api::submission_routes())
        .merge(api::task_routes())
        .merge(api::report_routes())
        .route("/api/meetings/:id/events", get(api::meeting_event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
