//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for the student ledger
//! - Error to response mapping
//! - Request and response types

pub mod error;
pub mod routes;

use axum::Router;
use hostel_core::ledger::Ledger;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger facade over the configured store.
    pub ledger: Arc<Ledger>,
}

impl AppState {
    /// Wraps a ledger for sharing across handlers.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
