//! HTTP surface: thin axum handlers over the session manager and the
//! Google wrappers. Handlers never format errors themselves; everything
//! flows through [`crate::error::GatewayError`]'s `IntoResponse`.

mod analytics;
mod auth;
mod calendar;
mod gmail;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::auth::SessionManager;
use crate::config::GatewayConfig;

/// Shared application state.
pub struct AppState {
    pub config: GatewayConfig,
    pub sessions: SessionManager,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/auth/login", get(auth::login))
        .route("/api/auth/callback", get(auth::callback))
        .route("/api/auth/status", get(auth::status))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/gmail", get(gmail::list).post(gmail::send))
        .route("/api/gmail/{id}", get(gmail::get).patch(gmail::update))
        .route(
            "/api/calendar",
            get(calendar::list).post(calendar::create),
        )
        .route(
            "/api/calendar/{id}",
            get(calendar::get)
                .patch(calendar::update)
                .delete(calendar::remove),
        )
        .route(
            "/api/ga4",
            get(analytics::view).post(analytics::run_report),
        )
        .with_state(state)
}
