//! HTTP Request Handlers
//!
//! This module contains all HTTP request handlers organized by domain.

pub mod health;
pub mod languages;
pub mod leaderboard;
pub mod submissions;
pub mod ws;

use axum::{middleware, Router};

use crate::{constants::API_BASE_PATH, middleware::logging_middleware, state::AppState};

/// Create all API routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(languages::routes())
        .merge(submissions::routes())
        .merge(leaderboard::routes())
}

/// API routes plus the live status channel, with request logging
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest(API_BASE_PATH, routes())
        .merge(ws::routes())
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}
