//! Application state management
//!
//! This module contains the shared application state that is passed
//! to all request handlers via Axum's State extractor.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    notify::NotificationHub,
    services::{LeaderboardService, SubmissionService},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    /// Database connection pool
    db: PgPool,

    /// Live listeners per submission
    hub: Arc<NotificationHub>,

    submissions: SubmissionService,

    leaderboard: LeaderboardService,

    /// Application configuration
    config: Config,
}

impl AppState {
    /// Create a new application state
    pub fn new(
        db: PgPool,
        hub: Arc<NotificationHub>,
        submissions: SubmissionService,
        leaderboard: LeaderboardService,
        config: Config,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                hub,
                submissions,
                leaderboard,
                config,
            }),
        }
    }

    /// Get a reference to the database pool
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get a reference to the notification hub
    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.inner.hub
    }

    pub fn submissions(&self) -> &SubmissionService {
        &self.inner.submissions
    }

    pub fn leaderboard(&self) -> &LeaderboardService {
        &self.inner.leaderboard
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}
