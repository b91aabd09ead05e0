//! Neptune Judge - Asynchronous Judging Pipeline
//!
//! This library provides the core of the Neptune online judge: it accepts
//! submitted source code, dispatches it through a two-stage queue to a remote
//! sandbox executor, aggregates per-test-case verdicts into a score, pushes
//! live status to connected clients and ranks contest participants ICPC-style.
//!
//! # Features
//!
//! - Queue-based judging with retry, backoff and dead-lettering
//! - Fail-fast test-case evaluation against a remote execution service
//! - Idempotent result persistence under at-least-once delivery
//! - Live status over websockets
//! - ICPC leaderboard with deterministic tie-breaking
//!
//! # Architecture
//!
//! The application follows a layered architecture:
//! - **Handlers**: HTTP and websocket handlers (thin layer)
//! - **Services**: Intake, judge-stage and result-stage workers, leaderboard
//! - **Queue / Judge / Notify**: Broker, execution client and live-status hub
//! - **Repositories / Storage**: Database access and file storage
//! - **Models**: Domain models and DTOs

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod handlers;
pub mod judge;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod queue;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
