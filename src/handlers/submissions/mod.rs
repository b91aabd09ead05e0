//! Submission handlers

mod handler;
pub mod request;
pub mod response;

pub use handler::*;
pub use request::*;
pub use response::*;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Submission routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/submissions", post(handler::create_submission))
        .route("/submissions/{id}", get(handler::get_submission))
        .route("/submissions/{id}/source", get(handler::get_submission_source))
        .route(
            "/submissions/{id}/source.zip",
            get(handler::download_submission_source),
        )
        .route(
            "/contests/{contest_id}/users/{user_id}/submissions",
            get(handler::list_user_contest_submissions),
        )
        .route(
            "/classes/{class_id}/contests/{contest_id}/submissions",
            get(handler::list_class_submissions),
        )
}
