//! Language catalogue

use axum::{routing::get, Json, Router};

use crate::{
    constants::languages::{self, Language},
    state::AppState,
};

/// Languages accepted for submission
async fn list_languages() -> Json<&'static [Language]> {
    Json(languages::ALL)
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/languages", get(list_languages))
}
