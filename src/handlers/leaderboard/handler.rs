//! Leaderboard handler implementations

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{error::AppResult, state::AppState};

use super::response::LeaderboardResponse;

/// Standings of a class in a contest
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path((class_id, contest_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<LeaderboardResponse>> {
    let leaderboard = state.leaderboard().compute(class_id, contest_id).await?;

    Ok(Json(LeaderboardResponse {
        class_id,
        contest_id,
        problems: leaderboard.problems.into_iter().map(Into::into).collect(),
        rows: leaderboard.rows,
    }))
}
