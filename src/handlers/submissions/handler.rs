//! Submission handler implementations

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{error::AppResult, state::AppState};

use super::{
    request::{ClassFilterQuery, CreateSubmissionRequest},
    response::{CreateSubmissionResponse, SubmissionDetailResponse, SubmissionsListResponse},
};

/// Create a new submission
pub async fn create_submission(
    State(state): State<AppState>,
    Json(payload): Json<CreateSubmissionRequest>,
) -> AppResult<(StatusCode, Json<CreateSubmissionResponse>)> {
    payload.validate()?;

    let submission = state.submissions().submit(payload.into()).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateSubmissionResponse {
            submission_id: submission.id,
            status: submission.status,
        }),
    ))
}

/// Get a submission with its results
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubmissionDetailResponse>> {
    let (submission, results) = state.submissions().get_with_results(id).await?;

    Ok(Json(SubmissionDetailResponse {
        submission,
        results,
    }))
}

/// Stored source code, served with a content type matching its extension
pub async fn get_submission_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let source = state.submissions().source(id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, source.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", source.file_name),
            ),
        ],
        source.content,
    ))
}

/// Source code packed in a zip archive
pub async fn download_submission_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (file_name, archive) = state.submissions().source_zip(id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        archive,
    ))
}

/// A user's submissions in a contest, newest first
pub async fn list_user_contest_submissions(
    State(state): State<AppState>,
    Path((contest_id, user_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ClassFilterQuery>,
) -> AppResult<Json<SubmissionsListResponse>> {
    let submissions = state
        .submissions()
        .list_user_contest_submissions(contest_id, user_id, query.class_id)
        .await?;

    Ok(Json(submissions.into()))
}

/// Every submission of a class in a contest, oldest first
pub async fn list_class_submissions(
    State(state): State<AppState>,
    Path((class_id, contest_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<SubmissionsListResponse>> {
    let submissions = state
        .submissions()
        .list_class_submissions(class_id, contest_id)
        .await?;

    Ok(Json(submissions.into()))
}
