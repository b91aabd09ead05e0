//! Submission service
//!
//! Intake plus the read paths used for review: single submissions with
//! their results, per-user and per-class listings, and source download.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::repositories::SubmissionStore,
    error::{AppError, AppResult},
    models::{NewSubmission, Submission, SubmissionResult, SubmissionStatus},
    queue::{JudgeRequest, PublishOutcome, QueuePublisher},
    storage::{source_files, SourceFileStore},
    utils::now_utc,
};

/// Stored source code ready to be served
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub content: String,
}

/// Submission intake and queries
#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn SubmissionStore>,
    sources: SourceFileStore,
    publisher: QueuePublisher,
    judge_queue: String,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        sources: SourceFileStore,
        publisher: QueuePublisher,
        judge_queue: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sources,
            publisher,
            judge_queue: judge_queue.into(),
        }
    }

    /// Accept a submission: store the source, create the row in `Judging`,
    /// then enqueue a judge request.
    ///
    /// A failed file write aborts before anything is persisted. A judge
    /// request that cannot be delivered is dead-lettered and the submission
    /// is still returned; it stays in `Judging` until replayed.
    pub async fn submit(&self, new: NewSubmission) -> AppResult<Submission> {
        let id = Uuid::new_v4();

        let source_code_path = self
            .sources
            .write(id, new.language_id, &new.source_code)
            .await?;

        let now = now_utc();
        let submission = self
            .store
            .save(&Submission {
                id,
                case_id: new.case_id,
                user_id: new.user_id,
                language_id: new.language_id,
                status: SubmissionStatus::Judging,
                source_code_path,
                score: 0,
                contest_id: new.contest_id,
                class_transaction_id: new.class_transaction_id,
                created_at: now,
                updated_at: now,
            })
            .await?;

        match self
            .publisher
            .publish(&self.judge_queue, &JudgeRequest { submission_id: id })
            .await?
        {
            PublishOutcome::Delivered => {
                tracing::info!(
                    submission_id = %id,
                    case_id = %submission.case_id,
                    user_id = %submission.user_id,
                    language_id = submission.language_id,
                    "Submission queued for judging"
                );
            }
            PublishOutcome::DeadLettered => {
                tracing::error!(
                    submission_id = %id,
                    "Judge request dead-lettered, submission remains in Judging"
                );
            }
        }

        Ok(submission)
    }

    /// Find a submission or fail with `NotFound`
    pub async fn get_submission(&self, id: Uuid) -> AppResult<Submission> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))
    }

    /// A submission with its per-test-case results
    pub async fn get_with_results(&self, id: Uuid) -> AppResult<(Submission, Vec<SubmissionResult>)> {
        let submission = self.get_submission(id).await?;
        let results = self.store.find_results(id).await?;
        Ok((submission, results))
    }

    /// A user's submissions in a contest, newest first
    pub async fn list_user_contest_submissions(
        &self,
        contest_id: Uuid,
        user_id: Uuid,
        class_transaction_id: Option<Uuid>,
    ) -> AppResult<Vec<Submission>> {
        self.store
            .find_by_user_in_contest(contest_id, user_id, class_transaction_id)
            .await
    }

    /// All submissions of a class in a contest, oldest first
    pub async fn list_class_submissions(
        &self,
        class_transaction_id: Uuid,
        contest_id: Uuid,
    ) -> AppResult<Vec<Submission>> {
        self.store
            .find_class_submissions(class_transaction_id, contest_id)
            .await
    }

    /// Source code of a submission with a content type for display
    pub async fn source(&self, id: Uuid) -> AppResult<SourceFile> {
        let submission = self.get_submission(id).await?;
        let content = self
            .sources
            .read(&submission.source_code_path)
            .await
            .map_err(|e| match e {
                AppError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                    AppError::NotFound(format!("Source file for submission {} not found", id))
                }
                other => other,
            })?;

        Ok(SourceFile {
            file_name: source_files::file_name(&submission.source_code_path),
            content_type: source_files::content_type_for(&submission.source_code_path),
            content,
        })
    }

    /// Source code packed in `submission_<id>.zip`
    pub async fn source_zip(&self, id: Uuid) -> AppResult<(String, Vec<u8>)> {
        let source = self.source(id).await?;
        let archive = source_files::zip_single_file(&source.file_name, source.content.as_bytes())?;
        Ok((format!("submission_{}.zip", id), archive))
    }
}
