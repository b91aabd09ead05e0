//! Result stage
//!
//! Persists the final verdict of a judging pass and pushes the terminal
//! update to live listeners. Redelivered results are detected and skipped.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    db::repositories::{FinalizeOutcome, SubmissionStore},
    error::{AppError, AppResult},
    judge::compute_score,
    notify::{NotificationHub, SubmissionUpdate},
    queue::JudgeResultMessage,
};

use super::worker_pool::MessageHandler;

/// Consumer of judge results
pub struct ResultWorker {
    store: Arc<dyn SubmissionStore>,
    hub: Arc<NotificationHub>,
}

impl ResultWorker {
    pub fn new(store: Arc<dyn SubmissionStore>, hub: Arc<NotificationHub>) -> Self {
        Self { store, hub }
    }

    /// Persist a judge result. The score carried by the message is ignored
    /// and recomputed from the results.
    pub async fn apply(&self, message: &JudgeResultMessage) -> AppResult<FinalizeOutcome> {
        if !message.final_status.is_final() {
            return Err(AppError::Validation(format!(
                "Result for submission {} carries non-final status {}",
                message.submission_id, message.final_status
            )));
        }

        let score = compute_score(&message.results);
        if score != message.score {
            tracing::debug!(
                submission_id = %message.submission_id,
                carried = message.score,
                computed = score,
                "Overriding carried score"
            );
        }

        let outcome = self
            .store
            .finalize(
                message.submission_id,
                message.final_status,
                score,
                &message.results,
            )
            .await?;

        match outcome {
            FinalizeOutcome::Applied => {
                tracing::info!(
                    submission_id = %message.submission_id,
                    verdict = %message.final_status,
                    score,
                    results = message.results.len(),
                    "Submission result persisted"
                );

                let update = SubmissionUpdate::finished(
                    message.submission_id,
                    message.final_status,
                    score,
                    &message.results,
                );
                if let Err(e) = self.hub.broadcast(message.submission_id, &update) {
                    tracing::warn!(submission_id = %message.submission_id, error = %e, "Failed to notify listeners");
                }
            }
            FinalizeOutcome::AlreadyFinalized => {
                tracing::info!(
                    submission_id = %message.submission_id,
                    "Duplicate result skipped"
                );
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl MessageHandler for ResultWorker {
    type Message = JudgeResultMessage;

    fn stage(&self) -> &'static str {
        "result"
    }

    async fn handle(&self, message: &JudgeResultMessage) -> AppResult<()> {
        self.apply(message).await.map(|_| ())
    }
}
