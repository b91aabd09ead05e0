//! Submission repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Submission, SubmissionResult, SubmissionStatus},
};

/// What happened when the result stage tried to persist a final verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Status, score and results were written
    Applied,
    /// The submission already had a final verdict; nothing was written
    AlreadyFinalized,
}

/// Persistence contract for submissions and their per-test-case results
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a new submission row
    async fn save(&self, submission: &Submission) -> AppResult<Submission>;

    /// Find submission by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Submission>>;

    /// Per-test-case results of a submission, ordered by test-case number
    async fn find_results(&self, id: Uuid) -> AppResult<Vec<SubmissionResult>>;

    /// Overwrite the status of a submission
    async fn update_status(&self, id: Uuid, status: SubmissionStatus) -> AppResult<()>;

    /// Atomically set the final status and score and insert the result batch.
    /// A no-op when the submission is no longer in `Judging`.
    async fn finalize(
        &self,
        id: Uuid,
        status: SubmissionStatus,
        score: i32,
        results: &[SubmissionResult],
    ) -> AppResult<FinalizeOutcome>;

    /// Submissions for any of `case_ids` by any of `user_ids` created at or
    /// after `since`, oldest first
    async fn find_all_for_contest(
        &self,
        case_ids: &[Uuid],
        user_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> AppResult<Vec<Submission>>;

    /// A user's submissions in a contest. `Some(class)` restricts to that
    /// class, `None` to submissions made outside any class.
    async fn find_by_user_in_contest(
        &self,
        contest_id: Uuid,
        user_id: Uuid,
        class_transaction_id: Option<Uuid>,
    ) -> AppResult<Vec<Submission>>;

    /// Every submission of a class in a contest, oldest first
    async fn find_class_submissions(
        &self,
        class_transaction_id: Uuid,
        contest_id: Uuid,
    ) -> AppResult<Vec<Submission>>;
}

/// PostgreSQL-backed submission store
#[derive(Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Batch insert of test-case results inside an open transaction
    async fn save_results_batch(
        tx: &mut Transaction<'_, Postgres>,
        results: &[SubmissionResult],
    ) -> AppResult<u64> {
        if results.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            INSERT INTO submission_results (
                submission_id, testcase_number, status, time_seconds,
                memory_kb, input, expected_output, actual_output
            )
            "#,
        );
        builder.push_values(results, |mut row, result| {
            row.push_bind(result.submission_id)
                .push_bind(result.testcase_number)
                .push_bind(result.status.as_str())
                .push_bind(result.time_seconds)
                .push_bind(result.memory_kb)
                .push_bind(result.input.as_str())
                .push_bind(result.expected_output.as_str())
                .push_bind(result.actual_output.as_str());
        });
        builder.push(" ON CONFLICT (submission_id, testcase_number) DO NOTHING");

        let inserted = builder.build().execute(&mut **tx).await?.rows_affected();
        Ok(inserted)
    }
}

#[async_trait]
impl SubmissionStore for SubmissionRepository {
    async fn save(&self, submission: &Submission) -> AppResult<Submission> {
        let saved = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (
                id, case_id, user_id, language_id, status, source_code_path,
                score, contest_id, class_transaction_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(submission.id)
        .bind(submission.case_id)
        .bind(submission.user_id)
        .bind(submission.language_id)
        .bind(submission.status.as_str())
        .bind(&submission.source_code_path)
        .bind(submission.score)
        .bind(submission.contest_id)
        .bind(submission.class_transaction_id)
        .bind(submission.created_at)
        .bind(submission.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Submission>> {
        let submission =
            sqlx::query_as::<_, Submission>(r#"SELECT * FROM submissions WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(submission)
    }

    async fn find_results(&self, id: Uuid) -> AppResult<Vec<SubmissionResult>> {
        let results = sqlx::query_as::<_, SubmissionResult>(
            r#"
            SELECT * FROM submission_results
            WHERE submission_id = $1
            ORDER BY testcase_number ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    async fn update_status(&self, id: Uuid, status: SubmissionStatus) -> AppResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE submissions
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound(format!("Submission {} not found", id)));
        }

        Ok(())
    }

    async fn finalize(
        &self,
        id: Uuid,
        status: SubmissionStatus,
        score: i32,
        results: &[SubmissionResult],
    ) -> AppResult<FinalizeOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent redeliveries of the same result
        let current: Option<String> =
            sqlx::query_scalar(r#"SELECT status FROM submissions WHERE id = $1 FOR UPDATE"#)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(current) = current else {
            return Err(AppError::NotFound(format!("Submission {} not found", id)));
        };

        // Any verdict other than Judging is terminal, even with no result rows
        if current != SubmissionStatus::Judging.as_str() {
            tx.rollback().await?;
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }

        sqlx::query(
            r#"
            UPDATE submissions
            SET status = $2, score = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(score)
        .execute(&mut *tx)
        .await?;

        Self::save_results_batch(&mut tx, results).await?;

        tx.commit().await?;
        Ok(FinalizeOutcome::Applied)
    }

    async fn find_all_for_contest(
        &self,
        case_ids: &[Uuid],
        user_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> AppResult<Vec<Submission>> {
        if case_ids.is_empty() || user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE case_id = ANY($1)
              AND user_id = ANY($2)
              AND created_at >= $3
            ORDER BY created_at ASC
            "#,
        )
        .bind(case_ids)
        .bind(user_ids)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(submissions)
    }

    async fn find_by_user_in_contest(
        &self,
        contest_id: Uuid,
        user_id: Uuid,
        class_transaction_id: Option<Uuid>,
    ) -> AppResult<Vec<Submission>> {
        let submissions = match class_transaction_id {
            Some(class_id) => {
                sqlx::query_as::<_, Submission>(
                    r#"
                    SELECT * FROM submissions
                    WHERE contest_id = $1 AND user_id = $2 AND class_transaction_id = $3
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(contest_id)
                .bind(user_id)
                .bind(class_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Submission>(
                    r#"
                    SELECT * FROM submissions
                    WHERE contest_id = $1 AND user_id = $2 AND class_transaction_id IS NULL
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(contest_id)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(submissions)
    }

    async fn find_class_submissions(
        &self,
        class_transaction_id: Uuid,
        contest_id: Uuid,
    ) -> AppResult<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE class_transaction_id = $1 AND contest_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(class_transaction_id)
        .bind(contest_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(submissions)
    }
}
