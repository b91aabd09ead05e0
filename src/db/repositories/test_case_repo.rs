//! Test case repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppResult, models::TestCase};

/// Repository for test case metadata
pub struct TestCaseRepository;

impl TestCaseRepository {
    /// Test cases of a problem in ascending number order
    pub async fn list_by_case(pool: &PgPool, case_id: Uuid) -> AppResult<Vec<TestCase>> {
        let test_cases = sqlx::query_as::<_, TestCase>(
            r#"
            SELECT case_id, number, input_url, output_url
            FROM test_cases
            WHERE case_id = $1
            ORDER BY number ASC
            "#,
        )
        .bind(case_id)
        .fetch_all(pool)
        .await?;

        Ok(test_cases)
    }
}
