//! Test-case assets

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::repositories::TestCaseRepository,
    error::AppResult,
    models::{TestCase, TestCaseData},
};

use super::resolve_handle;

/// Read-only access to a problem's ordered test cases
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaseAssetStore: Send + Sync {
    /// Test cases of a problem in ascending number order
    async fn list_test_cases(&self, case_id: Uuid) -> AppResult<Vec<TestCase>>;

    /// Input and expected output bytes of one test case
    async fn read_test_case(&self, test_case: &TestCase) -> AppResult<TestCaseData>;
}

/// Lists test cases from PostgreSQL and reads their files from disk
#[derive(Clone)]
pub struct FsCaseAssetStore {
    pool: PgPool,
    root: PathBuf,
}

impl FsCaseAssetStore {
    pub fn new(pool: PgPool, root: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            root: root.into(),
        }
    }
}

#[async_trait]
impl CaseAssetStore for FsCaseAssetStore {
    async fn list_test_cases(&self, case_id: Uuid) -> AppResult<Vec<TestCase>> {
        TestCaseRepository::list_by_case(&self.pool, case_id).await
    }

    async fn read_test_case(&self, test_case: &TestCase) -> AppResult<TestCaseData> {
        read_pair(&self.root, test_case).await
    }
}

/// Read the input/expected-output pair of a test case relative to `root`.
/// Invalid UTF-8 is replaced rather than rejected.
pub async fn read_pair(root: &std::path::Path, test_case: &TestCase) -> AppResult<TestCaseData> {
    let input = tokio::fs::read(resolve_handle(root, &test_case.input_url)).await?;
    let expected_output = tokio::fs::read(resolve_handle(root, &test_case.output_url)).await?;

    Ok(TestCaseData {
        input: String::from_utf8_lossy(&input).into_owned(),
        expected_output: String::from_utf8_lossy(&expected_output).into_owned(),
    })
}
