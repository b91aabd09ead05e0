//! Test case model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Test case metadata owned by the problem catalogue
///
/// `input_url` and `output_url` are `/`-prefixed file handles resolved
/// against the configured test-case root.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestCase {
    pub case_id: Uuid,
    pub number: i32,
    pub input_url: String,
    pub output_url: String,
}

/// Input and expected output of one test case, read from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseData {
    pub input: String,
    pub expected_output: String,
}
