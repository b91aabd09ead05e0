//! Verdict mapping and scoring

use crate::{
    constants::{execution_status, COMPILE_OUTPUT_MARKER, MAX_SCORE, STDERR_MARKER},
    models::{SubmissionResult, SubmissionStatus},
};

use super::ExecutionResult;

/// Map an execution status id to a verdict.
///
/// A program that ran successfully is only accepted when its stdout equals
/// the expected output byte for byte.
pub fn map_status(status_id: i32, stdout: &str, expected_output: &str) -> SubmissionStatus {
    match status_id {
        execution_status::RAN_OK if stdout == expected_output => SubmissionStatus::Accepted,
        execution_status::RAN_OK | execution_status::WRONG_OUTPUT => SubmissionStatus::WrongAnswer,
        execution_status::TIME_LIMIT => SubmissionStatus::TimeLimitExceeded,
        execution_status::COMPILE_ERROR => SubmissionStatus::CompileError,
        execution_status::RUNTIME_ERROR_FIRST..=execution_status::RUNTIME_ERROR_LAST => {
            SubmissionStatus::RuntimeError
        }
        _ => SubmissionStatus::InternalError,
    }
}

/// Stdout followed by stderr and compiler output, each behind a marker line
pub fn compose_actual_output(result: &ExecutionResult) -> String {
    let mut output = result.stdout.clone();
    if !result.stderr.is_empty() {
        output.push_str(STDERR_MARKER);
        output.push_str(&result.stderr);
    }
    if !result.compile_output.is_empty() {
        output.push_str(COMPILE_OUTPUT_MARKER);
        output.push_str(&result.compile_output);
    }
    output
}

/// `round(100 * accepted / total)`, or 0 without results
pub fn compute_score(results: &[SubmissionResult]) -> i32 {
    if results.is_empty() {
        return 0;
    }

    let accepted = results
        .iter()
        .filter(|result| result.status.is_accepted())
        .count();

    (f64::from(MAX_SCORE) * accepted as f64 / results.len() as f64).round() as i32
}
