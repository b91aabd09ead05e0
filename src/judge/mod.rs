//! Remote execution and verdict mapping

pub mod client;
pub mod verdict;

pub use client::{ExecutionClient, ExecutionRequest, ExecutionResult, ExecutionStatus, Judge0Client};
pub use verdict::{compose_actual_output, compute_score, map_status};
