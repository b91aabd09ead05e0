//! Business logic services

pub mod judge_worker;
pub mod leaderboard_service;
pub mod result_worker;
pub mod submission_service;
pub mod worker_pool;

pub use judge_worker::JudgeWorker;
pub use leaderboard_service::LeaderboardService;
pub use result_worker::ResultWorker;
pub use submission_service::{SourceFile, SubmissionService};
pub use worker_pool::{Consumer, MessageHandler, WorkerPool};
