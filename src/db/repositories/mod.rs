//! Database repositories
//!
//! Repositories handle all direct database interactions.

pub mod contest_repo;
pub mod submission_repo;
pub mod test_case_repo;

pub use contest_repo::{ContestDirectory, ContestRepository};
pub use submission_repo::{FinalizeOutcome, SubmissionRepository, SubmissionStore};
pub use test_case_repo::TestCaseRepository;
