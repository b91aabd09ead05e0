//! Domain models
//!
//! This module contains all domain models used throughout the application.

pub mod contest;
pub mod leaderboard;
pub mod submission;
pub mod test_case;

pub use contest::*;
pub use leaderboard::*;
pub use submission::*;
pub use test_case::*;
