//! Live submission status
//!
//! Clients watch a submission over a websocket. The hub maps submission ids
//! to the listeners currently watching them and fans updates out to them.

pub mod hub;
pub mod payload;

pub use hub::{ListenerId, NotificationHub};
pub use payload::{SubmissionUpdate, TestCaseUpdate};
