//! Utility functions

pub mod time;

pub use time::{minutes_between, now_utc, parse_datetime};
