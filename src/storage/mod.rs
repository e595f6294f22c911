//! # Storage Module
//!
//! Local persistence of station data.
//!
//! This module handles:
//! - The bounded "latest" CSV of aggregated records (header + last N rows)
//! - The optional date-partitioned CSV of raw samples

pub mod bounded_log;
pub mod raw_log;

pub use bounded_log::BoundedLog;
pub use raw_log::DailyRawLog;
