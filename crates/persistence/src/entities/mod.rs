//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod activity_log;
pub mod target;

pub use activity_log::ActivityLogEntity;
pub use target::TargetEntity;
