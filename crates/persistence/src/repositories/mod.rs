//! Repository implementations for database operations.

pub mod activity_log;
pub mod target;

pub use activity_log::ActivityLogRepository;
pub use target::TargetRepository;
