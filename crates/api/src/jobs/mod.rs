//! Background job scheduler and job implementations.

mod cleanup_logs;
mod pool_metrics;
mod refresh_targets;
mod scheduler;

pub use cleanup_logs::{retention_cutoff, CleanupLogsJob};
pub use pool_metrics::PoolMetricsJob;
pub use refresh_targets::RefreshTargetsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
