//! Domain services: proximity evaluation, the monitoring loop and the
//! collaborator seams it runs against.

pub mod alert;
pub mod containment;
pub mod event_log;
pub mod event_writer;
pub mod keep_alive;
pub mod location_source;
pub mod monitor;
pub mod proximity;
pub mod target_store;

#[cfg(test)]
pub(crate) mod testing;

pub use alert::{AlertSink, LoggingAlertSink};
pub use containment::ContainmentTracker;
pub use event_log::{EventLogSink, InMemoryEventLog};
pub use event_writer::{EventWriter, WriteOp};
pub use keep_alive::{KeepAlive, KeepAliveHandle};
pub use location_source::{
    ChannelLocationSource, FeedError, LocationError, LocationSource, LocationSubscription,
    PushOutcome,
};
pub use monitor::{ControlCommand, MonitorController, MonitorDeps, MonitorSettings};
pub use proximity::{EvaluatorPolicy, Evaluation, ProximityEvaluator};
pub use target_store::{InMemoryTargetStore, StoreError, TargetStore};
