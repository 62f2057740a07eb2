//! Domain models for TargetPing.

pub mod activity_log;
pub mod location;
pub mod status;
pub mod target;
pub mod transition;

pub use activity_log::{LogEventType, LogRecord, NewLogRecord};
pub use location::{LocationFix, LocationUpdateConfig};
pub use status::{MotionState, NearestTarget, TrackingState, TrackingStatus};
pub use target::{MalformedTarget, Target, UpdateTargetRequest};
pub use transition::{Transition, TransitionKind};
