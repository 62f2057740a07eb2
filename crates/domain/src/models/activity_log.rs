//! Activity log (entry/exit history) domain models.

use serde::{Deserialize, Serialize};

use super::transition::{Transition, TransitionKind};

/// Name recorded on SYSTEM events that are not tied to a target.
pub const SYSTEM_TARGET_NAME: &str = "system";

/// Category of an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogEventType {
    Entry,
    Exit,
    System,
}

impl LogEventType {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "ENTRY",
            Self::Exit => "EXIT",
            Self::System => "SYSTEM",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ENTRY" => Some(Self::Entry),
            "EXIT" => Some(Self::Exit),
            "SYSTEM" => Some(Self::System),
            _ => None,
        }
    }
}

impl From<TransitionKind> for LogEventType {
    fn from(kind: TransitionKind) -> Self {
        match kind {
            TransitionKind::Enter => Self::Entry,
            TransitionKind::Exit => Self::Exit,
        }
    }
}

impl std::fmt::Display for LogEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: i64,
    /// Copy of the target name at event time, so renames and deletions keep history intact.
    pub target_name: String,
    pub event_type: LogEventType,
    pub timestamp: i64,
    pub message: String,
}

/// A history entry that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogRecord {
    pub target_name: String,
    pub event_type: LogEventType,
    pub timestamp: i64,
    pub message: String,
}

impl NewLogRecord {
    pub fn from_transition(transition: &Transition) -> Self {
        let distance = shared::geodesy::format_distance(transition.distance_meters);
        let message = match transition.kind {
            TransitionKind::Enter => {
                format!("Entered {} ({} from center)", transition.target_name, distance)
            }
            TransitionKind::Exit => {
                format!("Exited {} ({} from center)", transition.target_name, distance)
            }
        };
        Self {
            target_name: transition.target_name.clone(),
            event_type: transition.kind.into(),
            timestamp: transition.timestamp,
            message,
        }
    }

    pub fn system(message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            target_name: SYSTEM_TARGET_NAME.to_string(),
            event_type: LogEventType::System,
            timestamp,
            message: message.into(),
        }
    }

    /// Attaches the id assigned by the log sink.
    pub fn with_id(self, id: i64) -> LogRecord {
        LogRecord {
            id,
            target_name: self.target_name,
            event_type: self.event_type,
            timestamp: self.timestamp,
            message: self.message,
        }
    }
}

fn default_limit() -> i64 {
    100
}

/// Query parameters for listing log records.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Response for listing log records (newest first).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogsResponse {
    pub logs: Vec<LogRecord>,
    pub total: usize,
}

/// Response for clearing the history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearLogsResponse {
    pub deleted: u64,
}
