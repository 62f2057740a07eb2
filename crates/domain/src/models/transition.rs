//! Containment transitions produced by the proximity evaluator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a containment change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Enter,
    Exit,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "enter" => Some(Self::Enter),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected outside→inside or inside→outside change for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub target_id: Uuid,
    pub target_name: String,
    pub kind: TransitionKind,
    pub distance_meters: f64,
    pub timestamp: i64,
    /// Whether the user-facing alert passes the cooldown. Always false for exits.
    pub fires_alert: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_kind_as_str() {
        assert_eq!(TransitionKind::Enter.as_str(), "enter");
        assert_eq!(TransitionKind::Exit.as_str(), "exit");
    }

    #[test]
    fn test_transition_kind_parse() {
        assert_eq!(TransitionKind::parse("ENTER"), Some(TransitionKind::Enter));
        assert_eq!(TransitionKind::parse("exit"), Some(TransitionKind::Exit));
        assert_eq!(TransitionKind::parse("dwell"), None);
    }

    #[test]
    fn test_transition_kind_display() {
        assert_eq!(TransitionKind::Exit.to_string(), "exit");
    }
}
