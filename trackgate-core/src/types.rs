//! Domain types shared by the tracker, the hit store and the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

// ============================================
// Tracker settings
// ============================================

/// Settings handed to a tracker when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Analytics account key the tracker reports under
    pub tracking_key: String,
    /// Network timeout the tracker uses for its own delivery
    pub network_timeout: Duration,
}

// ============================================
// Custom variables
// ============================================

/// Lowest custom variable slot
pub const MIN_VARIABLE_INDEX: u8 = 1;

/// Highest custom variable slot
pub const MAX_VARIABLE_INDEX: u8 = 5;

/// How long a custom variable sticks to the reports that follow it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    Visitor,
    Session,
    Page,
}

impl VariableScope {
    /// Numeric scope code understood by trackers
    pub fn code(&self) -> i32 {
        match self {
            VariableScope::Visitor => 1,
            VariableScope::Session => 2,
            VariableScope::Page => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariableScope::Visitor => "visitor",
            VariableScope::Session => "session",
            VariableScope::Page => "page",
        }
    }
}

impl std::str::FromStr for VariableScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visitor" => Ok(VariableScope::Visitor),
            "session" => Ok(VariableScope::Session),
            "page" => Ok(VariableScope::Page),
            _ => Err(format!("unknown variable scope: {}", s)),
        }
    }
}

impl std::fmt::Display for VariableScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named value attached to a slot (1..=5) of the tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomVariable {
    pub index: u8,
    pub name: String,
    pub value: String,
    pub scope: VariableScope,
}

impl CustomVariable {
    pub fn new(index: u8, name: impl Into<String>, value: impl Into<String>, scope: VariableScope) -> Self {
        Self {
            index,
            name: name.into(),
            value: value.into(),
            scope,
        }
    }

    /// Whether the slot is one a tracker accepts
    pub fn has_valid_index(&self) -> bool {
        (MIN_VARIABLE_INDEX..=MAX_VARIABLE_INDEX).contains(&self.index)
    }
}

// ============================================
// Hits
// ============================================

/// An event report: category / action / label / value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHit {
    pub category: String,
    pub action: String,
    pub label: String,
    pub value: i32,
}

/// What a single hit reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HitPayload {
    Event(EventHit),
    PageView { path: String },
}

impl HitPayload {
    /// Name of the reporting operation, used in logs
    pub fn operation(&self) -> &'static str {
        match self {
            HitPayload::Event(_) => "track_event",
            HitPayload::PageView { .. } => "track_page_view",
        }
    }

    /// Identifier used in database storage
    pub fn kind(&self) -> HitKind {
        match self {
            HitPayload::Event(_) => HitKind::Event,
            HitPayload::PageView { .. } => HitKind::PageView,
        }
    }
}

/// Stored kind of a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Event,
    PageView,
}

impl HitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HitKind::Event => "event",
            HitKind::PageView => "page_view",
        }
    }
}

impl std::str::FromStr for HitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(HitKind::Event),
            "page_view" => Ok(HitKind::PageView),
            _ => Err(format!("unknown hit kind: {}", s)),
        }
    }
}

impl std::fmt::Display for HitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of work on the dispatch queue
#[derive(Debug, Clone)]
pub struct Hit {
    /// Correlates the submission with its delivery in the logs
    pub id: Uuid,
    /// When the caller reported it
    pub submitted_at: DateTime<Utc>,
    pub payload: HitPayload,
}

impl Hit {
    pub fn event(
        category: impl Into<String>,
        action: impl Into<String>,
        label: impl Into<String>,
        value: i32,
    ) -> Self {
        Self::new(HitPayload::Event(EventHit {
            category: category.into(),
            action: action.into(),
            label: label.into(),
            value,
        }))
    }

    pub fn page_view(path: impl Into<String>) -> Self {
        Self::new(HitPayload::PageView { path: path.into() })
    }

    fn new(payload: HitPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            submitted_at: Utc::now(),
            payload,
        }
    }
}

/// A hit as persisted by the bundled tracker
#[derive(Debug, Clone, Serialize)]
pub struct StoredHit {
    pub id: i64,
    pub kind: HitKind,
    pub tracking_key: String,
    pub category: Option<String>,
    pub action: Option<String>,
    pub label: Option<String>,
    pub value: Option<i32>,
    pub path: Option<String>,
    /// Custom variables in effect when the hit was recorded
    pub custom_variables: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_codes() {
        assert_eq!(VariableScope::Visitor.code(), 1);
        assert_eq!(VariableScope::Session.code(), 2);
        assert_eq!(VariableScope::Page.code(), 3);
        assert_eq!("visitor".parse::<VariableScope>(), Ok(VariableScope::Visitor));
        assert!("global".parse::<VariableScope>().is_err());
    }

    #[test]
    fn test_custom_variable_index_range() {
        assert!(CustomVariable::new(1, "apiLevel", "34", VariableScope::Visitor).has_valid_index());
        assert!(CustomVariable::new(5, "x", "y", VariableScope::Page).has_valid_index());
        assert!(!CustomVariable::new(0, "x", "y", VariableScope::Page).has_valid_index());
        assert!(!CustomVariable::new(6, "x", "y", VariableScope::Page).has_valid_index());
    }

    #[test]
    fn test_hit_constructors() {
        let hit = Hit::event("ui", "click", "button_x", 1);
        assert_eq!(hit.payload.operation(), "track_event");
        assert_eq!(hit.payload.kind(), HitKind::Event);

        let page = Hit::page_view("/home");
        assert_eq!(page.payload, HitPayload::PageView { path: "/home".to_string() });
        assert_ne!(hit.id, page.id);
    }

    #[test]
    fn test_hit_payload_serializes_with_kind_tag() {
        let json = serde_json::to_value(HitPayload::PageView { path: "/home".to_string() }).unwrap();
        assert_eq!(json["kind"], "page_view");
        assert_eq!(json["path"], "/home");
    }
}
