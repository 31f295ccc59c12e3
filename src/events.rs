//! Append-only audit log for lock lifecycle events.
//!
//! Events are stored in NDJSON format (one JSON object per line) in
//! `events.ndjson` inside the lock store root, so the audit trail lives on
//! the same shared filesystem the locks do and is visible to every site.
//!
//! Logging is strictly best-effort: a full disk or permission problem on
//! the audit file must never fail an acquire or release, so callers ignore
//! or warn on append errors.

use crate::error::{ReslockError, Result};
use crate::store::LockStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;

/// Lock lifecycle actions recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A lock entry was claimed.
    Acquire,
    /// A lock entry was released by its holder.
    Release,
    /// A stale entry was deleted by a different caller before re-acquisition.
    Reclaim,
    /// An entry was force-cleared by an operator.
    Clear,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Acquire => write!(f, "acquire"),
            EventAction::Release => write!(f, "release"),
            EventAction::Reclaim => write!(f, "reclaim"),
            EventAction::Clear => write!(f, "clear"),
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// Who performed it (`user@HOST`).
    pub actor: String,

    /// The logical identifier involved.
    pub resource: String,

    /// Freeform action-specific details.
    pub details: Value,
}

impl Event {
    /// Create a new event for a logical identifier. The timestamp is now
    /// and the actor is derived from the environment.
    pub fn new(action: EventAction, resource: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(),
            resource: resource.into(),
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ReslockError::UserError(format!("failed to serialize event: {}", e)))
    }
}

/// Get the `user@HOST` identity of this process.
pub(crate) fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the audit log in the store root.
pub fn append_event(store: &LockStore, event: &Event) -> Result<()> {
    let json_line = event.to_ndjson_line()?;

    let root = store.root();
    if !root.exists() {
        std::fs::create_dir_all(root).map_err(|e| {
            ReslockError::Store(format!(
                "failed to create lock store root '{}': {}",
                root.display(),
                e
            ))
        })?;
    }

    let path = root.join("events.ndjson");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            ReslockError::Store(format!(
                "failed to open events file '{}': {}",
                path.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        ReslockError::Store(format!(
            "failed to write event to '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn event_serializes_to_single_line() {
        let event = Event::new(EventAction::Acquire, "ISCSI_LUNS-fas270a")
            .with_details(json!({"jobid": "1234"}));
        let line = event.to_ndjson_line().unwrap();

        assert!(!line.contains('\n'));
        let parsed: Event = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.action, EventAction::Acquire);
        assert_eq!(parsed.resource, "ISCSI_LUNS-fas270a");
        assert_eq!(parsed.details["jobid"], "1234");
    }

    #[test]
    fn actions_serialize_snake_case() {
        let line = Event::new(EventAction::Reclaim, "X")
            .to_ndjson_line()
            .unwrap();
        assert!(line.contains("\"reclaim\""));
    }

    #[test]
    fn append_event_accumulates_lines() {
        let temp_dir = TempDir::new().unwrap();
        let store = LockStore::new(temp_dir.path().join("locks"));

        append_event(&store, &Event::new(EventAction::Acquire, "X")).unwrap();
        append_event(&store, &Event::new(EventAction::Release, "X")).unwrap();

        let content =
            std::fs::read_to_string(store.root().join("events.ndjson")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Event = serde_json::from_str(lines[0]).unwrap();
        let second: Event = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first.action, EventAction::Acquire);
        assert_eq!(second.action, EventAction::Release);
    }

    #[test]
    fn actor_string_has_user_and_host() {
        let actor = actor_string();
        assert!(actor.contains('@'));
    }

    #[test]
    fn event_action_display() {
        assert_eq!(EventAction::Acquire.to_string(), "acquire");
        assert_eq!(EventAction::Release.to_string(), "release");
        assert_eq!(EventAction::Reclaim.to_string(), "reclaim");
        assert_eq!(EventAction::Clear.to_string(), "clear");
    }
}
