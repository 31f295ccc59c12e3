//! Advisory metadata read from lock entries.

use chrono::Utc;
use std::fs;
use std::path::Path;

/// Advisory metadata for one on-disk lock entry.
///
/// Every field is optional: the holder writes them best-effort and a crash
/// can leave any subset behind. Absence never affects the mutual-exclusion
/// decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockEntry {
    /// The unhashed logical identifier recorded inside the entry.
    pub id: Option<String>,

    /// Epoch seconds of the last heartbeat.
    pub timestamp: Option<i64>,

    /// Job identifier of the holder.
    pub jobid: Option<String>,
}

impl LockEntry {
    /// Read whatever metadata files exist inside an entry directory.
    pub(super) fn read_from_dir(dir: &Path) -> Self {
        Self {
            id: read_trimmed(&dir.join("id")),
            timestamp: read_trimmed(&dir.join("timestamp")).and_then(|s| s.parse().ok()),
            jobid: read_trimmed(&dir.join("jobid")),
        }
    }

    /// Seconds since the last heartbeat, when a timestamp is present.
    pub fn age_secs(&self) -> Option<i64> {
        self.timestamp.map(|ts| Utc::now().timestamp() - ts)
    }

    /// Format the heartbeat age as a human-readable string.
    pub fn age_string(&self) -> String {
        match self.age_secs() {
            None => "unknown".to_string(),
            Some(secs) => {
                let minutes = secs / 60;
                let hours = minutes / 60;
                let days = hours / 24;
                if days > 0 {
                    format!("{}d {}h", days, hours % 24)
                } else if hours > 0 {
                    format!("{}h {}m", hours, minutes % 60)
                } else {
                    format!("{}m", minutes)
                }
            }
        }
    }

    /// Whether the last heartbeat is older than the given staleness window.
    pub fn is_stale(&self, timeout_secs: i64) -> bool {
        match self.age_secs() {
            Some(age) => age > timeout_secs,
            // No readable timestamp: treat as live, never reclaim blind
            None => false,
        }
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
