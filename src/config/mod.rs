//! Site configuration for reslock.
//!
//! One YAML file describes a lab site: engine settings at the top level and
//! the resource inventory under `resources:`. `Settings` is a plain serde
//! struct with defaults for every tunable; unknown fields are ignored for
//! forward compatibility.
//!
//! ```yaml
//! lock_dir: /shared/lab/locks
//! retry_interval_secs: 60
//! acquire_deadline_secs: 3600
//! stale_timeout_secs:
//!   ISCSI_LUNS: 7200
//! machines: [m1, m2]
//! resources:
//!   ISCSI_LUNS:
//!     fas270a:
//!       SIZE: 50
//! ```

use crate::catalog::Catalog;
use crate::error::{ReslockError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;


/// Engine settings for one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory of the shared lock store. Every cooperating process
    /// must point at the same (typically NFS-mounted) directory.
    pub lock_dir: PathBuf,

    /// Seconds to sleep between acquisition sweeps while a resource is busy.
    pub retry_interval_secs: u64,

    /// Global deadline in seconds for a blocking acquire, measured from the
    /// first attempt.
    pub acquire_deadline_secs: u64,

    /// Seconds between heartbeat refreshes of held locks.
    pub heartbeat_interval_secs: u64,

    /// Per-kind staleness window in seconds. A lock of that kind whose
    /// timestamp is older than the window may be reclaimed by another
    /// process. Kinds without an entry are never reclaimed.
    pub stale_timeout_secs: BTreeMap<String, u64>,

    /// Machine names assigned to this job, checked against resource
    /// reservation allow-lists (`RESERVED`).
    pub machines: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lock_dir: default_lock_dir(),
            retry_interval_secs: default_retry_interval_secs(),
            acquire_deadline_secs: default_acquire_deadline_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            stale_timeout_secs: BTreeMap::new(),
            machines: Vec::new(),
        }
    }
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from("locks")
}
fn default_retry_interval_secs() -> u64 {
    60
}
fn default_acquire_deadline_secs() -> u64 {
    3600
}
fn default_heartbeat_interval_secs() -> u64 {
    60
}

impl Settings {
    /// Validate settings values.
    pub fn validate(&self) -> Result<()> {
        if self.acquire_deadline_secs == 0 {
            return Err(ReslockError::UserError(
                "config validation failed: acquire_deadline_secs must be greater than 0"
                    .to_string(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ReslockError::UserError(
                "config validation failed: heartbeat_interval_secs must be greater than 0"
                    .to_string(),
            ));
        }
        for (kind, secs) in &self.stale_timeout_secs {
            if *secs == 0 {
                return Err(ReslockError::UserError(format!(
                    "config validation failed: stale_timeout_secs for {} must be greater than 0",
                    kind
                )));
            }
        }
        Ok(())
    }

    /// The backoff interval as a `Duration`.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    /// The global acquire deadline as a `Duration`.
    pub fn acquire_deadline(&self) -> Duration {
        Duration::from_secs(self.acquire_deadline_secs)
    }

    /// The heartbeat interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// The staleness window for one kind, if configured.
    pub fn stale_timeout(&self, kind: &str) -> Option<Duration> {
        self.stale_timeout_secs
            .get(kind)
            .map(|s| Duration::from_secs(*s))
    }
}

/// A fully loaded site file: settings plus catalog.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub settings: Settings,
    pub catalog: Catalog,
}

impl SiteConfig {
    /// Load a site file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReslockError::UserError(format!(
                "failed to read site config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a site file from a YAML string.
    ///
    /// Settings fields live at the top level; the inventory lives under
    /// `resources:`. A file with no `resources` key yields an empty catalog.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)
            .map_err(|e| ReslockError::UserError(format!("failed to parse site config: {}", e)))?;
        settings.validate()?;

        let doc: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| ReslockError::UserError(format!("failed to parse site config: {}", e)))?;
        let catalog = match doc.get("resources") {
            Some(resources) => Catalog::from_value(resources.clone())?,
            None => Catalog::empty(),
        };

        Ok(Self { settings, catalog })
    }
}
