//! Lock store acquisition, release, heartbeat, and listing operations.

use super::metadata::LockEntry;
use crate::catalog::{self, Catalog};
use crate::error::{ReslockError, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Locking status of one logical identifier, for operator visibility and
/// staleness decisions.
#[derive(Debug, Clone)]
pub struct LockStatus {
    /// The logical identifier (e.g. `ISCSI_LUNS-fas270a`).
    pub logical_id: String,

    /// Whether a lock entry currently exists.
    pub locked: bool,

    /// Advisory metadata from the entry, when locked.
    pub entry: Option<LockEntry>,
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.locked {
            return write!(f, "{}: not locked", self.logical_id);
        }
        write!(f, "{}: locked", self.logical_id)?;
        if let Some(entry) = &self.entry {
            write!(
                f,
                " (jobid: {}, age: {})",
                entry.jobid.as_deref().unwrap_or("none"),
                entry.age_string()
            )?;
        }
        Ok(())
    }
}

/// Handle to the shared lock-store directory.
///
/// Cheap to clone conceptually (it is just a path); every cooperating
/// process constructs one over the same shared directory.
#[derive(Debug, Clone)]
pub struct LockStore {
    root: PathBuf,
}

impl LockStore {
    /// Create a store handle over the given root directory. The directory
    /// is created lazily on first acquire.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The on-disk entry directory for a logical identifier.
    pub fn entry_dir(&self, logical_id: &str) -> PathBuf {
        let digest = Sha256::digest(logical_id.as_bytes());
        self.root.join(hex::encode(digest))
    }

    /// Attempt to claim a logical identifier.
    ///
    /// Returns `Ok(true)` when this caller now owns the entry, `Ok(false)`
    /// when another holder already does. Only real filesystem failures are
    /// errors. On success the `id`, `timestamp`, and `jobid` metadata files
    /// are written best-effort; a metadata write failure does not revoke
    /// ownership.
    pub fn try_acquire(&self, logical_id: &str, jobid: Option<&str>) -> Result<bool> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| {
                ReslockError::Store(format!(
                    "failed to create lock store root '{}': {}",
                    self.root.display(),
                    e
                ))
            })?;
        }

        let dir = self.entry_dir(logical_id);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(ReslockError::Store(format!(
                    "failed to create lock entry '{}': {}",
                    dir.display(),
                    e
                )));
            }
        }

        // Ownership is established by the mkdir above; metadata is advisory.
        let _ = fs::write(dir.join("id"), logical_id);
        let _ = fs::write(dir.join("timestamp"), Utc::now().timestamp().to_string());
        if let Some(jobid) = jobid {
            let _ = fs::write(dir.join("jobid"), jobid);
        }
        Ok(true)
    }

    /// Lock-free existence probe.
    ///
    /// Inherently racy; useful only as a pre-flight filter to reduce
    /// needless contention, never for correctness.
    pub fn is_locked(&self, logical_id: &str) -> bool {
        self.entry_dir(logical_id).exists()
    }

    /// Release a lock entry. Idempotent: releasing an entry that does not
    /// exist is not an error.
    pub fn release(&self, logical_id: &str) -> Result<()> {
        let dir = self.entry_dir(logical_id);
        for file in ["jobid", "id", "timestamp"] {
            let _ = fs::remove_file(dir.join(file));
        }
        match fs::remove_dir(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReslockError::Store(format!(
                "failed to remove lock entry '{}': {}",
                dir.display(),
                e
            ))),
        }
    }

    /// Rewrite the heartbeat timestamp of a held entry.
    ///
    /// Called by the heartbeat daemon for every held lock; never by the
    /// acquire/release paths.
    pub fn mark(&self, logical_id: &str) -> Result<()> {
        let path = self.entry_dir(logical_id).join("timestamp");
        fs::write(&path, Utc::now().timestamp().to_string()).map_err(|e| {
            ReslockError::Store(format!(
                "failed to update timestamp '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Read the advisory metadata of an entry, or `None` when not locked.
    pub fn read_entry(&self, logical_id: &str) -> Option<LockEntry> {
        let dir = self.entry_dir(logical_id);
        if !dir.exists() {
            return None;
        }
        let entry = LockEntry::read_from_dir(&dir);
        if let Some(recorded) = &entry.id
            && recorded != logical_id
        {
            eprintln!(
                "Warning: id inside lock entry ({}) does not match resource id {}",
                recorded, logical_id
            );
        }
        Some(entry)
    }

    /// Enumerate every catalog-declared resource with its locking status,
    /// then append entries found only on disk (locks whose resource is no
    /// longer declared, or range-pool members).
    pub fn list_all(&self, catalog: &Catalog) -> Result<Vec<LockStatus>> {
        let mut statuses = Vec::new();
        let mut seen = BTreeSet::new();

        for kind in catalog.kinds() {
            for name in catalog.names(&kind) {
                let logical_id = catalog::logical_id(&kind, &name);
                let entry = self.read_entry(&logical_id);
                seen.insert(logical_id.clone());
                statuses.push(LockStatus {
                    logical_id,
                    locked: entry.is_some(),
                    entry,
                });
            }
        }

        if self.root.exists() {
            let entries = fs::read_dir(&self.root).map_err(|e| {
                ReslockError::Store(format!(
                    "failed to read lock store root '{}': {}",
                    self.root.display(),
                    e
                ))
            })?;
            for dir_entry in entries {
                let dir_entry = dir_entry.map_err(|e| {
                    ReslockError::Store(format!("failed to read lock store entry: {}", e))
                })?;
                let path = dir_entry.path();
                if !path.is_dir() {
                    continue;
                }
                let entry = LockEntry::read_from_dir(&path);
                // Without a readable id we cannot attribute the entry
                let Some(id) = entry.id.clone() else { continue };
                if seen.contains(&id) {
                    continue;
                }
                statuses.push(LockStatus {
                    logical_id: id,
                    locked: true,
                    entry: Some(entry),
                });
            }
        }

        statuses.sort_by(|a, b| a.logical_id.cmp(&b.logical_id));
        Ok(statuses)
    }
}
