//! RAII handles for acquired resources.

use super::ManagerInner;
use crate::error::Result;
use std::sync::Arc;

/// Ownership of one acquired resource.
///
/// Dropping the handle releases the lock entry. Explicit `release` is
/// preferred on happy paths because it surfaces store failures; the drop
/// path can only warn.
#[derive(Debug)]
pub struct ResourceHandle {
    inner: Arc<ManagerInner>,
    logical_id: String,
    shared: bool,
    released: bool,
}

impl ResourceHandle {
    pub(crate) fn new(inner: Arc<ManagerInner>, logical_id: String, shared: bool) -> Self {
        Self {
            inner,
            logical_id,
            shared,
            released: false,
        }
    }

    /// The logical identifier this handle owns (e.g. `ISCSI_LUNS-fas270a`).
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The resource name without its kind prefix, when the identifier has
    /// the usual `KIND-name` shape.
    pub fn name(&self) -> &str {
        match self.logical_id.split_once('-') {
            Some((_, name)) => name,
            None => &self.logical_id,
        }
    }

    /// Whether this is a shared (registry-only) registration.
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Release the lock entry now.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.inner.release_one(&self.logical_id)
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.inner.release_one(&self.logical_id) {
            eprintln!("Warning: failed to release {}: {}", self.logical_id, e);
        }
    }
}

/// Ownership of a contiguous run of resources, released as a unit.
#[derive(Debug)]
pub struct RangeAllocation {
    handles: Vec<ResourceHandle>,
}

impl RangeAllocation {
    pub(crate) fn new(handles: Vec<ResourceHandle>) -> Self {
        Self { handles }
    }

    /// The logical identifiers of the run, in pool order.
    pub fn ids(&self) -> Vec<String> {
        self.handles
            .iter()
            .map(|h| h.logical_id().to_string())
            .collect()
    }

    /// Number of members in the run.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the run is empty. Never true for an allocation returned by
    /// the manager, which rejects zero-sized requests.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The member handles, in pool order.
    pub fn handles(&self) -> &[ResourceHandle] {
        &self.handles
    }

    /// Release every member. The first store failure is returned after all
    /// members have been attempted.
    pub fn release(self) -> Result<()> {
        let mut first_err = None;
        for handle in self.handles {
            if let Err(e) = handle.release()
                && first_err.is_none()
            {
                first_err = Some(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
