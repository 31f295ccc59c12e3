//! The resource manager: the process-level front door to the lock store.
//!
//! A `ResourceManager` owns one `LockStore` handle, the site catalog, the
//! per-process registry of held locks, and the heartbeat thread that keeps
//! the timestamps of held entries fresh. Each cooperating process (and each
//! test that simulates one) constructs its own manager; nothing is global.
//!
//! Acquisition returns RAII handles. Dropping a handle, or the manager
//! itself, releases the underlying entries, so a panicking job cleans up
//! after itself. A process killed outright leaves its entries behind for
//! staleness reclamation by others.

mod handle;

#[cfg(test)]
mod tests;

pub use handle::{RangeAllocation, ResourceHandle};

use crate::alloc::{self, RetryPolicy};
use crate::catalog::{self, Catalog};
use crate::config::Settings;
use crate::error::{ReslockError, Result};
use crate::events::{self, Event, EventAction};
use crate::selector::{self, Constraints};
use crate::store::{LockStatus, LockStore};
use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// One record in the per-process held-lock registry.
#[derive(Debug, Clone)]
struct Held {
    /// Shared registrations have no store entry and no heartbeat.
    shared: bool,
}

/// State shared between the manager, its handles, and the heartbeat thread.
#[derive(Debug)]
pub(crate) struct ManagerInner {
    store: LockStore,
    catalog: Catalog,
    settings: Settings,
    jobid: Option<String>,
    held: Mutex<BTreeMap<String, Held>>,
    shutdown: Mutex<bool>,
    wake: Condvar,
}

impl ManagerInner {
    fn blocking_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.settings.retry_interval(),
            self.settings.acquire_deadline(),
        )
    }

    fn register(&self, logical_id: &str, shared: bool) {
        let mut held = self.held.lock().unwrap();
        held.insert(logical_id.to_string(), Held { shared });
    }

    /// Release one registered lock. Shared registrations are dropped from
    /// the registry without touching the store.
    pub(crate) fn release_one(&self, logical_id: &str) -> Result<()> {
        let shared = {
            let mut held = self.held.lock().unwrap();
            match held.remove(logical_id) {
                Some(h) => h.shared,
                None => return Ok(()),
            }
        };
        if shared {
            return Ok(());
        }
        self.store.release(logical_id)?;
        let event = Event::new(EventAction::Release, logical_id);
        let _ = events::append_event(&self.store, &event);
        Ok(())
    }

    fn record_acquire(&self, logical_id: &str) {
        self.register(logical_id, false);
        let mut event = Event::new(EventAction::Acquire, logical_id);
        if let Some(jobid) = &self.jobid {
            event = event.with_details(serde_json::json!({ "jobid": jobid }));
        }
        let _ = events::append_event(&self.store, &event);
    }
}

/// Per-process manager over the shared lock store.
#[derive(Debug)]
pub struct ResourceManager {
    inner: Arc<ManagerInner>,
    heartbeat: Option<JoinHandle<()>>,
}

impl ResourceManager {
    /// Create a manager from validated settings and a catalog. Spawns the
    /// heartbeat thread immediately; it idles until locks are held.
    pub fn new(settings: Settings, catalog: Catalog, jobid: Option<String>) -> Result<Self> {
        settings.validate()?;
        let inner = Arc::new(ManagerInner {
            store: LockStore::new(settings.lock_dir.clone()),
            catalog,
            settings,
            jobid,
            held: Mutex::new(BTreeMap::new()),
            shutdown: Mutex::new(false),
            wake: Condvar::new(),
        });
        let heartbeat = Some(spawn_heartbeat(Arc::clone(&inner)));
        Ok(Self { inner, heartbeat })
    }

    /// The underlying store handle.
    pub fn store(&self) -> &LockStore {
        &self.inner.store
    }

    /// The site catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Acquire any resource of `kind`, blocking up to the configured
    /// deadline.
    pub fn acquire(&self, kind: &str) -> Result<ResourceHandle> {
        self.acquire_with(kind, &Constraints::default())
    }

    /// Acquire a resource of `kind` matching `constraints`, blocking up to
    /// the configured deadline. Candidates are re-shuffled on every sweep
    /// and stale entries of the kind are reclaimed when everything is busy.
    pub fn acquire_with(&self, kind: &str, constraints: &Constraints) -> Result<ResourceHandle> {
        let candidates = self.candidate_ids(kind, constraints)?;
        let policy = self.inner.blocking_policy();
        self.claim(kind, &candidates, &policy)
    }

    /// Single non-blocking sweep over the matching candidates. Returns
    /// `Ok(None)` when everything is busy; an empty candidate set is still
    /// an error.
    pub fn try_acquire(
        &self,
        kind: &str,
        constraints: &Constraints,
    ) -> Result<Option<ResourceHandle>> {
        let candidates = self.candidate_ids(kind, constraints)?;
        match self.claim(kind, &candidates, &RetryPolicy::no_wait()) {
            Ok(handle) => Ok(Some(handle)),
            Err(ReslockError::BusyTimeout(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Acquire one specific resource by name, without waiting. A busy
    /// resource fails immediately; the caller asked for that one exactly,
    /// so retrying other candidates makes no sense.
    pub fn acquire_named(&self, kind: &str, name: &str) -> Result<ResourceHandle> {
        let logical_id = catalog::logical_id(kind, name);
        if !self
            .inner
            .store
            .try_acquire(&logical_id, self.inner.jobid.as_deref())?
        {
            return Err(ReslockError::BusyTimeout(format!(
                "{} is already locked",
                logical_id
            )));
        }
        self.inner.record_acquire(&logical_id);
        Ok(ResourceHandle::new(
            Arc::clone(&self.inner),
            logical_id,
            false,
        ))
    }

    /// Register a shared (read-side) use of a resource. No store entry is
    /// created and nothing blocks; the registration only keeps the handle
    /// accounting uniform for callers that mix exclusive and shared use.
    pub fn acquire_shared(&self, kind: &str, name: &str) -> ResourceHandle {
        let logical_id = catalog::logical_id(kind, name);
        self.inner.register(&logical_id, true);
        ResourceHandle::new(Arc::clone(&self.inner), logical_id, true)
    }

    /// Acquire `n` consecutive resources of `kind`, blocking up to the
    /// configured deadline.
    ///
    /// The pool comes from the kind's `RANGE` declaration when present,
    /// otherwise from the enumerated names in sorted order.
    pub fn acquire_range(&self, kind: &str, n: usize) -> Result<RangeAllocation> {
        self.acquire_range_with(kind, n, &Constraints::default())
    }

    /// Range acquisition with constraints applied to enumerated pools.
    /// `RANGE` pools carry no per-member attributes, so constraints other
    /// than the default are rejected for them.
    pub fn acquire_range_with(
        &self,
        kind: &str,
        n: usize,
        constraints: &Constraints,
    ) -> Result<RangeAllocation> {
        let pool = match self.inner.catalog.range_pool(kind)? {
            Some(names) => {
                if !constraints.is_default() {
                    return Err(ReslockError::UserError(format!(
                        "{} is a RANGE pool; constraints are not supported",
                        kind
                    )));
                }
                names
                    .iter()
                    .map(|name| catalog::logical_id(kind, name))
                    .collect::<Vec<_>>()
            }
            None => self.candidate_ids(kind, constraints)?,
        };

        let policy = self.inner.blocking_policy();
        let won = alloc::claim_range(
            &self.inner.store,
            &pool,
            n,
            self.inner.jobid.as_deref(),
            &policy,
            &self.inner.catalog,
        )?;

        let mut handles = Vec::with_capacity(won.len());
        for logical_id in won {
            self.inner.record_acquire(&logical_id);
            handles.push(ResourceHandle::new(
                Arc::clone(&self.inner),
                logical_id,
                false,
            ));
        }
        Ok(RangeAllocation::new(handles))
    }

    /// Locking status of the whole inventory plus any on-disk orphans.
    pub fn list_locks(&self) -> Result<Vec<LockStatus>> {
        self.inner.store.list_all(&self.inner.catalog)
    }

    /// Logical identifiers currently registered by this process, sorted.
    pub fn held_ids(&self) -> Vec<String> {
        self.inner.held.lock().unwrap().keys().cloned().collect()
    }

    /// Release everything this process holds. Individual failures are
    /// reported but do not stop the rest of the cleanup.
    pub fn release_all(&self) {
        for logical_id in self.held_ids() {
            if let Err(e) = self.inner.release_one(&logical_id) {
                eprintln!("Warning: failed to release {}: {}", logical_id, e);
            }
        }
    }

    fn candidate_ids(&self, kind: &str, constraints: &Constraints) -> Result<Vec<String>> {
        let names = selector::select_candidates(
            &self.inner.catalog,
            kind,
            constraints,
            &self.inner.settings.machines,
        )?;
        Ok(names
            .iter()
            .map(|name| catalog::logical_id(kind, name))
            .collect())
    }

    fn claim(&self, kind: &str, candidates: &[String], policy: &RetryPolicy) -> Result<ResourceHandle> {
        let logical_id = alloc::claim_one(
            &self.inner.store,
            candidates,
            self.inner.jobid.as_deref(),
            self.inner.settings.stale_timeout(kind),
            policy,
            &self.inner.catalog,
        )?;
        self.inner.record_acquire(&logical_id);
        Ok(ResourceHandle::new(
            Arc::clone(&self.inner),
            logical_id,
            false,
        ))
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        {
            let mut shutdown = self.inner.shutdown.lock().unwrap();
            *shutdown = true;
        }
        self.inner.wake.notify_all();
        if let Some(handle) = self.heartbeat.take() {
            let _ = handle.join();
        }
        self.release_all();
    }
}

/// Periodically rewrite the timestamps of held exclusive locks so other
/// processes never judge a live holder stale.
fn spawn_heartbeat(inner: Arc<ManagerInner>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let interval = inner.settings.heartbeat_interval();
        let mut shutdown = inner.shutdown.lock().unwrap();
        loop {
            let (guard, _) = inner.wake.wait_timeout(shutdown, interval).unwrap();
            shutdown = guard;
            if *shutdown {
                return;
            }
            let ids: Vec<String> = {
                let held = inner.held.lock().unwrap();
                held.iter()
                    .filter(|(_, h)| !h.shared)
                    .map(|(id, _)| id.clone())
                    .collect()
            };
            for logical_id in ids {
                if let Err(e) = inner.store.mark(&logical_id) {
                    eprintln!("Warning: heartbeat failed for {}: {}", logical_id, e);
                }
            }
        }
    })
}
