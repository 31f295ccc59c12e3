//! Randomized single-resource acquisition with stale-lock reclamation.

use super::log_wait_status;
use super::retry::RetryPolicy;
use crate::catalog::Catalog;
use crate::error::{ReslockError, Result};
use crate::events::{self, Event, EventAction};
use crate::store::LockStore;
use rand::seq::SliceRandom;
use std::time::Duration;

/// Claim exactly one of `candidates`, retrying per `policy` until the
/// deadline passes.
///
/// Candidates are shuffled on every sweep so that concurrent callers with
/// the same constraint set spread across the pool instead of piling onto
/// the first member. When a full sweep finds everything busy and a
/// `stale_timeout` is given, entries older than the timeout are reclaimed
/// (deleted) before the next sweep; reclamation never grants ownership
/// directly, the reclaimed slot is re-contested like any other.
pub fn claim_one(
    store: &LockStore,
    candidates: &[String],
    jobid: Option<&str>,
    stale_timeout: Option<Duration>,
    policy: &RetryPolicy,
    catalog: &Catalog,
) -> Result<String> {
    if candidates.is_empty() {
        return Err(ReslockError::NoMatchingResource(
            "no candidates to acquire".to_string(),
        ));
    }

    let schedule = policy.start();
    let mut shuffled: Vec<String> = candidates.to_vec();
    loop {
        shuffled.shuffle(&mut rand::thread_rng());
        for logical_id in &shuffled {
            if store.try_acquire(logical_id, jobid)? {
                return Ok(logical_id.clone());
            }
        }

        // Everything was busy. Sweep for abandoned entries before deciding
        // whether to give up or back off.
        if let Some(timeout) = stale_timeout {
            reclaim_stale(store, &shuffled, timeout)?;
            for logical_id in &shuffled {
                if store.try_acquire(logical_id, jobid)? {
                    return Ok(logical_id.clone());
                }
            }
        }

        if schedule.expired() {
            return Err(ReslockError::BusyTimeout(format!(
                "all candidates busy ({})",
                shuffled.join(", ")
            )));
        }
        log_wait_status(store, catalog, &format!("one of {}", shuffled.join(", ")));
        schedule.pause();
    }
}

/// Delete entries whose heartbeat timestamp is older than `timeout`.
///
/// Deletion and acquisition are strictly separate steps: an entry reclaimed
/// here is acquired, if at all, by a subsequent `try_acquire`, which any
/// other process may win first.
fn reclaim_stale(store: &LockStore, candidates: &[String], timeout: Duration) -> Result<()> {
    for logical_id in candidates {
        let Some(entry) = store.read_entry(logical_id) else {
            continue;
        };
        if !entry.is_stale(timeout.as_secs() as i64) {
            continue;
        }
        eprintln!(
            "Reclaiming stale lock on {} (age: {}, jobid: {})",
            logical_id,
            entry.age_string(),
            entry.jobid.as_deref().unwrap_or("none")
        );
        store.release(logical_id)?;
        let event = Event::new(EventAction::Reclaim, logical_id).with_details(serde_json::json!({
            "age": entry.age_string(),
            "jobid": entry.jobid,
        }));
        let _ = events::append_event(store, &event);
    }
    Ok(())
}
