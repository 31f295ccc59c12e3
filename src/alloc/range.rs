//! Contiguous range acquisition over an ordered pool.

use super::log_wait_status;
use super::retry::RetryPolicy;
use crate::catalog::Catalog;
use crate::error::{ReslockError, Result};
use crate::store::LockStore;

/// Claim `n` consecutive members of `pool`, retrying per `policy`.
///
/// The pool order defines adjacency. Each sweep slides a window of size `n`
/// across the pool; a window is attempted only when an existence probe sees
/// all of its members free, and members are then acquired in pool order. A
/// member lost to a concurrent claimant rolls back everything acquired so
/// far and moves on to the next window, so a failed attempt never leaves a
/// partial claim behind.
pub fn claim_range(
    store: &LockStore,
    pool: &[String],
    n: usize,
    jobid: Option<&str>,
    policy: &RetryPolicy,
    catalog: &Catalog,
) -> Result<Vec<String>> {
    if n == 0 {
        return Err(ReslockError::UserError(
            "range size must be at least 1".to_string(),
        ));
    }
    if pool.len() < n {
        return Err(ReslockError::NoMatchingResource(format!(
            "pool of {} cannot satisfy a range of {}",
            pool.len(),
            n
        )));
    }

    let schedule = policy.start();
    loop {
        'windows: for window in pool.windows(n) {
            // Racy pre-filter; correctness rests on try_acquire below.
            if window.iter().any(|id| store.is_locked(id)) {
                continue;
            }

            let mut acquired: Vec<&String> = Vec::with_capacity(n);
            for logical_id in window {
                match store.try_acquire(logical_id, jobid) {
                    Ok(true) => acquired.push(logical_id),
                    Ok(false) => {
                        rollback(store, &acquired);
                        continue 'windows;
                    }
                    Err(e) => {
                        rollback(store, &acquired);
                        return Err(e);
                    }
                }
            }
            return Ok(window.to_vec());
        }

        if schedule.expired() {
            return Err(ReslockError::BusyTimeout(format!(
                "no free range of {} in pool of {}",
                n,
                pool.len()
            )));
        }
        log_wait_status(store, catalog, &format!("a range of {}", n));
        schedule.pause();
    }
}

fn rollback(store: &LockStore, acquired: &[&String]) {
    for logical_id in acquired {
        if let Err(e) = store.release(logical_id) {
            eprintln!("Warning: failed to roll back {}: {}", logical_id, e);
        }
    }
}
