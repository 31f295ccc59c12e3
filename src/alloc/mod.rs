//! Resource allocators built on the lock store.
//!
//! Two claiming strategies share one backoff/deadline utility:
//! - [`claim_one`]: claim any single member of a candidate set, in
//!   randomized order so concurrent callers spread across the pool instead
//!   of racing for the same "first" candidate.
//! - [`claim_range`]: claim a contiguous window of N members from an
//!   ordered pool, rolling back partial claims (the store only offers
//!   per-item atomicity, so multi-item claims are claim-or-unwind).
//!
//! Both sleep a coarse backoff interval between sweeps and give up at a
//! global deadline. While waiting they dump the current inventory lock
//! status to stderr so an operator can see what is contended.

mod range;
mod retry;
mod single;


pub use range::claim_range;
pub use retry::{RetryPolicy, RetrySchedule};
pub use single::claim_one;

use crate::catalog::Catalog;
use crate::store::LockStore;

/// Log the full inventory lock status to stderr during a contended wait.
fn log_wait_status(store: &LockStore, catalog: &Catalog, waiting_for: &str) {
    eprintln!("Waiting for {}; current lock status:", waiting_for);
    match store.list_all(catalog) {
        Ok(statuses) => {
            for status in statuses {
                eprintln!("  {}", status);
            }
        }
        Err(e) => eprintln!("  (could not list lock status: {})", e),
    }
}
