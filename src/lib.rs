//! Reslock: cooperative locking and allocation of shared lab resources.
//!
//! A fleet of test jobs on different controllers shares expensive physical
//! assets (iSCSI LUNs, VLAN ranges, routed subnets, licenses) with nothing
//! in common but an NFS directory. Reslock coordinates them through that
//! directory alone: an atomic `mkdir` is the lock, the directory's
//! existence is the single source of truth, and everything else
//! (timestamps, job ids, the audit log) is advisory metadata around it.
//!
//! The entry point is [`manager::ResourceManager`]: one per process, it
//! selects candidates from the site catalog, claims them with randomized
//! retry, heartbeats whatever it holds, and releases everything on drop.

pub mod alloc;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod manager;
pub mod selector;
pub mod store;

pub use error::{ReslockError, Result};
pub use manager::{RangeAllocation, ResourceHandle, ResourceManager};
pub use selector::Constraints;
