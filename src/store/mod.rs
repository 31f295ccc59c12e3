//! Filesystem-backed lock store for reslock.
//!
//! This module implements the mutual-exclusion primitive shared by every
//! cooperating process: a root directory (usually on NFS) holding one
//! subdirectory per held lock, named by the hex SHA-256 of the logical
//! identifier.
//!
//! # Mutual exclusion
//!
//! Atomic `create_dir` is the whole protocol: it either succeeds (this
//! caller now owns the entry) or fails with `AlreadyExists` (someone else
//! does). Existence of the directory is the sole source of truth for "is
//! this resource claimed".
//!
//! # Metadata
//!
//! Each entry carries flat text files written best-effort after the
//! directory is created:
//! - `id`: the unhashed logical identifier (collision detection/debugging)
//! - `timestamp`: epoch seconds of the last heartbeat
//! - `jobid`: the holder's job identifier, when it has one
//!
//! Metadata is advisory. Staleness decisions and operator listings read it;
//! the mutual-exclusion decision never does, and a failed metadata write
//! does not revoke ownership.

mod metadata;
mod operations;


pub use metadata::LockEntry;
pub use operations::{LockStatus, LockStore};
