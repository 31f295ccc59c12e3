//! Exit code constants for the reslock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state)
//! - 2: No matching resource definition in the catalog
//! - 3: Timed out waiting for a busy resource
//! - 4: Lock store filesystem failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid state.
pub const USER_ERROR: i32 = 1;

/// No catalog descriptor matched the requested kind/constraints.
pub const NO_MATCHING_RESOURCE: i32 = 2;

/// Matching resources exist but none became free before the deadline.
pub const BUSY_TIMEOUT: i32 = 3;

/// The shared lock-store filesystem is unavailable or failed.
pub const STORE_FAILURE: i32 = 4;
