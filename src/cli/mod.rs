//! CLI argument parsing for reslock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reslock: cooperative locking and allocation of shared lab resources.
///
/// Every cooperating process points at the same site file and the same
/// (typically NFS-mounted) lock directory. The directory entries are the
/// locks; this tool inspects and repairs them.
#[derive(Parser, Debug)]
#[command(name = "reslock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the site YAML file (settings plus resource catalog).
    #[arg(long, global = true, default_value = "site.yaml")]
    pub config: PathBuf,

    /// Override the lock store directory from the site file.
    #[arg(long, global = true)]
    pub lock_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for reslock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every declared resource with its lock status.
    ///
    /// Shows holder metadata, lock age, and staleness, plus any on-disk
    /// entries whose resource is no longer declared.
    Locks,

    /// Force-delete a lock entry.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(ClearArgs),
}

/// Arguments for the `clear` command.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Logical identifier whose entry should be cleared
    /// (e.g. ISCSI_LUNS-fas270a).
    pub logical_id: String,

    /// Force clearing the entry (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
