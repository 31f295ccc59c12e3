//! Command implementations for reslock.
//!
//! The dispatcher routes CLI commands to their implementations. Commands
//! are stateless: each one loads the site file, builds a store handle, and
//! operates directly on it. No heartbeat thread runs here; holding locks is
//! the library's job, the CLI only inspects and repairs.

use crate::cli::{ClearArgs, Cli, Command};
use crate::config::SiteConfig;
use crate::error::{ReslockError, Result};
use crate::events::{append_event, Event, EventAction};
use crate::store::LockStore;
use serde_json::json;
use std::path::PathBuf;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let site = SiteConfig::load(&cli.config)?;
    let lock_dir: PathBuf = cli
        .lock_dir
        .unwrap_or_else(|| site.settings.lock_dir.clone());
    let store = LockStore::new(lock_dir);

    match cli.command {
        Command::Locks => cmd_locks(&store, &site),
        Command::Clear(args) => cmd_clear(&store, &site, args),
    }
}

fn cmd_locks(store: &LockStore, site: &SiteConfig) -> Result<()> {
    let statuses = store.list_all(&site.catalog)?;

    if statuses.is_empty() {
        println!("No resources declared and no lock entries found.");
        return Ok(());
    }

    let mut stale_count = 0;
    for status in &statuses {
        if !status.locked {
            println!("{}: free", status.logical_id);
            continue;
        }
        let Some(entry) = &status.entry else {
            println!("{}: locked", status.logical_id);
            continue;
        };

        let stale = stale_timeout_for(site, &status.logical_id)
            .map(|t| entry.is_stale(t.as_secs() as i64))
            .unwrap_or(false);
        if stale {
            stale_count += 1;
        }

        println!(
            "{}: locked (jobid: {}, age: {}){}",
            status.logical_id,
            entry.jobid.as_deref().unwrap_or("none"),
            entry.age_string(),
            if stale { " STALE" } else { "" }
        );
    }

    if stale_count > 0 {
        println!();
        println!(
            "Note: {} lock(s) are stale. Use `reslock clear <logical-id> --force` to clear.",
            stale_count
        );
    }

    Ok(())
}

fn cmd_clear(store: &LockStore, site: &SiteConfig, args: ClearArgs) -> Result<()> {
    // Require --force flag
    if !args.force {
        return Err(ReslockError::UserError(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock that a live job still holds hands its resource to\n\
             another job and corrupts whatever is on it.\n\n\
             To clear the lock, run:\n  reslock clear {} --force"
                .replace("{}", &args.logical_id),
        ));
    }

    let Some(entry) = store.read_entry(&args.logical_id) else {
        return Err(ReslockError::UserError(format!(
            "no lock entry for {}",
            args.logical_id
        )));
    };

    store.release(&args.logical_id)?;

    let was_stale = stale_timeout_for(site, &args.logical_id)
        .map(|t| entry.is_stale(t.as_secs() as i64))
        .unwrap_or(false);
    let event = Event::new(EventAction::Clear, &args.logical_id).with_details(json!({
        "age": entry.age_string(),
        "jobid": entry.jobid,
        "was_stale": was_stale,
        "force": args.force,
    }));
    // Best-effort logging: if it fails, print a warning but don't fail the command
    if let Err(e) = append_event(store, &event) {
        eprintln!("Warning: failed to log clear event: {}", e);
    }

    println!("Cleared lock: {}", args.logical_id);
    println!("  Jobid:  {}", entry.jobid.as_deref().unwrap_or("none"));
    println!("  Age:    {}", entry.age_string());
    if was_stale {
        println!("  Status: was STALE");
    }

    Ok(())
}

/// The staleness window for a logical identifier, keyed by its kind prefix.
fn stale_timeout_for(site: &SiteConfig, logical_id: &str) -> Option<std::time::Duration> {
    let (kind, _) = logical_id.split_once('-')?;
    site.settings.stale_timeout(kind)
}
