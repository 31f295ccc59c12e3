use super::ResourceManager;
use crate::catalog::Catalog;
use crate::config::Settings;
use crate::error::ReslockError;
use crate::selector::Constraints;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const LUN_CATALOG: &str = r#"
ISCSI_LUNS:
  fas270a:
    SIZE: 50
    TYPE: hardware
  fas270b:
    SIZE: 200
    TYPE: hardware
"#;

const VLAN_CATALOG: &str = r#"
PRIVATE_VLANS:
  RANGE: "300-305"
"#;

fn settings(root: &Path) -> Settings {
    Settings {
        lock_dir: root.join("locks"),
        retry_interval_secs: 1,
        acquire_deadline_secs: 1,
        heartbeat_interval_secs: 60,
        stale_timeout_secs: BTreeMap::new(),
        machines: Vec::new(),
    }
}

fn manager(root: &Path, yaml: &str, jobid: &str) -> ResourceManager {
    ResourceManager::new(
        settings(root),
        Catalog::from_yaml(yaml).unwrap(),
        Some(jobid.to_string()),
    )
    .unwrap()
}

fn backdate(mgr: &ResourceManager, logical_id: &str, age_secs: i64) {
    let path = mgr.store().entry_dir(logical_id).join("timestamp");
    fs::write(path, (Utc::now().timestamp() - age_secs).to_string()).unwrap();
}

#[test]
fn two_processes_contend_for_a_sole_resource() {
    let dir = tempdir().unwrap();
    let sole = r#"
ISCSI_LUNS:
  fas270a:
    SIZE: 50
"#;
    let first = manager(dir.path(), sole, "job-1");
    let second = manager(dir.path(), sole, "job-2");

    let held = first.acquire("ISCSI_LUNS").unwrap();
    assert_eq!(held.logical_id(), "ISCSI_LUNS-fas270a");

    // The loser blocks for the full deadline, then fails cleanly.
    let started = Instant::now();
    let err = second.acquire("ISCSI_LUNS").unwrap_err();
    assert!(matches!(err, ReslockError::BusyTimeout(_)));
    assert!(started.elapsed() >= Duration::from_secs(1));

    held.release().unwrap();
    let rewon = second.acquire("ISCSI_LUNS").unwrap();
    assert_eq!(rewon.logical_id(), "ISCSI_LUNS-fas270a");
}

#[test]
fn acquire_records_jobid_metadata() {
    let dir = tempdir().unwrap();
    let mgr = manager(dir.path(), LUN_CATALOG, "job-42");

    let held = mgr.acquire("ISCSI_LUNS").unwrap();
    let entry = mgr.store().read_entry(held.logical_id()).unwrap();
    assert_eq!(entry.jobid.as_deref(), Some("job-42"));
}

#[test]
fn constraints_narrow_the_candidates() {
    let dir = tempdir().unwrap();
    let mgr = manager(dir.path(), LUN_CATALOG, "job-1");

    let held = mgr
        .acquire_with("ISCSI_LUNS", &Constraints::default().min_size(100))
        .unwrap();
    assert_eq!(held.logical_id(), "ISCSI_LUNS-fas270b");
}

#[test]
fn unsatisfiable_constraints_fail_without_waiting() {
    let dir = tempdir().unwrap();
    let mgr = manager(dir.path(), LUN_CATALOG, "job-1");

    let started = Instant::now();
    let err = mgr
        .acquire_with("ISCSI_LUNS", &Constraints::default().min_size(1000))
        .unwrap_err();
    assert!(matches!(err, ReslockError::NoMatchingResource(_)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn try_acquire_reports_busy_as_none() {
    let dir = tempdir().unwrap();
    let sole = r#"
ISCSI_LUNS:
  fas270a:
    SIZE: 50
"#;
    let first = manager(dir.path(), sole, "job-1");
    let second = manager(dir.path(), sole, "job-2");

    let held = first
        .try_acquire("ISCSI_LUNS", &Constraints::default())
        .unwrap();
    assert!(held.is_some());
    let blocked = second
        .try_acquire("ISCSI_LUNS", &Constraints::default())
        .unwrap();
    assert!(blocked.is_none());
}

#[test]
fn acquire_named_fails_fast_when_busy() {
    let dir = tempdir().unwrap();
    let first = manager(dir.path(), LUN_CATALOG, "job-1");
    let second = manager(dir.path(), LUN_CATALOG, "job-2");

    let held = first.acquire_named("ISCSI_LUNS", "fas270a").unwrap();
    assert_eq!(held.logical_id(), "ISCSI_LUNS-fas270a");

    let started = Instant::now();
    let err = second.acquire_named("ISCSI_LUNS", "fas270a").unwrap_err();
    assert!(matches!(err, ReslockError::BusyTimeout(_)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn shared_registration_creates_no_store_entry() {
    let dir = tempdir().unwrap();
    let mgr = manager(dir.path(), LUN_CATALOG, "job-1");

    let handle = mgr.acquire_shared("ISCSI_LUNS", "fas270a");
    assert!(handle.is_shared());
    assert!(!mgr.store().is_locked("ISCSI_LUNS-fas270a"));
    assert_eq!(mgr.held_ids(), vec!["ISCSI_LUNS-fas270a".to_string()]);

    handle.release().unwrap();
    assert!(mgr.held_ids().is_empty());
}

#[test]
fn dropping_a_handle_releases_the_entry() {
    let dir = tempdir().unwrap();
    let mgr = manager(dir.path(), LUN_CATALOG, "job-1");

    {
        let _held = mgr.acquire_named("ISCSI_LUNS", "fas270a").unwrap();
        assert!(mgr.store().is_locked("ISCSI_LUNS-fas270a"));
    }
    assert!(!mgr.store().is_locked("ISCSI_LUNS-fas270a"));
    assert!(mgr.held_ids().is_empty());
}

#[test]
fn dropping_the_manager_releases_everything() {
    let dir = tempdir().unwrap();
    let observer = manager(dir.path(), LUN_CATALOG, "observer");

    {
        let mgr = manager(dir.path(), LUN_CATALOG, "job-1");
        let held_a = mgr.acquire_named("ISCSI_LUNS", "fas270a").unwrap();
        let held_b = mgr.acquire_named("ISCSI_LUNS", "fas270b").unwrap();
        assert!(observer.store().is_locked("ISCSI_LUNS-fas270a"));
        std::mem::forget(held_a);
        std::mem::forget(held_b);
        drop(mgr);
    }

    assert!(!observer.store().is_locked("ISCSI_LUNS-fas270a"));
    assert!(!observer.store().is_locked("ISCSI_LUNS-fas270b"));
}

#[test]
fn stale_entries_are_reclaimed_during_acquisition() {
    let dir = tempdir().unwrap();
    let sole = r#"
ISCSI_LUNS:
  fas270a:
    SIZE: 50
"#;
    // A holder killed outright leaves its entry behind with an old timestamp.
    let store = crate::store::LockStore::new(dir.path().join("locks"));
    assert!(store.try_acquire("ISCSI_LUNS-fas270a", Some("dead-job")).unwrap());
    let path = store.entry_dir("ISCSI_LUNS-fas270a").join("timestamp");
    fs::write(path, (Utc::now().timestamp() - 7200).to_string()).unwrap();

    let mut second_settings = settings(dir.path());
    second_settings
        .stale_timeout_secs
        .insert("ISCSI_LUNS".to_string(), 3600);
    let second = ResourceManager::new(
        second_settings,
        Catalog::from_yaml(sole).unwrap(),
        Some("job-2".to_string()),
    )
    .unwrap();

    let rewon = second
        .try_acquire("ISCSI_LUNS", &Constraints::default())
        .unwrap()
        .expect("stale entry should have been reclaimed");
    assert_eq!(rewon.logical_id(), "ISCSI_LUNS-fas270a");
    let entry = second.store().read_entry("ISCSI_LUNS-fas270a").unwrap();
    assert_eq!(entry.jobid.as_deref(), Some("job-2"));
}

#[test]
fn heartbeat_refreshes_held_timestamps() {
    let dir = tempdir().unwrap();
    let mut beat_settings = settings(dir.path());
    beat_settings.heartbeat_interval_secs = 1;
    let mgr = ResourceManager::new(
        beat_settings,
        Catalog::from_yaml(LUN_CATALOG).unwrap(),
        None,
    )
    .unwrap();

    let held = mgr.acquire_named("ISCSI_LUNS", "fas270a").unwrap();
    backdate(&mgr, held.logical_id(), 5000);
    std::thread::sleep(Duration::from_millis(2500));

    let entry = mgr.store().read_entry(held.logical_id()).unwrap();
    assert!(entry.age_secs().unwrap() < 60);
}

#[test]
fn range_pool_yields_contiguous_members() {
    let dir = tempdir().unwrap();
    let mgr = manager(dir.path(), VLAN_CATALOG, "job-1");

    let run = mgr.acquire_range("PRIVATE_VLANS", 3).unwrap();
    assert_eq!(
        run.ids(),
        vec![
            "PRIVATE_VLANS-300".to_string(),
            "PRIVATE_VLANS-301".to_string(),
            "PRIVATE_VLANS-302".to_string(),
        ]
    );

    run.release().unwrap();
    assert!(!mgr.store().is_locked("PRIVATE_VLANS-300"));
}

#[test]
fn range_allocation_slides_past_held_members() {
    let dir = tempdir().unwrap();
    let first = manager(dir.path(), VLAN_CATALOG, "job-1");
    let second = manager(dir.path(), VLAN_CATALOG, "job-2");

    let _held = first.acquire_named("PRIVATE_VLANS", "301").unwrap();
    let run = second.acquire_range("PRIVATE_VLANS", 3).unwrap();
    assert_eq!(
        run.ids(),
        vec![
            "PRIVATE_VLANS-302".to_string(),
            "PRIVATE_VLANS-303".to_string(),
            "PRIVATE_VLANS-304".to_string(),
        ]
    );
}

#[test]
fn range_pools_reject_constraints() {
    let dir = tempdir().unwrap();
    let mgr = manager(dir.path(), VLAN_CATALOG, "job-1");

    let err = mgr
        .acquire_range_with("PRIVATE_VLANS", 2, &Constraints::default().min_size(10))
        .unwrap_err();
    assert!(matches!(err, ReslockError::UserError(_)));
}

#[test]
fn enumerated_kinds_form_range_pools_in_sorted_order() {
    let dir = tempdir().unwrap();
    let yaml = r#"
ROUTES:
  r1: {}
  r2: {}
  r3: {}
"#;
    let mgr = manager(dir.path(), yaml, "job-1");

    let run = mgr.acquire_range("ROUTES", 2).unwrap();
    assert_eq!(
        run.ids(),
        vec!["ROUTES-r1".to_string(), "ROUTES-r2".to_string()]
    );
}

#[test]
fn release_all_clears_the_registry() {
    let dir = tempdir().unwrap();
    let mgr = manager(dir.path(), LUN_CATALOG, "job-1");

    let held_a = mgr.acquire_named("ISCSI_LUNS", "fas270a").unwrap();
    let held_b = mgr.acquire_shared("ISCSI_LUNS", "fas270b");
    assert_eq!(mgr.held_ids().len(), 2);

    mgr.release_all();
    assert!(mgr.held_ids().is_empty());
    assert!(!mgr.store().is_locked("ISCSI_LUNS-fas270a"));
    // The handles are now inert; dropping them releases nothing twice.
    drop(held_a);
    drop(held_b);
}
