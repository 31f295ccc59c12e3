//! Tests for constraint-based candidate selection.

use super::*;
use crate::error::{ReslockError, Result};

const SAMPLE: &str = r#"
ISCSI_LUNS:
  a:
    SIZE: 50
    TYPE: hardware
  b:
    SIZE: 200
    TYPE: software
  c:
    SIZE: 500
    TYPE: hardware
    HWTYPE: netapp
    JUMBO: yes
  d:
    SIZE: 100
    TYPE: flash-reserved
  e:
    SIZE: 100
    TYPE: hardware
    RESERVED: "m5, m6"
  f:
    SIZE: 100
    TYPE: hardware
    NETWORK: NSEC
    INITIATOR_COUNT: 4
  g:
    SIZE: 100
    TYPE: hardware
    ALTERNATE_ADDRESSES:
      NSEC: 10.0.1.9
"#;

fn catalog() -> crate::catalog::Catalog {
    crate::catalog::Catalog::from_yaml(SAMPLE).unwrap()
}

fn select(c: &Constraints) -> Result<Vec<String>> {
    select_candidates(&catalog(), "ISCSI_LUNS", c, &[])
}

#[test]
fn min_size_filters_small_resources() {
    // {a: size=50,type=hw}, {b: size=200,type=sw}, min_size=100 excludes a
    let names = select(&Constraints::default().min_size(100)).unwrap();
    assert!(!names.contains(&"a".to_string()));
    assert!(names.contains(&"b".to_string()));
}

#[test]
fn max_size_filters_large_resources() {
    let names = select(&Constraints::default().max_size(60)).unwrap();
    assert_eq!(names, vec!["a"]);
}

#[test]
fn type_is_exact_match() {
    let names = select(&Constraints::default().resource_type("software")).unwrap();
    assert_eq!(names, vec!["b"]);
}

#[test]
fn reserved_type_suffix_needs_explicit_request() {
    // Not requested: excluded
    let names = select(&Constraints::default()).unwrap();
    assert!(!names.contains(&"d".to_string()));

    // Explicitly requested: selected
    let names = select(&Constraints::default().resource_type("flash-reserved")).unwrap();
    assert_eq!(names, vec!["d"]);
}

#[test]
fn hardware_type_is_exact_match() {
    let names = select(&Constraints::default().hardware_type("netapp").jumbo(true)).unwrap();
    assert_eq!(names, vec!["c"]);

    let result = select(&Constraints::default().hardware_type("equallogic"));
    assert!(result.is_err());
}

#[test]
fn jumbo_matches_both_directions() {
    // Default (no jumbo) excludes the jumbo resource
    let names = select(&Constraints::default()).unwrap();
    assert!(!names.contains(&"c".to_string()));

    // Asking for jumbo excludes everything else
    let names = select(&Constraints::default().jumbo(true)).unwrap();
    assert_eq!(names, vec!["c"]);
}

#[test]
fn network_accepts_primary_or_alternate() {
    let names = select(&Constraints::default().network("NSEC")).unwrap();
    // f's primary network is NSEC; g reaches NSEC via an alternate address
    assert_eq!(names, vec!["f", "g"]);

    // Everything defaults to NPRI except f
    let names = select(&Constraints::default().network("NPRI")).unwrap();
    assert!(!names.contains(&"f".to_string()));
    assert!(names.contains(&"a".to_string()));
}

#[test]
fn initiator_capacity_is_a_floor() {
    let names = select(&Constraints::default().min_initiators(2)).unwrap();
    assert_eq!(names, vec!["f"]);

    // Capacity defaults to 1
    let names = select(&Constraints::default().min_initiators(1)).unwrap();
    assert!(names.contains(&"a".to_string()));
}

#[test]
fn reservation_allow_list_is_keyed_by_machine() {
    // No machines: reserved resource excluded
    let names = select(&Constraints::default()).unwrap();
    assert!(!names.contains(&"e".to_string()));

    // A listed machine unlocks it
    let names = select_candidates(
        &catalog(),
        "ISCSI_LUNS",
        &Constraints::default(),
        &["m6".to_string()],
    )
    .unwrap();
    assert!(names.contains(&"e".to_string()));

    // An unlisted machine does not
    let names = select_candidates(
        &catalog(),
        "ISCSI_LUNS",
        &Constraints::default(),
        &["m9".to_string()],
    )
    .unwrap();
    assert!(!names.contains(&"e".to_string()));
}

#[test]
fn all_constraints_must_hold() {
    let names = select(
        &Constraints::default()
            .min_size(100)
            .max_size(300)
            .resource_type("hardware"),
    )
    .unwrap();
    // b is software, d needs an explicit type, e is machine-reserved
    assert_eq!(names, vec!["f", "g"]);
}

#[test]
fn undeclared_kind_is_no_matching_resource() {
    let result = select_candidates(&catalog(), "NETAPP_FILERS", &Constraints::default(), &[]);
    assert!(matches!(
        result,
        Err(ReslockError::NoMatchingResource(_))
    ));
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("no NETAPP_FILERS defined")
    );
}

#[test]
fn impossible_constraints_are_no_matching_resource() {
    let result = select(&Constraints::default().min_size(10_000));
    assert!(matches!(
        result,
        Err(ReslockError::NoMatchingResource(_))
    ));
}
