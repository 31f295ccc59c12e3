//! Resource descriptor catalog for reslock.
//!
//! The catalog is the static, read-only inventory of declared lab resources:
//! a nested key/value tree loaded once at process start and looked up by
//! path-like keys (e.g. `["ISCSI_LUNS", "fas270a", "SIZE"]`).
//!
//! Top-level keys are resource *kinds* (`ISCSI_LUNS`, `TTCP_PEERS`,
//! `IPRANGES`, ...). Within a kind, mapping-valued keys are resource names
//! and their attribute mappings; the scalar `RANGE` key declares an ordered
//! numeric pool (VLAN IDs, address offsets) for range allocation instead of
//! enumerated members.
//!
//! Accessors are typed and return explicit `Option`s: a missing key is
//! `None`, never a sentinel default.

use crate::error::{ReslockError, Result};
use serde_yaml::Value;
use std::path::Path;


/// Build the logical identifier for one resource instance within its kind.
///
/// This is the stable string key the lock store hashes, e.g.
/// `ISCSI_LUNS-fas270a`.
pub fn logical_id(kind: &str, name: &str) -> String {
    format!("{}-{}", kind, name)
}

/// The static resource inventory.
///
/// Immutable after load; never mutated by this subsystem.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    root: Value,
}

impl Catalog {
    /// An empty catalog (no kinds declared).
    pub fn empty() -> Self {
        Self { root: Value::Null }
    }

    /// Build a catalog from an already-parsed YAML value.
    ///
    /// The value must be a mapping (or null, for an empty inventory).
    pub fn from_value(root: Value) -> Result<Self> {
        match root {
            Value::Null => Ok(Self { root: Value::Null }),
            Value::Mapping(_) => Ok(Self { root }),
            other => Err(ReslockError::UserError(format!(
                "resource catalog must be a mapping, found {}",
                value_kind(&other)
            ))),
        }
    }

    /// Parse a catalog from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let root: Value = serde_yaml::from_str(yaml)
            .map_err(|e| ReslockError::UserError(format!("failed to parse catalog YAML: {}", e)))?;
        Self::from_value(root)
    }

    /// Load a catalog from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReslockError::UserError(format!(
                "failed to read catalog file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Look up a raw value by path.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let mut current = &self.root;
        for key in path {
            current = current.get(key)?;
        }
        Some(current)
    }

    /// Look up a string attribute. Scalar numbers and booleans are rendered
    /// to their string form; mappings and sequences are `None`.
    pub fn get_str(&self, path: &[&str]) -> Option<String> {
        match self.get(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Look up an unsigned integer attribute. Accepts YAML numbers and
    /// numeric strings.
    pub fn get_u64(&self, path: &[&str]) -> Option<u64> {
        match self.get(path)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Look up a boolean attribute. Accepts YAML booleans and the common
    /// string spellings (`yes`/`no`, `true`/`false`, `1`/`0`).
    pub fn get_bool(&self, path: &[&str]) -> Option<bool> {
        match self.get(path)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "true" | "1" => Some(true),
                "no" | "false" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => match n.as_u64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether the given kind section exists.
    pub fn has_kind(&self, kind: &str) -> bool {
        self.get(&[kind]).is_some()
    }

    /// All declared resource kinds, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = match &self.root {
            Value::Mapping(m) => m
                .iter()
                .filter_map(|(k, _)| k.as_str().map(|s| s.to_string()))
                .collect(),
            _ => Vec::new(),
        };
        kinds.sort();
        kinds
    }

    /// The resource names declared in a kind section, sorted.
    ///
    /// Only mapping-valued entries count as resources; scalar keys such as
    /// `RANGE` are section-level attributes.
    pub fn names(&self, kind: &str) -> Vec<String> {
        let mut names: Vec<String> = match self.get(&[kind]) {
            Some(Value::Mapping(m)) => m
                .iter()
                .filter(|(_, v)| v.is_mapping())
                .filter_map(|(k, _)| k.as_str().map(|s| s.to_string()))
                .collect(),
            _ => Vec::new(),
        };
        names.sort();
        names
    }

    /// The ordered member pool for a kind declared via `RANGE: "<start>-<end>"`.
    ///
    /// Returns the inclusive numeric sequence rendered as strings, or `None`
    /// when the kind has no `RANGE` key. A malformed range is an error so the
    /// misconfiguration surfaces instead of silently yielding nothing.
    pub fn range_pool(&self, kind: &str) -> Result<Option<Vec<String>>> {
        let Some(spec) = self.get_str(&[kind, "RANGE"]) else {
            return Ok(None);
        };
        let parts: Vec<&str> = spec.split('-').collect();
        let parsed: Option<(u64, u64)> = match parts.as_slice() {
            [start, end] => match (start.trim().parse(), end.trim().parse()) {
                (Ok(s), Ok(e)) if s <= e => Some((s, e)),
                _ => None,
            },
            _ => None,
        };
        let (start, end) = parsed.ok_or_else(|| {
            ReslockError::UserError(format!(
                "invalid RANGE '{}' for {} (expected \"<start>-<end>\")",
                spec, kind
            ))
        })?;
        Ok(Some((start..=end).map(|n| n.to_string()).collect()))
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
