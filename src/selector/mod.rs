//! Constraint-based candidate selection over the catalog.
//!
//! Given a kind section and a set of attribute constraints, produce the
//! names of every descriptor that satisfies all of them. Selection is a
//! pure function of the catalog; availability is the allocators' problem.
//!
//! An empty result is a hard `NoMatchingResource` failure: "nothing in the
//! inventory can ever satisfy this request" is deliberately distinct from
//! "a match exists but is busy right now".

use crate::catalog::Catalog;
use crate::error::{ReslockError, Result};

#[cfg(test)]
mod tests;

/// Attribute constraints for candidate selection.
///
/// `Default` means "anything non-reserved, without jumbo frames" — the
/// jumbo flag is an exact match in both directions, so a caller that does
/// not ask for jumbo-frame resources never receives one.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Minimum `SIZE` (GB), inclusive.
    pub min_size: Option<u64>,

    /// Maximum `SIZE` (GB), inclusive.
    pub max_size: Option<u64>,

    /// Exact `TYPE` match (e.g. "hardware", "software"). Types suffixed
    /// `-reserved` are only ever selected through this field.
    pub resource_type: Option<String>,

    /// Exact `HWTYPE` match.
    pub hardware_type: Option<String>,

    /// Jumbo-frame requirement, matched exactly against the descriptor's
    /// `JUMBO` flag (default false).
    pub jumbo: bool,

    /// Required network. Satisfied by the descriptor's primary `NETWORK`
    /// (default "NPRI") or any key of its `ALTERNATE_ADDRESSES` mapping.
    pub network: Option<String>,

    /// Minimum `INITIATOR_COUNT` capacity (default capacity 1).
    pub min_initiators: Option<u64>,
}

impl Constraints {
    /// Constrain the minimum size.
    pub fn min_size(mut self, gb: u64) -> Self {
        self.min_size = Some(gb);
        self
    }

    /// Constrain the maximum size.
    pub fn max_size(mut self, gb: u64) -> Self {
        self.max_size = Some(gb);
        self
    }

    /// Require an exact resource type.
    pub fn resource_type(mut self, t: impl Into<String>) -> Self {
        self.resource_type = Some(t.into());
        self
    }

    /// Require an exact hardware type.
    pub fn hardware_type(mut self, t: impl Into<String>) -> Self {
        self.hardware_type = Some(t.into());
        self
    }

    /// Require (or forbid) jumbo frames.
    pub fn jumbo(mut self, jumbo: bool) -> Self {
        self.jumbo = jumbo;
        self
    }

    /// Require reachability on a network.
    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Require a minimum initiator capacity.
    pub fn min_initiators(mut self, count: u64) -> Self {
        self.min_initiators = Some(count);
        self
    }

    /// Whether no constraint has been set.
    pub fn is_default(&self) -> bool {
        self.min_size.is_none()
            && self.max_size.is_none()
            && self.resource_type.is_none()
            && self.hardware_type.is_none()
            && !self.jumbo
            && self.network.is_none()
            && self.min_initiators.is_none()
    }

    fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(v) = self.min_size {
            parts.push(format!("size>={}G", v));
        }
        if let Some(v) = self.max_size {
            parts.push(format!("size<={}G", v));
        }
        if let Some(v) = &self.resource_type {
            parts.push(format!("type={}", v));
        }
        if let Some(v) = &self.hardware_type {
            parts.push(format!("hwtype={}", v));
        }
        if self.jumbo {
            parts.push("jumbo".to_string());
        }
        if let Some(v) = &self.network {
            parts.push(format!("network={}", v));
        }
        if let Some(v) = self.min_initiators {
            parts.push(format!("initiators>={}", v));
        }
        if parts.is_empty() {
            "any".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Select every resource name in `kind` satisfying the constraints, given
/// the caller's machine identities for reservation allow-list checks.
///
/// Returns names in sorted catalog order; randomization for contention
/// spreading happens in the allocator. An undeclared kind or an empty
/// result is `NoMatchingResource`.
pub fn select_candidates(
    catalog: &Catalog,
    kind: &str,
    constraints: &Constraints,
    machines: &[String],
) -> Result<Vec<String>> {
    if !catalog.has_kind(kind) {
        return Err(ReslockError::NoMatchingResource(format!(
            "no {} defined",
            kind
        )));
    }

    let names: Vec<String> = catalog
        .names(kind)
        .into_iter()
        .filter(|name| matches(catalog, kind, name, constraints, machines))
        .collect();

    if names.is_empty() {
        return Err(ReslockError::NoMatchingResource(format!(
            "no suitable {} defined ({})",
            kind,
            constraints.summary()
        )));
    }
    Ok(names)
}

fn matches(
    catalog: &Catalog,
    kind: &str,
    name: &str,
    c: &Constraints,
    machines: &[String],
) -> bool {
    let jumbo = catalog.get_bool(&[kind, name, "JUMBO"]).unwrap_or(false);
    if jumbo != c.jumbo {
        return false;
    }

    let size = catalog.get_u64(&[kind, name, "SIZE"]).unwrap_or(0);
    if let Some(min) = c.min_size
        && size < min
    {
        return false;
    }
    if let Some(max) = c.max_size
        && size > max
    {
        return false;
    }

    let rtype = catalog
        .get_str(&[kind, name, "TYPE"])
        .unwrap_or_else(|| "unknown".to_string());
    match &c.resource_type {
        Some(want) => {
            if *want != rtype {
                return false;
            }
        }
        // Quarantined/flash-reserved resources only on explicit request
        None => {
            if rtype.ends_with("-reserved") {
                return false;
            }
        }
    }

    if let Some(want) = &c.hardware_type {
        let hwtype = catalog
            .get_str(&[kind, name, "HWTYPE"])
            .unwrap_or_else(|| "unknown".to_string());
        if *want != hwtype {
            return false;
        }
    }

    if let Some(want) = c.min_initiators {
        let have = catalog
            .get_u64(&[kind, name, "INITIATOR_COUNT"])
            .unwrap_or(1);
        if want > have {
            return false;
        }
    }

    if let Some(want) = &c.network {
        let primary = catalog
            .get_str(&[kind, name, "NETWORK"])
            .unwrap_or_else(|| "NPRI".to_string());
        let on_alternate = matches!(
            catalog.get(&[kind, name, "ALTERNATE_ADDRESSES", want]),
            Some(_)
        );
        if *want != primary && !on_alternate {
            return false;
        }
    }

    // A RESERVED allow-list restricts the resource to jobs running on the
    // listed machines
    if let Some(reserved) = catalog.get_str(&[kind, name, "RESERVED"]) {
        let allowed = reserved
            .split(',')
            .map(str::trim)
            .any(|m| machines.iter().any(|mine| mine == m));
        if !allowed {
            return false;
        }
    }

    true
}
