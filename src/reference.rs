//! Reference resolution.
//!
//! The [`ReferenceMap`] maps literal values (OCIDs, availability domain
//! names, namespaces) to the HCL expressions that produce them. Rendering
//! replaces every literal found in the map with its expression.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Variables synthesized during an export: name → literal default.
pub type Variables = BTreeMap<String, String>;

/// Name of the variable holding the exported compartment's OCID.
pub const COMPARTMENT_VARIABLE: &str = "compartment_ocid";

/// `<class>.<name>.<attribute>`
#[must_use]
pub fn resource_expression(terraform_reference: &str, attribute: &str) -> String {
    format!("{terraform_reference}.{attribute}")
}

/// `data.<class>.<name>.<attribute>`
#[must_use]
pub fn data_source_expression(terraform_reference: &str, attribute: &str) -> String {
    format!("data.{terraform_reference}.{attribute}")
}

/// `var.<name>`
#[must_use]
pub fn variable_expression(name: &str) -> String {
    format!("var.{name}")
}

/// A registration rejected because the key already had another expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceConflict {
    pub key: String,
    pub kept: String,
    pub rejected: String,
}

/// Literal → expression map. The first registration of a key wins.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    entries: BTreeMap<String, String>,
    conflicts: Vec<ReferenceConflict>,
}

impl ReferenceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` → `expression`.
    ///
    /// Returns true when the entry was added. Re-registering the same
    /// expression is a no-op; a different expression is recorded as a
    /// conflict and the existing entry is kept. Empty keys are ignored.
    pub fn register(&mut self, key: &str, expression: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        match self.entries.get(key) {
            None => {
                debug!(key, expression, "Registered reference");
                self.entries.insert(key.to_string(), expression.to_string());
                true
            }
            Some(existing) if existing == expression => false,
            Some(existing) => {
                warn!(key, kept = %existing, rejected = expression, "Conflicting reference registration");
                self.conflicts.push(ReferenceConflict {
                    key: key.to_string(),
                    kept: existing.clone(),
                    rejected: expression.to_string(),
                });
                false
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn conflicts(&self) -> &[ReferenceConflict] {
        &self.conflicts
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_writer_wins() {
        let mut refs = ReferenceMap::new();
        assert!(refs.register("ocid1.vcn.oc1..a", "oci_core_vcn.vcn1.id"));
        assert!(!refs.register("ocid1.vcn.oc1..a", "oci_core_vcn.vcn1.id"));
        assert!(refs.conflicts().is_empty());

        assert!(!refs.register("ocid1.vcn.oc1..a", "oci_core_vcn.other.id"));
        assert_eq!(refs.get("ocid1.vcn.oc1..a"), Some("oci_core_vcn.vcn1.id"));
        assert_eq!(
            refs.conflicts(),
            &[ReferenceConflict {
                key: "ocid1.vcn.oc1..a".to_string(),
                kept: "oci_core_vcn.vcn1.id".to_string(),
                rejected: "oci_core_vcn.other.id".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_key_ignored() {
        let mut refs = ReferenceMap::new();
        assert!(!refs.register("", "x"));
        assert!(refs.is_empty());
    }

    #[test]
    fn test_expressions() {
        assert_eq!(resource_expression("oci_core_instance.web", "boot_volume_id"), "oci_core_instance.web.boot_volume_id");
        assert_eq!(
            data_source_expression("oci_identity_availability_domain.AD-3", "name"),
            "data.oci_identity_availability_domain.AD-3.name"
        );
        assert_eq!(variable_expression(COMPARTMENT_VARIABLE), "var.compartment_ocid");
    }
}
