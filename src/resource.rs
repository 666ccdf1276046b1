//! Discovered resources and the arena holding them.

use crate::render::{GenericRenderer, Renderer};
use crate::value::{AttrMap, AttrValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Index of a resource in the export arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub usize);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a resource is in the export pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ExportState {
    #[default]
    Discovered,
    PostProcessed,
    ReferenceRegistered,
    Rendered,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovered => write!(f, "discovered"),
            Self::PostProcessed => write!(f, "post-processed"),
            Self::ReferenceRegistered => write!(f, "reference-registered"),
            Self::Rendered => write!(f, "rendered"),
        }
    }
}

/// A resource found in the tenancy.
#[derive(Debug, Clone)]
pub struct DiscoveredResource {
    /// Cloud id, or a composite id for resources without one
    pub id: String,
    pub compartment_id: String,
    /// Terraform resource class (e.g. `oci_core_vcn`)
    pub terraform_class: String,
    /// Terraform name, unique per class within the export
    pub terraform_name: String,
    /// Id used by `terraform import` when it differs from `id`
    pub import_id: Option<String>,
    pub attributes: AttrMap,
    /// Parent in the discovery tree; `None` for the export root
    pub parent: Option<ResourceId>,
    /// The list/read response the resource was built from
    pub raw: serde_json::Value,
    /// Discovered (children hang off it) but not rendered
    pub omitted: bool,
    pub renderer: Arc<dyn Renderer>,
    /// Expression other resources use instead of `<class>.<name>.id`
    pub reference_override: Option<String>,
    pub state: ExportState,
}

impl DiscoveredResource {
    /// New resource with the generic renderer and no parent.
    #[must_use]
    pub fn new(id: impl Into<String>, terraform_class: impl Into<String>, attributes: AttrMap) -> Self {
        Self {
            id: id.into(),
            compartment_id: String::new(),
            terraform_class: terraform_class.into(),
            terraform_name: String::new(),
            import_id: None,
            attributes,
            parent: None,
            raw: serde_json::Value::Null,
            omitted: false,
            renderer: Arc::new(GenericRenderer),
            reference_override: None,
            state: ExportState::Discovered,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ResourceId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_compartment(mut self, compartment_id: impl Into<String>) -> Self {
        self.compartment_id = compartment_id.into();
        self
    }

    /// `<class>.<name>`
    #[must_use]
    pub fn terraform_reference(&self) -> String {
        format!("{}.{}", self.terraform_class, self.terraform_name)
    }

    /// Expression that resolves to this resource's id.
    #[must_use]
    pub fn id_reference(&self) -> String {
        self.reference_override
            .clone()
            .unwrap_or_else(|| format!("{}.id", self.terraform_reference()))
    }

    /// Id written to import blocks.
    #[must_use]
    pub fn import_id(&self) -> &str {
        self.import_id.as_deref().unwrap_or(&self.id)
    }

    /// Lifecycle state reported by the service, when present.
    #[must_use]
    pub fn lifecycle_state(&self) -> Option<&str> {
        self.attributes.get("state").and_then(AttrValue::as_str)
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attributes.insert(key.to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references() {
        let mut resource = DiscoveredResource::new("ocid1.vcn.oc1..a", "oci_core_vcn", AttrMap::new());
        resource.terraform_name = "vcn1".to_string();
        assert_eq!(resource.terraform_reference(), "oci_core_vcn.vcn1");
        assert_eq!(resource.id_reference(), "oci_core_vcn.vcn1.id");

        resource.reference_override = Some("oci_core_vcn.parent.default_route_table_id".to_string());
        assert_eq!(resource.id_reference(), "oci_core_vcn.parent.default_route_table_id");
    }

    #[test]
    fn test_import_id_falls_back_to_id() {
        let mut resource = DiscoveredResource::new("a", "oci_identity_tag", AttrMap::new());
        assert_eq!(resource.import_id(), "a");
        resource.import_id = Some("tagNamespaces/ns/tags/env".to_string());
        assert_eq!(resource.import_id(), "tagNamespaces/ns/tags/env");
    }

    #[test]
    fn test_state_order() {
        assert!(ExportState::Discovered < ExportState::PostProcessed);
        assert!(ExportState::ReferenceRegistered < ExportState::Rendered);
    }
}
