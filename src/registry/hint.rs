//! Resource hints and associations.

use crate::discovery::{Discoverer, IdGenerator};
use crate::render::Renderer;
use crate::services::PostProcessor;
use crate::value::AttrValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Static discovery metadata for one resource class.
#[derive(Debug, Clone)]
pub struct ResourceHint {
    /// Terraform resource class (e.g. `oci_core_vcn`)
    pub resource_class: String,
    /// Short prefix for generated names (e.g. `vcn`)
    pub abbreviation: String,
    /// Owning service, used for retry policies
    pub service: String,
    /// Data source listing the class (e.g. `oci_core_vcns`)
    pub datasource_class: String,
    /// Attribute of the data source holding the results (e.g. `virtual_networks`)
    pub items_attr: String,
    /// Read every listed item to fill in fields the list call omits
    pub require_resource_refresh: bool,
    /// Lifecycle states worth exporting; empty means all
    pub discoverable_lifecycle_states: Vec<String>,
    pub discoverer: Option<Arc<dyn Discoverer>>,
    pub post_processor: Option<Arc<dyn PostProcessor>>,
    pub id_generator: Option<Arc<dyn IdGenerator>>,
    pub renderer: Option<Arc<dyn Renderer>>,
    /// Exported even when resource type filters exclude it
    pub always_exportable: bool,
    /// Attributes reported by the service that configuration cannot set
    pub computed_attributes: Vec<String>,
}

impl ResourceHint {
    /// Hint listing `<class>s` through the data source of the same stem.
    #[must_use]
    pub fn new(resource_class: &str, abbreviation: &str, service: &str) -> Self {
        Self {
            resource_class: resource_class.to_string(),
            abbreviation: abbreviation.to_string(),
            service: service.to_string(),
            datasource_class: format!("{resource_class}s"),
            items_attr: String::new(),
            require_resource_refresh: false,
            discoverable_lifecycle_states: Vec::new(),
            discoverer: None,
            post_processor: None,
            id_generator: None,
            renderer: None,
            always_exportable: false,
            computed_attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn datasource(mut self, datasource_class: &str, items_attr: &str) -> Self {
        self.datasource_class = datasource_class.to_string();
        self.items_attr = items_attr.to_string();
        self
    }

    #[must_use]
    pub fn lifecycle_states(mut self, states: &[&str]) -> Self {
        self.discoverable_lifecycle_states = states.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn refresh(mut self) -> Self {
        self.require_resource_refresh = true;
        self
    }

    #[must_use]
    pub fn computed(mut self, attributes: &[&str]) -> Self {
        self.computed_attributes = attributes.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Whether a resource in `state` should be kept.
    #[must_use]
    pub fn is_discoverable(&self, state: Option<&str>) -> bool {
        if self.discoverable_lifecycle_states.is_empty() {
            return true;
        }
        state.is_some_and(|s| {
            self.discoverable_lifecycle_states
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(s))
        })
    }
}

/// Where a child data source query parameter comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryParam {
    /// Attribute of the parent resource (`id` is the parent's id)
    FromParent(String),
    /// Fixed value
    Fixed(AttrValue),
}

impl QueryParam {
    #[must_use]
    pub fn parent(attribute: &str) -> Self {
        Self::FromParent(attribute.to_string())
    }

    #[must_use]
    pub fn fixed(value: impl Into<AttrValue>) -> Self {
        Self::Fixed(value.into())
    }
}

/// A child class reachable from a parent, with its query mapping.
#[derive(Debug, Clone)]
pub struct ResourceAssociation {
    pub hint: Arc<ResourceHint>,
    /// Child query parameter → source
    pub query_params: BTreeMap<String, QueryParam>,
}

impl ResourceAssociation {
    #[must_use]
    pub fn resource_class(&self) -> &str {
        &self.hint.resource_class
    }
}

/// Parent class → ordered child associations.
pub type ResourceGraph = BTreeMap<String, Vec<ResourceAssociation>>;
