//! Load balancer hooks.
//!
//! Backend sets, backends, certificates, hostnames, path route sets and rule
//! sets have no OCID of their own. They are addressed by a composite id
//! built from the load balancer id and their name, and carry the parent's
//! `load_balancer_id` so the generated configuration can reference it.
//!
//! Listeners have no data source at all: they are read from the parent load
//! balancer's `listeners` map and attached to the backend set they route to
//! by default.

use super::{composite_id, PostProcessor, ProcessContext};
use crate::client::{GetLoadBalancerRequest, ReadRequest};
use crate::discovery::{resource_from_item, sanitize_name, Discoverer, DiscoveryContext};
use crate::error::{OciDiscoveryError, Result};
use crate::reference::resource_expression;
use crate::registry::{RegistryBuilder, ResourceAssociation};
use crate::resource::DiscoveredResource;
use crate::value::{AttrMap, AttrValue, Attributes};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder.patch("oci_load_balancer_backend_set", |hint| {
        hint.post_processor = Some(Arc::new(ChildProcessor::BACKEND_SET));
    })?;
    builder.patch("oci_load_balancer_backend", |hint| {
        hint.post_processor = Some(Arc::new(BackendProcessor));
    })?;
    builder.patch("oci_load_balancer_certificate", |hint| {
        hint.post_processor = Some(Arc::new(ChildProcessor::CERTIFICATE));
    })?;
    builder.patch("oci_load_balancer_hostname", |hint| {
        hint.post_processor = Some(Arc::new(ChildProcessor::HOSTNAME));
    })?;
    builder.patch("oci_load_balancer_path_route_set", |hint| {
        hint.post_processor = Some(Arc::new(ChildProcessor::PATH_ROUTE_SET));
    })?;
    builder.patch("oci_load_balancer_rule_set", |hint| {
        hint.post_processor = Some(Arc::new(ChildProcessor::RULE_SET));
    })?;
    builder.patch("oci_load_balancer_listener", |hint| {
        hint.discoverer = Some(Arc::new(ListenerFinder));
        hint.post_processor = Some(Arc::new(ListenerProcessor));
    })?;
    Ok(())
}

/// `<parent>.name` when the backend set is rendered, the literal otherwise.
fn backend_set_name(backend_set: &DiscoveredResource, name: &str) -> AttrValue {
    if backend_set.omitted {
        AttrValue::from(name)
    } else {
        AttrValue::Interpolation(resource_expression(&backend_set.terraform_reference(), "name"))
    }
}

/// Direct child of a load balancer, identified by name.
#[derive(Debug, Clone, Copy)]
pub struct ChildProcessor {
    /// Path segment of the composite id (e.g. `backendSets`)
    pub collection: &'static str,
    /// Attribute holding the child's name
    pub name_attribute: &'static str,
}

impl ChildProcessor {
    pub const BACKEND_SET: Self = Self {
        collection: "backendSets",
        name_attribute: "name",
    };
    pub const CERTIFICATE: Self = Self {
        collection: "certificates",
        name_attribute: "certificate_name",
    };
    pub const HOSTNAME: Self = Self {
        collection: "hostnames",
        name_attribute: "name",
    };
    pub const PATH_ROUTE_SET: Self = Self {
        collection: "pathRouteSets",
        name_attribute: "name",
    };
    pub const RULE_SET: Self = Self {
        collection: "ruleSets",
        name_attribute: "name",
    };
}

#[async_trait]
impl PostProcessor for ChildProcessor {
    fn name(&self) -> &'static str {
        "load_balancer_child"
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        let load_balancer = ctx.parent()?;
        for resource in &mut resources {
            let name = resource
                .attributes
                .require_str(&resource.terraform_reference(), self.name_attribute)?
                .to_string();
            resource.id = composite_id(&["loadBalancers", &load_balancer.id, self.collection, &name]);
            resource.set("load_balancer_id", load_balancer.id.as_str());
            trace!(id = %resource.id, "Synthesized load balancer child id");
        }
        Ok(resources)
    }
}

/// Backends live under a backend set, two levels below the load balancer.
#[derive(Debug, Clone, Copy)]
pub struct BackendProcessor;

#[async_trait]
impl PostProcessor for BackendProcessor {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        let backend_set = ctx.parent()?;
        let parent_reference = backend_set.terraform_reference();
        let load_balancer_id = backend_set
            .attributes
            .require_str(&parent_reference, "load_balancer_id")?;
        let set_name = backend_set.attributes.require_str(&parent_reference, "name")?;

        for resource in &mut resources {
            let name = resource
                .attributes
                .require_str(&resource.terraform_reference(), "name")?
                .to_string();
            resource.id = composite_id(&[
                "loadBalancers",
                load_balancer_id,
                "backendSets",
                set_name,
                "backends",
                &name,
            ]);
            resource.set("load_balancer_id", load_balancer_id);
            resource.set("backendset_name", backend_set_name(backend_set, set_name));
        }
        Ok(resources)
    }
}

/// Reads listeners out of the parent load balancer.
#[derive(Debug, Clone, Copy)]
pub struct ListenerFinder;

#[async_trait]
impl Discoverer for ListenerFinder {
    fn name(&self) -> &'static str {
        "listener_finder"
    }

    async fn discover(
        &self,
        ctx: &DiscoveryContext<'_>,
        association: &ResourceAssociation,
    ) -> Result<Vec<DiscoveredResource>> {
        let hint = association.hint.as_ref();
        let backend_set = ctx.parent()?;
        let parent_reference = backend_set.terraform_reference();
        let load_balancer_id = backend_set
            .attributes
            .require_str(&parent_reference, "load_balancer_id")?;
        let set_name = backend_set.attributes.require_str(&parent_reference, "name")?;
        let failure = |e| OciDiscoveryError::discovery(&hint.resource_class, e, file!(), line!());

        let load_balancer = ctx
            .client
            .get_load_balancer(&GetLoadBalancerRequest {
                load_balancer_id: load_balancer_id.to_string(),
                metadata: ctx.metadata(false, &hint.service),
            })
            .await
            .map_err(failure)?;

        let listeners: BTreeMap<&String, &serde_json::Value> = load_balancer
            .get("listeners")
            .and_then(serde_json::Value::as_object)
            .map(|map| map.iter().collect())
            .unwrap_or_default();

        let prefix = match backend_set.parent {
            Some(id) => ctx.resource(id)?.terraform_name.clone(),
            None => String::new(),
        };

        let mut resources = Vec::new();
        for (name, listener) in listeners {
            let routes_here = listener
                .get("default_backend_set_name")
                .and_then(serde_json::Value::as_str)
                == Some(set_name);
            if !routes_here {
                continue;
            }

            let id = composite_id(&["loadBalancers", load_balancer_id, "listeners", name]);
            let attributes = ctx
                .client
                .read_resource(&ReadRequest {
                    resource_class: hint.resource_class.clone(),
                    id: Some(id.clone()),
                    params: AttrMap::new(),
                    metadata: ctx.metadata(false, &hint.service),
                })
                .await
                .map_err(failure)?;

            let mut resource = resource_from_item(hint, backend_set, ctx.parent, attributes)?;
            resource.id = id;
            let base = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}_{name}")
            };
            resource.terraform_name = sanitize_name(&base, &hint.abbreviation);
            resources.push(resource);
        }

        debug!(load_balancer = load_balancer_id, backend_set = set_name, count = resources.len(), "Discovered listeners");
        Ok(resources)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListenerProcessor;

#[async_trait]
impl PostProcessor for ListenerProcessor {
    fn name(&self) -> &'static str {
        "listener"
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        let backend_set = ctx.parent()?;
        let parent_reference = backend_set.terraform_reference();
        let load_balancer_id = backend_set
            .attributes
            .require_str(&parent_reference, "load_balancer_id")?;
        let set_name = backend_set.attributes.require_str(&parent_reference, "name")?;

        for resource in &mut resources {
            resource.set("load_balancer_id", load_balancer_id);
            resource.set("default_backend_set_name", backend_set_name(backend_set, set_name));
        }
        Ok(resources)
    }
}
