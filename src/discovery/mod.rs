//! Discovery engine.
//!
//! Given a parent resource and an association, a [`Discoverer`] produces the
//! child resources. The default [`DataSourceDiscoverer`] lists the child's
//! data source with a query built from the association, follows page tokens
//! until the last page, assigns ids and optionally reads every item back to
//! fill in fields the list call leaves out. Hints override it for resources
//! that have no usable data source.

mod naming;

pub use naming::{base_name, sanitize_name, NameAllocator};

use crate::client::{retry_policy, DataSourceRequest, OciClient, ReadRequest, RequestMetadata};
use crate::config::RetryOptions;
use crate::err;
use crate::error::{OciDiscoveryError, Result};
use crate::registry::{QueryParam, ResourceAssociation, ResourceHint};
use crate::render::GenericRenderer;
use crate::resource::{DiscoveredResource, ResourceId};
use crate::value::{AttrMap, AttrValue, Attributes};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// What a discoverer sees while it runs.
pub struct DiscoveryContext<'a> {
    pub client: &'a dyn OciClient,
    pub retry: &'a RetryOptions,
    /// Every resource discovered so far
    pub resources: &'a [DiscoveredResource],
    /// Resource the children are discovered under
    pub parent: ResourceId,
}

impl<'a> DiscoveryContext<'a> {
    /// The parent resource.
    pub fn parent(&self) -> Result<&'a DiscoveredResource> {
        self.resource(self.parent)
    }

    /// Any resource of the arena.
    pub fn resource(&self, id: ResourceId) -> Result<&'a DiscoveredResource> {
        self.resources.get(id.0).ok_or_else(|| {
            err!(Internal {
                message: format!("resource {id} is not in the arena"),
            })
        })
    }

    /// Request metadata for a call to `service`.
    #[must_use]
    pub fn metadata(&self, is_datasource_read: bool, service: &str) -> RequestMetadata {
        RequestMetadata {
            retry_policy: retry_policy(is_datasource_read, service, self.retry),
        }
    }
}

/// Produces the children of a parent for one association.
#[async_trait]
pub trait Discoverer: fmt::Debug + Send + Sync {
    /// Name shown in logs and graph exports.
    fn name(&self) -> &'static str;

    async fn discover(
        &self,
        ctx: &DiscoveryContext<'_>,
        association: &ResourceAssociation,
    ) -> Result<Vec<DiscoveredResource>>;
}

/// Computes the id of a resource the service gives no usable id.
pub trait IdGenerator: fmt::Debug + Send + Sync {
    fn generate(&self, resource: &DiscoveredResource) -> Result<String>;
}

/// Id taken verbatim from one attribute.
#[derive(Debug, Clone)]
pub struct AttributeIdGenerator {
    attribute: String,
}

impl AttributeIdGenerator {
    #[must_use]
    pub fn new(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
        }
    }
}

impl IdGenerator for AttributeIdGenerator {
    fn generate(&self, resource: &DiscoveredResource) -> Result<String> {
        resource
            .attributes
            .require_str(&resource.terraform_class, &self.attribute)
            .map(str::to_string)
    }
}

/// Query parameters for a child data source.
///
/// Fixed values first, then parent attributes (`id` is the parent's id).
/// `compartment_id` comes from the parent's compartment unless mapped.
pub fn build_query(parent: &DiscoveredResource, association: &ResourceAssociation) -> Result<AttrMap> {
    let mut params = AttrMap::new();
    for (key, source) in &association.query_params {
        if let QueryParam::Fixed(value) = source {
            params.insert(key.clone(), value.clone());
        }
    }
    for (key, source) in &association.query_params {
        if let QueryParam::FromParent(attribute) = source {
            let value = if attribute == "id" {
                AttrValue::from(parent.id.as_str())
            } else {
                match parent.attributes.get(attribute) {
                    Some(value) if !value.is_null() => value.clone(),
                    _ => {
                        return Err(err!(MissingRequiredAttribute {
                            resource: parent.terraform_reference(),
                            attribute: attribute.clone(),
                        }))
                    }
                }
            };
            params.insert(key.clone(), value);
        }
    }
    params
        .entry("compartment_id".to_string())
        .or_insert_with(|| AttrValue::from(parent.compartment_id.as_str()));
    Ok(params)
}

/// Build a discovered resource from a list or read result.
pub fn resource_from_item(
    hint: &ResourceHint,
    parent: &DiscoveredResource,
    parent_id: ResourceId,
    item: AttrMap,
) -> Result<DiscoveredResource> {
    let compartment_id = item
        .get_str("compartment_id")
        .unwrap_or(&parent.compartment_id)
        .to_string();
    let raw = serde_json::to_value(&item).unwrap_or(serde_json::Value::Null);

    let mut resource = DiscoveredResource::new(String::new(), hint.resource_class.clone(), item)
        .with_parent(parent_id)
        .with_compartment(compartment_id);
    resource.raw = raw;
    resource.renderer = hint
        .renderer
        .clone()
        .unwrap_or_else(|| Arc::new(GenericRenderer));

    resource.id = match &hint.id_generator {
        Some(generator) => generator.generate(&resource)?,
        None => resource.attributes.get_str("id").unwrap_or_default().to_string(),
    };
    Ok(resource)
}

/// Default strategy: list the hint's data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSourceDiscoverer;

impl DataSourceDiscoverer {
    async fn list_all(
        &self,
        ctx: &DiscoveryContext<'_>,
        hint: &ResourceHint,
        params: AttrMap,
    ) -> Result<Vec<AttrMap>> {
        let mut request = DataSourceRequest {
            datasource_class: hint.datasource_class.clone(),
            items_attr: hint.items_attr.clone(),
            params,
            page: None,
            metadata: ctx.metadata(true, &hint.service),
        };

        let mut items = Vec::new();
        loop {
            let page = ctx
                .client
                .list_data_source(&request)
                .await
                .map_err(|e| OciDiscoveryError::discovery(&hint.resource_class, e, file!(), line!()))?;
            trace!(class = %hint.resource_class, items = page.items.len(), "Received page");
            items.extend(page.items);
            match page.next_page {
                Some(token) => request.page = Some(token),
                None => break,
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl Discoverer for DataSourceDiscoverer {
    fn name(&self) -> &'static str {
        "data_source"
    }

    async fn discover(
        &self,
        ctx: &DiscoveryContext<'_>,
        association: &ResourceAssociation,
    ) -> Result<Vec<DiscoveredResource>> {
        let hint = association.hint.as_ref();
        let parent = ctx.parent()?;
        let params = build_query(parent, association)?;

        debug!(
            class = %hint.resource_class,
            datasource = %hint.datasource_class,
            parent = %parent.id,
            "Listing data source"
        );
        let items = self.list_all(ctx, hint, params).await?;

        let mut resources = Vec::with_capacity(items.len());
        for item in items {
            let mut resource = resource_from_item(hint, parent, ctx.parent, item)?;

            if hint.require_resource_refresh && !resource.id.is_empty() {
                let request = ReadRequest {
                    resource_class: hint.resource_class.clone(),
                    id: Some(resource.id.clone()),
                    params: AttrMap::new(),
                    metadata: ctx.metadata(false, &hint.service),
                };
                let refreshed = ctx
                    .client
                    .read_resource(&request)
                    .await
                    .map_err(|e| OciDiscoveryError::discovery(&hint.resource_class, e, file!(), line!()))?;
                resource.attributes = refreshed;
            }

            resources.push(resource);
        }

        debug!(class = %hint.resource_class, count = resources.len(), "Discovered resources");
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, ListPage, MockOciClient};
    use crate::registry::ResourceHint;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn root() -> DiscoveredResource {
        DiscoveredResource::new("ocid1.compartment.oc1..root", "oci_identity_compartment", AttrMap::new())
            .with_compartment("ocid1.compartment.oc1..root")
    }

    fn association(hint: ResourceHint, params: &[(&str, QueryParam)]) -> ResourceAssociation {
        ResourceAssociation {
            hint: Arc::new(hint),
            query_params: params
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn item(id: &str) -> AttrMap {
        let mut attrs = AttrMap::new();
        attrs.insert("id".to_string(), id.into());
        attrs.insert("display_name".to_string(), format!("name-{id}").into());
        attrs
    }

    #[test]
    fn test_build_query() {
        let mut parent = root();
        parent.attributes.insert("name".to_string(), "bs1".into());
        parent.attributes.insert("load_balancer_id".to_string(), "lb1".into());

        let assoc = association(
            ResourceHint::new("oci_load_balancer_backend", "backend", "load_balancer"),
            &[
                ("backendset_name", QueryParam::parent("name")),
                ("load_balancer_id", QueryParam::parent("load_balancer_id")),
                ("include_subcompartments", QueryParam::fixed(false)),
            ],
        );
        let params = build_query(&parent, &assoc).unwrap();
        assert_eq!(params["backendset_name"], AttrValue::from("bs1"));
        assert_eq!(params["load_balancer_id"], AttrValue::from("lb1"));
        assert_eq!(params["include_subcompartments"], AttrValue::Bool(false));
        assert_eq!(params["compartment_id"], AttrValue::from("ocid1.compartment.oc1..root"));
    }

    #[test]
    fn test_build_query_missing_parent_attribute() {
        let assoc = association(
            ResourceHint::new("oci_objectstorage_bucket", "bucket", "object_storage"),
            &[("namespace", QueryParam::parent("namespace"))],
        );
        assert!(matches!(
            build_query(&root(), &assoc),
            Err(OciDiscoveryError::MissingRequiredAttribute { .. })
        ));
    }

    #[tokio::test]
    async fn test_paginates_then_refreshes() {
        let mut mock = MockOciClient::new();
        mock.expect_list_data_source().times(2).returning(|request| {
            if request.page.is_none() {
                Ok(ListPage {
                    items: vec![item("a"), item("b")],
                    next_page: Some("2".to_string()),
                })
            } else {
                Ok(ListPage {
                    items: vec![item("c")],
                    next_page: None,
                })
            }
        });
        mock.expect_read_resource().times(3).returning(|request| {
            let mut attrs = item(request.id.as_deref().unwrap_or_default());
            attrs.insert("refreshed".to_string(), true.into());
            Ok(attrs)
        });

        let resources = vec![root()];
        let retry = RetryOptions::default();
        let ctx = DiscoveryContext {
            client: &mock,
            retry: &retry,
            resources: &resources,
            parent: ResourceId(0),
        };
        let assoc = association(
            ResourceHint::new("oci_core_instance", "instance", "core")
                .datasource("oci_core_instances", "instances")
                .refresh(),
            &[],
        );

        let found = DataSourceDiscoverer.discover(&ctx, &assoc).await.unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(found.iter().all(|r| r.attributes["refreshed"] == AttrValue::Bool(true)));
        assert!(found.iter().all(|r| r.parent == Some(ResourceId(0))));
        assert_eq!(found[0].compartment_id, "ocid1.compartment.oc1..root");
    }

    #[tokio::test]
    async fn test_list_error_is_discovery_failure() {
        let mut mock = MockOciClient::new();
        mock.expect_list_data_source().returning(|_| {
            Err(ClientError::Service {
                service: "core".to_string(),
                status: 401,
                code: "NotAuthenticated".to_string(),
                message: "denied".to_string(),
            })
        });

        let resources = vec![root()];
        let retry = RetryOptions::default();
        let ctx = DiscoveryContext {
            client: &mock,
            retry: &retry,
            resources: &resources,
            parent: ResourceId(0),
        };
        let assoc = association(ResourceHint::new("oci_core_vcn", "vcn", "core"), &[]);

        match DataSourceDiscoverer.discover(&ctx, &assoc).await {
            Err(OciDiscoveryError::DiscoveryFailure { resource_class, .. }) => {
                assert_eq!(resource_class, "oci_core_vcn");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_attribute_id_generator() {
        let mut attrs = AttrMap::new();
        attrs.insert("namespace".to_string(), "ns1".into());
        let resource = DiscoveredResource::new("", "oci_objectstorage_namespace", attrs);
        assert_eq!(AttributeIdGenerator::new("namespace").generate(&resource).unwrap(), "ns1");
        assert!(AttributeIdGenerator::new("id").generate(&resource).is_err());
    }
}
