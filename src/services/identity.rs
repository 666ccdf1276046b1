//! Identity hooks: availability domains, authentication policy and tags.

use super::{composite_id, PostProcessor, ProcessContext};
use crate::client::{ListTagsRequest, ReadRequest};
use crate::discovery::{resource_from_item, sanitize_name, Discoverer, DiscoveryContext};
use crate::err;
use crate::error::{OciDiscoveryError, Result};
use crate::reference::data_source_expression;
use crate::registry::{RegistryBuilder, ResourceAssociation};
use crate::render::{compartment_value, quote, HclWriter, RenderContext, RenderedBlock, Renderer};
use crate::resource::DiscoveredResource;
use crate::value::{AttrMap, AttrValue, Attributes};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder.patch("oci_identity_availability_domain", |hint| {
        hint.abbreviation = "ad".to_string();
        hint.always_exportable = true;
        hint.post_processor = Some(Arc::new(AvailabilityDomainProcessor));
        hint.renderer = Some(Arc::new(AvailabilityDomainRenderer));
    })?;
    builder.patch("oci_identity_authentication_policy", |hint| {
        hint.post_processor = Some(Arc::new(AuthenticationPolicyProcessor));
    })?;
    builder.patch("oci_identity_tag", |hint| {
        hint.discoverer = Some(Arc::new(TagFinder));
        hint.post_processor = Some(Arc::new(TagProcessor));
    })?;
    Ok(())
}

/// Numbers availability domains and makes their names resolvable.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityDomainProcessor;

#[async_trait]
impl PostProcessor for AvailabilityDomainProcessor {
    fn name(&self) -> &'static str {
        "availability_domain"
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        for (position, resource) in resources.iter_mut().enumerate() {
            let index = i64::try_from(position + 1).unwrap_or(i64::MAX);
            resource.set("index", index);

            let reference = resource.terraform_reference();
            let name = resource.attributes.require_str(&reference, "name")?.to_string();
            ctx.references
                .register(&name, &data_source_expression(&reference, "name"));
            resource.reference_override = Some(data_source_expression(&reference, "id"));
        }
        Ok(resources)
    }
}

/// `data "oci_identity_availability_domain"` lookup by 1-based number.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityDomainRenderer;

impl Renderer for AvailabilityDomainRenderer {
    fn name(&self) -> &'static str {
        "availability_domain_data_source"
    }

    fn is_importable(&self) -> bool {
        false
    }

    fn render(&self, resource: &DiscoveredResource, ctx: &RenderContext<'_>) -> Result<RenderedBlock> {
        let index = resource
            .attributes
            .get("index")
            .and_then(AttrValue::as_i64)
            .ok_or_else(|| {
                err!(RenderFailure {
                    resource: resource.terraform_reference(),
                    message: "availability domain has no index".to_string(),
                })
            })?;

        let mut writer = HclWriter::new();
        writer.open_block("data", &[&resource.terraform_class, &resource.terraform_name]);
        writer.raw_attribute("compartment_id", &compartment_value(resource, ctx.references));
        writer.raw_attribute("ad_number", &quote(&index.to_string()));
        writer.close_block();

        Ok(RenderedBlock {
            text: writer.finish(),
            unresolved: Vec::new(),
        })
    }
}

/// The tenancy's single authentication policy, addressed by compartment.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticationPolicyProcessor;

#[async_trait]
impl PostProcessor for AuthenticationPolicyProcessor {
    fn name(&self) -> &'static str {
        "authentication_policy"
    }

    async fn process(
        &self,
        _ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        for resource in &mut resources {
            let id = composite_id(&["authenticationPolicies", &resource.compartment_id]);
            let compartment_id = resource.compartment_id.clone();
            resource.set("compartment_id", compartment_id);
            resource.import_id = Some(id.clone());
            resource.id = id;
        }
        Ok(resources)
    }
}

/// Lists the tag definitions of the parent namespace and reads each one.
#[derive(Debug, Clone, Copy)]
pub struct TagFinder;

#[async_trait]
impl Discoverer for TagFinder {
    fn name(&self) -> &'static str {
        "tag_finder"
    }

    async fn discover(
        &self,
        ctx: &DiscoveryContext<'_>,
        association: &ResourceAssociation,
    ) -> Result<Vec<DiscoveredResource>> {
        let hint = association.hint.as_ref();
        let namespace = ctx.parent()?;
        let failure = |e| OciDiscoveryError::discovery(&hint.resource_class, e, file!(), line!());

        let mut request = ListTagsRequest {
            tag_namespace_id: namespace.id.clone(),
            page: None,
            metadata: ctx.metadata(true, &hint.service),
        };
        let mut summaries = Vec::new();
        loop {
            let page = ctx.client.list_tags(&request).await.map_err(failure)?;
            summaries.extend(page.items);
            match page.next_page {
                Some(token) => request.page = Some(token),
                None => break,
            }
        }

        let mut resources = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let mut params = AttrMap::new();
            params.insert("tag_namespace_id".to_string(), namespace.id.as_str().into());
            params.insert("name".to_string(), summary.name.as_str().into());
            let read = ReadRequest {
                resource_class: hint.resource_class.clone(),
                id: None,
                params,
                metadata: ctx.metadata(false, &hint.service),
            };
            let attributes = ctx.client.read_resource(&read).await.map_err(failure)?;

            let mut resource = resource_from_item(hint, namespace, ctx.parent, attributes)?;
            resource.terraform_name = sanitize_name(
                &format!("{}_{}", namespace.terraform_name, summary.name),
                &hint.abbreviation,
            );
            resources.push(resource);
        }

        debug!(namespace = %namespace.id, count = resources.len(), "Discovered tags");
        Ok(resources)
    }
}

/// Ties tags to their namespace and sets the import id.
#[derive(Debug, Clone, Copy)]
pub struct TagProcessor;

#[async_trait]
impl PostProcessor for TagProcessor {
    fn name(&self) -> &'static str {
        "tag"
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        let namespace = ctx.parent()?;
        for resource in &mut resources {
            let reference = resource.terraform_reference();
            let name = resource.attributes.require_str(&reference, "name")?.to_string();
            resource.set("tag_namespace_id", namespace.id.as_str());
            resource.import_id = Some(composite_id(&["tagNamespaces", &namespace.id, "tags", &name]));
        }
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, TagPage, TagSummary};
    use crate::reference::ReferenceMap;
    use crate::registry::{QueryParam, ResourceHint};
    use crate::resource::ResourceId;
    use crate::services::test_support::{resource, Harness};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn domains() -> Vec<DiscoveredResource> {
        ["AD-1", "AD-2", "AD-3"]
            .iter()
            .map(|name| {
                resource(
                    &format!("ocid1.availabilitydomain.oc1..{name}"),
                    "oci_identity_availability_domain",
                    name,
                    json!({ "name": name, "id": format!("ocid1.availabilitydomain.oc1..{name}") }),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_third_domain_renders_ad_number_three() {
        let mut harness = Harness::with_root();
        harness
            .references
            .register("ocid1.compartment.oc1..root", "var.compartment_ocid");

        let processed = harness.run(&AvailabilityDomainProcessor, domains()).await.unwrap();
        let third = &processed[2];
        assert_eq!(third.attributes["index"], AttrValue::Int(3));
        assert_eq!(
            harness.references.get("AD-3"),
            Some("data.oci_identity_availability_domain.AD-3.name")
        );
        assert_eq!(third.id_reference(), "data.oci_identity_availability_domain.AD-3.id");

        let ctx = RenderContext {
            references: &harness.references,
            computed: &[],
        };
        let block = AvailabilityDomainRenderer.render(third, &ctx).unwrap();
        assert_eq!(
            block.text,
            "data \"oci_identity_availability_domain\" \"AD-3\" {\n  compartment_id = var.compartment_ocid\n  ad_number = \"3\"\n}\n"
        );
    }

    #[tokio::test]
    async fn test_domain_without_name_fails() {
        let mut harness = Harness::with_root();
        let nameless = vec![resource("ad", "oci_identity_availability_domain", "ad", json!({}))];
        assert!(matches!(
            harness.run(&AvailabilityDomainProcessor, nameless).await,
            Err(OciDiscoveryError::MissingRequiredAttribute { .. })
        ));
    }

    #[test]
    fn test_render_without_index_fails() {
        let refs = ReferenceMap::new();
        let ctx = RenderContext {
            references: &refs,
            computed: &[],
        };
        let ad = resource("ad", "oci_identity_availability_domain", "AD-1", json!({"name": "AD-1"}));
        assert!(matches!(
            AvailabilityDomainRenderer.render(&ad, &ctx),
            Err(OciDiscoveryError::RenderFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_domain_processing_is_idempotent() {
        let mut harness = Harness::with_root();
        let once = harness.run(&AvailabilityDomainProcessor, domains()).await.unwrap();
        let twice = harness.run(&AvailabilityDomainProcessor, once.clone()).await.unwrap();
        let attrs = |rs: &[DiscoveredResource]| rs.iter().map(|r| r.attributes.clone()).collect::<Vec<_>>();
        assert_eq!(attrs(&once), attrs(&twice));
        assert!(harness.references.conflicts().is_empty());
    }

    #[tokio::test]
    async fn test_authentication_policy_composite_id() {
        let mut harness = Harness::with_root();
        let policy = resource("", "oci_identity_authentication_policy", "authentication_policy", json!({}));
        let processed = harness
            .run(&AuthenticationPolicyProcessor, vec![policy])
            .await
            .unwrap();
        assert_eq!(processed[0].id, "authenticationPolicies/ocid1.compartment.oc1..root");
        assert_eq!(processed[0].import_id(), "authenticationPolicies/ocid1.compartment.oc1..root");
        assert_eq!(
            processed[0].attributes["compartment_id"],
            AttrValue::from("ocid1.compartment.oc1..root")
        );
    }

    #[tokio::test]
    async fn test_tag_processor_sets_namespace_and_import_id() {
        let namespace = resource("ocid1.tagnamespace.oc1..ns", "oci_identity_tag_namespace", "ops", json!({}));
        let mut harness = Harness::new(namespace);
        let tag = resource("ocid1.tag.oc1..t", "oci_identity_tag", "ops_env", json!({"name": "env"}));

        let processed = harness.run(&TagProcessor, vec![tag]).await.unwrap();
        assert_eq!(
            processed[0].attributes["tag_namespace_id"],
            AttrValue::from("ocid1.tagnamespace.oc1..ns")
        );
        assert_eq!(processed[0].import_id(), "tagNamespaces/ocid1.tagnamespace.oc1..ns/tags/env");
    }

    fn tag_association() -> ResourceAssociation {
        ResourceAssociation {
            hint: Arc::new(ResourceHint::new("oci_identity_tag", "tag", "identity")),
            query_params: BTreeMap::from([("tag_namespace_id".to_string(), QueryParam::parent("id"))]),
        }
    }

    #[tokio::test]
    async fn test_tag_finder_paginates_and_reads() {
        let namespace = resource("ocid1.tagnamespace.oc1..ns", "oci_identity_tag_namespace", "ops", json!({}));
        let mut harness = Harness::new(namespace);
        harness.client.expect_list_tags().times(2).returning(|request| {
            let summary = |name: &str| TagSummary {
                name: name.to_string(),
                raw: json!({}),
            };
            Ok(match request.page.as_deref() {
                None => TagPage {
                    items: vec![summary("env")],
                    next_page: Some("1".to_string()),
                },
                Some(_) => TagPage {
                    items: vec![summary("cost center")],
                    next_page: None,
                },
            })
        });
        harness.client.expect_read_resource().times(2).returning(|request| {
            let name = request.params["name"].as_str().unwrap_or_default().to_string();
            let mut attrs = AttrMap::new();
            attrs.insert("id".to_string(), format!("ocid1.tag.oc1..{name}").into());
            attrs.insert("name".to_string(), name.into());
            Ok(attrs)
        });

        let ctx = DiscoveryContext {
            client: &harness.client,
            retry: &harness.retry,
            resources: &harness.arena,
            parent: ResourceId(0),
        };
        let tags = TagFinder.discover(&ctx, &tag_association()).await.unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.terraform_name.as_str()).collect();
        assert_eq!(names, vec!["ops_env", "ops_cost_center"]);
        assert_eq!(tags[1].id, "ocid1.tag.oc1..cost center");
        assert!(tags.iter().all(|t| t.parent == Some(ResourceId(0))));
    }

    #[tokio::test]
    async fn test_tag_finder_reports_discovery_failure() {
        let namespace = resource("ocid1.tagnamespace.oc1..ns", "oci_identity_tag_namespace", "ops", json!({}));
        let mut harness = Harness::new(namespace);
        harness.client.expect_list_tags().returning(|_| {
            Err(ClientError::Transport {
                message: "reset".to_string(),
            })
        });

        let ctx = DiscoveryContext {
            client: &harness.client,
            retry: &harness.retry,
            resources: &harness.arena,
            parent: ResourceId(0),
        };
        assert!(matches!(
            TagFinder.discover(&ctx, &tag_association()).await,
            Err(OciDiscoveryError::DiscoveryFailure { .. })
        ));
    }
}
