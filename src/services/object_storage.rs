//! Object Storage hooks.

use super::{composite_id, PostProcessor, ProcessContext};
use crate::discovery::{AttributeIdGenerator, IdGenerator};
use crate::error::Result;
use crate::reference::data_source_expression;
use crate::registry::RegistryBuilder;
use crate::render::{compartment_value, HclWriter, RenderContext, RenderedBlock, Renderer};
use crate::resource::DiscoveredResource;
use crate::value::Attributes;
use async_trait::async_trait;
use std::sync::Arc;

pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder.patch("oci_objectstorage_namespace", |hint| {
        hint.always_exportable = true;
        hint.id_generator = Some(Arc::new(AttributeIdGenerator::new("namespace")));
        hint.post_processor = Some(Arc::new(NamespaceProcessor));
        hint.renderer = Some(Arc::new(NamespaceRenderer));
    })?;
    builder.patch("oci_objectstorage_bucket", |hint| {
        hint.id_generator = Some(Arc::new(BucketIdGenerator));
    })?;
    Ok(())
}

/// Makes the tenancy namespace resolvable through its data source.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceProcessor;

#[async_trait]
impl PostProcessor for NamespaceProcessor {
    fn name(&self) -> &'static str {
        "namespace"
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        for resource in &mut resources {
            let reference = resource.terraform_reference();
            let namespace = resource.attributes.require_str(&reference, "namespace")?;
            let expression = data_source_expression(&reference, "namespace");
            ctx.references.register(namespace, &expression);
            resource.reference_override = Some(expression);
        }
        Ok(resources)
    }
}

/// `data "oci_objectstorage_namespace"` lookup.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceRenderer;

impl Renderer for NamespaceRenderer {
    fn name(&self) -> &'static str {
        "namespace_data_source"
    }

    fn is_importable(&self) -> bool {
        false
    }

    fn render(&self, resource: &DiscoveredResource, ctx: &RenderContext<'_>) -> Result<RenderedBlock> {
        let mut writer = HclWriter::new();
        writer.open_block("data", &[&resource.terraform_class, &resource.terraform_name]);
        writer.raw_attribute("compartment_id", &compartment_value(resource, ctx.references));
        writer.close_block();
        Ok(RenderedBlock {
            text: writer.finish(),
            unresolved: Vec::new(),
        })
    }
}

/// `n/<namespace>/b/<bucket name>`
#[derive(Debug, Clone, Copy)]
pub struct BucketIdGenerator;

impl IdGenerator for BucketIdGenerator {
    fn generate(&self, resource: &DiscoveredResource) -> Result<String> {
        let namespace = resource
            .attributes
            .require_str(&resource.terraform_class, "namespace")?;
        let name = resource.attributes.require_str(&resource.terraform_class, "name")?;
        Ok(composite_id(&["n", namespace, "b", name]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OciDiscoveryError;
    use crate::services::test_support::{resource, Harness};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_namespace_registers_data_source_lookup() {
        let mut harness = Harness::with_root();
        harness
            .references
            .register("ocid1.compartment.oc1..root", "var.compartment_ocid");
        let namespace = resource("acme", "oci_objectstorage_namespace", "acme", json!({"namespace": "acme"}));

        let processed = harness.run(&NamespaceProcessor, vec![namespace]).await.unwrap();
        assert_eq!(
            harness.references.get("acme"),
            Some("data.oci_objectstorage_namespace.acme.namespace")
        );
        assert_eq!(processed[0].id_reference(), "data.oci_objectstorage_namespace.acme.namespace");

        let ctx = RenderContext {
            references: &harness.references,
            computed: &[],
        };
        let block = NamespaceRenderer.render(&processed[0], &ctx).unwrap();
        assert_eq!(
            block.text,
            "data \"oci_objectstorage_namespace\" \"acme\" {\n  compartment_id = var.compartment_ocid\n}\n"
        );
    }

    #[tokio::test]
    async fn test_namespace_missing_value_fails() {
        let mut harness = Harness::with_root();
        let namespace = resource("", "oci_objectstorage_namespace", "ns", json!({}));
        assert!(matches!(
            harness.run(&NamespaceProcessor, vec![namespace]).await,
            Err(OciDiscoveryError::MissingRequiredAttribute { .. })
        ));
    }

    #[test]
    fn test_bucket_id() {
        let bucket = resource(
            "",
            "oci_objectstorage_bucket",
            "logs",
            json!({"namespace": "acme", "name": "app logs"}),
        );
        assert_eq!(BucketIdGenerator.generate(&bucket).unwrap(), "n/acme/b/app%20logs");

        let nameless = resource("", "oci_objectstorage_bucket", "b", json!({"namespace": "acme"}));
        assert!(BucketIdGenerator.generate(&nameless).is_err());
    }
}
