//! HCL synthesis.
//!
//! A [`Renderer`] turns one discovered resource into configuration text.
//! The [`GenericRenderer`] writes a `resource` block from the attribute map,
//! replacing every literal registered in the [`ReferenceMap`] with its
//! expression. Hints install their own renderer when the resource must be
//! emitted as something else (data source lookups).

mod writer;

pub use writer::{escape_string, format_value, quote, HclWriter};

use crate::err;
use crate::error::Result;
use crate::reference::ReferenceMap;
use crate::resource::DiscoveredResource;
use crate::value::{AttrMap, AttrValue};
use std::fmt;

/// Attributes never written by the generic renderer.
const SKIPPED_ATTRIBUTES: &[&str] = &["id", "state", "time_created"];

/// Prefix of literal OCIDs.
const OCID_PREFIX: &str = "ocid1.";

/// What a renderer reads besides the resource itself.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub references: &'a ReferenceMap,
    /// Computed-only attributes of the resource's class
    pub computed: &'a [String],
}

/// Rendered configuration of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBlock {
    pub text: String,
    /// Literal OCIDs that could not be replaced by a reference
    pub unresolved: Vec<String>,
}

/// Produces configuration text for a resource.
pub trait Renderer: fmt::Debug + Send + Sync {
    /// Name shown in logs and graph exports.
    fn name(&self) -> &'static str;

    fn render(&self, resource: &DiscoveredResource, ctx: &RenderContext<'_>) -> Result<RenderedBlock>;

    /// Whether the rendered block can be the target of an import block.
    fn is_importable(&self) -> bool {
        true
    }
}

/// Replace registered literals with their expressions, recursively.
///
/// Map keys are never substituted, and an expression pointing at the
/// resource being rendered (`self_reference` prefix) is never used.
#[must_use]
pub fn substitute(value: &AttrValue, references: &ReferenceMap, self_reference: &str) -> AttrValue {
    match value {
        AttrValue::String(s) => match references.get(s) {
            Some(expr) if !is_self_reference(expr, self_reference) => AttrValue::Interpolation(expr.to_string()),
            _ => value.clone(),
        },
        AttrValue::List(items) => AttrValue::List(
            items
                .iter()
                .map(|item| substitute(item, references, self_reference))
                .collect(),
        ),
        AttrValue::Map(map) => AttrValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, references, self_reference)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn is_self_reference(expression: &str, self_reference: &str) -> bool {
    expression
        .strip_prefix(self_reference)
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Literal OCIDs left in a value, in traversal order.
pub fn collect_unresolved(value: &AttrValue, out: &mut Vec<String>) {
    match value {
        AttrValue::String(s) if s.starts_with(OCID_PREFIX) => out.push(s.clone()),
        AttrValue::List(items) => items.iter().for_each(|item| collect_unresolved(item, out)),
        AttrValue::Map(map) => map.values().for_each(|item| collect_unresolved(item, out)),
        _ => {}
    }
}

/// Default renderer: a `resource` block built from the attribute map.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRenderer;

impl GenericRenderer {
    /// Attributes to render, substituted, without skipped and null entries.
    #[must_use]
    pub fn prepared_attributes(resource: &DiscoveredResource, ctx: &RenderContext<'_>) -> AttrMap {
        let self_reference = resource.terraform_reference();
        resource
            .attributes
            .iter()
            .filter(|(key, value)| {
                !value.is_null()
                    && !SKIPPED_ATTRIBUTES.contains(&key.as_str())
                    && !ctx.computed.iter().any(|c| c == *key)
            })
            .map(|(key, value)| (key.clone(), substitute(value, ctx.references, &self_reference)))
            .collect()
    }
}

impl Renderer for GenericRenderer {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn render(&self, resource: &DiscoveredResource, ctx: &RenderContext<'_>) -> Result<RenderedBlock> {
        if resource.terraform_name.is_empty() {
            return Err(err!(RenderFailure {
                resource: resource.terraform_class.clone(),
                message: format!("resource '{}' has no terraform name", resource.id),
            }));
        }

        let attributes = Self::prepared_attributes(resource, ctx);
        let mut unresolved = Vec::new();
        for value in attributes.values() {
            collect_unresolved(value, &mut unresolved);
        }

        let mut writer = HclWriter::new();
        writer.open_block("resource", &[&resource.terraform_class, &resource.terraform_name]);
        writer.body(&attributes);
        writer.close_block();

        Ok(RenderedBlock {
            text: writer.finish(),
            unresolved,
        })
    }
}

/// `compartment_id = <expression or literal>` value for data source blocks.
#[must_use]
pub fn compartment_value(resource: &DiscoveredResource, references: &ReferenceMap) -> String {
    references
        .get(&resource.compartment_id)
        .map_or_else(|| quote(&resource.compartment_id), str::to_string)
}

/// Parse generated text back and return the number of top-level blocks.
pub fn validate(file_name: &str, text: &str) -> Result<usize> {
    let body: hcl::Body = hcl::from_str(text).map_err(|e| {
        err!(RenderFailure {
            resource: file_name.to_string(),
            message: format!("generated configuration does not parse: {e}"),
        })
    })?;

    Ok(body
        .into_inner()
        .into_iter()
        .filter(|structure| matches!(structure, hcl::Structure::Block(_)))
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::attrs_from_json;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn subnet() -> DiscoveredResource {
        let mut resource = DiscoveredResource::new(
            "ocid1.subnet.oc1..s",
            "oci_core_subnet",
            attrs_from_json(&json!({
                "id": "ocid1.subnet.oc1..s",
                "state": "AVAILABLE",
                "time_created": "2020-01-01",
                "vcn_id": "ocid1.vcn.oc1..v",
                "compartment_id": "ocid1.compartment.oc1..c",
                "security_list_ids": ["ocid1.securitylist.oc1..a", "ocid1.securitylist.oc1..b"],
                "freeform_tags": {"ocid1.vcn.oc1..v": "ocid1.vcn.oc1..v"},
                "display_name": "private",
                "virtual_router_ip": "10.0.0.1"
            })),
        );
        resource.terraform_name = "private".to_string();
        resource
    }

    fn references() -> ReferenceMap {
        let mut refs = ReferenceMap::new();
        refs.register("ocid1.vcn.oc1..v", "oci_core_vcn.vcn1.id");
        refs.register("ocid1.compartment.oc1..c", "var.compartment_ocid");
        refs.register("ocid1.securitylist.oc1..a", "oci_core_security_list.a.id");
        refs.register("ocid1.subnet.oc1..s", "oci_core_subnet.private.id");
        refs
    }

    #[test]
    fn test_generic_render_substitutes_everywhere_but_keys() {
        let refs = references();
        let computed = vec!["virtual_router_ip".to_string()];
        let ctx = RenderContext {
            references: &refs,
            computed: &computed,
        };

        let block = GenericRenderer.render(&subnet(), &ctx).unwrap();
        let expected = r#"resource "oci_core_subnet" "private" {
  compartment_id = var.compartment_ocid
  display_name = "private"
  freeform_tags = {
    "ocid1.vcn.oc1..v" = oci_core_vcn.vcn1.id
  }
  security_list_ids = [oci_core_security_list.a.id, "ocid1.securitylist.oc1..b"]
  vcn_id = oci_core_vcn.vcn1.id
}
"#;
        assert_eq!(block.text, expected);
        assert_eq!(block.unresolved, vec!["ocid1.securitylist.oc1..b".to_string()]);
    }

    #[test]
    fn test_never_references_itself() {
        let mut refs = ReferenceMap::new();
        refs.register("ocid1.instance.oc1..i", "oci_core_instance.web.id");
        refs.register("ocid1.instance.oc1..other", "oci_core_instance.web_1.id");

        let value = AttrValue::List(vec![
            AttrValue::from("ocid1.instance.oc1..i"),
            AttrValue::from("ocid1.instance.oc1..other"),
        ]);
        let out = substitute(&value, &refs, "oci_core_instance.web");
        assert_eq!(
            out,
            AttrValue::List(vec![
                AttrValue::from("ocid1.instance.oc1..i"),
                AttrValue::Interpolation("oci_core_instance.web_1.id".to_string()),
            ])
        );
    }

    #[test]
    fn test_generated_text_validates() {
        let refs = references();
        let ctx = RenderContext {
            references: &refs,
            computed: &[],
        };
        let block = GenericRenderer.render(&subnet(), &ctx).unwrap();
        assert_eq!(validate("core.tf", &block.text).unwrap(), 1);
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(matches!(
            validate("broken.tf", "resource \"a\" {"),
            Err(crate::error::OciDiscoveryError::RenderFailure { .. })
        ));
    }

    #[test]
    fn test_compartment_value() {
        let refs = references();
        let resource = subnet().with_compartment("ocid1.compartment.oc1..c");
        assert_eq!(compartment_value(&resource, &refs), "var.compartment_ocid");

        let resource = subnet().with_compartment("ocid1.compartment.oc1..unknown");
        assert_eq!(compartment_value(&resource, &refs), "\"ocid1.compartment.oc1..unknown\"");
    }
}
