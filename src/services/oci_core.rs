//! Core service hooks: compute, block storage and networking.

use super::{PostProcessor, ProcessContext};
use crate::client::{DataSourceRequest, ReadRequest};
use crate::error::{OciDiscoveryError, Result};
use crate::reference::{resource_expression, variable_expression};
use crate::registry::RegistryBuilder;
use crate::resource::DiscoveredResource;
use crate::value::{AttrMap, AttrValue, Attributes};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Free-form tag OCI puts on instances owned by an instance pool.
const INSTANCE_POOL_TAG: &str = "oci:compute:instancepool";

/// Boot volumes smaller than this use the platform default size.
const MIN_BOOT_VOLUME_SIZE_GBS: i64 = 50;

pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder.patch("oci_core_instance", |hint| {
        hint.post_processor = Some(Arc::new(InstanceProcessor));
    })?;
    builder.patch("oci_core_vnic_attachment", |hint| {
        hint.post_processor = Some(Arc::new(VnicAttachmentProcessor));
    })?;
    builder.patch("oci_core_boot_volume", |hint| {
        hint.post_processor = Some(Arc::new(BootVolumeFilter));
    })?;
    builder.patch("oci_core_image", |hint| {
        hint.post_processor = Some(Arc::new(CustomImageFilter));
    })?;
    builder.patch("oci_core_volume_group", |hint| {
        hint.post_processor = Some(Arc::new(VolumeGroupProcessor));
    })?;
    builder.patch("oci_core_network_security_group_security_rule", |hint| {
        hint.post_processor = Some(Arc::new(SecurityRuleProcessor));
    })?;
    for default in DefaultResourceProcessor::ALL {
        builder.patch(default.base_class, |hint| {
            hint.post_processor = Some(Arc::new(default));
        })?;
    }
    Ok(())
}

/// Instances: skip pool members, tie the boot volume and image to references.
#[derive(Debug, Clone, Copy)]
pub struct InstanceProcessor;

impl InstanceProcessor {
    fn is_pool_member(resource: &DiscoveredResource) -> bool {
        resource
            .attributes
            .get("freeform_tags")
            .and_then(AttrValue::as_map)
            .is_some_and(|tags| tags.contains_key(INSTANCE_POOL_TAG))
    }
}

#[async_trait]
impl PostProcessor for InstanceProcessor {
    fn name(&self) -> &'static str {
        "instance"
    }

    async fn retain(
        &self,
        _ctx: &mut ProcessContext<'_>,
        resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        Ok(resources
            .into_iter()
            .filter(|resource| {
                let pooled = Self::is_pool_member(resource);
                if pooled {
                    debug!(id = %resource.id, "Skipping instance pool member");
                }
                !pooled
            })
            .collect())
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        let mut kept = Vec::with_capacity(resources.len());
        for mut resource in resources {
            let reference = resource.terraform_reference();

            if let Some(boot_volume_id) = resource.attributes.optional_str(&reference, "boot_volume_id")? {
                ctx.references
                    .register(boot_volume_id, &resource_expression(&reference, "boot_volume_id"));
            }

            if let Some(image) = resource.attributes.optional_str(&reference, "image")?.map(str::to_string) {
                if let Some(source) = resource.attributes.first_block_mut("source_details") {
                    source.insert("source_id".to_string(), image.as_str().into());
                }
                if !image.is_empty() && !ctx.references.contains(&image) {
                    let variable = format!("{}_source_image_id", resource.terraform_name);
                    ctx.variables.insert(variable.clone(), image.clone());
                    ctx.references.register(&image, &variable_expression(&variable));
                }
            }

            let size = match resource.attributes.get("source_details").and_then(AttrValue::as_list) {
                Some([AttrValue::Map(source), ..]) => source.get("boot_volume_size_in_gbs").cloned(),
                _ => None,
            };
            if let Some(size) = size.filter(|s| !s.is_null()) {
                let gbs = size.as_i64().ok_or_else(|| {
                    crate::err!(AttributeType {
                        resource: reference.clone(),
                        attribute: "boot_volume_size_in_gbs".to_string(),
                        expected: "integer",
                        found: size.type_name(),
                    })
                })?;
                if gbs < MIN_BOOT_VOLUME_SIZE_GBS {
                    if let Some(source) = resource.attributes.first_block_mut("source_details") {
                        source.remove("boot_volume_size_in_gbs");
                    }
                }
            }

            kept.push(resource);
        }
        Ok(kept)
    }
}

/// Secondary VNIC attachments only; the primary one belongs to the instance.
#[derive(Debug, Clone, Copy)]
pub struct VnicAttachmentProcessor;

#[async_trait]
impl PostProcessor for VnicAttachmentProcessor {
    fn name(&self) -> &'static str {
        "vnic_attachment"
    }

    async fn retain(
        &self,
        ctx: &mut ProcessContext<'_>,
        resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        let mut kept = Vec::with_capacity(resources.len());
        for resource in resources {
            let vnic_id = resource
                .attributes
                .require_str(&resource.terraform_class, "vnic_id")?
                .to_string();

            let mut params = AttrMap::new();
            params.insert("vnic_id".to_string(), vnic_id.as_str().into());
            let vnic = ctx
                .client
                .read_data_source(&DataSourceRequest {
                    datasource_class: "oci_core_vnic".to_string(),
                    items_attr: String::new(),
                    params,
                    page: None,
                    metadata: ctx.metadata(true, "core"),
                })
                .await
                .map_err(|e| OciDiscoveryError::discovery(&resource.terraform_class, e, file!(), line!()))?;

            if vnic.get("is_primary").and_then(AttrValue::as_bool) == Some(true) {
                debug!(vnic_id, "Skipping primary VNIC attachment");
                continue;
            }
            kept.push(resource);
        }
        Ok(kept)
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        for resource in &mut resources {
            let class = resource.terraform_class.clone();
            resource.attributes = ctx
                .client
                .read_resource(&ReadRequest {
                    resource_class: class.clone(),
                    id: Some(resource.id.clone()),
                    params: AttrMap::new(),
                    metadata: ctx.metadata(false, "core"),
                })
                .await
                .map_err(|e| OciDiscoveryError::discovery(&class, e, file!(), line!()))?;
        }
        Ok(resources)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BootVolumeFilter;

#[async_trait]
impl PostProcessor for BootVolumeFilter {
    fn name(&self) -> &'static str {
        "boot_volume"
    }

    async fn retain(
        &self,
        _ctx: &mut ProcessContext<'_>,
        resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        Ok(resources
            .into_iter()
            .filter(|resource| {
                resource
                    .attributes
                    .get("source_details")
                    .and_then(AttrValue::as_list)
                    .is_some_and(|details| !details.is_empty())
            })
            .collect())
    }
}

/// Platform images have no compartment; only custom images are exported.
#[derive(Debug, Clone, Copy)]
pub struct CustomImageFilter;

#[async_trait]
impl PostProcessor for CustomImageFilter {
    fn name(&self) -> &'static str {
        "custom_image"
    }

    async fn retain(
        &self,
        _ctx: &mut ProcessContext<'_>,
        resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        Ok(resources
            .into_iter()
            .filter(|resource| resource.attributes.get_str("compartment_id").is_some())
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VolumeGroupProcessor;

#[async_trait]
impl PostProcessor for VolumeGroupProcessor {
    fn name(&self) -> &'static str {
        "volume_group"
    }

    async fn process(
        &self,
        _ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        for resource in &mut resources {
            let Some(volume_ids) = resource.attributes.get("volume_ids").cloned() else {
                continue;
            };
            if let Some(source) = resource.attributes.first_block_mut("source_details") {
                source.insert("volume_ids".to_string(), volume_ids);
            }
        }
        Ok(resources)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SecurityRuleProcessor;

#[async_trait]
impl PostProcessor for SecurityRuleProcessor {
    fn name(&self) -> &'static str {
        "security_rule"
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        let group = ctx.parent()?;
        for resource in &mut resources {
            resource.set("network_security_group_id", group.id.as_str());
        }
        Ok(resources)
    }
}

/// Reclassifies the VCN's default security list, route table or DHCP
/// options as the matching `oci_core_default_*` resource.
#[derive(Debug, Clone, Copy)]
pub struct DefaultResourceProcessor {
    pub base_class: &'static str,
    pub default_class: &'static str,
    /// Attribute of the parent VCN holding the default resource's id
    pub parent_attribute: &'static str,
}

impl DefaultResourceProcessor {
    pub const ALL: [Self; 3] = [
        Self {
            base_class: "oci_core_security_list",
            default_class: "oci_core_default_security_list",
            parent_attribute: "default_security_list_id",
        },
        Self {
            base_class: "oci_core_route_table",
            default_class: "oci_core_default_route_table",
            parent_attribute: "default_route_table_id",
        },
        Self {
            base_class: "oci_core_dhcp_options",
            default_class: "oci_core_default_dhcp_options",
            parent_attribute: "default_dhcp_options_id",
        },
    ];
}

#[async_trait]
impl PostProcessor for DefaultResourceProcessor {
    fn name(&self) -> &'static str {
        "default_resource"
    }

    async fn process(
        &self,
        ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        let vcn = ctx.parent()?;
        let Some(default_id) = vcn
            .attributes
            .optional_str(&vcn.terraform_reference(), self.parent_attribute)?
        else {
            return Ok(resources);
        };

        for resource in &mut resources {
            if resource.id != default_id {
                continue;
            }
            debug!(id = %resource.id, class = self.default_class, "Reclassified default resource");
            resource.terraform_class = self.default_class.to_string();
            let id = resource.id.clone();
            resource.set("manage_default_resource_id", id);
            if !vcn.omitted {
                resource.reference_override =
                    Some(resource_expression(&vcn.terraform_reference(), self.parent_attribute));
            }
        }
        Ok(resources)
    }
}
