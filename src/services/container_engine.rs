//! Container Engine hooks.

use super::{PostProcessor, ProcessContext};
use crate::error::Result;
use crate::registry::RegistryBuilder;
use crate::resource::DiscoveredResource;
use async_trait::async_trait;
use std::sync::Arc;

/// Replaced by `node_config_details`; the provider rejects both together.
const DEPRECATED_PLACEMENT: &[&str] = &["subnet_ids", "quantity_per_subnet"];

pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder.patch("oci_containerengine_node_pool", |hint| {
        hint.post_processor = Some(Arc::new(NodePoolProcessor));
    })?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct NodePoolProcessor;

#[async_trait]
impl PostProcessor for NodePoolProcessor {
    fn name(&self) -> &'static str {
        "node_pool"
    }

    async fn process(
        &self,
        _ctx: &mut ProcessContext<'_>,
        mut resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        for pool in &mut resources {
            let has_config = pool
                .attributes
                .get("node_config_details")
                .is_some_and(|details| !details.is_null());
            if has_config {
                for key in DEPRECATED_PLACEMENT {
                    pool.attributes.remove(*key);
                }
            }
        }
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{resource, Harness};
    use serde_json::json;

    #[tokio::test]
    async fn test_deprecated_placement_dropped_with_config_details() {
        let mut harness = Harness::with_root();
        let pools = vec![
            resource(
                "np1",
                "oci_containerengine_node_pool",
                "np1",
                json!({
                    "subnet_ids": ["s1"],
                    "quantity_per_subnet": 1,
                    "node_config_details": [{"size": 3}]
                }),
            ),
            resource(
                "np2",
                "oci_containerengine_node_pool",
                "np2",
                json!({"subnet_ids": ["s1"], "quantity_per_subnet": 2}),
            ),
        ];
        let processed = harness.run(&NodePoolProcessor, pools).await.unwrap();
        assert!(!processed[0].attributes.contains_key("subnet_ids"));
        assert!(!processed[0].attributes.contains_key("quantity_per_subnet"));
        assert!(processed[0].attributes.contains_key("node_config_details"));
        assert!(processed[1].attributes.contains_key("subnet_ids"));
        assert!(processed[1].attributes.contains_key("quantity_per_subnet"));
    }
}
