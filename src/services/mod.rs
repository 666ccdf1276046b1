//! Post-processing pipeline.
//!
//! Each service module patches the hints of its resource classes with the
//! strategies they need: post-processors that filter, mutate or reparent
//! discovered resources, custom discoverers, id generators and renderers.
//!
//! A [`PostProcessor`] runs once per resource type per parent, right after
//! discovery and before any child of those resources is discovered. Hooks
//! are idempotent: running one twice on its own output changes nothing.

pub mod container_engine;
pub mod database;
pub mod identity;
pub mod load_balancer;
pub mod object_storage;
pub mod oci_core;

use crate::client::{retry_policy, OciClient, RequestMetadata};
use crate::config::RetryOptions;
use crate::err;
use crate::error::Result;
use crate::reference::{ReferenceMap, Variables};
use crate::registry::RegistryBuilder;
use crate::resource::{DiscoveredResource, ResourceId};
use async_trait::async_trait;
use std::fmt;

/// State a post-processor may read and extend.
pub struct ProcessContext<'a> {
    pub client: &'a dyn OciClient,
    pub retry: &'a RetryOptions,
    /// Resources discovered before this batch
    pub resources: &'a [DiscoveredResource],
    /// Parent of every resource in the batch
    pub parent: ResourceId,
    pub references: &'a mut ReferenceMap,
    pub variables: &'a mut Variables,
}

impl<'a> ProcessContext<'a> {
    pub fn parent(&self) -> Result<&'a DiscoveredResource> {
        self.resources.get(self.parent.0).ok_or_else(|| {
            err!(Internal {
                message: format!("parent {} is not in the arena", self.parent),
            })
        })
    }

    #[must_use]
    pub fn metadata(&self, is_datasource_read: bool, service: &str) -> RequestMetadata {
        RequestMetadata {
            retry_policy: retry_policy(is_datasource_read, service, self.retry),
        }
    }
}

/// Filters, mutates or reparents a batch of discovered resources.
///
/// [`retain`](Self::retain) runs before the batch is named and drops the
/// resources that are not exported. [`process`](Self::process) runs on the
/// named survivors and may reclassify them or register references.
#[async_trait]
pub trait PostProcessor: fmt::Debug + Send + Sync {
    /// Name shown in logs and graph exports.
    fn name(&self) -> &'static str;

    async fn retain(
        &self,
        _ctx: &mut ProcessContext<'_>,
        resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        Ok(resources)
    }

    async fn process(
        &self,
        _ctx: &mut ProcessContext<'_>,
        resources: Vec<DiscoveredResource>,
    ) -> Result<Vec<DiscoveredResource>> {
        Ok(resources)
    }
}

/// Build a composite id from literal parts and percent-encoded segments.
///
/// `parts` alternates literal path components and values, e.g.
/// `["loadBalancers", lb_id, "backendSets", name]`: every odd entry is
/// encoded, every even entry is kept as is.
#[must_use]
pub fn composite_id(parts: &[&str]) -> String {
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            if i % 2 == 1 {
                urlencoding::encode(part).into_owned()
            } else {
                (*part).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Install every service's strategies on the catalog hints.
pub fn register_all(builder: &mut RegistryBuilder) -> Result<()> {
    identity::register(builder)?;
    oci_core::register(builder)?;
    database::register(builder)?;
    load_balancer::register(builder)?;
    object_storage::register(builder)?;
    container_engine::register(builder)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_composite_id() {
        assert_eq!(
            composite_id(&["loadBalancers", "lb1", "backendSets", "bs1"]),
            "loadBalancers/lb1/backendSets/bs1"
        );
        assert_eq!(composite_id(&["n", "ns", "b", "my bucket/x"]), "n/ns/b/my%20bucket%2Fx");
        assert_eq!(
            composite_id(&["loadBalancers", "ocid1.loadbalancer.oc1..aaa", "listeners", "l_1~x"]),
            "loadBalancers/ocid1.loadbalancer.oc1..aaa/listeners/l_1~x"
        );
    }

    proptest! {
        #[test]
        fn composite_id_is_deterministic(lb in "[a-z0-9.]{1,30}", name in "\\PC{1,20}") {
            let first = composite_id(&["loadBalancers", &lb, "backendSets", &name]);
            let second = composite_id(&["loadBalancers", &lb, "backendSets", &name]);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.matches('/').count(), 3);
        }
    }
}
