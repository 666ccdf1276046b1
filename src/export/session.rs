//! Export session.
//!
//! The session owns everything an export mutates: the resource arena, the
//! reference map, the synthesized variables and the name allocator. Steps
//! walk their association graph depth-first from the compartment root; for
//! every association the batch of children is discovered and filtered, then
//! named, post-processed and registered before any of its own children are
//! discovered. Names are allocated only to resources that survive the
//! filters, and the type filter sees the class left by post-processing.

use super::filter::ResourceFilter;
use crate::client::OciClient;
use crate::config::RetryOptions;
use crate::discovery::{base_name, DataSourceDiscoverer, Discoverer, DiscoveryContext, NameAllocator};
use crate::error::Result;
use crate::reference::{variable_expression, ReferenceMap, Variables, COMPARTMENT_VARIABLE};
use crate::registry::{ExportStep, Registry, ResourceAssociation, ROOT_CLASS};
use crate::render::RenderContext;
use crate::resource::{DiscoveredResource, ExportState, ResourceId};
use crate::services::ProcessContext;
use crate::types::{StepSummary, UnresolvedReference};
use crate::value::AttrMap;
use tracing::{debug, info, warn};

/// Read-only collaborators of a session.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub client: &'a dyn OciClient,
    pub registry: &'a Registry,
    pub retry: &'a RetryOptions,
    /// Record recoverable failures on the step instead of aborting
    pub continue_on_error: bool,
}

/// Output of one step.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub summary: StepSummary,
    /// Rendered configuration; empty when nothing was rendered
    pub text: String,
}

/// Mutable state of one export.
#[derive(Debug)]
pub struct ExportSession {
    arena: Vec<DiscoveredResource>,
    references: ReferenceMap,
    variables: Variables,
    names: NameAllocator,
    filter: ResourceFilter,
    unresolved: Vec<UnresolvedReference>,
}

impl ExportSession {
    /// Index of the compartment root in the arena.
    pub const ROOT: ResourceId = ResourceId(0);

    /// New session rooted at `compartment_id`. The compartment is declared
    /// as the `compartment_ocid` variable and resolves to it.
    #[must_use]
    pub fn new(compartment_id: &str, filter: ResourceFilter) -> Self {
        let mut attributes = AttrMap::new();
        attributes.insert("id".to_string(), compartment_id.into());
        attributes.insert("compartment_id".to_string(), compartment_id.into());

        let mut root = DiscoveredResource::new(compartment_id, ROOT_CLASS, attributes)
            .with_compartment(compartment_id);
        root.terraform_name = "export".to_string();
        root.omitted = true;
        root.reference_override = Some(variable_expression(COMPARTMENT_VARIABLE));
        root.state = ExportState::ReferenceRegistered;

        let mut references = ReferenceMap::new();
        references.register(compartment_id, &root.id_reference());
        let mut variables = Variables::new();
        variables.insert(COMPARTMENT_VARIABLE.to_string(), compartment_id.to_string());
        let mut names = NameAllocator::new();
        names.reserve(ROOT_CLASS, &root.terraform_name);

        Self {
            arena: vec![root],
            references,
            variables,
            names,
            filter,
            unresolved: Vec::new(),
        }
    }

    #[must_use]
    pub fn resources(&self) -> &[DiscoveredResource] {
        &self.arena
    }

    #[must_use]
    pub fn references(&self) -> &ReferenceMap {
        &self.references
    }

    #[must_use]
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    #[must_use]
    pub fn unresolved(&self) -> &[UnresolvedReference] {
        &self.unresolved
    }

    #[must_use]
    pub fn filter(&self) -> &ResourceFilter {
        &self.filter
    }

    /// Discover and render one step.
    pub async fn run_step(&mut self, ctx: &StepContext<'_>, step: &ExportStep) -> Result<StepOutput> {
        info!(step = %step.name, "Running export step");
        let start = self.arena.len();
        let mut summary = StepSummary {
            name: step.name.clone(),
            ..StepSummary::default()
        };

        // Depth-first: (parent, index of its next association)
        let mut stack = vec![(Self::ROOT, 0_usize)];
        while let Some((parent, next)) = stack.pop() {
            let class = self.arena[parent.0].terraform_class.clone();
            let Some(association) = step.children(&class).get(next) else {
                continue;
            };
            stack.push((parent, next + 1));

            match self.discover_batch(ctx, parent, association).await {
                Ok(children) => stack.extend(children.into_iter().rev().map(|child| (child, 0))),
                Err(e) if ctx.continue_on_error && e.is_recoverable() => {
                    warn!(step = %step.name, class = association.resource_class(), error = %e, "Skipping failed association");
                    summary.errors.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        let text = self.render_range(ctx, start, &mut summary)?;
        if summary.rendered > 0 {
            summary.file = Some(step.file_name());
        }
        info!(
            step = %step.name,
            discovered = summary.discovered,
            rendered = summary.rendered,
            omitted = summary.omitted,
            errors = summary.errors.len(),
            "Export step finished"
        );
        Ok(StepOutput { summary, text })
    }

    /// Discover, filter, name, post-process and register the children of
    /// `parent` for one association. Returns their arena ids.
    async fn discover_batch(
        &mut self,
        ctx: &StepContext<'_>,
        parent: ResourceId,
        association: &ResourceAssociation,
    ) -> Result<Vec<ResourceId>> {
        let hint = association.hint.as_ref();
        let discoverer: &dyn Discoverer = hint.discoverer.as_deref().unwrap_or(&DataSourceDiscoverer);

        let mut batch = {
            let discovery = DiscoveryContext {
                client: ctx.client,
                retry: ctx.retry,
                resources: &self.arena,
                parent,
            };
            discoverer.discover(&discovery, association).await?
        };

        let listed = batch.len();
        batch.retain(|resource| hint.is_discoverable(resource.lifecycle_state()));
        if batch.len() < listed {
            debug!(class = %hint.resource_class, skipped = listed - batch.len(), "Filtered by lifecycle state");
        }

        if let Some(processor) = &hint.post_processor {
            let before = batch.len();
            let mut process = self.process_context(ctx, parent);
            batch = processor.retain(&mut process, batch).await?;
            if batch.len() < before {
                debug!(class = %hint.resource_class, processor = processor.name(), dropped = before - batch.len(), "Dropped resources");
            }
        }

        for resource in &mut batch {
            let base = if resource.terraform_name.is_empty() {
                base_name(&resource.attributes, &hint.abbreviation)
            } else {
                resource.terraform_name.clone()
            };
            resource.terraform_name = self.names.allocate(&resource.terraform_class, &base);
            resource.parent = Some(parent);
        }

        if let Some(processor) = &hint.post_processor {
            let mut process = self.process_context(ctx, parent);
            batch = processor.process(&mut process, batch).await?;
            debug!(class = %hint.resource_class, processor = processor.name(), kept = batch.len(), "Post-processed batch");
        }

        for resource in &mut batch {
            resource.omitted = !self.filter.renders(&resource.terraform_class, hint.always_exportable);
        }

        let mut ids = Vec::with_capacity(batch.len());
        for mut resource in batch {
            resource.state = ExportState::PostProcessed;
            self.references.register(&resource.id, &resource.id_reference());
            resource.state = ExportState::ReferenceRegistered;
            debug!(
                class = %resource.terraform_class,
                name = %resource.terraform_name,
                id = %resource.id,
                omitted = resource.omitted,
                "Registered resource"
            );
            ids.push(ResourceId(self.arena.len()));
            self.arena.push(resource);
        }
        Ok(ids)
    }

    fn process_context<'a>(&'a mut self, ctx: &StepContext<'a>, parent: ResourceId) -> ProcessContext<'a> {
        ProcessContext {
            client: ctx.client,
            retry: ctx.retry,
            resources: &self.arena,
            parent,
            references: &mut self.references,
            variables: &mut self.variables,
        }
    }

    /// Render every resource from `start` on, in discovery order.
    fn render_range(&mut self, ctx: &StepContext<'_>, start: usize, summary: &mut StepSummary) -> Result<String> {
        let mut text = String::new();
        for resource in &mut self.arena[start..] {
            summary.discovered += 1;
            if resource.omitted {
                summary.omitted += 1;
                continue;
            }

            let computed = ctx
                .registry
                .lookup(&resource.terraform_class)
                .map(|hint| hint.computed_attributes.as_slice())
                .unwrap_or_default();
            let render = RenderContext {
                references: &self.references,
                computed,
            };

            let block = match resource.renderer.render(resource, &render) {
                Ok(block) => block,
                Err(e) if ctx.continue_on_error && e.is_recoverable() => {
                    warn!(resource = %resource.terraform_reference(), error = %e, "Skipping resource that failed to render");
                    summary.errors.push(e.to_string());
                    continue;
                }
                Err(e) => return Err(e),
            };

            let reference = resource.terraform_reference();
            for value in block.unresolved {
                debug!(resource = %reference, value = %value, "Unresolved reference left as literal");
                self.unresolved.push(UnresolvedReference {
                    resource: reference.clone(),
                    value,
                });
            }

            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&block.text);
            resource.state = ExportState::Rendered;
            summary.rendered += 1;
        }
        Ok(text)
    }

    /// Consume the session into the synthesized variables, the unresolved
    /// references and the resources.
    #[must_use]
    pub fn into_parts(self) -> (Vec<DiscoveredResource>, ReferenceMap, Variables, Vec<UnresolvedReference>) {
        (self.arena, self.references, self.variables, self.unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ListPage, MockOciClient};
    use crate::config::ExportOptions;
    use crate::registry::{QueryParam, RegistryBuilder, ResourceHint, StepBuilder};
    use crate::services::oci_core::DefaultResourceProcessor;
    use crate::services::PostProcessor;
    use crate::value::{attrs_from_json, Attributes};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> Registry {
        let mut builder = RegistryBuilder::new();
        builder
            .register(ResourceHint::new(ROOT_CLASS, "compartment", "identity"))
            .register(ResourceHint::new("oci_core_vcn", "vcn", "core").datasource("oci_core_vcns", "virtual_networks"))
            .register(
                ResourceHint::new("oci_core_subnet", "subnet", "core")
                    .datasource("oci_core_subnets", "subnets")
                    .lifecycle_states(&["AVAILABLE"]),
            );
        builder.add_step(
            StepBuilder::new("core")
                .child(ROOT_CLASS, "oci_core_vcn", &[])
                .child("oci_core_vcn", "oci_core_subnet", &[("vcn_id", QueryParam::parent("id"))]),
        );
        builder.freeze().unwrap()
    }

    fn client() -> MockOciClient {
        let mut mock = MockOciClient::new();
        mock.expect_list_data_source().returning(|request| {
            let items = match request.datasource_class.as_str() {
                "oci_core_vcns" => vec![
                    json!({"id": "ocid1.vcn.oc1..a", "display_name": "main", "compartment_id": "ocid1.compartment.oc1..root", "state": "AVAILABLE"}),
                    json!({"id": "ocid1.vcn.oc1..b", "display_name": "main", "state": "AVAILABLE"}),
                ],
                "oci_core_subnets" if request.params.get_str("vcn_id") == Some("ocid1.vcn.oc1..a") => vec![
                    json!({"id": "ocid1.subnet.oc1..s", "display_name": "web", "vcn_id": "ocid1.vcn.oc1..a", "state": "AVAILABLE"}),
                    json!({"id": "ocid1.subnet.oc1..gone", "display_name": "old", "vcn_id": "ocid1.vcn.oc1..a", "state": "TERMINATED"}),
                ],
                _ => Vec::new(),
            };
            Ok(ListPage {
                items: items.iter().map(attrs_from_json).collect(),
                next_page: None,
            })
        });
        mock
    }

    fn ctx<'a>(client: &'a MockOciClient, registry: &'a Registry, retry: &'a RetryOptions) -> StepContext<'a> {
        StepContext {
            client,
            registry,
            retry,
            continue_on_error: false,
        }
    }

    fn session(types: &[&str]) -> ExportSession {
        let options = ExportOptions {
            resource_types: types.iter().map(ToString::to_string).collect(),
            ..ExportOptions::default()
        };
        ExportSession::new("ocid1.compartment.oc1..root", ResourceFilter::new(&options).unwrap())
    }

    #[tokio::test]
    async fn test_step_walk_names_and_references() {
        let registry = registry();
        let client = client();
        let retry = RetryOptions::default();
        let ctx = StepContext {
            client: &client,
            registry: &registry,
            retry: &retry,
            continue_on_error: false,
        };

        let mut session = session(&[]);
        let output = session.run_step(&ctx, registry.step("core").unwrap()).await.unwrap();

        let names: Vec<_> = session.resources()[1..]
            .iter()
            .map(|r| r.terraform_reference())
            .collect();
        assert_eq!(
            names,
            vec!["oci_core_vcn.main", "oci_core_subnet.web", "oci_core_vcn.main_1"]
        );
        assert_eq!(output.summary.discovered, 3);
        assert_eq!(output.summary.rendered, 3);
        assert_eq!(output.summary.file.as_deref(), Some("core.tf"));
        assert!(output.text.contains("vcn_id = oci_core_vcn.main.id"));
        assert!(output.text.contains("compartment_id = var.compartment_ocid"));
        assert_eq!(session.references().get("ocid1.compartment.oc1..root"), Some("var.compartment_ocid"));
        assert!(session.unresolved().is_empty());
        assert!(session.resources()[1..]
            .iter()
            .all(|r| r.state == ExportState::Rendered));
    }

    #[tokio::test]
    async fn test_filtered_types_are_discovered_but_omitted() {
        let registry = registry();
        let client = client();
        let retry = RetryOptions::default();
        let ctx = StepContext {
            client: &client,
            registry: &registry,
            retry: &retry,
            continue_on_error: false,
        };

        let mut session = session(&["oci_core_subnet"]);
        let output = session.run_step(&ctx, registry.step("core").unwrap()).await.unwrap();
        assert_eq!(output.summary.omitted, 2);
        assert_eq!(output.summary.rendered, 1);
        assert!(output.text.starts_with("resource \"oci_core_subnet\" \"web\""));
        assert!(output.text.contains("vcn_id = oci_core_vcn.main.id"));
    }

    #[tokio::test]
    async fn test_continue_on_error_records_failure() {
        let registry = registry();
        let mut client = MockOciClient::new();
        client.expect_list_data_source().returning(|_| {
            Err(crate::client::ClientError::Transport {
                message: "reset".to_string(),
            })
        });
        let retry = RetryOptions::default();
        let mut ctx = StepContext {
            client: &client,
            registry: &registry,
            retry: &retry,
            continue_on_error: true,
        };

        let mut session = session(&[]);
        let output = session.run_step(&ctx, registry.step("core").unwrap()).await.unwrap();
        assert_eq!(output.summary.errors.len(), 1);
        assert!(output.summary.file.is_none());
        assert!(output.text.is_empty());

        ctx.continue_on_error = false;
        let mut session = self::session(&[]);
        assert!(session.run_step(&ctx, registry.step("core").unwrap()).await.is_err());
    }

    #[derive(Debug)]
    struct DropVcn(&'static str);

    #[async_trait]
    impl PostProcessor for DropVcn {
        fn name(&self) -> &'static str {
            "drop_vcn"
        }

        async fn retain(
            &self,
            _ctx: &mut ProcessContext<'_>,
            resources: Vec<DiscoveredResource>,
        ) -> Result<Vec<DiscoveredResource>> {
            Ok(resources.into_iter().filter(|r| r.id != self.0).collect())
        }
    }

    #[tokio::test]
    async fn test_dropped_resources_do_not_consume_names() {
        let mut builder = RegistryBuilder::new();
        let mut vcn = ResourceHint::new("oci_core_vcn", "vcn", "core").datasource("oci_core_vcns", "virtual_networks");
        vcn.post_processor = Some(Arc::new(DropVcn("ocid1.vcn.oc1..a")));
        builder
            .register(ResourceHint::new(ROOT_CLASS, "compartment", "identity"))
            .register(vcn);
        builder.add_step(StepBuilder::new("core").child(ROOT_CLASS, "oci_core_vcn", &[]));
        let registry = builder.freeze().unwrap();
        let client = client();
        let retry = RetryOptions::default();

        let mut session = session(&[]);
        let output = session
            .run_step(&ctx(&client, &registry, &retry), registry.step("core").unwrap())
            .await
            .unwrap();

        assert_eq!(output.summary.discovered, 1);
        assert_eq!(session.resources()[1].id, "ocid1.vcn.oc1..b");
        assert_eq!(session.resources()[1].terraform_reference(), "oci_core_vcn.main");
        assert_eq!(session.references().get("ocid1.vcn.oc1..a"), None);
    }

    fn default_list_registry() -> Registry {
        let mut builder = RegistryBuilder::new();
        let mut security_list = ResourceHint::new("oci_core_security_list", "security_list", "core")
            .datasource("oci_core_security_lists", "security_lists");
        security_list.post_processor = Some(Arc::new(DefaultResourceProcessor::ALL[0]));
        builder
            .register(ResourceHint::new(ROOT_CLASS, "compartment", "identity"))
            .register(ResourceHint::new("oci_core_vcn", "vcn", "core").datasource("oci_core_vcns", "virtual_networks"))
            .register(security_list);
        builder.add_step(
            StepBuilder::new("core")
                .child(ROOT_CLASS, "oci_core_vcn", &[])
                .child("oci_core_vcn", "oci_core_security_list", &[("vcn_id", QueryParam::parent("id"))]),
        );
        builder.freeze().unwrap()
    }

    fn default_list_client() -> MockOciClient {
        let mut mock = MockOciClient::new();
        mock.expect_list_data_source().returning(|request| {
            let items = match request.datasource_class.as_str() {
                "oci_core_vcns" => vec![json!({
                    "id": "ocid1.vcn.oc1..a",
                    "display_name": "main",
                    "default_security_list_id": "ocid1.securitylist.oc1..default"
                })],
                "oci_core_security_lists" => vec![
                    json!({"id": "ocid1.securitylist.oc1..default", "display_name": "Default", "vcn_id": "ocid1.vcn.oc1..a"}),
                    json!({"id": "ocid1.securitylist.oc1..web", "display_name": "web", "vcn_id": "ocid1.vcn.oc1..a"}),
                ],
                _ => Vec::new(),
            };
            Ok(ListPage {
                items: items.iter().map(attrs_from_json).collect(),
                next_page: None,
            })
        });
        mock
    }

    #[tokio::test]
    async fn test_type_filter_sees_reclassified_default_list() {
        let registry = default_list_registry();
        let client = default_list_client();
        let retry = RetryOptions::default();
        let ctx = ctx(&client, &registry, &retry);
        let step = registry.step("core").unwrap();

        let mut session = session(&["oci_core_default_security_list"]);
        let output = session.run_step(&ctx, step).await.unwrap();
        assert_eq!(output.summary.rendered, 1);
        assert!(output.text.starts_with("resource \"oci_core_default_security_list\" \"Default\""));

        let mut session = self::session(&["oci_core_security_list"]);
        let output = session.run_step(&ctx, step).await.unwrap();
        assert_eq!(output.summary.rendered, 1);
        assert!(output.text.starts_with("resource \"oci_core_security_list\" \"web\""));
        assert!(!output.text.contains("oci_core_default_security_list"));
    }
}
