//! Resource metadata registry.
//!
//! The registry maps every exportable resource class to its [`ResourceHint`]
//! and holds the per-step association graphs walked by the exporter.
//!
//! It is assembled once through a [`RegistryBuilder`]: the catalog registers
//! plain hints and step graphs, service modules then patch individual hints
//! with their strategies, and [`RegistryBuilder::freeze`] validates the
//! graphs and produces an immutable [`Registry`].
//!
//! ```rust
//! use oci_discovery::registry::Registry;
//!
//! let registry = Registry::builtin().unwrap();
//! let hint = registry.lookup("oci_core_vcn").unwrap();
//! assert_eq!(hint.abbreviation, "vcn");
//! ```

pub mod catalog;
mod hint;

pub use hint::{QueryParam, ResourceAssociation, ResourceGraph, ResourceHint};

use crate::err;
use crate::error::Result;
use crate::graph::AssociationGraph;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Class of the resource every step starts from.
pub const ROOT_CLASS: &str = "oci_identity_compartment";

#[derive(Debug, Clone)]
struct AssociationSpec {
    parent: String,
    child: String,
    query_params: BTreeMap<String, QueryParam>,
}

/// Declares the association graph of one export step.
#[derive(Debug, Clone)]
pub struct StepBuilder {
    name: String,
    associations: Vec<AssociationSpec>,
}

impl StepBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            associations: Vec::new(),
        }
    }

    /// Add `child` under `parent`. Children of one parent are discovered in
    /// the order they are added.
    #[must_use]
    pub fn child(mut self, parent: &str, child: &str, params: &[(&str, QueryParam)]) -> Self {
        self.associations.push(AssociationSpec {
            parent: parent.to_string(),
            child: child.to_string(),
            query_params: params
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        });
        self
    }
}

/// A named export phase and its association graph.
#[derive(Debug, Clone)]
pub struct ExportStep {
    pub name: String,
    pub root_class: String,
    pub graph: ResourceGraph,
}

impl ExportStep {
    /// Child associations of `class`, in discovery order.
    #[must_use]
    pub fn children(&self, class: &str) -> &[ResourceAssociation] {
        self.graph.get(class).map_or(&[], Vec::as_slice)
    }

    /// Output file for the step.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.tf", self.name)
    }

    /// Classes reachable from the root, in depth-first discovery order.
    #[must_use]
    pub fn classes(&self) -> Vec<&str> {
        fn walk<'a>(step: &'a ExportStep, class: &str, out: &mut Vec<&'a str>) {
            for association in step.children(class) {
                out.push(association.resource_class());
                walk(step, association.resource_class(), out);
            }
        }

        let mut out = Vec::new();
        walk(self, &self.root_class, &mut out);
        out
    }
}

/// Mutable registry under construction.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    hints: BTreeMap<String, ResourceHint>,
    steps: Vec<StepBuilder>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hint. A second registration of a class replaces the first.
    pub fn register(&mut self, hint: ResourceHint) -> &mut Self {
        if self.hints.contains_key(&hint.resource_class) {
            warn!(class = %hint.resource_class, "Replacing registered resource hint");
        }
        self.hints.insert(hint.resource_class.clone(), hint);
        self
    }

    /// Modify a registered hint in place.
    pub fn patch(&mut self, class: &str, update: impl FnOnce(&mut ResourceHint)) -> Result<&mut Self> {
        let hint = self.hints.get_mut(class).ok_or_else(|| {
            err!(HintNotFound {
                resource_class: class.to_string(),
            })
        })?;
        update(hint);
        Ok(self)
    }

    pub fn add_step(&mut self, step: StepBuilder) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Resolve every association against the registered hints and check
    /// that no step graph contains a cycle.
    pub fn freeze(self) -> Result<Registry> {
        let hints: BTreeMap<String, Arc<ResourceHint>> = self
            .hints
            .into_iter()
            .map(|(class, hint)| (class, Arc::new(hint)))
            .collect();

        let resolve = |class: &str| {
            hints.get(class).cloned().ok_or_else(|| {
                err!(HintNotFound {
                    resource_class: class.to_string(),
                })
            })
        };

        let mut steps = Vec::with_capacity(self.steps.len());
        for step in self.steps {
            resolve(ROOT_CLASS)?;
            let mut graph = ResourceGraph::new();
            for spec in step.associations {
                resolve(&spec.parent)?;
                let association = ResourceAssociation {
                    hint: resolve(&spec.child)?,
                    query_params: spec.query_params,
                };
                graph.entry(spec.parent).or_default().push(association);
            }

            let export_step = ExportStep {
                name: step.name,
                root_class: ROOT_CLASS.to_string(),
                graph,
            };

            if let Some(cycle) = AssociationGraph::from_step(&export_step).find_cycle() {
                return Err(err!(CircularDependency {
                    step: export_step.name.clone(),
                    cycle: cycle.join(" -> "),
                }));
            }

            debug!(step = %export_step.name, classes = export_step.classes().len(), "Registered export step");
            steps.push(export_step);
        }

        Ok(Registry { hints, steps })
    }
}

/// Immutable registry of hints and export steps.
#[derive(Debug, Clone)]
pub struct Registry {
    hints: BTreeMap<String, Arc<ResourceHint>>,
    steps: Vec<ExportStep>,
}

impl Registry {
    /// The built-in catalog with every service hook installed.
    pub fn builtin() -> Result<Self> {
        let mut builder = RegistryBuilder::new();
        catalog::register(&mut builder);
        crate::services::register_all(&mut builder)?;
        builder.freeze()
    }

    /// Look up the hint of a resource class.
    pub fn lookup(&self, class: &str) -> Result<&ResourceHint> {
        self.hints.get(class).map(AsRef::as_ref).ok_or_else(|| {
            err!(HintNotFound {
                resource_class: class.to_string(),
            })
        })
    }

    /// All hints, ordered by class.
    pub fn hints(&self) -> impl Iterator<Item = &ResourceHint> {
        self.hints.values().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn steps(&self) -> &[ExportStep] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Result<&ExportStep> {
        self.steps.iter().find(|s| s.name == name).ok_or_else(|| {
            err!(StepNotFound {
                step: name.to_string(),
            })
        })
    }

    /// Step the class is discovered in, if any.
    #[must_use]
    pub fn step_of(&self, class: &str) -> Option<&ExportStep> {
        self.steps
            .iter()
            .find(|step| step.graph.values().flatten().any(|a| a.resource_class() == class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OciDiscoveryError;

    fn builder_with(classes: &[&str]) -> RegistryBuilder {
        let mut builder = RegistryBuilder::new();
        builder.register(ResourceHint::new(ROOT_CLASS, "compartment", "identity"));
        for class in classes {
            builder.register(ResourceHint::new(class, "x", "core"));
        }
        builder
    }

    #[test]
    fn test_lookup_unknown_class() {
        let registry = builder_with(&[]).freeze().unwrap();
        assert!(matches!(
            registry.lookup("oci_core_nothing"),
            Err(OciDiscoveryError::HintNotFound { .. })
        ));
    }

    #[test]
    fn test_freeze_rejects_unknown_child() {
        let mut builder = builder_with(&[]);
        builder.add_step(StepBuilder::new("core").child(ROOT_CLASS, "oci_core_vcn", &[]));
        assert!(matches!(builder.freeze(), Err(OciDiscoveryError::HintNotFound { .. })));
    }

    #[test]
    fn test_freeze_rejects_cycles() {
        let mut builder = builder_with(&["a", "b"]);
        builder.add_step(
            StepBuilder::new("loop")
                .child(ROOT_CLASS, "a", &[])
                .child("a", "b", &[])
                .child("b", "a", &[]),
        );
        match builder.freeze() {
            Err(OciDiscoveryError::CircularDependency { step, cycle, .. }) => {
                assert_eq!(step, "loop");
                assert!(cycle.contains('a') && cycle.contains('b'));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_patch_and_order() {
        let mut builder = builder_with(&["oci_core_vcn", "oci_core_subnet", "oci_core_route_table"]);
        builder
            .patch("oci_core_vcn", |hint| hint.always_exportable = true)
            .unwrap();
        assert!(builder.patch("missing", |_| {}).is_err());
        builder.add_step(
            StepBuilder::new("core")
                .child(ROOT_CLASS, "oci_core_vcn", &[])
                .child("oci_core_vcn", "oci_core_subnet", &[("vcn_id", QueryParam::parent("id"))])
                .child("oci_core_vcn", "oci_core_route_table", &[("vcn_id", QueryParam::parent("id"))]),
        );

        let registry = builder.freeze().unwrap();
        assert!(registry.lookup("oci_core_vcn").unwrap().always_exportable);
        let step = registry.step("core").unwrap();
        assert_eq!(step.classes(), vec!["oci_core_vcn", "oci_core_subnet", "oci_core_route_table"]);
        assert_eq!(step.file_name(), "core.tf");
        assert_eq!(registry.step_of("oci_core_subnet").map(|s| s.name.as_str()), Some("core"));
        assert!(registry.step("missing").is_err());
    }

    #[test]
    fn test_builtin_registry() {
        let registry = Registry::builtin().unwrap();
        let names: Vec<_> = registry.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "availability_domain",
                "identity",
                "core",
                "database",
                "load_balancer",
                "object_storage",
                "containerengine",
                "health_checks"
            ]
        );
        assert!(registry.lookup("oci_identity_availability_domain").unwrap().always_exportable);
        assert!(registry.lookup("oci_objectstorage_namespace").unwrap().renderer.is_some());
        assert!(registry.lookup("oci_load_balancer_listener").unwrap().discoverer.is_some());
        assert!(registry.lookup("oci_identity_tag").unwrap().discoverer.is_some());
        assert!(registry.lookup("oci_objectstorage_bucket").unwrap().id_generator.is_some());
    }
}
