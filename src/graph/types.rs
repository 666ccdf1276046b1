//! Graph type definitions.
//!
//! - `AssociationGraph`: petgraph view of one export step
//! - `ClassNode`: a resource class in the step
//! - `QueryEdge`: parent → child association with its query mapping

use crate::registry::{ExportStep, QueryParam};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A resource class in an association graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassNode {
    /// Terraform resource class
    pub class: String,
    /// Owning service
    pub service: String,
    /// Exported regardless of resource type filters
    pub always_exportable: bool,
    /// Custom strategies installed on the hint
    pub strategies: Vec<&'static str>,
}

/// Association from a parent class to a child class.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryEdge {
    /// Child query parameter → source
    pub params: BTreeMap<String, QueryParam>,
}

impl fmt::Display for QueryEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .params
            .iter()
            .map(|(key, source)| match source {
                QueryParam::FromParent(attr) => format!("{key}={attr}"),
                QueryParam::Fixed(value) => format!("{key}:{value}"),
            })
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Directed graph of the classes of one step.
///
/// ```text
/// AssociationGraph
/// ├── inner: DiGraph<ClassNode, QueryEdge>
/// └── node_index: HashMap<class, NodeIndex>
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssociationGraph {
    step: String,
    inner: DiGraph<ClassNode, QueryEdge>,
    node_index: HashMap<String, NodeIndex>,
}

impl AssociationGraph {
    #[must_use]
    pub fn new(step: &str) -> Self {
        Self {
            step: step.to_string(),
            ..Self::default()
        }
    }

    /// Build the graph of an export step.
    #[must_use]
    pub fn from_step(step: &ExportStep) -> Self {
        let mut graph = Self::new(&step.name);
        graph.add_class(ClassNode {
            class: step.root_class.clone(),
            service: "identity".to_string(),
            always_exportable: false,
            strategies: Vec::new(),
        });

        for associations in step.graph.values() {
            for association in associations {
                let hint = &association.hint;
                let mut strategies = Vec::new();
                if hint.discoverer.is_some() {
                    strategies.push("discoverer");
                }
                if hint.post_processor.is_some() {
                    strategies.push("post_processor");
                }
                if hint.id_generator.is_some() {
                    strategies.push("id_generator");
                }
                if hint.renderer.is_some() {
                    strategies.push("renderer");
                }

                graph.add_class(ClassNode {
                    class: hint.resource_class.clone(),
                    service: hint.service.clone(),
                    always_exportable: hint.always_exportable,
                    strategies,
                });
            }
        }

        for (parent, associations) in &step.graph {
            for association in associations {
                let hint = &association.hint;
                graph.add_edge(
                    parent,
                    &hint.resource_class,
                    QueryEdge {
                        params: association.query_params.clone(),
                    },
                );
            }
        }
        graph
    }

    /// Add a class node. Returns false when the class is already present.
    pub fn add_class(&mut self, node: ClassNode) -> bool {
        if self.node_index.contains_key(&node.class) {
            return false;
        }
        let class = node.class.clone();
        let idx = self.inner.add_node(node);
        self.node_index.insert(class, idx);
        true
    }

    /// Add an edge between two known classes.
    pub fn add_edge(&mut self, parent: &str, child: &str, edge: QueryEdge) -> bool {
        let (Some(&from), Some(&to)) = (self.node_index.get(parent), self.node_index.get(child)) else {
            return false;
        };
        self.inner.add_edge(from, to, edge);
        true
    }

    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ClassNode> {
        self.inner.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&ClassNode, &ClassNode, &QueryEdge)> {
        self.inner
            .edge_references()
            .map(|e| (&self.inner[e.source()], &self.inner[e.target()], e.weight()))
    }

    /// Classes of the first cycle found, closed (first class repeated last).
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        for component in tarjan_scc(&self.inner) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| self.inner.find_edge(n, n).is_some());
            if is_cycle {
                let mut classes: Vec<String> = component
                    .iter()
                    .rev()
                    .map(|&n| self.inner[n].class.clone())
                    .collect();
                if let Some(first) = classes.first().cloned() {
                    classes.push(first);
                }
                return Some(classes);
            }
        }
        None
    }
}
