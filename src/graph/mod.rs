//! Association Graph Module
//!
//! Every export step walks a graph of resource classes rooted at the
//! compartment being exported. Edges go from a parent class to a child class
//! and carry the mapping from the child's data source query parameters to
//! parent attributes or fixed values.
//!
//! ```text
//! ┌──────────────────────────┐
//! │ oci_identity_compartment │
//! └────────────┬─────────────┘
//!              ▼
//!      ┌──────────────┐  vcn_id=id   ┌─────────────────┐
//!      │ oci_core_vcn │─────────────▶│ oci_core_subnet │
//!      └──────────────┘              └─────────────────┘
//! ```
//!
//! The registry builds one [`AssociationGraph`] per step when it is frozen
//! and rejects cycles, so the exporter's depth-first walk always terminates.
//! The same graph is exported to DOT, JSON or Mermaid by the `graph`
//! subcommand.
//!
//! ```rust
//! use oci_discovery::graph::{export_graph, AssociationGraph};
//! use oci_discovery::registry::Registry;
//! use oci_discovery::types::GraphFormat;
//!
//! let registry = Registry::builtin().unwrap();
//! for step in registry.steps() {
//!     let graph = AssociationGraph::from_step(step);
//!     assert!(graph.find_cycle().is_none());
//!     let mermaid = export_graph(&graph, GraphFormat::Mermaid).unwrap();
//!     assert!(mermaid.starts_with("graph LR"));
//! }
//! ```

mod export;
mod types;

pub use export::export_graph;
pub use types::{AssociationGraph, ClassNode, QueryEdge};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{QueryParam, Registry};
    use std::collections::BTreeMap;

    #[test]
    fn test_builtin_steps_are_acyclic() {
        let registry = Registry::builtin().unwrap();
        for step in registry.steps() {
            let graph = AssociationGraph::from_step(step);
            assert!(graph.find_cycle().is_none(), "cycle in {}", step.name);
            assert_eq!(graph.node_count(), step.classes().len() + 1);
        }
    }

    #[test]
    fn test_find_self_loop() {
        let mut graph = AssociationGraph::new("test");
        graph.add_class(ClassNode {
            class: "a".to_string(),
            service: "core".to_string(),
            always_exportable: false,
            strategies: Vec::new(),
        });
        assert!(graph.find_cycle().is_none());
        assert!(graph.add_edge("a", "a", QueryEdge::default()));
        assert_eq!(graph.find_cycle(), Some(vec!["a".to_string(), "a".to_string()]));
    }

    #[test]
    fn test_edge_display() {
        let mut params = BTreeMap::new();
        params.insert("load_balancer_id".to_string(), QueryParam::parent("load_balancer_id"));
        params.insert("backendset_name".to_string(), QueryParam::parent("name"));
        let edge = QueryEdge { params };
        assert_eq!(edge.to_string(), "backendset_name=name, load_balancer_id=load_balancer_id");

        let mut params = BTreeMap::new();
        params.insert("include_subcompartments".to_string(), QueryParam::fixed(false));
        assert_eq!(QueryEdge { params }.to_string(), "include_subcompartments:false");
    }
}
