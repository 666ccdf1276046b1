//! Graph export functionality.
//!
//! Renders association graphs for visualization and tooling.

use crate::err;
use crate::error::Result;
use crate::graph::types::AssociationGraph;
use crate::types::GraphFormat;
use serde::Serialize;

/// Export one step graph in the given format.
///
/// # Supported Formats
///
/// - **DOT**: Graphviz DOT format for visualization
/// - **JSON**: Structured JSON for programmatic access
/// - **Mermaid**: Mermaid diagram syntax for documentation
///
/// ```rust
/// use oci_discovery::graph::{export_graph, AssociationGraph};
/// use oci_discovery::registry::Registry;
/// use oci_discovery::types::GraphFormat;
///
/// let registry = Registry::builtin().unwrap();
/// let graph = AssociationGraph::from_step(registry.step("core").unwrap());
/// let dot = export_graph(&graph, GraphFormat::Dot).unwrap();
/// assert!(dot.contains("oci_core_vcn"));
/// ```
pub fn export_graph(graph: &AssociationGraph, format: GraphFormat) -> Result<String> {
    match format {
        GraphFormat::Dot => Ok(export_dot(graph)),
        GraphFormat::Json => export_json(graph),
        GraphFormat::Mermaid => Ok(export_mermaid(graph)),
    }
}

fn export_dot(graph: &AssociationGraph) -> String {
    let mut dot = String::new();
    dot.push_str(&format!("digraph \"{}\" {{\n", escape_dot_string(graph.step_name())));
    dot.push_str("    rankdir=LR;\n");
    dot.push_str("    node [shape=box, style=rounded];\n\n");

    for node in graph.nodes() {
        let fill = if node.always_exportable {
            "lightgreen"
        } else if node.strategies.is_empty() {
            "white"
        } else {
            "lightblue"
        };
        let label = if node.strategies.is_empty() {
            escape_dot_string(&node.class)
        } else {
            escape_dot_string(&format!("{}\n[{}]", node.class, node.strategies.join(", ")))
        };
        dot.push_str(&format!(
            "    \"{}\" [label=\"{label}\", fillcolor={fill}, style=\"rounded,filled\"];\n",
            node.class
        ));
    }
    dot.push('\n');

    for (from, to, edge) in graph.edges() {
        let label = edge.to_string();
        if label.is_empty() {
            dot.push_str(&format!("    \"{}\" -> \"{}\";\n", from.class, to.class));
        } else {
            dot.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
                from.class,
                to.class,
                escape_dot_string(&label)
            ));
        }
    }

    dot.push_str("}\n");
    dot
}

fn export_json(graph: &AssociationGraph) -> Result<String> {
    #[derive(Serialize)]
    struct JsonGraph<'a> {
        step: &'a str,
        nodes: Vec<&'a super::ClassNode>,
        edges: Vec<JsonEdge<'a>>,
        metadata: JsonMetadata,
    }

    #[derive(Serialize)]
    struct JsonEdge<'a> {
        from: &'a str,
        to: &'a str,
        params: &'a std::collections::BTreeMap<String, crate::registry::QueryParam>,
    }

    #[derive(Serialize)]
    struct JsonMetadata {
        total_nodes: usize,
        total_edges: usize,
    }

    let json_graph = JsonGraph {
        step: graph.step_name(),
        nodes: graph.nodes().collect(),
        edges: graph
            .edges()
            .map(|(from, to, edge)| JsonEdge {
                from: &from.class,
                to: &to.class,
                params: &edge.params,
            })
            .collect(),
        metadata: JsonMetadata {
            total_nodes: graph.node_count(),
            total_edges: graph.edge_count(),
        },
    };

    serde_json::to_string_pretty(&json_graph).map_err(|e| {
        err!(ReportGeneration {
            message: format!("Failed to serialize graph to JSON: {e}"),
        })
    })
}

fn export_mermaid(graph: &AssociationGraph) -> String {
    let mut mermaid = String::new();
    mermaid.push_str("graph LR\n");
    mermaid.push_str(&format!("    %% step: {}\n\n", graph.step_name()));

    for node in graph.nodes() {
        let id = sanitize_mermaid_id(&node.class);
        let label = escape_mermaid_string(&node.class);
        if node.always_exportable {
            mermaid.push_str(&format!("    {id}((\"{label}\"))\n"));
        } else {
            mermaid.push_str(&format!("    {id}[\"{label}\"]\n"));
        }
    }
    mermaid.push('\n');

    for (from, to, edge) in graph.edges() {
        let from_id = sanitize_mermaid_id(&from.class);
        let to_id = sanitize_mermaid_id(&to.class);
        let label = edge.to_string();
        if label.is_empty() {
            mermaid.push_str(&format!("    {from_id} --> {to_id}\n"));
        } else {
            mermaid.push_str(&format!(
                "    {from_id} -->|\"{}\"| {to_id}\n",
                escape_mermaid_string(&label)
            ));
        }
    }

    let custom: Vec<String> = graph
        .nodes()
        .filter(|n| !n.strategies.is_empty())
        .map(|n| sanitize_mermaid_id(&n.class))
        .collect();
    if !custom.is_empty() {
        mermaid.push_str("\n    classDef custom fill:#e1f5fe,stroke:#01579b\n");
        mermaid.push_str(&format!("    class {} custom\n", custom.join(",")));
    }

    mermaid
}

/// Escape a string for use in DOT labels.
fn escape_dot_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Sanitize a string for use as a Mermaid node ID.
fn sanitize_mermaid_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Escape a string for use in Mermaid labels.
fn escape_mermaid_string(s: &str) -> String {
    s.replace('"', "'").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn load_balancer_graph() -> AssociationGraph {
        let registry = Registry::builtin().unwrap();
        AssociationGraph::from_step(registry.step("load_balancer").unwrap())
    }

    #[test]
    fn test_export_dot() {
        let dot = export_dot(&load_balancer_graph());
        assert!(dot.contains("digraph \"load_balancer\""));
        assert!(dot.contains("\"oci_load_balancer_backend_set\" -> \"oci_load_balancer_backend\""));
        assert!(dot.contains("backendset_name=name"));
    }

    #[test]
    fn test_export_json() {
        let json = export_json(&load_balancer_graph()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["step"], "load_balancer");
        assert_eq!(parsed["metadata"]["total_nodes"], 9);
        assert_eq!(parsed["metadata"]["total_edges"], 8);
    }

    #[test]
    fn test_export_mermaid() {
        let mermaid = export_mermaid(&load_balancer_graph());
        assert!(mermaid.starts_with("graph LR"));
        assert!(mermaid.contains("oci_load_balancer_listener"));
        assert!(mermaid.contains("class "));
    }

    #[test]
    fn test_escape_dot_string() {
        assert_eq!(escape_dot_string("hello\nworld"), "hello\\nworld");
        assert_eq!(escape_dot_string("say \"hi\""), "say \\\"hi\\\"");
    }

    #[test]
    fn test_sanitize_mermaid_id() {
        assert_eq!(sanitize_mermaid_id("oci_core_vcn.vcn-1"), "oci_core_vcn_vcn_1");
    }
}
