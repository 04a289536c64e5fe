//! Node parameter completeness (PAR004).

use std::collections::HashSet;

use crate::graph::types::Graph;
use crate::registry::NodeRegistry;

use super::types::Diagnostic;

/// Every required parameter of every node must be covered by its static
/// config or by an inbound connection (plain or loop edge).
pub(super) fn validate(graph: &Graph, registry: &NodeRegistry) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    for node in &graph.nodes {
        let required = registry.required_parameters(&node.node_type);
        if required.is_empty() {
            continue;
        }

        let mut supplied: HashSet<&str> = node.config.keys().map(String::as_str).collect();
        for conn in graph.inbound_connections(&node.id) {
            supplied.insert(conn.target_input.as_str());
        }
        for group in &graph.cycle_groups {
            for conn in &group.member_connections {
                if conn.target_id == node.id {
                    supplied.insert(conn.target_input.as_str());
                }
            }
        }

        let mut missing: Vec<&String> =
            required.iter().filter(|p| !supplied.contains(p.as_str())).collect();
        missing.sort();
        for param in missing {
            diags.push(
                Diagnostic::error(
                    "PAR004",
                    format!(
                        "Node '{}' is missing required parameter '{}': not in config and no inbound connection supplies it",
                        node.id, param
                    ),
                )
                .at_node(node.id.clone()),
            );
        }
    }

    diags
}
