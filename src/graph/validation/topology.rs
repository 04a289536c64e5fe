//! Acyclicity outside cycle groups (CON005).
//!
//! Depth-first search over the plain connections only; loop edges are
//! exempt by construction because they live inside their cycle group.

use std::collections::HashMap;

use crate::graph::types::Graph;

use super::types::Diagnostic;

pub(super) fn validate(graph: &Graph) -> Vec<Diagnostic> {
    let mut out_edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in &graph.nodes {
        out_edges.entry(node.id.as_str()).or_default();
    }
    for conn in &graph.connections {
        // Dangling endpoints are reported elsewhere; only walk real nodes.
        if graph.has_node(&conn.source_id) && graph.has_node(&conn.target_id) {
            out_edges
                .entry(conn.source_id.as_str())
                .or_default()
                .push(conn.target_id.as_str());
        }
    }

    let mut diags = Vec::new();
    let mut state: HashMap<&str, u8> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();

    let mut roots: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    roots.sort();
    for node in roots {
        if state.get(node).copied().unwrap_or(0) == 0 {
            dfs(node, &out_edges, &mut state, &mut stack, &mut diags);
        }
    }

    diags
}

fn dfs<'a>(
    node: &'a str,
    out_edges: &HashMap<&'a str, Vec<&'a str>>,
    state: &mut HashMap<&'a str, u8>,
    stack: &mut Vec<&'a str>,
    diags: &mut Vec<Diagnostic>,
) {
    state.insert(node, 1);
    stack.push(node);

    if let Some(nexts) = out_edges.get(node) {
        for &next in nexts {
            match state.get(next).copied().unwrap_or(0) {
                0 => dfs(next, out_edges, state, stack, diags),
                1 => {
                    if let Some(pos) = stack.iter().position(|&n| n == next) {
                        let mut path: Vec<&str> = stack[pos..].to_vec();
                        path.push(next);
                        diags.push(
                            Diagnostic::error(
                                "CON005",
                                format!(
                                    "Cycle outside any cycle group: {}",
                                    path.join(" -> ")
                                ),
                            )
                            .at_node((*next).to_string()),
                        );
                    }
                }
                _ => {}
            }
        }
    }

    stack.pop();
    state.insert(node, 2);
}
