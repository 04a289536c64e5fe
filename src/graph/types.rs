//! The in-memory graph model: nodes, connections, and cycle groups.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::core::value::ValueMap;

/// One node instance in a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique within the graph.
    pub id: String,
    /// Resolved against the node registry at execution time.
    pub node_type: String,
    /// Static parameter values fixed at graph-build time.
    #[serde(default)]
    pub config: ValueMap,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            config: ValueMap::new(),
        }
    }

    pub fn with_config(mut self, config: ValueMap) -> Self {
        self.config = config;
        self
    }
}

/// A directed data edge: one node's named output feeds another's named input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source_id: String,
    pub source_output: String,
    pub target_id: String,
    pub target_input: String,
}

impl Connection {
    pub fn new(
        source_id: impl Into<String>,
        source_output: impl Into<String>,
        target_id: impl Into<String>,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_output: source_output.into(),
            target_id: target_id.into(),
            target_input: target_input.into(),
        }
    }

    /// The legacy two-endpoint shape with no field names. Kept so old call
    /// sites still construct, but the validator rejects it (`CON002`) and
    /// it is never silently upgraded.
    pub fn pair(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            source_output: String::new(),
            target_id: target_id.into(),
            target_input: String::new(),
        }
    }

    pub fn is_legacy_pair(&self) -> bool {
        self.source_output.is_empty() || self.target_input.is_empty()
    }

    /// Short rendering for diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "{}.{} -> {}.{}",
            self.source_id, self.source_output, self.target_id, self.target_input
        )
    }
}

/// A named subgraph permitted to loop, with an explicit termination rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleGroup {
    pub name: String,
    /// The loop edges, in the order members execute each pass.
    pub member_connections: Vec<Connection>,
    /// Pass cap; first-to-trigger against `converge_when`.
    pub max_iterations: Option<u32>,
    /// Boolean expression over node outputs; ends the loop when true.
    pub converge_when: Option<String>,
    /// Wall-clock bound; exceeding it aborts the group and marks the run
    /// partially failed.
    pub timeout: Option<Duration>,
}

impl CycleGroup {
    pub fn builder(name: impl Into<String>) -> CycleGroupBuilder {
        CycleGroupBuilder::new(name)
    }

    /// Member node ids in execution order: each connection contributes its
    /// source then target, first occurrence wins.
    pub fn member_order(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for conn in &self.member_connections {
            for id in [&conn.source_id, &conn.target_id] {
                if seen.insert(id.clone()) {
                    order.push(id.clone());
                }
            }
        }
        order
    }
}

/// Staged builder for [`CycleGroup`] — owned, no shared mutable state.
pub struct CycleGroupBuilder {
    group: CycleGroup,
}

impl CycleGroupBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            group: CycleGroup {
                name: name.into(),
                member_connections: Vec::new(),
                max_iterations: None,
                converge_when: None,
                timeout: None,
            },
        }
    }

    /// Add a loop edge. Declaration order is execution order.
    pub fn connect(
        mut self,
        source_id: impl Into<String>,
        source_output: impl Into<String>,
        target_id: impl Into<String>,
        target_input: impl Into<String>,
    ) -> Self {
        self.group
            .member_connections
            .push(Connection::new(source_id, source_output, target_id, target_input));
        self
    }

    pub fn max_iterations(mut self, n: u32) -> Self {
        self.group.max_iterations = Some(n);
        self
    }

    pub fn converge_when(mut self, expr: impl Into<String>) -> Self {
        self.group.converge_when = Some(expr.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.group.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> CycleGroup {
        self.group
    }
}

/// The complete unit of work handed to the engine.
///
/// `connections` holds only the acyclic edges; loop edges live inside
/// their [`CycleGroup`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<NodeSpec>,
    pub connections: Vec<Connection>,
    pub cycle_groups: Vec<CycleGroup>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Plain (non-loop) connections into `node_id`.
    pub fn inbound_connections(&self, node_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.target_id == node_id)
            .collect()
    }

    /// Plain (non-loop) connections out of `node_id`.
    pub fn outbound_connections(&self, node_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.source_id == node_id)
            .collect()
    }

    /// Node ids that belong to some cycle group.
    pub fn cycle_member_ids(&self) -> HashSet<String> {
        self.cycle_groups
            .iter()
            .flat_map(|g| g.member_order())
            .collect()
    }

    /// Nodes with no outgoing edge at all (plain or loop): the terminal
    /// frontier used for run-status derivation.
    pub fn sink_node_ids(&self) -> Vec<String> {
        let mut with_outgoing: HashSet<&str> = self
            .connections
            .iter()
            .map(|c| c.source_id.as_str())
            .collect();
        for group in &self.cycle_groups {
            for conn in &group.member_connections {
                with_outgoing.insert(conn.source_id.as_str());
            }
        }
        self.nodes
            .iter()
            .filter(|n| !with_outgoing.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_order_dedups_preserving_declaration() {
        let group = CycleGroup::builder("loop")
            .connect("gen", "draft", "critic", "draft")
            .connect("critic", "feedback", "gen", "feedback")
            .build();
        assert_eq!(group.member_order(), vec!["gen", "critic"]);
    }

    #[test]
    fn test_member_order_self_loop() {
        let group = CycleGroup::builder("self")
            .connect("acc", "total", "acc", "total")
            .max_iterations(3)
            .build();
        assert_eq!(group.member_order(), vec!["acc"]);
    }

    #[test]
    fn test_legacy_pair_detection() {
        assert!(Connection::pair("a", "b").is_legacy_pair());
        assert!(!Connection::new("a", "out", "b", "in").is_legacy_pair());
    }

    #[test]
    fn test_sink_nodes_exclude_cycle_sources() {
        let graph = Graph {
            nodes: vec![
                NodeSpec::new("a", "t"),
                NodeSpec::new("b", "t"),
                NodeSpec::new("c", "t"),
            ],
            connections: vec![Connection::new("a", "out", "b", "in")],
            cycle_groups: vec![CycleGroup::builder("g")
                .connect("b", "x", "c", "x")
                .connect("c", "y", "b", "y")
                .max_iterations(2)
                .build()],
        };
        // Every node has an outgoing edge somewhere, so no sinks.
        assert!(graph.sink_node_ids().is_empty());
    }

    #[test]
    fn test_inbound_outbound() {
        let graph = Graph {
            nodes: vec![NodeSpec::new("a", "t"), NodeSpec::new("b", "t")],
            connections: vec![Connection::new("a", "out", "b", "in")],
            cycle_groups: vec![],
        };
        assert_eq!(graph.inbound_connections("b").len(), 1);
        assert_eq!(graph.outbound_connections("a").len(), 1);
        assert!(graph.inbound_connections("a").is_empty());
    }
}
