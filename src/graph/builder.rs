//! Programmatic graph construction.

use std::collections::HashSet;

use crate::core::value::ValueMap;
use crate::error::{EngineError, EngineResult};

use super::types::{Connection, CycleGroup, Graph, NodeSpec};

/// Accumulates nodes, connections, and cycle groups into a [`Graph`].
///
/// Structural mistakes a caller cannot meaningfully recover from —
/// duplicate node ids, duplicate group names — fail `build` immediately.
/// Everything else (dangling endpoints, missing parameters, illegal
/// cycles) is the validator's job so it can be reported in one batch.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<NodeSpec>,
    connections: Vec<Connection>,
    cycle_groups: Vec<CycleGroup>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with an empty config.
    pub fn add_node(self, id: impl Into<String>, node_type: impl Into<String>) -> Self {
        self.add_node_with_config(id, node_type, ValueMap::new())
    }

    pub fn add_node_with_config(
        mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        config: ValueMap,
    ) -> Self {
        self.nodes.push(NodeSpec::new(id, node_type).with_config(config));
        self
    }

    pub fn add_node_spec(mut self, spec: NodeSpec) -> Self {
        self.nodes.push(spec);
        self
    }

    /// Wire `source_id.source_output` into `target_id.target_input`.
    pub fn connect(
        mut self,
        source_id: impl Into<String>,
        source_output: impl Into<String>,
        target_id: impl Into<String>,
        target_input: impl Into<String>,
    ) -> Self {
        self.connections
            .push(Connection::new(source_id, source_output, target_id, target_input));
        self
    }

    pub fn add_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn add_cycle_group(mut self, group: CycleGroup) -> Self {
        self.cycle_groups.push(group);
        self
    }

    pub fn build(self) -> EngineResult<Graph> {
        let mut seen_ids = HashSet::new();
        for node in &self.nodes {
            if !seen_ids.insert(node.id.as_str()) {
                return Err(EngineError::DuplicateNodeId(node.id.clone()));
            }
        }

        let mut seen_groups = HashSet::new();
        for group in &self.cycle_groups {
            if !seen_groups.insert(group.name.as_str()) {
                return Err(EngineError::DuplicateCycleGroup(group.name.clone()));
            }
        }

        Ok(Graph {
            nodes: self.nodes,
            connections: self.connections,
            cycle_groups: self.cycle_groups,
        })
    }
}
