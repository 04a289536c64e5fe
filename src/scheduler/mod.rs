//! Dependency resolution and wave scheduling.
//!
//! The scheduler flattens a validated [`Graph`] into an [`ExecutionPlan`]:
//! a sequence of waves, each holding schedule units with no ordering
//! constraint among them. Plain nodes are their own unit; every cycle
//! group is one opaque unit placed by the union of its members'
//! dependencies, and loops internally under the executor's control.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use crate::error::{EngineError, EngineResult};
use crate::graph::types::Graph;

/// One schedulable unit: a plain node or a whole cycle group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleUnit {
    Node(String),
    Group(String),
}

impl std::fmt::Display for ScheduleUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleUnit::Node(id) => write!(f, "node:{}", id),
            ScheduleUnit::Group(name) => write!(f, "group:{}", name),
        }
    }
}

/// Waves in execution order. Units within a wave may run concurrently.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub waves: Vec<Vec<ScheduleUnit>>,
}

impl ExecutionPlan {
    pub fn unit_count(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }
}

/// Compute the wave plan.
///
/// Fails with [`EngineError::CircularDependency`] if a true cycle survives
/// among the units — defense in depth; unreachable when validation ran.
pub fn build_plan(graph: &Graph) -> EngineResult<ExecutionPlan> {
    // Map each cycle member to its owning group; first declaration wins.
    let mut owner: HashMap<String, String> = HashMap::new();
    for group in &graph.cycle_groups {
        for id in group.member_order() {
            owner.entry(id).or_insert_with(|| group.name.clone());
        }
    }

    let mut dag: DiGraph<ScheduleUnit, ()> = DiGraph::new();
    let mut index_of: HashMap<ScheduleUnit, NodeIndex> = HashMap::new();

    let unit_for = |node_id: &str| -> ScheduleUnit {
        match owner.get(node_id) {
            Some(group) => ScheduleUnit::Group(group.clone()),
            None => ScheduleUnit::Node(node_id.to_string()),
        }
    };

    // Units in node-declaration order keeps waves deterministic.
    for node in &graph.nodes {
        let unit = unit_for(&node.id);
        if !index_of.contains_key(&unit) {
            let idx = dag.add_node(unit.clone());
            index_of.insert(unit, idx);
        }
    }

    let mut seen_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    for conn in &graph.connections {
        if !graph.has_node(&conn.source_id) || !graph.has_node(&conn.target_id) {
            continue;
        }
        let u = index_of[&unit_for(&conn.source_id)];
        let v = index_of[&unit_for(&conn.target_id)];
        if u != v && seen_edges.insert((u, v)) {
            dag.add_edge(u, v, ());
        }
    }

    if petgraph::algo::is_cyclic_directed(&dag) {
        return Err(EngineError::CircularDependency(
            "cycle among schedule units outside any cycle group".to_string(),
        ));
    }

    // Kahn layering: each round of zero-in-degree units is one wave.
    let mut in_degree: HashMap<NodeIndex, usize> = dag
        .node_indices()
        .map(|idx| {
            (
                idx,
                dag.neighbors_directed(idx, petgraph::Direction::Incoming).count(),
            )
        })
        .collect();

    let mut waves = Vec::new();
    let mut remaining: usize = dag.node_count();
    while remaining > 0 {
        let mut wave_indices: Vec<NodeIndex> = dag
            .node_indices()
            .filter(|idx| in_degree.get(idx) == Some(&0))
            .collect();
        if wave_indices.is_empty() {
            return Err(EngineError::CircularDependency(
                "no ready schedule unit; dependency graph is not a DAG".to_string(),
            ));
        }
        wave_indices.sort();

        for idx in &wave_indices {
            in_degree.remove(idx);
            for next in dag.neighbors_directed(*idx, petgraph::Direction::Outgoing) {
                if let Some(d) = in_degree.get_mut(&next) {
                    *d = d.saturating_sub(1);
                }
            }
        }

        remaining -= wave_indices.len();
        waves.push(
            wave_indices
                .into_iter()
                .map(|idx| dag[idx].clone())
                .collect(),
        );
    }

    Ok(ExecutionPlan { waves })
}
