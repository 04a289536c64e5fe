//! The execution driver.
//!
//! Walks the wave plan produced by the scheduler, runs ready nodes of a
//! wave concurrently on a [`JoinSet`], applies field-level output
//! propagation, iterates cycle groups until their termination rule fires,
//! and derives the terminal run status.
//!
//! Single-writer rule: node tasks only compute; every write into the run
//! context, the output map, and the delivery buffers happens on the
//! executor task when a result is joined.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

use crate::core::cancel::CancelFlag;
use crate::core::event_bus::{EngineEvent, EventEmitter};
use crate::core::run_context::{NodeRecord, NodeStatus, RunContext, RunStatus};
use crate::core::value::ValueMap;
use crate::error::NodeError;
use crate::evaluator::{parse_expr, ConvergeExpr};
use crate::graph::types::{CycleGroup, Graph};
use crate::registry::{Node, NodeDescriptor};
use crate::scheduler::{ExecutionPlan, ScheduleUnit};

/// Everything a run needs, resolved up front by the engine.
pub(crate) struct Executor {
    pub graph: Arc<Graph>,
    /// Node id → descriptor, snapshotted at execute time so later
    /// re-registration cannot affect an in-flight run.
    pub descriptors: HashMap<String, Arc<NodeDescriptor>>,
    pub initial: ValueMap,
    pub emitter: EventEmitter,
    pub cancel: CancelFlag,
    /// 0 means unbounded.
    pub max_concurrency: usize,
}

struct NodeExecOutcome {
    node_id: String,
    elapsed_ms: u64,
    result: Result<ValueMap, NodeError>,
}

enum GroupRun {
    Completed,
    Aborted,
    Cancelled,
}

/// Mutable per-run state, written only by the executor task.
struct RunState {
    context: RunContext,
    /// Output bags of nodes that succeeded (latest pass for cycle members).
    outputs: HashMap<String, ValueMap>,
    /// Values delivered along plain connections, keyed by target node.
    delivered: HashMap<String, ValueMap>,
    /// Nodes whose outputs must not be consumed downstream: failed,
    /// skipped, or members of an aborted cycle group.
    unavailable: HashSet<String>,
    failure_seen: bool,
}

impl Executor {
    pub async fn run(&self, plan: &ExecutionPlan) -> RunContext {
        let mut state = RunState {
            context: RunContext::new(),
            outputs: HashMap::new(),
            delivered: HashMap::new(),
            unavailable: HashSet::new(),
            failure_seen: false,
        };

        self.emitter
            .emit(EngineEvent::RunStarted {
                run_id: state.context.run_id.clone(),
            })
            .await;
        tracing::debug!(run_id = %state.context.run_id, "run started");

        let mut cancelled = false;
        'waves: for wave in &plan.waves {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let mut ready = Vec::new();
            let mut groups = Vec::new();
            for unit in wave {
                match unit {
                    ScheduleUnit::Node(id) => match self.prepare_node(id, &state) {
                        Ok(job) => ready.push(job),
                        Err(reason) => self.record_skip(id, reason, &mut state).await,
                    },
                    ScheduleUnit::Group(name) => {
                        if let Some(group) =
                            self.graph.cycle_groups.iter().find(|g| &g.name == name)
                        {
                            groups.push(group);
                        }
                    }
                }
            }

            self.run_wave_nodes(ready, &mut state).await;

            for group in groups {
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break 'waves;
                }
                match self.run_cycle_group(group, &mut state).await {
                    GroupRun::Completed | GroupRun::Aborted => {}
                    GroupRun::Cancelled => {
                        cancelled = true;
                        break 'waves;
                    }
                }
            }
        }

        let status = if cancelled {
            RunStatus::Cancelled
        } else {
            self.derive_status(&state)
        };
        state.context.finish(status);

        tracing::debug!(run_id = %state.context.run_id, ?status, "run finished");
        self.emitter
            .emit(EngineEvent::RunFinished {
                run_id: state.context.run_id.clone(),
                status,
            })
            .await;

        state.context
    }

    /// A run with any failure is never `succeeded`; it is `failed` only
    /// when the failure starved every sink node, otherwise partial.
    fn derive_status(&self, state: &RunState) -> RunStatus {
        if !state.failure_seen {
            return RunStatus::Succeeded;
        }
        let sinks = self.graph.sink_node_ids();
        let terminal: Vec<&str> = if sinks.is_empty() {
            self.graph.nodes.iter().map(|n| n.id.as_str()).collect()
        } else {
            sinks.iter().map(String::as_str).collect()
        };
        let all_terminal_dead =
            !terminal.is_empty() && terminal.iter().all(|id| state.unavailable.contains(*id));
        if all_terminal_dead {
            RunStatus::Failed
        } else {
            RunStatus::PartiallyFailed
        }
    }

    /// Check readiness and resolve inputs, or explain why the node must be
    /// skipped.
    fn prepare_node(&self, node_id: &str, state: &RunState) -> Result<NodeJob, String> {
        for conn in self.graph.inbound_connections(node_id) {
            if state.unavailable.contains(&conn.source_id) {
                return Err(format!(
                    "upstream node '{}' failed or was skipped",
                    conn.source_id
                ));
            }
            let has_value = state
                .delivered
                .get(node_id)
                .map(|bag| bag.contains_key(&conn.target_input))
                .unwrap_or(false);
            if !has_value {
                return Err(format!(
                    "upstream node '{}' produced no output field '{}'",
                    conn.source_id, conn.source_output
                ));
            }
        }

        let node = self
            .descriptors
            .get(node_id)
            .map(|d| d.node())
            .ok_or_else(|| format!("no implementation resolved for node '{}'", node_id))?;

        Ok(NodeJob {
            node_id: node_id.to_string(),
            inputs: self.resolve_inputs(node_id, state),
            node,
        })
    }

    /// Input precedence: initial parameters < static config < delivered
    /// connection values.
    fn resolve_inputs(&self, node_id: &str, state: &RunState) -> ValueMap {
        let mut inputs = self.initial.clone();
        if let Some(spec) = self.graph.node(node_id) {
            inputs.extend(spec.config.clone());
        }
        if let Some(bag) = state.delivered.get(node_id) {
            inputs.extend(bag.clone());
        }
        inputs
    }

    async fn record_skip(&self, node_id: &str, reason: String, state: &mut RunState) {
        tracing::debug!(node_id, %reason, "node skipped");
        state
            .context
            .node_results
            .insert(node_id.to_string(), NodeRecord::skipped(reason));
        state.unavailable.insert(node_id.to_string());
        state.failure_seen = true;
        self.emitter
            .emit(EngineEvent::NodeFinished {
                node_id: node_id.to_string(),
                status: NodeStatus::SkippedDueToDependencyFailure,
            })
            .await;
    }

    async fn record_success(&self, node_id: &str, outputs: ValueMap, elapsed_ms: u64, state: &mut RunState) {
        // Propagate along plain connections; a missing output field simply
        // delivers nothing and the target is skipped at its own wave.
        for conn in self.graph.outbound_connections(node_id) {
            if let Some(value) = outputs.get(&conn.source_output) {
                state
                    .delivered
                    .entry(conn.target_id.clone())
                    .or_default()
                    .insert(conn.target_input.clone(), value.clone());
            }
        }
        state.outputs.insert(node_id.to_string(), outputs.clone());
        state
            .context
            .node_results
            .insert(node_id.to_string(), NodeRecord::succeeded(outputs, elapsed_ms));
        self.emitter
            .emit(EngineEvent::NodeFinished {
                node_id: node_id.to_string(),
                status: NodeStatus::Succeeded,
            })
            .await;
    }

    async fn record_failure(&self, node_id: &str, error: String, elapsed_ms: u64, state: &mut RunState) {
        tracing::warn!(node_id, %error, "node failed");
        state
            .context
            .node_results
            .insert(node_id.to_string(), NodeRecord::failed(error, elapsed_ms));
        state.unavailable.insert(node_id.to_string());
        state.failure_seen = true;
        self.emitter
            .emit(EngineEvent::NodeFinished {
                node_id: node_id.to_string(),
                status: NodeStatus::Failed,
            })
            .await;
    }

    /// Run one wave's ready nodes, at most `max_concurrency` at a time.
    async fn run_wave_nodes(&self, jobs: Vec<NodeJob>, state: &mut RunState) {
        let limit = if self.max_concurrency == 0 {
            usize::MAX
        } else {
            self.max_concurrency
        };

        let mut queue: VecDeque<NodeJob> = jobs.into();
        let mut join_set: JoinSet<NodeExecOutcome> = JoinSet::new();
        let mut running: HashMap<tokio::task::Id, String> = HashMap::new();

        loop {
            while join_set.len() < limit {
                let Some(job) = queue.pop_front() else { break };
                self.emitter
                    .emit(EngineEvent::NodeStarted {
                        node_id: job.node_id.clone(),
                    })
                    .await;
                let NodeJob { node_id, inputs, node } = job;
                let task_id = {
                    let node_id = node_id.clone();
                    join_set
                        .spawn(async move {
                            let started = Instant::now();
                            let result = node.run(inputs).await;
                            NodeExecOutcome {
                                node_id,
                                elapsed_ms: started.elapsed().as_millis() as u64,
                                result,
                            }
                        })
                        .id()
                };
                running.insert(task_id, node_id);
            }

            match join_set.join_next_with_id().await {
                Some(Ok((task_id, outcome))) => {
                    running.remove(&task_id);
                    match outcome.result {
                        Ok(outputs) => {
                            self.record_success(
                                &outcome.node_id,
                                outputs,
                                outcome.elapsed_ms,
                                state,
                            )
                            .await
                        }
                        Err(e) => {
                            self.record_failure(
                                &outcome.node_id,
                                e.to_string(),
                                outcome.elapsed_ms,
                                state,
                            )
                            .await
                        }
                    }
                }
                Some(Err(join_err)) => {
                    // A panicking node must not take the engine down.
                    if let Some(node_id) = running.remove(&join_err.id()) {
                        self.record_failure(
                            &node_id,
                            format!("node task panicked: {}", join_err),
                            0,
                            state,
                        )
                        .await;
                    }
                }
                None => break,
            }
        }
    }

    /// Iterate one cycle group until convergence, the pass cap, the
    /// timeout, or cancellation — whichever comes first.
    async fn run_cycle_group(&self, group: &CycleGroup, state: &mut RunState) -> GroupRun {
        let order = group.member_order();

        // A member starved by an upstream failure means the loop can never
        // run a complete pass; the whole group is skipped.
        for node_id in &order {
            if let Err(reason) = self.check_plain_deps(node_id, state) {
                for member in &order {
                    self.record_skip(member, reason.clone(), state).await;
                }
                return GroupRun::Aborted;
            }
        }

        let expr: Option<ConvergeExpr> = match group.converge_when.as_deref().map(parse_expr) {
            Some(Ok(expr)) => Some(expr),
            Some(Err(e)) => {
                // Validation rejects degenerate expressions before any run.
                self.abort_group(group, &order, format!("degenerate converge_when: {}", e), state)
                    .await;
                return GroupRun::Aborted;
            }
            None => None,
        };

        let started = Instant::now();
        let mut cycle_delivered: HashMap<String, ValueMap> = HashMap::new();
        let mut pass: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return GroupRun::Cancelled;
            }
            if let Some(timeout) = group.timeout {
                if started.elapsed() >= timeout {
                    self.abort_group(
                        group,
                        &order,
                        format!("cycle group timed out after {} passes", pass),
                        state,
                    )
                    .await;
                    return GroupRun::Aborted;
                }
            }

            for node_id in &order {
                let mut inputs = self.resolve_inputs(node_id, state);
                if let Some(bag) = cycle_delivered.get(node_id) {
                    inputs.extend(bag.clone());
                }

                let Some(node) = self.descriptors.get(node_id).map(|d| d.node()) else {
                    self.abort_group(
                        group,
                        &order,
                        format!("no implementation resolved for node '{}'", node_id),
                        state,
                    )
                    .await;
                    return GroupRun::Aborted;
                };

                self.emitter
                    .emit(EngineEvent::NodeStarted {
                        node_id: node_id.clone(),
                    })
                    .await;
                let node_started = Instant::now();
                match node.run(inputs).await {
                    Ok(outputs) => {
                        for conn in &group.member_connections {
                            if &conn.source_id == node_id {
                                if let Some(value) = outputs.get(&conn.source_output) {
                                    cycle_delivered
                                        .entry(conn.target_id.clone())
                                        .or_default()
                                        .insert(conn.target_input.clone(), value.clone());
                                }
                            }
                        }
                        state.outputs.insert(node_id.clone(), outputs.clone());
                        state.context.node_results.insert(
                            node_id.clone(),
                            NodeRecord::succeeded(
                                outputs,
                                node_started.elapsed().as_millis() as u64,
                            ),
                        );
                        self.emitter
                            .emit(EngineEvent::NodeFinished {
                                node_id: node_id.clone(),
                                status: NodeStatus::Succeeded,
                            })
                            .await;
                    }
                    Err(e) => {
                        self.record_failure(
                            node_id,
                            e.to_string(),
                            node_started.elapsed().as_millis() as u64,
                            state,
                        )
                        .await;
                        self.abort_group(
                            group,
                            &order,
                            format!("member node '{}' failed", node_id),
                            state,
                        )
                        .await;
                        return GroupRun::Aborted;
                    }
                }
            }

            pass += 1;
            self.emitter
                .emit(EngineEvent::CyclePass {
                    group: group.name.clone(),
                    pass,
                })
                .await;

            if let Some(expr) = &expr {
                if expr.evaluate(&state.outputs) {
                    tracing::debug!(group = %group.name, pass, "cycle group converged");
                    break;
                }
            }
            if let Some(cap) = group.max_iterations {
                if pass >= cap {
                    tracing::debug!(group = %group.name, pass, "cycle group reached iteration cap");
                    break;
                }
            }
            if expr.is_none() && group.max_iterations.is_none() {
                // Unreachable behind validation (CYC002); never loop forever.
                self.abort_group(group, &order, "no termination rule".to_string(), state)
                    .await;
                return GroupRun::Aborted;
            }
        }

        // Loop finished normally: publish members' final outputs downstream.
        for node_id in &order {
            if let Some(outputs) = state.outputs.get(node_id).cloned() {
                for conn in self.graph.outbound_connections(node_id) {
                    if let Some(value) = outputs.get(&conn.source_output) {
                        state
                            .delivered
                            .entry(conn.target_id.clone())
                            .or_default()
                            .insert(conn.target_input.clone(), value.clone());
                    }
                }
            }
        }

        GroupRun::Completed
    }

    /// Readiness of a cycle member with respect to plain inbound edges only.
    fn check_plain_deps(&self, node_id: &str, state: &RunState) -> Result<(), String> {
        for conn in self.graph.inbound_connections(node_id) {
            if state.unavailable.contains(&conn.source_id) {
                return Err(format!(
                    "upstream node '{}' failed or was skipped",
                    conn.source_id
                ));
            }
            let has_value = state
                .delivered
                .get(node_id)
                .map(|bag| bag.contains_key(&conn.target_input))
                .unwrap_or(false);
            if !has_value {
                return Err(format!(
                    "upstream node '{}' produced no output field '{}'",
                    conn.source_id, conn.source_output
                ));
            }
        }
        Ok(())
    }

    /// Mark a group's members unavailable after a timeout or member
    /// failure; independent parts of the run continue.
    async fn abort_group(
        &self,
        group: &CycleGroup,
        order: &[String],
        reason: String,
        state: &mut RunState,
    ) {
        tracing::warn!(group = %group.name, %reason, "cycle group aborted");
        state.failure_seen = true;
        for node_id in order {
            state.unavailable.insert(node_id.clone());
            state.outputs.remove(node_id);
        }
    }
}

struct NodeJob {
    node_id: String,
    inputs: ValueMap,
    node: Arc<dyn Node>,
}
