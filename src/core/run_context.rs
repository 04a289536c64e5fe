//! Per-run state and the terminal result store.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};

use super::value::ValueMap;

/// Terminal and in-flight status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    PartiallyFailed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Outcome of a single node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Succeeded,
    Failed,
    SkippedDueToDependencyFailure,
}

/// What one node produced (or why it did not).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub status: NodeStatus,
    pub outputs: ValueMap,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl NodeRecord {
    pub fn succeeded(outputs: ValueMap, elapsed_ms: u64) -> Self {
        Self {
            status: NodeStatus::Succeeded,
            outputs,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(error: String, elapsed_ms: u64) -> Self {
        Self {
            status: NodeStatus::Failed,
            outputs: ValueMap::new(),
            error: Some(error),
            elapsed_ms,
        }
    }

    pub fn skipped(reason: String) -> Self {
        Self {
            status: NodeStatus::SkippedDueToDependencyFailure,
            outputs: ValueMap::new(),
            error: Some(reason),
            elapsed_ms: 0,
        }
    }
}

/// The record of one graph execution.
///
/// Mutated by the executor while `status` is `Running`; once a terminal
/// status is set the context is stored behind an `Arc` and never touched
/// again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: String,
    pub status: RunStatus,
    pub node_results: HashMap<String, NodeRecord>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            status: RunStatus::Running,
            node_results: HashMap::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Move to a terminal status and stamp the end time.
    pub fn finish(&mut self, status: RunStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.ended_at = Some(Utc::now());
    }

    pub fn elapsed_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    pub fn record(&self, node_id: &str) -> Option<&NodeRecord> {
        self.node_results.get(node_id)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Store of finished runs, keyed by run id.
///
/// Only terminal contexts are inserted; a duplicate run id is an engine
/// invariant violation, never a silent overwrite.
#[derive(Default)]
pub struct RunStore {
    runs: DashMap<String, Arc<RunContext>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, context: Arc<RunContext>) -> EngineResult<()> {
        if self.runs.contains_key(&context.run_id) {
            return Err(EngineError::DuplicateRunId(context.run_id.clone()));
        }
        self.runs.insert(context.run_id.clone(), context);
        Ok(())
    }

    pub fn get(&self, run_id: &str) -> EngineResult<Arc<RunContext>> {
        self.runs
            .get(run_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))
    }

    pub fn status(&self, run_id: &str) -> EngineResult<RunStatus> {
        Ok(self.get(run_id)?.status)
    }

    pub fn get_result(&self, run_id: &str, node_id: &str) -> EngineResult<ValueMap> {
        let context = self.get(run_id)?;
        context
            .node_results
            .get(node_id)
            .map(|record| record.outputs.clone())
            .ok_or_else(|| EngineError::NodeResultNotFound {
                run_id: run_id.to_string(),
                node_id: node_id.to_string(),
            })
    }
}
