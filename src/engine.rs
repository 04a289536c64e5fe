//! The public entry point: validate and execute graphs, query past runs.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::cancel::CancelFlag;
use crate::core::event_bus::{EngineEvent, EventEmitter};
use crate::core::run_context::{NodeRecord, RunContext, RunStatus, RunStore};
use crate::core::value::ValueMap;
use crate::error::EngineResult;
use crate::executor::Executor;
use crate::graph::types::Graph;
use crate::graph::validation::{validate_graph, ValidationReport, ValidatorConfig};
use crate::registry::{NodeDescriptor, NodeRegistry};
use crate::scheduler::build_plan;

/// Engine tunables.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub validator: ValidatorConfig,
    /// Upper bound on concurrently running nodes within a wave;
    /// 0 means unbounded.
    pub max_concurrency: usize,
}

/// Per-run options for [`WorkflowEngine::execute_with_options`].
#[derive(Default)]
pub struct RunOptions {
    /// Checked cooperatively at wave and cycle-pass boundaries.
    pub cancel: CancelFlag,
    /// Receives progress events when set.
    pub events: Option<mpsc::Sender<EngineEvent>>,
}

/// What `execute` hands back.
///
/// Validation findings are data, not errors: an invalid graph yields
/// `Rejected` with the full report and no run is started. Only structural
/// and engine-fatal problems surface as `Err`.
#[derive(Debug)]
pub enum RunOutcome {
    Rejected(ValidationReport),
    Finished(Arc<RunContext>),
}

impl RunOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, RunOutcome::Rejected(_))
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            RunOutcome::Rejected(report) => Some(report),
            RunOutcome::Finished(_) => None,
        }
    }

    pub fn run_id(&self) -> Option<&str> {
        match self {
            RunOutcome::Finished(ctx) => Some(&ctx.run_id),
            RunOutcome::Rejected(_) => None,
        }
    }

    pub fn status(&self) -> Option<RunStatus> {
        match self {
            RunOutcome::Finished(ctx) => Some(ctx.status),
            RunOutcome::Rejected(_) => None,
        }
    }

    /// The per-node result map of a finished run.
    pub fn results(&self) -> Option<&HashMap<String, NodeRecord>> {
        match self {
            RunOutcome::Finished(ctx) => Some(&ctx.node_results),
            RunOutcome::Rejected(_) => None,
        }
    }
}

/// The workflow engine: a node registry, a validator configuration, and a
/// store of finished runs.
///
/// The registry is injected; callers that want ambient behavior can pass
/// [`NodeRegistry::global()`].
pub struct WorkflowEngine {
    registry: Arc<NodeRegistry>,
    config: EngineConfig,
    store: RunStore,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: Arc<NodeRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            store: RunStore::new(),
        }
    }

    /// Convenience constructor over the process-wide registry.
    pub fn with_global_registry() -> Self {
        Self::new(NodeRegistry::global())
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Validate without running — linter-style.
    pub fn validate(&self, graph: &Graph) -> ValidationReport {
        validate_graph(graph, &self.registry, &self.config.validator)
    }

    /// Validate and execute synchronously, returning the per-node results
    /// and run id once the run reaches a terminal status.
    pub async fn execute(&self, graph: &Graph, initial: ValueMap) -> EngineResult<RunOutcome> {
        self.execute_with_options(graph, initial, RunOptions::default())
            .await
    }

    pub async fn execute_with_options(
        &self,
        graph: &Graph,
        initial: ValueMap,
        options: RunOptions,
    ) -> EngineResult<RunOutcome> {
        let report = self.validate(graph);
        if report.has_errors {
            tracing::debug!(
                errors = report.errors.len(),
                "graph rejected by validation"
            );
            return Ok(RunOutcome::Rejected(report));
        }

        // Snapshot descriptors so re-registration cannot affect this run.
        let mut descriptors: HashMap<String, Arc<NodeDescriptor>> = HashMap::new();
        for node in &graph.nodes {
            descriptors.insert(node.id.clone(), self.registry.resolve(&node.node_type)?);
        }

        let plan = build_plan(graph)?;

        let emitter = match options.events {
            Some(tx) => EventEmitter::new(tx),
            None => EventEmitter::disabled(),
        };

        let executor = Executor {
            graph: Arc::new(graph.clone()),
            descriptors,
            initial,
            emitter,
            cancel: options.cancel,
            max_concurrency: self.config.max_concurrency,
        };

        let context = Arc::new(executor.run(&plan).await);
        self.store.insert(context.clone())?;
        Ok(RunOutcome::Finished(context))
    }

    /// Terminal status of a stored run.
    pub fn status(&self, run_id: &str) -> EngineResult<RunStatus> {
        self.store.status(run_id)
    }

    /// Output bag a node produced in a stored run.
    pub fn get_result(&self, run_id: &str, node_id: &str) -> EngineResult<ValueMap> {
        self.store.get_result(run_id, node_id)
    }

    /// Full context of a stored run.
    pub fn run_context(&self, run_id: &str) -> EngineResult<Arc<RunContext>> {
        self.store.get(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::run_context::NodeStatus;
    use crate::core::value::Value;
    use crate::error::{EngineError, NodeError};
    use crate::graph::builder::GraphBuilder;

    fn engine_with_basic_nodes() -> WorkflowEngine {
        let registry = Arc::new(NodeRegistry::new());
        registry.register_fn("const-five", &[], &[], |_| {
            let mut out = ValueMap::new();
            out.insert("result".to_string(), Value::Int(5));
            Ok(out)
        });
        registry.register_fn("echo", &["input"], &[], |inputs| {
            let value = inputs
                .get("input")
                .cloned()
                .ok_or_else(|| NodeError::MissingInput("input".into()))?;
            let mut out = ValueMap::new();
            out.insert("echoed".to_string(), value);
            Ok(out)
        });
        WorkflowEngine::new(registry)
    }

    #[tokio::test]
    async fn test_execute_simple_chain() {
        let engine = engine_with_basic_nodes();
        let graph = GraphBuilder::new()
            .add_node("a", "const-five")
            .add_node("b", "echo")
            .connect("a", "result", "b", "input")
            .build()
            .unwrap();

        let outcome = engine.execute(&graph, ValueMap::new()).await.unwrap();
        assert_eq!(outcome.status(), Some(RunStatus::Succeeded));
        let results = outcome.results().unwrap();
        assert_eq!(results["b"].status, NodeStatus::Succeeded);
        assert_eq!(results["b"].outputs.get("echoed"), Some(&Value::Int(5)));
    }

    #[tokio::test]
    async fn test_invalid_graph_is_rejected_not_raised() {
        let engine = engine_with_basic_nodes();
        let graph = GraphBuilder::new()
            .add_node("a", "const-five")
            .connect("a", "result", "ghost", "input")
            .build()
            .unwrap();

        let outcome = engine.execute(&graph, ValueMap::new()).await.unwrap();
        assert!(outcome.is_rejected());
        assert!(outcome.report().unwrap().error_codes().contains(&"CON004"));
        assert!(outcome.run_id().is_none());
    }

    #[tokio::test]
    async fn test_unknown_node_type_raises() {
        let engine = engine_with_basic_nodes();
        let graph = GraphBuilder::new()
            .add_node("a", "never-registered")
            .build()
            .unwrap();

        let result = engine.execute(&graph, ValueMap::new()).await;
        assert!(matches!(result, Err(EngineError::Registry(_))));
    }

    #[tokio::test]
    async fn test_store_queries_after_run() {
        let engine = engine_with_basic_nodes();
        let graph = GraphBuilder::new().add_node("a", "const-five").build().unwrap();

        let outcome = engine.execute(&graph, ValueMap::new()).await.unwrap();
        let run_id = outcome.run_id().unwrap().to_string();

        assert_eq!(engine.status(&run_id).unwrap(), RunStatus::Succeeded);
        let bag = engine.get_result(&run_id, "a").unwrap();
        assert_eq!(bag.get("result"), Some(&Value::Int(5)));
        assert!(matches!(
            engine.get_result(&run_id, "ghost"),
            Err(EngineError::NodeResultNotFound { .. })
        ));
        assert!(matches!(
            engine.status("not-a-run"),
            Err(EngineError::RunNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_initial_parameters_reach_nodes() {
        let engine = engine_with_basic_nodes();
        engine.registry().register_fn("maybe-echo", &[], &["input"], |inputs| {
            let mut out = ValueMap::new();
            if let Some(value) = inputs.get("input") {
                out.insert("echoed".to_string(), value.clone());
            }
            Ok(out)
        });
        let graph = GraphBuilder::new().add_node("b", "maybe-echo").build().unwrap();

        let mut initial = ValueMap::new();
        initial.insert("input".to_string(), Value::String("seed".into()));
        let outcome = engine.execute(&graph, initial).await.unwrap();
        assert_eq!(outcome.status(), Some(RunStatus::Succeeded));
        assert_eq!(
            outcome.results().unwrap()["b"].outputs.get("echoed"),
            Some(&Value::String("seed".into()))
        );
    }

    #[tokio::test]
    async fn test_global_registry_engine() {
        NodeRegistry::global().register_fn("global-noop", &[], &[], |_| Ok(ValueMap::new()));
        let engine = WorkflowEngine::with_global_registry();
        let graph = GraphBuilder::new().add_node("n", "global-noop").build().unwrap();
        let outcome = engine.execute(&graph, ValueMap::new()).await.unwrap();
        assert_eq!(outcome.status(), Some(RunStatus::Succeeded));
    }
}
