//! # Waveflow — a workflow graph execution engine
//!
//! `waveflow` executes declared directed graphs of nodes with field-level
//! data mappings, wave-based parallelism, and explicitly bounded cycle
//! groups:
//!
//! - **Graph model**: nodes with static config, connections mapping one
//!   node's named output to another's named input, and named cycle groups
//!   with a termination rule (`max_iterations`, `converge_when`, or both).
//! - **Validation**: a fixed ordered pass sequence that accumulates every
//!   finding (missing parameters, dangling endpoints, legacy connection
//!   shapes, illegal cycles, incomplete cycle groups) into one structured
//!   report instead of failing fast.
//! - **Scheduling**: topological wave layering; each cycle group is one
//!   opaque schedule unit that loops internally.
//! - **Execution**: nodes of a wave run concurrently on a `JoinSet`;
//!   per-node failures are isolated and propagate only as dependency
//!   failures; cancellation is cooperative at wave and pass boundaries.
//! - **Results**: every run yields an immutable [`RunContext`] with a
//!   generated run id and a per-node result map, queryable afterwards.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use waveflow::{GraphBuilder, NodeRegistry, ValueMap, WorkflowEngine};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(NodeRegistry::new());
//!     registry.register_fn("hello", &[], &[], |_| {
//!         let mut out = ValueMap::new();
//!         out.insert("greeting".to_string(), "hi".into());
//!         Ok(out)
//!     });
//!
//!     let graph = GraphBuilder::new().add_node("a", "hello").build().unwrap();
//!     let engine = WorkflowEngine::new(registry);
//!     let outcome = engine.execute(&graph, ValueMap::new()).await.unwrap();
//!     println!("{:?}", outcome.status());
//! }
//! ```

pub mod core;
pub mod engine;
pub mod error;
pub mod evaluator;
mod executor;
pub mod graph;
pub mod registry;
pub mod scheduler;

pub use crate::core::{
    CancelFlag, EngineEvent, EventEmitter, NodeRecord, NodeStatus, RunContext, RunStatus,
    RunStore, Value, ValueMap,
};
pub use crate::engine::{EngineConfig, RunOptions, RunOutcome, WorkflowEngine};
pub use crate::error::{EngineError, EngineResult, NodeError, NodeResult, RegistryError};
pub use crate::evaluator::{parse_expr, ComparisonOperator, Condition, ConvergeExpr, Selector};
pub use crate::graph::{
    validate_graph, Connection, CycleGroup, CycleGroupBuilder, Graph, GraphBuilder, NodeSpec,
    ValidationReport, ValidatorConfig,
};
pub use crate::graph::validation::{Diagnostic, DiagnosticLevel};
pub use crate::registry::{Node, NodeDescriptor, NodeRegistry};
pub use crate::scheduler::{build_plan, ExecutionPlan, ScheduleUnit};
