//! Engine-level error types.
//!
//! These are the errors that *raise*: structural mistakes caught while
//! building a graph, and engine-fatal conditions that indicate a violated
//! internal precondition. Per-node execution failures never surface here —
//! they are recorded in the run context instead.

use super::RegistryError;
use thiserror::Error;

/// Structural and engine-fatal errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(String),
    #[error("Duplicate cycle group name: {0}")]
    DuplicateCycleGroup(String),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Circular dependency in schedule graph: {0}")]
    CircularDependency(String),
    #[error("Run not found: {0}")]
    RunNotFound(String),
    #[error("No result for node '{node_id}' in run '{run_id}'")]
    NodeResultNotFound { run_id: String, node_id: String },
    #[error("Run id already recorded: {0}")]
    DuplicateRunId(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        assert_eq!(
            EngineError::DuplicateNodeId("a".into()).to_string(),
            "Duplicate node id: a"
        );
        assert_eq!(
            EngineError::CircularDependency("a -> b -> a".into()).to_string(),
            "Circular dependency in schedule graph: a -> b -> a"
        );
        assert_eq!(
            EngineError::RunNotFound("r1".into()).to_string(),
            "Run not found: r1"
        );
        assert_eq!(
            EngineError::NodeResultNotFound {
                run_id: "r1".into(),
                node_id: "n1".into()
            }
            .to_string(),
            "No result for node 'n1' in run 'r1'"
        );
    }

    #[test]
    fn test_engine_error_from_registry_error() {
        let err: EngineError = RegistryError::UnknownType("llm".into()).into();
        assert!(err.to_string().contains("Unknown node type: llm"));
    }
}
