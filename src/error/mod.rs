//! Error types for the workflow engine.
//!
//! - [`NodeError`] — Errors raised during individual node execution.
//! - [`RegistryError`] — Node-type registration and lookup failures.
//! - [`EngineError`] — Structural build errors and engine-fatal conditions.
//!
//! Validation findings are deliberately *not* errors: they are collected
//! into a [`ValidationReport`](crate::graph::validation::ValidationReport)
//! and returned as data.

pub mod engine_error;
pub mod node_error;
pub mod registry_error;

pub use engine_error::EngineError;
pub use node_error::NodeError;
pub use registry_error::RegistryError;

/// Convenience alias for engine-level results.
pub type EngineResult<T> = Result<T, EngineError>;
/// Convenience alias for node-level results.
pub type NodeResult<T> = Result<T, NodeError>;
