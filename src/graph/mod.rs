//! Graph model, construction, and validation.

pub mod builder;
pub mod types;
pub mod validation;

pub use builder::GraphBuilder;
pub use types::{Connection, CycleGroup, CycleGroupBuilder, Graph, NodeSpec};
pub use validation::{validate_graph, ValidationReport, ValidatorConfig};
