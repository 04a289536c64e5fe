//! Static graph validation.
//!
//! A fixed, ordered sequence of passes runs before execution, accumulating
//! every finding instead of stopping at the first, so a single call reports
//! the complete defect list:
//!
//! 1. Node parameter completeness (`PAR004`)
//! 2. Connection structure: endpoints, shape, heuristic field names,
//!    duplicate target inputs (`CON002`–`CON004`, `CON006`–`CON008`)
//! 3. Acyclicity outside cycle groups (`CON005`)
//! 4. Cycle group completeness (`CYC002`–`CYC008`, warning `CYC006`)
//!
//! The executor refuses to run a graph whose report has errors; callers may
//! also invoke validation standalone, linter-style.

mod cycles;
mod params;
mod structure;
mod topology;
pub mod types;

pub use types::{Diagnostic, DiagnosticLevel, ValidationReport, ValidatorConfig};

use crate::graph::types::Graph;
use crate::registry::NodeRegistry;

/// Run every validation pass in order and aggregate the findings.
pub fn validate_graph(
    graph: &Graph,
    registry: &NodeRegistry,
    config: &ValidatorConfig,
) -> ValidationReport {
    let mut diagnostics = Vec::new();
    diagnostics.extend(params::validate(graph, registry));
    diagnostics.extend(structure::validate(graph, config));
    diagnostics.extend(topology::validate(graph));
    diagnostics.extend(cycles::validate(graph, config));
    ValidationReport::from_diagnostics(diagnostics)
}
