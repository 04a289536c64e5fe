//! Connection structure checks: endpoint existence (CON003/CON004),
//! legacy shape (CON002), heuristic field names (CON006/CON007), and
//! duplicate target inputs (CON008).

use std::collections::HashSet;

use crate::graph::types::{Connection, Graph};

use super::types::{Diagnostic, ValidatorConfig};

/// Substrings that mark a field name as stale placeholder wiring.
const SUSPICIOUS_MARKERS: [&str; 3] = ["nonexistent", "invalid", "fake"];

pub(super) fn validate(graph: &Graph, config: &ValidatorConfig) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    // Endpoint existence first, one diagnostic per dangling reference.
    for conn in &graph.connections {
        if !graph.has_node(&conn.source_id) {
            diags.push(
                Diagnostic::error(
                    "CON003",
                    format!("Connection references unknown source node '{}'", conn.source_id),
                )
                .at_connection(conn.describe()),
            );
        }
        if !graph.has_node(&conn.target_id) {
            diags.push(
                Diagnostic::error(
                    "CON004",
                    format!("Connection references unknown target node '{}'", conn.target_id),
                )
                .at_connection(conn.describe()),
            );
        }
    }

    // Shape: the legacy source/target pair without field names is a hard
    // error, never silently upgraded.
    for conn in &graph.connections {
        if conn.is_legacy_pair() {
            diags.push(
                Diagnostic::error(
                    "CON002",
                    format!(
                        "Connection '{}' -> '{}' lacks output/input field names (legacy pair shape)",
                        conn.source_id, conn.target_id
                    ),
                )
                .at_connection(conn.describe()),
            );
        }
    }

    if config.heuristic_field_names {
        for conn in &graph.connections {
            if let Some(marker) = suspicious_marker(&conn.source_output) {
                diags.push(
                    Diagnostic::error(
                        "CON006",
                        format!(
                            "Output field '{}' looks like placeholder wiring (contains '{}')",
                            conn.source_output, marker
                        ),
                    )
                    .at_connection(conn.describe()),
                );
            }
            if let Some(marker) = suspicious_marker(&conn.target_input) {
                diags.push(
                    Diagnostic::error(
                        "CON007",
                        format!(
                            "Input field '{}' looks like placeholder wiring (contains '{}')",
                            conn.target_input, marker
                        ),
                    )
                    .at_connection(conn.describe()),
                );
            }
        }
    }

    diags.extend(duplicate_targets(&graph.connections));
    diags
}

fn suspicious_marker(field: &str) -> Option<&'static str> {
    let lower = field.to_lowercase();
    SUSPICIOUS_MARKERS.iter().find(|m| lower.contains(**m)).copied()
}

/// Two connections feeding the same `(target_id, target_input)` would be
/// last-write-wins at runtime; rejected instead (CON008).
fn duplicate_targets(connections: &[Connection]) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for conn in connections {
        if conn.is_legacy_pair() {
            continue;
        }
        if !seen.insert((conn.target_id.as_str(), conn.target_input.as_str())) {
            diags.push(
                Diagnostic::error(
                    "CON008",
                    format!(
                        "Multiple connections write to input '{}' of node '{}'",
                        conn.target_input, conn.target_id
                    ),
                )
                .at_connection(conn.describe()),
            );
        }
    }
    diags
}
