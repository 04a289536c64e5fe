//! Cycle group completeness (CYC002/CYC003/CYC004/CYC006/CYC007/CYC008).

use std::collections::HashSet;
use std::time::Duration;

use crate::evaluator::parse_expr;
use crate::graph::types::Graph;

use super::types::{Diagnostic, ValidatorConfig};

pub(super) fn validate(graph: &Graph, config: &ValidatorConfig) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    for group in &graph.cycle_groups {
        if group.member_connections.is_empty() {
            diags.push(
                Diagnostic::error(
                    "CYC004",
                    format!("Cycle group '{}' has no member connections", group.name),
                )
                .at_cycle_group(group.name.clone()),
            );
        }

        match (&group.max_iterations, &group.converge_when) {
            (None, None) => diags.push(
                Diagnostic::error(
                    "CYC002",
                    format!(
                        "Cycle group '{}' declares neither max_iterations nor converge_when",
                        group.name
                    ),
                )
                .at_cycle_group(group.name.clone()),
            ),
            (_, Some(expr)) => {
                if let Err(e) = parse_expr(expr) {
                    diags.push(
                        Diagnostic::error(
                            "CYC003",
                            format!(
                                "Cycle group '{}' has a degenerate converge_when expression: {}",
                                group.name, e
                            ),
                        )
                        .at_cycle_group(group.name.clone()),
                    );
                }
            }
            _ => {}
        }

        if group.max_iterations == Some(0) {
            diags.push(
                Diagnostic::error(
                    "CYC007",
                    format!("Cycle group '{}' has a non-positive max_iterations", group.name),
                )
                .at_cycle_group(group.name.clone()),
            );
        }
        if group.timeout == Some(Duration::ZERO) {
            diags.push(
                Diagnostic::error(
                    "CYC007",
                    format!("Cycle group '{}' has a non-positive timeout", group.name),
                )
                .at_cycle_group(group.name.clone()),
            );
        }

        let mut unknown: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for conn in &group.member_connections {
            for id in [conn.source_id.as_str(), conn.target_id.as_str()] {
                if !graph.has_node(id) && seen.insert(id) {
                    unknown.push(id);
                }
            }
        }
        for id in unknown {
            diags.push(
                Diagnostic::error(
                    "CYC008",
                    format!(
                        "Cycle group '{}' references unknown node '{}'",
                        group.name, id
                    ),
                )
                .at_cycle_group(group.name.clone())
                .at_node(id.to_string()),
            );
        }

        if let Some(cap) = group.max_iterations {
            if cap > config.max_iterations_high_water {
                diags.push(
                    Diagnostic::warning(
                        "CYC006",
                        format!(
                            "Cycle group '{}' allows {} iterations (high-water mark {}); consider a converge_when condition",
                            group.name, cap, config.max_iterations_high_water
                        ),
                    )
                    .at_cycle_group(group.name.clone()),
                );
            }
        }
    }

    diags
}
