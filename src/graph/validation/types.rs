//! Validation diagnostic types.

use serde::{Deserialize, Serialize};

/// Severity level of a validation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: String,
    pub message: String,
    pub node_id: Option<String>,
    pub connection: Option<String>,
    pub cycle_group: Option<String>,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code: code.to_string(),
            message: message.into(),
            node_id: None,
            connection: None,
            cycle_group: None,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn at_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn at_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = Some(connection.into());
        self
    }

    pub fn at_cycle_group(mut self, group: impl Into<String>) -> Self {
        self.cycle_group = Some(group.into());
        self
    }
}

/// Aggregated result of graph validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub has_errors: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = diagnostics
            .into_iter()
            .partition(|d| d.level == DiagnosticLevel::Error);
        Self {
            has_errors: !errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Error codes in report order, for assertions and tooling.
    pub fn error_codes(&self) -> Vec<&str> {
        self.errors.iter().map(|d| d.code.as_str()).collect()
    }

    pub fn warning_codes(&self) -> Vec<&str> {
        self.warnings.iter().map(|d| d.code.as_str()).collect()
    }
}

/// Tunables for the validator.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// `max_iterations` above this emits the CYC006 performance warning.
    pub max_iterations_high_water: u32,
    /// Enables the heuristic field-name lint (CON006/CON007). This is a
    /// lint against stale placeholder wiring, not a type check.
    pub heuristic_field_names: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_iterations_high_water: 1000,
            heuristic_field_names: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_partitions_levels() {
        let report = ValidationReport::from_diagnostics(vec![
            Diagnostic::error("CON002", "bad shape"),
            Diagnostic::warning("CYC006", "high cap"),
            Diagnostic::error("PAR004", "missing param"),
        ]);
        assert!(report.has_errors);
        assert_eq!(report.error_codes(), vec!["CON002", "PAR004"]);
        assert_eq!(report.warning_codes(), vec!["CYC006"]);
    }

    #[test]
    fn test_report_clean() {
        let report = ValidationReport::from_diagnostics(vec![]);
        assert!(!report.has_errors);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_diagnostic_locations() {
        let d = Diagnostic::error("CON004", "dangling")
            .at_connection("a.out -> ghost.in")
            .at_node("ghost");
        assert_eq!(d.node_id.as_deref(), Some("ghost"));
        assert_eq!(d.connection.as_deref(), Some("a.out -> ghost.in"));
        assert!(d.cycle_group.is_none());
    }

    #[test]
    fn test_diagnostic_serde_roundtrip() {
        let d = Diagnostic::error("CYC002", "no termination").at_cycle_group("loop");
        let json = serde_json::to_string(&d).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, "CYC002");
        assert_eq!(back.cycle_group.as_deref(), Some("loop"));
    }
}
