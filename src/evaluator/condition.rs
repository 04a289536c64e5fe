//! Condition evaluation over accumulated node outputs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::value::{Value, ValueMap};

/// Comparison operators supported by convergence conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
    NotContains,
}

/// Addresses one output field: `node_id.field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub node_id: String,
    pub field: String,
}

impl Selector {
    pub fn new(node_id: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            field: field.into(),
        }
    }

    /// Parse `node.field`; the field part may itself contain dots.
    pub fn parse(raw: &str) -> Option<Self> {
        let (node_id, field) = raw.split_once('.')?;
        if node_id.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self::new(node_id, field))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node_id, self.field)
    }
}

/// A single test against one output field.
///
/// `test == None` means bare truthiness of the selected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub selector: Selector,
    pub test: Option<(ComparisonOperator, Value)>,
}

/// Evaluate one condition against per-node output bags.
pub fn evaluate_condition(cond: &Condition, outputs: &HashMap<String, ValueMap>) -> bool {
    let actual = outputs
        .get(&cond.selector.node_id)
        .and_then(|bag| bag.get(&cond.selector.field));

    let Some((operator, expected)) = &cond.test else {
        return actual.map(Value::is_truthy).unwrap_or(false);
    };

    let Some(actual) = actual else {
        // Absent values satisfy only the negative operators.
        return matches!(
            operator,
            ComparisonOperator::NotEqual | ComparisonOperator::NotContains
        );
    };

    match operator {
        ComparisonOperator::Equal => eval_equal(actual, expected),
        ComparisonOperator::NotEqual => !eval_equal(actual, expected),
        ComparisonOperator::GreaterThan => eval_numeric(actual, expected, |a, b| a > b),
        ComparisonOperator::LessThan => eval_numeric(actual, expected, |a, b| a < b),
        ComparisonOperator::GreaterOrEqual => eval_numeric(actual, expected, |a, b| a >= b),
        ComparisonOperator::LessOrEqual => eval_numeric(actual, expected, |a, b| a <= b),
        ComparisonOperator::Contains => eval_contains(actual, expected),
        ComparisonOperator::NotContains => !eval_contains(actual, expected),
    }
}

/// Numeric equality when both sides coerce, display-string equality
/// otherwise.
fn eval_equal(actual: &Value, expected: &Value) -> bool {
    match (coerce_f64(actual), coerce_f64(expected)) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ => actual.to_display_string() == expected.to_display_string(),
    }
}

fn eval_numeric(actual: &Value, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    match (coerce_f64(actual), coerce_f64(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn eval_contains(actual: &Value, expected: &Value) -> bool {
    let needle = expected.to_display_string();
    match actual {
        Value::String(s) => s.contains(&needle),
        Value::Array(items) => items.iter().any(|v| v.to_display_string() == needle),
        _ => false,
    }
}

/// Numeric coercion including numeric strings.
fn coerce_f64(v: &Value) -> Option<f64> {
    match v {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(_) => None,
        other => other.as_f64(),
    }
}
