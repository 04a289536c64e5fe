//! Convergence-condition evaluation for cycle groups.

pub mod condition;
pub mod expr;

pub use condition::{evaluate_condition, ComparisonOperator, Condition, Selector};
pub use expr::{parse_expr, ConvergeExpr, ExprError};
