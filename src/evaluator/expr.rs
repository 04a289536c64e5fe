//! Parser for `converge_when` expressions.
//!
//! Grammar (infix, `&&` binds tighter than `||`):
//!
//! ```text
//! expr    := group ("||" group)*
//! group   := term ("&&" term)*
//! term    := selector (op literal)?
//! selector:= ident "." ident
//! op      := "==" | "!=" | ">" | "<" | ">=" | "<=" | "contains"
//! literal := number | quoted string | true | false | null | bare word
//! ```
//!
//! A term without an operator tests the selected value for truthiness.

use std::collections::HashMap;
use thiserror::Error;

use crate::core::value::{Value, ValueMap};

use super::condition::{evaluate_condition, ComparisonOperator, Condition, Selector};

/// Reasons an expression fails to parse. Surfaced by validation as the
/// `CYC003` degenerate-condition diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("expected a `node.field` selector, found `{0}`")]
    InvalidSelector(String),
    #[error("expected a literal after operator, found end of input")]
    MissingValue,
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("dangling logical operator")]
    DanglingLogical,
}

/// A parsed convergence expression: OR over AND-groups of conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergeExpr {
    groups: Vec<Vec<Condition>>,
}

impl ConvergeExpr {
    /// True when any AND-group has every condition satisfied.
    pub fn evaluate(&self, outputs: &HashMap<String, ValueMap>) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().all(|c| evaluate_condition(c, outputs)))
    }

    /// Every selector the expression reads, for diagnostics.
    pub fn selectors(&self) -> Vec<&Selector> {
        self.groups
            .iter()
            .flat_map(|g| g.iter().map(|c| &c.selector))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Op(ComparisonOperator),
    And,
    Or,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_none() {
                    return Err(ExprError::UnexpectedToken("&".into()));
                }
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_none() {
                    return Err(ExprError::UnexpectedToken("|".into()));
                }
                tokens.push(Token::Or);
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(ExprError::UnexpectedToken("=".into()));
                }
                tokens.push(Token::Op(ComparisonOperator::Equal));
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(ExprError::UnexpectedToken("!".into()));
                }
                tokens.push(Token::Op(ComparisonOperator::NotEqual));
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Op(ComparisonOperator::GreaterOrEqual));
                } else {
                    tokens.push(Token::Op(ComparisonOperator::GreaterThan));
                }
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Op(ComparisonOperator::LessOrEqual));
                } else {
                    tokens.push(Token::Op(ComparisonOperator::LessThan));
                }
            }
            quote @ ('\'' | '"') => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => s.push(c),
                        None => return Err(ExprError::UnterminatedString),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if word == "contains" {
                    tokens.push(Token::Op(ComparisonOperator::Contains));
                } else {
                    tokens.push(Token::Word(word));
                }
            }
            other => return Err(ExprError::UnexpectedToken(other.to_string())),
        }
    }

    Ok(tokens)
}

fn literal_from_word(word: &str) -> Value {
    match word {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            if let Ok(i) = word.parse::<i64>() {
                Value::Int(i)
            } else if let Ok(f) = word.parse::<f64>() {
                Value::Float(f)
            } else {
                Value::String(word.to_string())
            }
        }
    }
}

/// Parse a convergence expression. Any failure here means the expression
/// is degenerate and the owning cycle group must be rejected.
pub fn parse_expr(input: &str) -> Result<ConvergeExpr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }

    let mut groups: Vec<Vec<Condition>> = Vec::new();
    let mut current: Vec<Condition> = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    loop {
        let selector = match iter.next() {
            Some(Token::Word(w)) => {
                Selector::parse(&w).ok_or(ExprError::InvalidSelector(w))?
            }
            Some(Token::Str(s)) => return Err(ExprError::InvalidSelector(s)),
            Some(Token::Op(_)) | Some(Token::And) | Some(Token::Or) => {
                return Err(ExprError::DanglingLogical)
            }
            None => return Err(ExprError::DanglingLogical),
        };

        let test = if let Some(Token::Op(_)) = iter.peek() {
            let Some(Token::Op(op)) = iter.next() else {
                unreachable!()
            };
            let value = match iter.next() {
                Some(Token::Word(w)) => literal_from_word(&w),
                Some(Token::Str(s)) => Value::String(s),
                Some(other) => {
                    return Err(ExprError::UnexpectedToken(format!("{:?}", other)))
                }
                None => return Err(ExprError::MissingValue),
            };
            Some((op, value))
        } else {
            None
        };

        current.push(Condition { selector, test });

        match iter.next() {
            Some(Token::And) => continue,
            Some(Token::Or) => {
                groups.push(std::mem::take(&mut current));
                continue;
            }
            Some(other) => return Err(ExprError::UnexpectedToken(format!("{:?}", other))),
            None => break,
        }
    }

    groups.push(current);
    Ok(ConvergeExpr { groups })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(node: &str, field: &str, value: Value) -> HashMap<String, ValueMap> {
        let mut bag = ValueMap::new();
        bag.insert(field.to_string(), value);
        let mut map = HashMap::new();
        map.insert(node.to_string(), bag);
        map
    }

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse_expr("critic.score >= 0.9").unwrap();
        assert!(expr.evaluate(&outputs("critic", "score", Value::Float(0.95))));
        assert!(!expr.evaluate(&outputs("critic", "score", Value::Float(0.5))));
    }

    #[test]
    fn test_parse_string_literal() {
        let expr = parse_expr("review.verdict == 'approved'").unwrap();
        assert!(expr.evaluate(&outputs("review", "verdict", Value::String("approved".into()))));
    }

    #[test]
    fn test_and_or_precedence() {
        // a.x > 1 && a.y > 1 is one group; b.z alone is another.
        let expr = parse_expr("a.x > 1 && a.y > 1 || b.z").unwrap();

        let mut bags = HashMap::new();
        let mut a = ValueMap::new();
        a.insert("x".to_string(), Value::Int(5));
        a.insert("y".to_string(), Value::Int(0));
        bags.insert("a".to_string(), a);
        assert!(!expr.evaluate(&bags));

        let mut b = ValueMap::new();
        b.insert("z".to_string(), Value::Bool(true));
        bags.insert("b".to_string(), b);
        assert!(expr.evaluate(&bags));
    }

    #[test]
    fn test_bare_selector_is_truthiness() {
        let expr = parse_expr("gate.open").unwrap();
        assert!(expr.evaluate(&outputs("gate", "open", Value::Bool(true))));
        assert!(!expr.evaluate(&outputs("gate", "open", Value::Int(0))));
    }

    #[test]
    fn test_contains_keyword() {
        let expr = parse_expr("log.text contains 'done'").unwrap();
        assert!(expr.evaluate(&outputs("log", "text", Value::String("all done".into()))));
    }

    #[test]
    fn test_degenerate_expressions() {
        assert_eq!(parse_expr(""), Err(ExprError::Empty));
        assert_eq!(parse_expr("   "), Err(ExprError::Empty));
        assert!(matches!(
            parse_expr("noselector == 1"),
            Err(ExprError::InvalidSelector(_))
        ));
        assert_eq!(parse_expr("a.b =="), Err(ExprError::MissingValue));
        assert_eq!(parse_expr("a.b && "), Err(ExprError::DanglingLogical));
        assert_eq!(parse_expr("&& a.b"), Err(ExprError::DanglingLogical));
        assert!(matches!(
            parse_expr("a.b = 1"),
            Err(ExprError::UnexpectedToken(_))
        ));
        assert_eq!(parse_expr("a.b == 'x"), Err(ExprError::UnterminatedString));
    }

    #[test]
    fn test_selectors_listed() {
        let expr = parse_expr("a.x > 1 || b.y == 2").unwrap();
        let sels: Vec<String> = expr.selectors().iter().map(|s| s.to_string()).collect();
        assert_eq!(sels, vec!["a.x", "b.y"]);
    }

    #[test]
    fn test_numeric_literal_classification() {
        let expr = parse_expr("n.count == 3").unwrap();
        assert!(expr.evaluate(&outputs("n", "count", Value::Int(3))));
        let expr = parse_expr("n.ratio < 0.5").unwrap();
        assert!(expr.evaluate(&outputs("n", "ratio", Value::Float(0.25))));
    }
}
