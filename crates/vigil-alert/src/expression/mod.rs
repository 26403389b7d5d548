//! Per-timestamp evaluation of a trigger's rule.
//!
//! A trigger is either a plain warn/error threshold check or a custom
//! expression over the aligned target values. The variant is resolved once
//! per check with [`TriggerRule::resolve`]; each timestamp then builds a
//! [`TriggerExpression`] and evaluates it.
//!
//! Expression variables: `t1` (main target), `t2`.. (additional targets),
//! `warn_value`, `error_value`, `PREV_STATE`, and the state literals `OK`,
//! `WARN`/`WARNING`, `ERROR`/`CRIT`, `NODATA`.

pub mod parser;

use parser::{BinaryOp, Expr, UnaryOp};
use std::collections::HashMap;
use vigil_common::types::{State, Trigger};

/// Label of the main target inside expressions.
pub const MAIN_TARGET_LABEL: &str = "t1";

/// Label of the additional target at `index` (0-based among additional targets).
pub fn additional_target_label(index: usize) -> String {
    format!("t{}", index + 2)
}

/// Errors raised while parsing or evaluating a trigger expression.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    #[error("Invalid expression: {0}")]
    Invalid(String),

    /// An identifier is called like a function; the expression language has none.
    #[error("Unknown function: \"{0}\"")]
    UnknownFunction(String),

    #[error("Unknown variable: \"{0}\"")]
    UnknownVariable(String),

    #[error("Operator '{op}' cannot be applied to {operands}")]
    TypeMismatch { op: String, operands: String },

    #[error("Expression evaluated to {0}, expected a state")]
    NotAState(String),

    #[error("Trigger has neither warn_value nor error_value")]
    MissingThresholds,
}

/// How a trigger turns aligned values into a state.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerRule {
    Simple {
        warn: Option<f64>,
        error: Option<f64>,
    },
    Expression(Expr),
}

impl TriggerRule {
    /// Picks the rule variant of `trigger`, parsing its custom expression.
    pub fn resolve(trigger: &Trigger) -> Result<Self, ExpressionError> {
        match trigger.custom_expression() {
            Some(source) => Ok(Self::Expression(parser::parse(source)?)),
            None => {
                if trigger.warn_value.is_none() && trigger.error_value.is_none() {
                    return Err(ExpressionError::MissingThresholds);
                }
                Ok(Self::Simple {
                    warn: trigger.warn_value,
                    error: trigger.error_value,
                })
            }
        }
    }
}

/// Values available to the rule at one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerExpression {
    pub main_target_value: f64,
    /// Additional target values keyed by label (`t2`, `t3`, ...).
    pub additional_target_values: HashMap<String, f64>,
    pub warn_value: Option<f64>,
    pub error_value: Option<f64>,
    pub previous_state: State,
}

impl TriggerExpression {
    /// Evaluates `rule` against these values.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use vigil_alert::expression::{TriggerExpression, TriggerRule};
    /// use vigil_common::types::State;
    ///
    /// let rule = TriggerRule::Simple { warn: Some(3.0), error: Some(5.0) };
    /// let values = TriggerExpression {
    ///     main_target_value: 4.0,
    ///     additional_target_values: HashMap::new(),
    ///     warn_value: Some(3.0),
    ///     error_value: Some(5.0),
    ///     previous_state: State::Ok,
    /// };
    /// assert_eq!(values.evaluate(&rule).unwrap(), State::Warn);
    /// ```
    pub fn evaluate(&self, rule: &TriggerRule) -> Result<State, ExpressionError> {
        match rule {
            TriggerRule::Simple { warn, error } => self.evaluate_thresholds(*warn, *error),
            TriggerRule::Expression(expr) => match self.eval(expr)? {
                Value::State(state) => Ok(state),
                other => Err(ExpressionError::NotAState(other.describe())),
            },
        }
    }

    fn evaluate_thresholds(&self, warn: Option<f64>, error: Option<f64>) -> Result<State, ExpressionError> {
        let value = self.main_target_value;
        let state = match (warn, error) {
            (Some(warn), Some(error)) if warn <= error => {
                if value >= error {
                    State::Crit
                } else if value >= warn {
                    State::Warn
                } else {
                    State::Ok
                }
            }
            (Some(warn), Some(error)) => {
                if value <= error {
                    State::Crit
                } else if value <= warn {
                    State::Warn
                } else {
                    State::Ok
                }
            }
            (Some(warn), None) if value >= warn => State::Warn,
            (None, Some(error)) if value >= error => State::Crit,
            (Some(_), None) | (None, Some(_)) => State::Ok,
            (None, None) => return Err(ExpressionError::MissingThresholds),
        };
        Ok(state)
    }

    fn variable(&self, name: &str) -> Result<Value, ExpressionError> {
        let value = match name {
            MAIN_TARGET_LABEL => Some(Value::Number(self.main_target_value)),
            "warn_value" => self.warn_value.map(Value::Number),
            "error_value" => self.error_value.map(Value::Number),
            "PREV_STATE" => Some(Value::State(self.previous_state)),
            _ => self.additional_target_values.get(name).copied().map(Value::Number),
        };
        value.ok_or_else(|| ExpressionError::UnknownVariable(name.to_string()))
    }

    fn eval(&self, expr: &Expr) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::State(state) => Ok(Value::State(*state)),
            Expr::Var(name) => self.variable(name),
            Expr::Unary(op, inner) => match (op, self.eval(inner)?) {
                (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (op, value) => Err(ExpressionError::TypeMismatch {
                    op: if *op == UnaryOp::Neg { "-" } else { "!" }.to_string(),
                    operands: value.describe(),
                }),
            },
            Expr::Ternary(cond, then, otherwise) => match self.eval(cond)? {
                Value::Bool(true) => self.eval(then),
                Value::Bool(false) => self.eval(otherwise),
                other => Err(ExpressionError::TypeMismatch {
                    op: "?:".to_string(),
                    operands: other.describe(),
                }),
            },
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                Ok(Value::Bool(self.eval_bool(BinaryOp::And, lhs)? && self.eval_bool(BinaryOp::And, rhs)?))
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                Ok(Value::Bool(self.eval_bool(BinaryOp::Or, lhs)? || self.eval_bool(BinaryOp::Or, rhs)?))
            }
            Expr::Binary(op, lhs, rhs) => apply_binary(*op, self.eval(lhs)?, self.eval(rhs)?),
        }
    }

    fn eval_bool(&self, op: BinaryOp, expr: &Expr) -> Result<bool, ExpressionError> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExpressionError::TypeMismatch {
                op: op.to_string(),
                operands: other.describe(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Number(f64),
    Bool(bool),
    State(State),
}

impl Value {
    fn describe(&self) -> String {
        match self {
            Value::Number(n) => format!("number {n}"),
            Value::Bool(b) => format!("bool {b}"),
            Value::State(s) => format!("state {s}"),
        }
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExpressionError> {
    let value = match (op, lhs, rhs) {
        (BinaryOp::Eq, a, b) if same_kind(a, b) => Value::Bool(a == b),
        (BinaryOp::Ne, a, b) if same_kind(a, b) => Value::Bool(a != b),
        (BinaryOp::Lt, Value::Number(a), Value::Number(b)) => Value::Bool(a < b),
        (BinaryOp::Le, Value::Number(a), Value::Number(b)) => Value::Bool(a <= b),
        (BinaryOp::Gt, Value::Number(a), Value::Number(b)) => Value::Bool(a > b),
        (BinaryOp::Ge, Value::Number(a), Value::Number(b)) => Value::Bool(a >= b),
        (BinaryOp::Add, Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (BinaryOp::Sub, Value::Number(a), Value::Number(b)) => Value::Number(a - b),
        (BinaryOp::Mul, Value::Number(a), Value::Number(b)) => Value::Number(a * b),
        (BinaryOp::Div, Value::Number(a), Value::Number(b)) => Value::Number(a / b),
        (op, a, b) => {
            return Err(ExpressionError::TypeMismatch {
                op: op.to_string(),
                operands: format!("{} and {}", a.describe(), b.describe()),
            })
        }
    };
    Ok(value)
}

fn same_kind(a: Value, b: Value) -> bool {
    std::mem::discriminant(&a) == std::mem::discriminant(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(main: f64, additional: &[(&str, f64)]) -> TriggerExpression {
        TriggerExpression {
            main_target_value: main,
            additional_target_values: additional
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            warn_value: Some(10.0),
            error_value: Some(20.0),
            previous_state: State::Warn,
        }
    }

    fn eval(source: &str, values: &TriggerExpression) -> Result<State, ExpressionError> {
        values.evaluate(&TriggerRule::Expression(parser::parse(source)?))
    }

    #[test]
    fn ascending_thresholds() {
        let rule = TriggerRule::Simple { warn: Some(3.0), error: Some(5.0) };
        assert_eq!(values(1.0, &[]).evaluate(&rule).unwrap(), State::Ok);
        assert_eq!(values(3.0, &[]).evaluate(&rule).unwrap(), State::Warn);
        assert_eq!(values(6.0, &[]).evaluate(&rule).unwrap(), State::Crit);
    }

    #[test]
    fn descending_thresholds() {
        let rule = TriggerRule::Simple { warn: Some(50.0), error: Some(10.0) };
        assert_eq!(values(80.0, &[]).evaluate(&rule).unwrap(), State::Ok);
        assert_eq!(values(40.0, &[]).evaluate(&rule).unwrap(), State::Warn);
        assert_eq!(values(10.0, &[]).evaluate(&rule).unwrap(), State::Crit);
    }

    #[test]
    fn single_threshold_is_ascending() {
        let rule = TriggerRule::Simple { warn: None, error: Some(5.0) };
        assert_eq!(values(4.0, &[]).evaluate(&rule).unwrap(), State::Ok);
        assert_eq!(values(5.0, &[]).evaluate(&rule).unwrap(), State::Crit);
    }

    #[test]
    fn resolve_requires_thresholds_without_expression() {
        let trigger: Trigger =
            serde_json::from_str(r#"{"id":"t","name":"n","targets":["a.b"]}"#).unwrap();
        assert!(matches!(
            TriggerRule::resolve(&trigger),
            Err(ExpressionError::MissingThresholds)
        ));
    }

    #[test]
    fn expression_uses_targets_and_thresholds() {
        let v = values(15.0, &[("t2", 2.0)]);
        assert_eq!(eval("t1 / t2 > warn_value ? ERROR : OK", &v).unwrap(), State::Ok);
        assert_eq!(eval("t1 * t2 >= error_value ? ERROR : OK", &v).unwrap(), State::Crit);
        assert_eq!(
            eval("t1 > error_value ? ERROR : (t1 > warn_value ? WARN : OK)", &v).unwrap(),
            State::Warn
        );
    }

    #[test]
    fn expression_precedence_and_logic() {
        let v = values(5.0, &[("t2", 1.0)]);
        assert_eq!(eval("1 + 2 * 3 == 7 && !(t2 > 1) ? WARNING : OK", &v).unwrap(), State::Warn);
        assert_eq!(eval("t1 < 0 || -t1 < 0 ? NODATA : OK", &v).unwrap(), State::Nodata);
        assert_eq!(eval("PREV_STATE == WARN ? PREV_STATE : OK", &v).unwrap(), State::Warn);
    }

    #[test]
    fn expression_errors() {
        let v = values(5.0, &[]);
        assert!(matches!(eval("t3 > 1 ? OK : WARN", &v), Err(ExpressionError::UnknownVariable(name)) if name == "t3"));
        assert!(matches!(eval("max(t1) > 1 ? OK : WARN", &v), Err(ExpressionError::UnknownFunction(name)) if name == "max"));
        assert!(matches!(eval("t1 + 1", &v), Err(ExpressionError::NotAState(_))));
        assert!(matches!(eval("t1 && OK", &v), Err(ExpressionError::TypeMismatch { .. })));
        assert!(matches!(eval("t1 > 1 ? OK", &v), Err(ExpressionError::Invalid(_))));
        assert!(matches!(eval("t1 = 1 ? OK : WARN", &v), Err(ExpressionError::Invalid(_))));
        assert!(matches!(eval("(t1 > 1 ? OK : WARN", &v), Err(ExpressionError::Invalid(_))));
    }

    #[test]
    fn deeply_nested_expression_is_rejected() {
        let v = values(5.0, &[]);
        let depth = parser::MAX_NESTING_DEPTH;
        let nested = format!("{}t1 > 1{} ? OK : WARN", "(".repeat(depth - 1), ")".repeat(depth - 1));
        assert_eq!(eval(&nested, &v).unwrap(), State::Ok);

        let parens = format!("{}t1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(parser::parse(&parens), Err(ExpressionError::Invalid(_))));
        let negations = format!("{}t1 > 1 ? OK : WARN", "-".repeat(10_000));
        assert!(matches!(parser::parse(&negations), Err(ExpressionError::Invalid(_))));
    }
}
