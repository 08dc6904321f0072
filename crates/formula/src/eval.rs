//! Tree-walking evaluator.
//!
//! Works over a parse-validated AST, so the only failures left here are
//! runtime ones: type mismatches, division by zero, an attribute a view
//! declines to provide, or a query that fails. Operands evaluate left to
//! right; `&&` and `||` short-circuit and never touch their right side when
//! the left decides the result.

use crate::ast::{BinaryOp, Expr, Subject, UnaryOp};
use crate::query;
use crate::value::Value;
use crate::view::{EntityView, QueryError};
use thiserror::Error;

/// Runtime evaluation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("operator '{op}' cannot combine {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("division by zero in '{op}'")]
    DivisionByZero { op: &'static str },

    #[error("operator '{op}' cannot order {left} and {right}")]
    IncomparableTypes {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("formula references the target but no target was supplied")]
    MissingTarget,

    #[error("attribute '{subject}.{group}.{attribute}' is not available on this entity")]
    AttributeUnavailable {
        subject: String,
        group: String,
        attribute: String,
    },

    #[error("query '{name}' failed: {source}")]
    QueryFailed {
        name: String,
        #[source]
        source: QueryError,
    },
}

/// Evaluate a parsed formula against an actor and an optional target.
pub fn evaluate(
    expr: &Expr,
    actor: &dyn EntityView,
    target: Option<&dyn EntityView>,
) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(value) => Ok(Value::Number(*value)),
        Expr::Text(text) => Ok(Value::Text(text.clone())),
        Expr::Grouping(inner) => evaluate(inner, actor, target),

        Expr::Attribute {
            subject,
            group,
            attribute,
        } => {
            let view = match subject {
                Subject::Actor => actor,
                Subject::Target => target.ok_or(EvalError::MissingTarget)?,
            };
            view.get(group, attribute)
                .ok_or_else(|| EvalError::AttributeUnavailable {
                    subject: subject.to_string(),
                    group: group.clone(),
                    attribute: attribute.clone(),
                })
        }

        Expr::Unary { op, operand } => {
            let value = evaluate(operand, actor, target)?;
            apply_unary(*op, value)
        }

        Expr::Binary { op, left, right } => match op {
            // Short-circuit forms evaluate the right side lazily.
            BinaryOp::And | BinaryOp::Or => {
                let lhs = evaluate(left, actor, target)?;
                let lhs = expect_bool(*op, &lhs, "left")?;
                let decided = match op {
                    BinaryOp::And => !lhs,
                    _ => lhs,
                };
                if decided {
                    return Ok(Value::Bool(lhs));
                }
                let rhs = evaluate(right, actor, target)?;
                let rhs = expect_bool(*op, &rhs, "right")?;
                Ok(Value::Bool(rhs))
            }
            _ => {
                let lhs = evaluate(left, actor, target)?;
                let rhs = evaluate(right, actor, target)?;
                apply_binary(*op, lhs, rhs)
            }
        },

        Expr::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len() + 1);
            // Target-directed queries receive the target's name as an
            // implicit first argument.
            let desc = query::get(name);
            if desc.map(|d| d.requires_target).unwrap_or(false) {
                let target = target.ok_or(EvalError::MissingTarget)?;
                values.push(Value::Text(target.name().to_string()));
            }
            for arg in args {
                values.push(evaluate(arg, actor, target)?);
            }
            actor
                .query(name, &values)
                .map_err(|source| EvalError::QueryFailed {
                    name: name.clone(),
                    source,
                })
        }
    }
}

fn expect_bool(op: BinaryOp, value: &Value, side: &str) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| EvalError::TypeMismatch {
        op: op.symbol(),
        left: if side == "left" { value.kind() } else { "boolean" },
        right: if side == "left" { "boolean" } else { value.kind() },
    })
}

fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, &value) {
        (UnaryOp::Neg, Value::Number(v)) => Ok(Value::Number(-v)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        _ => Err(EvalError::TypeMismatch {
            op: op.symbol(),
            left: value.kind(),
            right: value.kind(),
        }),
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            // Either side being text turns `+` into concatenation.
            (Value::Text(_), _) | (_, Value::Text(_)) => {
                Ok(Value::Text(format!("{}{}", lhs, rhs)))
            }
            _ => Err(mismatch(op, &lhs, &rhs)),
        },

        BinaryOp::Sub | BinaryOp::Mul => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(match op {
                BinaryOp::Sub => a - b,
                _ => a * b,
            })),
            _ => Err(mismatch(op, &lhs, &rhs)),
        },

        BinaryOp::Div | BinaryOp::Rem => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => {
                if *b == 0.0 {
                    return Err(EvalError::DivisionByZero { op: op.symbol() });
                }
                Ok(Value::Number(match op {
                    BinaryOp::Div => a / b,
                    _ => a % b,
                }))
            }
            _ => Err(mismatch(op, &lhs, &rhs)),
        },

        BinaryOp::Eq | BinaryOp::Ne => {
            if lhs.kind() != rhs.kind() {
                return Err(EvalError::IncomparableTypes {
                    op: op.symbol(),
                    left: lhs.kind(),
                    right: rhs.kind(),
                });
            }
            let equal = lhs == rhs;
            Ok(Value::Bool(match op {
                BinaryOp::Eq => equal,
                _ => !equal,
            }))
        }

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(EvalError::IncomparableTypes {
                        op: op.symbol(),
                        left: lhs.kind(),
                        right: rhs.kind(),
                    })
                }
            };
            // NaN comparisons are false either way.
            let result = match ordering {
                Some(ord) => match op {
                    BinaryOp::Lt => ord.is_lt(),
                    BinaryOp::Le => ord.is_le(),
                    BinaryOp::Gt => ord.is_gt(),
                    _ => ord.is_ge(),
                },
                None => false,
            };
            Ok(Value::Bool(result))
        }

        // Handled above; unreachable through evaluate().
        BinaryOp::And | BinaryOp::Or => {
            let lhs = expect_bool(op, &lhs, "left")?;
            let rhs = expect_bool(op, &rhs, "right")?;
            Ok(Value::Bool(match op {
                BinaryOp::And => lhs && rhs,
                _ => lhs || rhs,
            }))
        }
    }
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.symbol(),
        left: lhs.kind(),
        right: rhs.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::schema::{AttributeSchema, ValueType};
    use std::collections::HashMap;

    struct TestView {
        name: String,
        attrs: HashMap<(String, String), Value>,
        affinities: HashMap<(String, String), f64>,
        grievances: HashMap<String, f64>,
    }

    impl TestView {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                attrs: HashMap::new(),
                affinities: HashMap::new(),
                grievances: HashMap::new(),
            }
        }

        fn attr(mut self, group: &str, attribute: &str, value: impl Into<Value>) -> Self {
            self.attrs
                .insert((group.to_string(), attribute.to_string()), value.into());
            self
        }

        fn affinity(mut self, other: &str, kind: &str, score: f64) -> Self {
            self.affinities
                .insert((other.to_string(), kind.to_string()), score);
            self
        }
    }

    impl EntityView for TestView {
        fn name(&self) -> &str {
            &self.name
        }

        fn get(&self, group: &str, attribute: &str) -> Option<Value> {
            self.attrs
                .get(&(group.to_string(), attribute.to_string()))
                .cloned()
        }

        fn query(&self, name: &str, args: &[Value]) -> Result<Value, QueryError> {
            match name {
                "relationship" => {
                    let other = args[0].as_text().unwrap().to_string();
                    let kind = args[1].as_text().unwrap().to_string();
                    Ok(Value::Number(
                        self.affinities.get(&(other, kind)).copied().unwrap_or(0.0),
                    ))
                }
                "grievance" => {
                    let other = args[0].as_text().unwrap();
                    Ok(Value::Number(
                        self.grievances.get(other).copied().unwrap_or(0.0),
                    ))
                }
                _ => Err(QueryError::new(format!("unhandled query '{name}'"))),
            }
        }
    }

    fn schema() -> AttributeSchema {
        let mut schema = AttributeSchema::new();
        schema.add("core", "charisma", ValueType::Number);
        schema.add("personality", "extraversion", ValueType::Number);
        schema.add("dynamic", "emotional_state", ValueType::Text);
        schema.add("dynamic", "health", ValueType::Number);
        schema
    }

    fn eval_src(
        source: &str,
        requires_target: bool,
        actor: &TestView,
        target: Option<&TestView>,
    ) -> Result<Value, EvalError> {
        let tokens = tokenize(source).unwrap();
        let expr = parse(&tokens, &schema(), requires_target).unwrap();
        evaluate(&expr, actor, target.map(|t| t as &dyn EntityView))
    }

    #[test]
    fn test_weighted_attribute_sum() {
        let actor = TestView::new("Mira")
            .attr("core", "charisma", 35.0)
            .attr("personality", "extraversion", 10.0);
        let result = eval_src(
            "(actor.core.charisma * 1.5) + (actor.personality.extraversion * 0.5)",
            false,
            &actor,
            None,
        )
        .unwrap();
        assert_eq!(result, Value::Number(57.5));
    }

    #[test]
    fn test_text_equality() {
        let actor = TestView::new("Mira").attr("dynamic", "emotional_state", "joyful");
        let result = eval_src(
            "actor.dynamic.emotional_state == \"joyful\"",
            false,
            &actor,
            None,
        )
        .unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_cross_kind_equality_is_error() {
        let actor = TestView::new("Mira").attr("dynamic", "emotional_state", "joyful");
        let err = eval_src("actor.dynamic.emotional_state == 1", false, &actor, None).unwrap_err();
        assert!(matches!(
            err,
            EvalError::IncomparableTypes {
                op: "==",
                left: "text",
                right: "number",
            }
        ));
    }

    #[test]
    fn test_cross_kind_inequality_is_error() {
        let actor = TestView::new("Mira");
        let err = eval_src("(1 < 2) != 1", false, &actor, None).unwrap_err();
        assert!(matches!(err, EvalError::IncomparableTypes { op: "!=", .. }));
    }

    #[test]
    fn test_concat_number_and_text() {
        let actor = TestView::new("Mira").attr("dynamic", "health", 57.5);
        let result = eval_src("\"hp: \" + actor.dynamic.health", false, &actor, None).unwrap();
        assert_eq!(result, Value::Text("hp: 57.5".into()));

        let actor = TestView::new("Mira").attr("dynamic", "health", 57.0);
        let result = eval_src("\"hp: \" + actor.dynamic.health", false, &actor, None).unwrap();
        assert_eq!(result, Value::Text("hp: 57".into()));
    }

    #[test]
    fn test_division_by_zero() {
        let actor = TestView::new("Mira");
        let err = eval_src("1 / 0", false, &actor, None).unwrap_err();
        assert!(matches!(err, EvalError::DivisionByZero { op: "/" }));
        let err = eval_src("1 % 0", false, &actor, None).unwrap_err();
        assert!(matches!(err, EvalError::DivisionByZero { op: "%" }));
    }

    #[test]
    fn test_short_circuit_and_skips_rhs() {
        // The right side would fail (attribute unavailable), but the left
        // side already decides the result.
        let actor = TestView::new("Mira").attr("dynamic", "health", 10.0);
        let result = eval_src(
            "1 > 2 && actor.core.charisma > 0",
            false,
            &actor,
            None,
        )
        .unwrap();
        assert_eq!(result, Value::Bool(false));
    }

    #[test]
    fn test_short_circuit_or_skips_rhs() {
        let actor = TestView::new("Mira");
        let result = eval_src("1 < 2 || actor.core.charisma > 0", false, &actor, None).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_logical_needs_bool() {
        let actor = TestView::new("Mira");
        let err = eval_src("1 && 2 < 3", false, &actor, None).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { op: "&&", .. }));
    }

    #[test]
    fn test_bool_ordering_is_error() {
        let actor = TestView::new("Mira");
        let err = eval_src("(1 < 2) < (3 < 4)", false, &actor, None).unwrap_err();
        assert!(matches!(err, EvalError::IncomparableTypes { op: "<", .. }));
    }

    #[test]
    fn test_text_ordering() {
        let actor = TestView::new("Mira");
        let result = eval_src("\"apple\" < \"banana\"", false, &actor, None).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_unary() {
        let actor = TestView::new("Mira").attr("dynamic", "health", 40.0);
        let result = eval_src("-actor.dynamic.health", false, &actor, None).unwrap();
        assert_eq!(result, Value::Number(-40.0));
        let result = eval_src("!(1 > 2)", false, &actor, None).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_negate_text_is_error() {
        let actor = TestView::new("Mira");
        let err = eval_src("-\"oops\"", false, &actor, None).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { op: "-", .. }));
    }

    #[test]
    fn test_attribute_unavailable() {
        let actor = TestView::new("Mira");
        let err = eval_src("actor.core.charisma", false, &actor, None).unwrap_err();
        assert!(matches!(
            err,
            EvalError::AttributeUnavailable { ref attribute, .. } if attribute == "charisma"
        ));
    }

    #[test]
    fn test_target_attribute() {
        let actor = TestView::new("Mira");
        let target = TestView::new("Joss").attr("core", "charisma", 12.0);
        let result = eval_src("target.core.charisma", true, &actor, Some(&target)).unwrap();
        assert_eq!(result, Value::Number(12.0));
    }

    #[test]
    fn test_missing_target() {
        let actor = TestView::new("Mira");
        let err = eval_src("target.core.charisma", true, &actor, None).unwrap_err();
        assert!(matches!(err, EvalError::MissingTarget));
    }

    #[test]
    fn test_relationship_query_threads_target_name() {
        let actor = TestView::new("Mira").affinity("Joss", "trust", 0.8);
        let target = TestView::new("Joss");
        let result = eval_src(
            "relationship(\"trust\") * 100",
            true,
            &actor,
            Some(&target),
        )
        .unwrap();
        assert_eq!(result, Value::Number(80.0));
    }

    #[test]
    fn test_grievance_query() {
        let mut actor = TestView::new("Mira");
        actor.grievances.insert("Joss".into(), 3.0);
        let target = TestView::new("Joss");
        let result = eval_src("grievance() > 2", true, &actor, Some(&target)).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_query_failure_wrapped() {
        struct FailingView;
        impl EntityView for FailingView {
            fn name(&self) -> &str {
                "x"
            }
            fn get(&self, _: &str, _: &str) -> Option<Value> {
                None
            }
            fn query(&self, _: &str, _: &[Value]) -> Result<Value, QueryError> {
                Err(QueryError::new("ledger offline"))
            }
        }
        let tokens = tokenize("grievance()").unwrap();
        let expr = parse(&tokens, &schema(), true).unwrap();
        let err = evaluate(&expr, &FailingView, Some(&FailingView)).unwrap_err();
        assert!(matches!(
            err,
            EvalError::QueryFailed { ref name, .. } if name == "grievance"
        ));
    }

    #[test]
    fn test_short_circuit_skips_failing_query() {
        struct NoQueries;
        impl EntityView for NoQueries {
            fn name(&self) -> &str {
                "x"
            }
            fn get(&self, _: &str, _: &str) -> Option<Value> {
                None
            }
            fn query(&self, name: &str, _: &[Value]) -> Result<Value, QueryError> {
                Err(QueryError::new(format!("query '{name}' should not run")))
            }
        }
        let tokens = tokenize("1 > 2 && grievance() > 0").unwrap();
        let expr = parse(&tokens, &schema(), true).unwrap();
        let result = evaluate(&expr, &NoQueries, Some(&NoQueries)).unwrap();
        assert_eq!(result, Value::Bool(false));
    }

    #[test]
    fn test_operands_left_to_right() {
        // Left operand's error surfaces even when the right would fail too.
        let actor = TestView::new("Mira");
        let err = eval_src(
            "actor.core.charisma + actor.dynamic.health",
            false,
            &actor,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EvalError::AttributeUnavailable { ref attribute, .. } if attribute == "charisma"
        ));
    }
}
