use super::ast::{Expr, Operand};
use super::error::{EvalError, QueryError};
use super::field::Field;
use super::parser::parse;
use super::value::{operator, OpFn, Value};
use crate::attendance::AttendanceRecord;
use std::borrow::Cow;

/// A compiled query. Holds no per-record state, so one predicate can be
/// evaluated against any number of records, from any number of threads.
#[derive(Debug, Clone)]
pub struct Predicate {
    root: Option<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Compare {
        apply: OpFn,
        left: Slot,
        right: Slot,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

#[derive(Debug, Clone)]
enum Slot {
    Field(Field),
    Const(Value<'static>),
}

impl Predicate {
    /// Accepts every record.
    pub fn always() -> Self {
        Self { root: None }
    }

    pub fn evaluate<R: AttendanceRecord + ?Sized>(&self, record: &R) -> Result<bool, EvalError> {
        match &self.root {
            Some(node) => node.evaluate(record),
            None => Ok(true),
        }
    }
}

impl Node {
    fn evaluate<R: AttendanceRecord + ?Sized>(&self, record: &R) -> Result<bool, EvalError> {
        match self {
            Node::Compare { apply, left, right } => {
                apply(&left.evaluate(record), &right.evaluate(record))
            }
            Node::And(l, r) => Ok(l.evaluate(record)? && r.evaluate(record)?),
            Node::Or(l, r) => Ok(l.evaluate(record)? || r.evaluate(record)?),
        }
    }
}

impl Slot {
    fn evaluate<'a, R: AttendanceRecord + ?Sized>(&'a self, record: &'a R) -> Value<'a> {
        match self {
            Slot::Field(field) => field.read(record),
            Slot::Const(value) => value.reborrow(),
        }
    }
}

/// Lowers a parsed expression into a predicate, resolving every operator once.
pub fn lower(expr: &Expr) -> Predicate {
    Predicate {
        root: Some(lower_node(expr)),
    }
}

fn lower_node(expr: &Expr) -> Node {
    match expr {
        Expr::Compare { op, left, right } => Node::Compare {
            apply: operator(*op),
            left: lower_operand(left),
            right: lower_operand(right),
        },
        Expr::And(l, r) => Node::And(Box::new(lower_node(l)), Box::new(lower_node(r))),
        Expr::Or(l, r) => Node::Or(Box::new(lower_node(l)), Box::new(lower_node(r))),
    }
}

fn lower_operand(operand: &Operand) -> Slot {
    match operand {
        Operand::Field(field) => Slot::Field(*field),
        Operand::String(s) => Slot::Const(Value::Str(Cow::Owned(s.clone()))),
        Operand::Number(n) => Slot::Const(Value::Num(*n)),
        Operand::Duration(d) => Slot::Const(Value::Dur(*d)),
        Operand::Timestamp(t) => Slot::Const(Value::Time(*t)),
        Operand::Status(s) => Slot::Const(Value::Status(*s)),
        Operand::Bool(b) => Slot::Const(Value::Bool(*b)),
    }
}

/// Compiles query text into a predicate. The empty query accepts everything
/// and never reaches the lexer.
pub fn compile(input: &str) -> Result<Predicate, QueryError> {
    if input.is_empty() {
        return Ok(Predicate::always());
    }

    let expr = parse(input)?;
    log::debug!("parsed query: {}", expr);
    Ok(lower(&expr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::tests::{at, attendee};
    use crate::attendance::{Attendee, Status};
    use crate::query::ast::CompareOp;
    use crate::query::error::LexError;
    use crate::query::value::ValueKind;

    fn alice() -> Attendee {
        attendee(
            "Alice",
            &[
                (Status::Joined, at(10, 0, 0)),
                (Status::Left, at(10, 5, 0)),
                (Status::Joined, at(10, 10, 0)),
                (Status::Left, at(10, 40, 0)),
            ],
        )
    }

    fn bob() -> Attendee {
        attendee(
            "Bob",
            &[(Status::Joined, at(9, 50, 0)), (Status::Left, at(10, 50, 0))],
        )
    }

    fn carol() -> Attendee {
        attendee("Carol", &[(Status::Joined, at(10, 30, 0))])
    }

    fn everyone() -> Vec<Attendee> {
        vec![alice(), bob(), carol()]
    }

    fn matching(query: &str) -> Vec<String> {
        let predicate = compile(query).unwrap();
        everyone()
            .into_iter()
            .filter(|a| predicate.evaluate(a).unwrap())
            .map(|a| a.name().to_string())
            .collect()
    }

    #[test]
    fn test_empty_query_accepts_everything() {
        assert_eq!(matching(""), vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn test_name_equality() {
        assert_eq!(matching(r#"name == "Alice""#), vec!["Alice"]);
        assert_eq!(matching(r#"name != "Alice""#), vec!["Bob", "Carol"]);
    }

    #[test]
    fn test_total_boundary_is_inclusive() {
        assert_eq!(matching("total >= (01:00:00)"), vec!["Bob"]);
        assert_eq!(matching("total == (01:00:00)"), vec!["Bob"]);
        assert_eq!(matching("total > (01:00:00)"), Vec::<String>::new());
    }

    #[test]
    fn test_durations_membership() {
        assert_eq!(matching("durations % (00:05:00)"), vec!["Alice"]);
        assert_eq!(matching("durations % (00:30:00)"), vec!["Alice", "Carol"]);
    }

    #[test]
    fn test_status_and_timestamps() {
        assert_eq!(matching("final_status == joined"), vec!["Carol"]);
        assert_eq!(matching("final_status < left"), vec!["Carol"]);
        assert_eq!(
            matching("first_join < (2021-03-15 10:00:00)"),
            vec!["Bob"]
        );
        assert_eq!(
            matching("last_left >= (2021-03-15 10:50:00)"),
            vec!["Bob", "Carol"]
        );
    }

    #[test]
    fn test_substring() {
        assert_eq!(matching(r#"name % "o""#), vec!["Bob", "Carol"]);
    }

    #[test]
    fn test_quoted_status_fails_to_compile() {
        assert!(matches!(
            compile(r#"final_status == "joined""#),
            Err(QueryError::Syntax(_))
        ));
    }

    #[test]
    fn test_and_or_grouping_is_left_flat() {
        // left-flat: (Alice or Bob) and joined => nobody
        // precedence-aware: Alice or (Bob and joined) => Alice
        let query = r#"name == "Alice" or name == "Bob" and final_status == joined"#;
        assert_eq!(matching(query), Vec::<String>::new());

        let query = r#"name == "Alice" or name == "Carol" and final_status == joined"#;
        assert_eq!(matching(query), vec!["Carol"]);

        let query = r#"name == "Alice" or (name == "Bob" and final_status == joined)"#;
        assert_eq!(matching(query), vec!["Alice"]);
    }

    #[test]
    fn test_compile_is_idempotent() {
        let query = r#"(total < (00:40:00) or name == "Bob") and durations % (00:30:00)"#;
        let first = compile(query).unwrap();
        let second = compile(query).unwrap();
        for a in everyone() {
            assert_eq!(first.evaluate(&a), second.evaluate(&a));
        }
    }

    #[test]
    fn test_type_mismatch_surfaces_at_evaluation() {
        let predicate = compile("name == 5").unwrap();
        assert_eq!(
            predicate.evaluate(&alice()),
            Err(EvalError::TypeMismatch {
                op: CompareOp::Eq,
                left: ValueKind::Str,
                right: ValueKind::Num,
            })
        );
    }

    #[test]
    fn test_unsupported_contains() {
        let predicate = compile("total % (00:05:00)").unwrap();
        assert_eq!(
            predicate.evaluate(&alice()),
            Err(EvalError::UnsupportedContains { left: ValueKind::Dur })
        );
    }

    #[test]
    fn test_and_skips_right_side_once_decided() {
        let predicate = compile(r#"name == "Bob" and name == 5"#).unwrap();
        assert_eq!(predicate.evaluate(&alice()), Ok(false));
        assert!(predicate.evaluate(&bob()).is_err());
    }

    #[test]
    fn test_lex_errors_fail_compilation() {
        assert!(matches!(
            compile("name ~ \"A\""),
            Err(QueryError::Lex(LexError::UnexpectedChar { found: '~', .. }))
        ));
    }

    #[test]
    fn test_predicate_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Predicate>();
    }
}
