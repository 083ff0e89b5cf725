use super::ast::CompareOp;
use super::error::EvalError;
use crate::attendance::Status;
use chrono::{NaiveDateTime, TimeDelta};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// A runtime value produced by a literal or by reading a field off a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Str(Cow<'a, str>),
    Num(f64),
    Dur(TimeDelta),
    Time(NaiveDateTime),
    Bool(bool),
    Status(Status),
    DurList(Cow<'a, [TimeDelta]>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Num,
    Dur,
    Time,
    Bool,
    Status,
    DurList,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Str => "string",
            ValueKind::Num => "number",
            ValueKind::Dur => "duration",
            ValueKind::Time => "timestamp",
            ValueKind::Bool => "bool",
            ValueKind::Status => "status",
            ValueKind::DurList => "duration list",
        })
    }
}

impl Value<'_> {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Str(_) => ValueKind::Str,
            Value::Num(_) => ValueKind::Num,
            Value::Dur(_) => ValueKind::Dur,
            Value::Time(_) => ValueKind::Time,
            Value::Bool(_) => ValueKind::Bool,
            Value::Status(_) => ValueKind::Status,
            Value::DurList(_) => ValueKind::DurList,
        }
    }

    /// Borrows owned payloads instead of cloning them.
    pub fn reborrow(&self) -> Value<'_> {
        match self {
            Value::Str(s) => Value::Str(Cow::Borrowed(s.as_ref())),
            Value::DurList(l) => Value::DurList(Cow::Borrowed(l.as_ref())),
            Value::Num(n) => Value::Num(*n),
            Value::Dur(d) => Value::Dur(*d),
            Value::Time(t) => Value::Time(*t),
            Value::Bool(b) => Value::Bool(*b),
            Value::Status(s) => Value::Status(*s),
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Num(n) => write!(f, "{}", n),
            Value::Dur(d) => write_duration(f, *d),
            Value::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Status(s) => write!(f, "{}", s),
            Value::DurList(list) => {
                f.write_str("[")?;
                for (i, d) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_duration(f, *d)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// `H:MM:SS`, hours unpadded.
fn write_duration(f: &mut fmt::Formatter<'_>, d: TimeDelta) -> fmt::Result {
    let secs = d.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();
    write!(
        f,
        "{}{}:{:02}:{:02}",
        sign,
        secs / 3600,
        secs % 3600 / 60,
        secs % 60
    )
}

/// Operator resolved once at compile time.
pub type OpFn = for<'a, 'b> fn(&Value<'a>, &Value<'b>) -> Result<bool, EvalError>;

pub fn operator(op: CompareOp) -> OpFn {
    match op {
        CompareOp::Eq => eq,
        CompareOp::Ne => ne,
        CompareOp::Le => le,
        CompareOp::Ge => ge,
        CompareOp::Lt => lt,
        CompareOp::Gt => gt,
        CompareOp::Contains => contains,
    }
}

fn mismatch(op: CompareOp, left: &Value<'_>, right: &Value<'_>) -> EvalError {
    EvalError::TypeMismatch {
        op,
        left: left.kind(),
        right: right.kind(),
    }
}

fn equals(op: CompareOp, left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    Ok(match (left, right) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Num(a), Value::Num(b)) => a == b,
        (Value::Dur(a), Value::Dur(b)) => a == b,
        (Value::Time(a), Value::Time(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Status(a), Value::Status(b)) => a == b,
        (Value::DurList(a), Value::DurList(b)) => a == b,
        _ => return Err(mismatch(op, left, right)),
    })
}

/// `None` only for unordered floats.
fn ordering(
    op: CompareOp,
    left: &Value<'_>,
    right: &Value<'_>,
) -> Result<Option<Ordering>, EvalError> {
    Ok(match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
        (Value::Dur(a), Value::Dur(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Status(a), Value::Status(b)) => Some(a.cmp(b)),
        _ => return Err(mismatch(op, left, right)),
    })
}

fn eq(left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    equals(CompareOp::Eq, left, right)
}

fn ne(left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    equals(CompareOp::Ne, left, right).map(|b| !b)
}

fn le(left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    Ok(ordering(CompareOp::Le, left, right)?.is_some_and(Ordering::is_le))
}

fn ge(left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    Ok(ordering(CompareOp::Ge, left, right)?.is_some_and(Ordering::is_ge))
}

fn lt(left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    Ok(ordering(CompareOp::Lt, left, right)?.is_some_and(Ordering::is_lt))
}

fn gt(left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    Ok(ordering(CompareOp::Gt, left, right)?.is_some_and(Ordering::is_gt))
}

/// Right is an element of (duration list) or a substring of (string) left.
fn contains(left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    match (left, right) {
        (Value::DurList(list), Value::Dur(d)) => Ok(list.contains(d)),
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_ref())),
        (Value::DurList(_) | Value::Str(_), _) => Err(mismatch(CompareOp::Contains, left, right)),
        _ => Err(EvalError::UnsupportedContains { left: left.kind() }),
    }
}
