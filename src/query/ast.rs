use super::field::Field;
use crate::attendance::Status;
use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Contains,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Contains => "%",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One side of a comparison. Never a nested boolean expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(Field),
    String(String),
    Number(f64),
    Duration(TimeDelta),
    Timestamp(NaiveDateTime),
    Status(Status),
    Bool(bool),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Expr::And(l, r) => write!(f, "({} and {})", l, r),
            Expr::Or(l, r) => write!(f, "({} or {})", l, r),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Field(field) => write!(f, "{}", field),
            Operand::String(s) => write!(f, "{:?}", s),
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Duration(d) => {
                let secs = d.num_seconds();
                write!(
                    f,
                    "({:02}:{:02}:{:02})",
                    secs / 3600,
                    secs % 3600 / 60,
                    secs % 60
                )
            }
            Operand::Timestamp(t) => write!(f, "({})", t.format("%Y-%m-%d %H:%M:%S")),
            Operand::Status(s) => write!(f, "{}", s),
            Operand::Bool(b) => write!(f, "{}", b),
        }
    }
}
