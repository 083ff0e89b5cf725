use super::ast::CompareOp;
use super::value::ValueKind;
use std::fmt;
use thiserror::Error;

/// Failure to turn query text into a predicate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("query is {len} bytes long, the limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("query nests parentheses deeper than {max} levels")]
    TooDeep { max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character {found:?} at position {pos}")]
    UnexpectedChar { pos: usize, found: char },
    #[error("unknown word {word:?} at position {pos}")]
    UnknownWord { pos: usize, word: String },
    #[error("unterminated string starting at position {pos}")]
    UnterminatedString { pos: usize },
    #[error("invalid number {text:?} at position {pos}")]
    InvalidNumber { pos: usize, text: String },
    #[error("invalid timestamp {text:?} at position {pos}")]
    InvalidTimestamp { pos: usize, text: String },
}

/// Token stream does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub pos: usize,
    pub found: String,
    pub expected: Vec<&'static str>,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected {} at position {}", self.found, self.pos)?;
        if !self.expected.is_empty() {
            write!(f, ", expected one of: {}", self.expected.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

/// Raised while evaluating a compiled predicate against a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("cannot apply `{op}` to {left} and {right}")]
    TypeMismatch {
        op: CompareOp,
        left: ValueKind,
        right: ValueKind,
    },
    #[error("`%` needs a string or duration list on the left, got {left}")]
    UnsupportedContains { left: ValueKind },
}
