pub mod ast;
pub mod compile;
pub mod error;
pub mod field;
pub mod lexer;
pub mod parser;
pub mod value;

pub use compile::{compile, Predicate};
pub use field::Field;
