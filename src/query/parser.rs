use super::ast::{Expr, Operand};
use super::error::{QueryError, SyntaxError};
use super::field::Field;
use super::lexer::{tokenize, Token, TokenKind};

/// Longest query text accepted.
pub const MAX_QUERY_LEN: usize = 4096;

/// Deepest parenthesised nesting accepted.
pub const MAX_DEPTH: usize = 64;

const VALUE_START: &[&str] = &[
    "field name",
    "status",
    "`(` duration `)`",
    "`(` timestamp `)`",
    "string",
    "number",
    "boolean",
];

const BINOP: &[&str] = &["`==`", "`!=`", "`<=`", "`>=`", "`<`", "`>`", "`%`"];

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with `Eof`, as produced by the lexer.
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse(mut self) -> Result<Expr, QueryError> {
        let expr = self.parse_expr()?;
        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected(&["`and`", "`or`", "end of input"]).into());
        }
        Ok(expr)
    }

    /// `and` and `or` share one level and fold left to right, so
    /// `a or b and c` is `(a or b) and c`.
    fn parse_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_term()?;
        loop {
            let combine: fn(Box<Expr>, Box<Expr>) -> Expr = match self.peek().kind {
                TokenKind::And => Expr::And,
                TokenKind::Or => Expr::Or,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = combine(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, QueryError> {
        let opens_group = self.peek().kind == TokenKind::LParen
            && !matches!(
                self.peek_at(1).kind,
                TokenKind::Duration(_) | TokenKind::Timestamp(_)
            );
        if !opens_group {
            return self.parse_comparison();
        }

        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(QueryError::TooDeep { max: MAX_DEPTH });
        }
        self.advance();
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen, &["`)`", "`and`", "`or`"])?;
        self.depth -= 1;
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, QueryError> {
        let left_at = self.pos;
        let left = self.parse_value(true)?;
        let op = match self.peek().kind {
            TokenKind::Op(op) => op,
            _ => return Err(self.unexpected(BINOP).into()),
        };
        self.advance();
        let right_at = self.pos;
        let right = self.parse_value(false)?;

        self.reject_quoted_status(&left, left_at, &right)?;
        self.reject_quoted_status(&right, right_at, &left)?;
        Ok(Expr::Compare { op, left, right })
    }

    fn parse_value(&mut self, term_start: bool) -> Result<Operand, QueryError> {
        let operand = match &self.peek().kind {
            TokenKind::Field(field) => Some(Operand::Field(*field)),
            TokenKind::Status(status) => Some(Operand::Status(*status)),
            TokenKind::String(s) => Some(Operand::String(s.clone())),
            TokenKind::Number(n) => Some(Operand::Number(*n)),
            TokenKind::True => Some(Operand::Bool(true)),
            TokenKind::False => Some(Operand::Bool(false)),
            _ => None,
        };

        match operand {
            Some(operand) => {
                self.advance();
                Ok(operand)
            }
            None if self.peek().kind == TokenKind::LParen => self.parse_bracketed_literal(),
            None if term_start => {
                let mut expected = vec!["`(`"];
                expected.extend_from_slice(VALUE_START);
                Err(self.unexpected(&expected).into())
            }
            None => Err(self.unexpected(VALUE_START).into()),
        }
    }

    /// Statuses are bare keywords; `final_status == "left"` is a mistake
    /// rather than a string comparison.
    fn reject_quoted_status(
        &self,
        operand: &Operand,
        at: usize,
        other: &Operand,
    ) -> Result<(), SyntaxError> {
        let Operand::String(text) = operand else {
            return Ok(());
        };
        let status_typed = matches!(
            other,
            Operand::Status(_) | Operand::Field(Field::FinalStatus)
        );
        if !status_typed || !matches!(text.as_str(), "joined" | "left") {
            return Ok(());
        }

        let token = &self.tokens[at];
        Err(SyntaxError {
            pos: token.pos,
            found: format!("{} `{}`", token.kind.describe(), token.lexeme),
            expected: vec!["`joined`", "`left`"],
        })
    }

    fn parse_bracketed_literal(&mut self) -> Result<Operand, QueryError> {
        self.advance();
        let operand = match self.peek().kind {
            TokenKind::Duration(d) => Operand::Duration(d),
            TokenKind::Timestamp(t) => Operand::Timestamp(t),
            _ => return Err(self.unexpected(&["duration", "timestamp"]).into()),
        };
        self.advance();
        self.expect(TokenKind::RParen, &["`)`"])?;
        Ok(operand)
    }

    fn expect(&mut self, kind: TokenKind, expected: &[&'static str]) -> Result<(), SyntaxError> {
        if self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn peek(&self) -> &Token<'a> {
        self.peek_at(0)
    }

    /// Past the end yields the trailing `Eof`.
    fn peek_at(&self, offset: usize) -> &Token<'a> {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn unexpected(&self, expected: &[&'static str]) -> SyntaxError {
        let token = self.peek();
        let found = match token.kind {
            TokenKind::Eof => token.kind.describe().to_string(),
            _ => format!("{} `{}`", token.kind.describe(), token.lexeme),
        };
        SyntaxError {
            pos: token.pos,
            found,
            expected: expected.to_vec(),
        }
    }
}

/// Parses a non-empty query into an expression tree.
pub fn parse(input: &str) -> Result<Expr, QueryError> {
    if input.len() > MAX_QUERY_LEN {
        return Err(QueryError::TooLong {
            len: input.len(),
            max: MAX_QUERY_LEN,
        });
    }
    let tokens = tokenize(input)?;
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::Status;
    use crate::query::ast::CompareOp;
    use crate::query::error::LexError;
    use chrono::TimeDelta;

    fn grouping(input: &str) -> String {
        parse(input).unwrap().to_string()
    }

    fn syntax_error(input: &str) -> SyntaxError {
        match parse(input) {
            Err(QueryError::Syntax(e)) => e,
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_eq() {
        let expr = parse(r#"name == "Alice""#).unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Eq,
                left: Operand::Field(Field::Name),
                right: Operand::String("Alice".to_string()),
            }
        );
    }

    #[test]
    fn test_duration_literal() {
        let expr = parse("total >= (01:00:00)").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Ge,
                left: Operand::Field(Field::Total),
                right: Operand::Duration(TimeDelta::hours(1)),
            }
        );
    }

    #[test]
    fn test_literals_on_either_side() {
        let expr = parse("joined == final_status").unwrap();
        assert!(matches!(
            expr,
            Expr::Compare {
                left: Operand::Status(Status::Joined),
                right: Operand::Field(Field::FinalStatus),
                ..
            }
        ));
        assert!(parse("(00:05:00) < total").is_ok());
        assert!(parse("(2021-03-15 10:00:00) <= first_join").is_ok());
    }

    #[test]
    fn test_and_or_fold_left() {
        assert_eq!(
            grouping(r#"name == "A" or name == "B" and final_status == left"#),
            r#"((name == "A" or name == "B") and final_status == left)"#
        );
        assert_eq!(
            grouping("total > (00:01:00) and total < (01:00:00) or name % \"x\""),
            r#"((total > (00:01:00) and total < (01:00:00)) or name % "x")"#
        );
    }

    #[test]
    fn test_parentheses_override_grouping() {
        assert_eq!(
            grouping(r#"name == "A" or (name == "B" and final_status == left)"#),
            r#"(name == "A" or (name == "B" and final_status == left))"#
        );
        assert_eq!(grouping("((true == true))"), "true == true");
    }

    #[test]
    fn test_quoted_status_rejected() {
        let err = syntax_error(r#"final_status == "joined""#);
        assert_eq!(err.pos, 16);
        assert_eq!(err.found, r#"string `"joined"`"#);
        assert_eq!(err.expected, vec!["`joined`", "`left`"]);

        assert!(parse(r#""left" != final_status"#).is_err());
        assert!(parse(r#"name == "left""#).is_ok());
        assert!(parse(r#"final_status == "gone""#).is_ok());
    }

    #[test]
    fn test_missing_operator() {
        let err = syntax_error("name \"Alice\"");
        assert_eq!(err.pos, 5);
        assert_eq!(err.found, "string `\"Alice\"`");
        assert_eq!(err.expected, BINOP);
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = syntax_error("(name == \"A\"");
        assert_eq!(err.found, "end of input");
        assert!(err.expected.contains(&"`)`"));

        let err = syntax_error("name == \"A\")");
        assert_eq!(err.pos, 11);
        assert_eq!(err.expected, vec!["`and`", "`or`", "end of input"]);
    }

    #[test]
    fn test_bare_duration_rejected() {
        let err = syntax_error("total >= 01:00:00");
        assert_eq!(err.found, "duration `01:00:00`");
    }

    #[test]
    fn test_comparison_operands_are_not_expressions() {
        assert!(parse("name == (name == \"A\")").is_err());
        assert!(parse("name == \"A\" == \"B\"").is_err());
        assert!(parse("and").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_lex_error_propagates() {
        assert!(matches!(
            parse("name == 'A'"),
            Err(QueryError::Lex(LexError::UnexpectedChar { pos: 8, .. }))
        ));
    }

    #[test]
    fn test_limits() {
        let long = format!("name == \"{}\"", "a".repeat(MAX_QUERY_LEN));
        assert!(matches!(parse(&long), Err(QueryError::TooLong { .. })));

        let deep = format!(
            "{}true == true{}",
            "(".repeat(MAX_DEPTH + 1),
            ")".repeat(MAX_DEPTH + 1)
        );
        assert_eq!(parse(&deep), Err(QueryError::TooDeep { max: MAX_DEPTH }));

        let ok = format!(
            "{}true == true{}",
            "(".repeat(MAX_DEPTH),
            ")".repeat(MAX_DEPTH)
        );
        assert!(parse(&ok).is_ok());
    }
}
