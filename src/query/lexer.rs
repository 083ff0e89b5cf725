use super::ast::CompareOp;
use super::error::LexError;
use super::field::Field;
use crate::attendance::Status;
use chrono::{NaiveDateTime, TimeDelta};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    And,
    Or,
    LParen,
    RParen,
    Op(CompareOp),
    Field(Field),
    True,
    False,
    Status(Status),
    String(String),
    Number(f64),
    Timestamp(NaiveDateTime),
    Duration(TimeDelta),
    Eof,
}

impl TokenKind {
    /// Name used in syntax error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::And => "`and`",
            TokenKind::Or => "`or`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::Op(_) => "operator",
            TokenKind::Field(_) => "field name",
            TokenKind::True | TokenKind::False => "boolean",
            TokenKind::Status(_) => "status",
            TokenKind::String(_) => "string",
            TokenKind::Number(_) => "number",
            TokenKind::Timestamp(_) => "timestamp",
            TokenKind::Duration(_) => "duration",
            TokenKind::Eof => "end of input",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub pos: usize,
}

const TIMESTAMP_SHAPE: &[u8] = b"9999-99-99 99:99:99";
const DURATION_SHAPE: &[u8] = b"99:99:99";

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.current_char() else {
            return Ok(self.token(TokenKind::Eof, start));
        };

        let kind = match c {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '%' => self.single(TokenKind::Op(CompareOp::Contains)),
            '=' | '!' | '<' | '>' => self.operator(c)?,
            '"' => self.string()?,
            c if c.is_ascii_digit() => self.numeric()?,
            '+' | '-' | '.' => self.number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.word()?,
            found => return Err(LexError::UnexpectedChar { pos: start, found }),
        };

        Ok(self.token(kind, start))
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token {
            kind,
            lexeme: &self.input[start..self.pos],
            pos: start,
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn operator(&mut self, first: char) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.pos += 1;
        let followed_by_eq = self.match_char('=');

        let op = match (first, followed_by_eq) {
            ('=', true) => CompareOp::Eq,
            ('!', true) => CompareOp::Ne,
            ('<', true) => CompareOp::Le,
            ('>', true) => CompareOp::Ge,
            ('<', false) => CompareOp::Lt,
            ('>', false) => CompareOp::Gt,
            (found, _) => return Err(LexError::UnexpectedChar { pos: start, found }),
        };
        Ok(TokenKind::Op(op))
    }

    fn string(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();

        loop {
            let Some(c) = self.current_char() else {
                return Err(LexError::UnterminatedString { pos: start });
            };
            self.pos += c.len_utf8();
            match c {
                '"' => return Ok(TokenKind::String(text)),
                '\\' => {
                    let Some(escaped) = self.current_char() else {
                        return Err(LexError::UnterminatedString { pos: start });
                    };
                    self.pos += escaped.len_utf8();
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '"' | '\\' => text.push(escaped),
                        other => {
                            text.push('\\');
                            text.push(other);
                        }
                    }
                }
                other => text.push(other),
            }
        }
    }

    /// Digits start a timestamp, a duration or a number; longest shape wins.
    fn numeric(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let rest = &self.input.as_bytes()[start..];

        if has_shape(rest, TIMESTAMP_SHAPE) {
            self.pos += TIMESTAMP_SHAPE.len();
            let text = &self.input[start..self.pos];
            return NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .map(TokenKind::Timestamp)
                .map_err(|_| LexError::InvalidTimestamp {
                    pos: start,
                    text: text.to_string(),
                });
        }

        if has_shape(rest, DURATION_SHAPE) {
            self.pos += DURATION_SHAPE.len();
            let text = &self.input[start..self.pos];
            return Ok(TokenKind::Duration(parse_duration(text)));
        }

        self.number()
    }

    fn number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;

        if matches!(self.current_char(), Some('+' | '-')) {
            self.pos += 1;
        }
        let int_digits = self.eat_digits();
        let mut frac_digits = 0;
        if self.match_char('.') {
            frac_digits = self.eat_digits();
        }

        if int_digits + frac_digits == 0 {
            let found = self.input[start..].chars().next().unwrap_or('\0');
            return Err(LexError::UnexpectedChar { pos: start, found });
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.current_char(), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.eat_digits() == 0 {
                self.pos = mark;
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| LexError::InvalidNumber {
                pos: start,
                text: text.to_string(),
            })
    }

    fn word(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }

        let word = &self.input[start..self.pos];
        let kind = match word {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "joined" => TokenKind::Status(Status::Joined),
            "left" => TokenKind::Status(Status::Left),
            _ => match Field::from_keyword(word) {
                Some(field) => TokenKind::Field(field),
                None => {
                    return Err(LexError::UnknownWord {
                        pos: start,
                        word: word.to_string(),
                    })
                }
            },
        };
        Ok(kind)
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.current_char(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn match_char(&mut self, c: char) -> bool {
        if self.current_char() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }
}

/// `9` in the shape stands for any ASCII digit, everything else is literal.
fn has_shape(input: &[u8], shape: &[u8]) -> bool {
    input.len() >= shape.len()
        && input.iter().zip(shape).all(|(&b, &s)| match s {
            b'9' => b.is_ascii_digit(),
            _ => b == s,
        })
}

/// `hh:mm:ss`; fields are not range checked, `(00:90:00)` is ninety minutes.
fn parse_duration(text: &str) -> TimeDelta {
    let seconds = text
        .split(':')
        .map(|part| part.bytes().fold(0i64, |acc, b| acc * 10 + i64::from(b - b'0')))
        .fold(0i64, |acc, part| acc * 60 + part);
    TimeDelta::seconds(seconds)
}

pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(input).tokenize()
}
