use crate::attendance::AttendanceRecord;
use crate::query::Field;
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unknown placeholder {{{name}}} at position {pos}")]
    UnknownField { pos: usize, name: String },
    #[error("unclosed `{{` at position {pos}")]
    Unclosed { pos: usize },
    #[error("unmatched `}}` at position {pos}; write `}}}}` for a literal brace")]
    Unmatched { pos: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Field(Field),
}

/// Output line template: literal text with `{field}` placeholders, `{{` and
/// `}}` for literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

impl Template {
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut chars = input.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.next_if(|&(_, c)| c == '{').is_some() => text.push('{'),
                '}' if chars.next_if(|&(_, c)| c == '}').is_some() => text.push('}'),
                '}' => return Err(FormatError::Unmatched { pos }),
                '{' => {
                    let start = pos + 1;
                    let end = input[start..]
                        .find('}')
                        .map(|i| start + i)
                        .ok_or(FormatError::Unclosed { pos })?;
                    let name = &input[start..end];
                    let field = Field::from_keyword(name).ok_or_else(|| {
                        FormatError::UnknownField {
                            pos,
                            name: name.to_string(),
                        }
                    })?;

                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    pieces.push(Piece::Field(field));
                    while chars.next_if(|&(i, _)| i <= end).is_some() {}
                }
                other => text.push(other),
            }
        }

        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        Ok(Self { pieces })
    }

    pub fn render<R: AttendanceRecord + ?Sized>(&self, record: &R) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Field(field) => {
                    let _ = write!(out, "{}", field.read(record));
                }
            }
        }
        out
    }
}
