use crate::attendance::{Attendee, Event, Status};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("input is not valid {encoding}")]
    Decode { encoding: Encoding },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("line {line}: unknown user action {action:?}")]
    UnknownAction { line: u64, action: String },
    #[error("line {line}: unrecognised timestamp {value:?}")]
    InvalidTimestamp { line: u64, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    /// Byte order taken from the BOM, little endian without one.
    Utf16,
    Utf16Le,
    Utf16Be,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf16 => "utf-16",
            Encoding::Utf16Le => "utf-16le",
            Encoding::Utf16Be => "utf-16be",
        })
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-16" | "utf16" => Ok(Encoding::Utf16),
            "utf-16le" | "utf16le" => Ok(Encoding::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Encoding::Utf16Be),
            _ => Err(format!(
                "unsupported encoding {:?} (expected utf-8, utf-16, utf-16le or utf-16be)",
                s
            )),
        }
    }
}

pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<String, TableError> {
    let text = match encoding {
        Encoding::Utf8 => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            String::from_utf8(bytes.to_vec()).ok()
        }
        Encoding::Utf16 => match bytes {
            [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
            [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
            _ => decode_utf16(bytes, u16::from_le_bytes),
        },
        Encoding::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
        Encoding::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
    };

    let text = text.ok_or(TableError::Decode { encoding })?;
    Ok(match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "Full Name")]
    name: String,
    #[serde(rename = "User Action")]
    action: String,
    #[serde(rename = "Timestamp")]
    timestamp: String,
}

const TIMESTAMP_FORMATS: &[&str] = &["%m/%d/%Y, %I:%M:%S %p", "%Y-%m-%d %H:%M:%S"];

fn parse_action(action: &str) -> Option<Status> {
    match action.trim() {
        "Joined" | "Joined before" => Some(Status::Joined),
        "Left" => Some(Status::Left),
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Groups the rows of a tab-separated attendance report into attendees, in
/// order of first appearance.
pub fn parse_attendees(text: &str) -> Result<Vec<Attendee>, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut order: Vec<String> = Vec::new();
    let mut events: HashMap<String, Vec<Event>> = HashMap::new();
    let mut closed_at: Option<NaiveDateTime> = None;

    let headers = reader.headers()?.clone();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let row: Row = record.deserialize(Some(&headers))?;

        let action = parse_action(&row.action).ok_or_else(|| TableError::UnknownAction {
            line,
            action: row.action.clone(),
        })?;
        let at = parse_timestamp(&row.timestamp).ok_or_else(|| TableError::InvalidTimestamp {
            line,
            value: row.timestamp.clone(),
        })?;

        closed_at = Some(closed_at.map_or(at, |c| c.max(at)));
        if !events.contains_key(&row.name) {
            order.push(row.name.clone());
        }
        events
            .entry(row.name)
            .or_default()
            .push(Event::new(action, at));
    }

    let Some(closed_at) = closed_at else {
        return Ok(Vec::new());
    };

    Ok(order
        .into_iter()
        .map(|name| {
            let list = events.remove(&name).unwrap_or_default();
            Attendee::new(name, list, closed_at)
        })
        .collect())
}

pub fn read_attendance_file(path: &Path, encoding: Encoding) -> Result<Vec<Attendee>, TableError> {
    let bytes = fs::read(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let text = decode(&bytes, encoding)?;
    let attendees = parse_attendees(&text)?;
    log::debug!(
        "loaded {} attendees from {} ({})",
        attendees.len(),
        path.display(),
        encoding
    );
    Ok(attendees)
}
