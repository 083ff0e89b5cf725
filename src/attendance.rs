use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;

/// Attendance state of a participant. Declaration order is the ordering
/// used by `<`, `>` and friends in queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Joined,
    Left,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Joined => f.write_str("joined"),
            Status::Left => f.write_str("left"),
        }
    }
}

/// Read-only view of one participant that queries are evaluated against.
pub trait AttendanceRecord {
    fn name(&self) -> &str;

    /// Earliest instant the participant joined.
    fn first_joined(&self) -> NaiveDateTime;

    /// Latest instant the participant left.
    fn last_left(&self) -> NaiveDateTime;

    /// One entry per join/left session, in chronological order.
    fn durations(&self) -> Vec<TimeDelta>;

    fn total_duration(&self) -> TimeDelta {
        self.durations()
            .into_iter()
            .fold(TimeDelta::zero(), |acc, d| acc + d)
    }

    fn final_status(&self) -> Status;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub action: Status,
    pub at: NaiveDateTime,
}

impl Event {
    pub fn new(action: Status, at: NaiveDateTime) -> Self {
        Self { action, at }
    }
}

/// A participant and their join/left events. `closed_at` is the end of the
/// meeting and closes any session that never saw a `Left`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attendee {
    name: String,
    events: Vec<Event>,
    closed_at: NaiveDateTime,
}

impl Attendee {
    pub fn new(name: impl Into<String>, mut events: Vec<Event>, closed_at: NaiveDateTime) -> Self {
        events.sort_by_key(|e| e.at);
        Self {
            name: name.into(),
            events,
            closed_at,
        }
    }
}

impl AttendanceRecord for Attendee {
    fn name(&self) -> &str {
        &self.name
    }

    fn first_joined(&self) -> NaiveDateTime {
        self.events
            .iter()
            .find(|e| e.action == Status::Joined)
            .or_else(|| self.events.first())
            .map_or(self.closed_at, |e| e.at)
    }

    fn last_left(&self) -> NaiveDateTime {
        self.events
            .iter()
            .rev()
            .find(|e| e.action == Status::Left)
            .map_or(self.closed_at, |e| e.at)
    }

    fn durations(&self) -> Vec<TimeDelta> {
        let mut sessions = Vec::new();
        let mut open: Option<NaiveDateTime> = None;

        for event in &self.events {
            match (event.action, open) {
                (Status::Joined, None) => open = Some(event.at),
                (Status::Left, Some(start)) => {
                    sessions.push(event.at - start);
                    open = None;
                }
                // rejoin while inside, or leave without a join
                _ => {}
            }
        }

        if let Some(start) = open {
            sessions.push(self.closed_at - start);
        }

        sessions
    }

    fn final_status(&self) -> Status {
        self.events.last().map_or(Status::Left, |e| e.action)
    }
}
