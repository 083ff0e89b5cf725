use super::value::Value;
use crate::attendance::AttendanceRecord;
use std::borrow::Cow;
use std::fmt;

/// A record accessor addressable by name in queries and output templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    FirstJoin,
    LastLeft,
    Durations,
    Total,
    FinalStatus,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Name,
        Field::FirstJoin,
        Field::LastLeft,
        Field::Durations,
        Field::Total,
        Field::FinalStatus,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::FirstJoin => "first_join",
            Field::LastLeft => "last_left",
            Field::Durations => "durations",
            Field::Total => "total",
            Field::FinalStatus => "final_status",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.keyword() == word)
    }

    /// Reads this field off a record.
    pub fn read<R: AttendanceRecord + ?Sized>(self, record: &R) -> Value<'_> {
        match self {
            Field::Name => Value::Str(Cow::Borrowed(record.name())),
            Field::FirstJoin => Value::Time(record.first_joined()),
            Field::LastLeft => Value::Time(record.last_left()),
            Field::Durations => Value::DurList(Cow::Owned(record.durations())),
            Field::Total => Value::Dur(record.total_duration()),
            Field::FinalStatus => Value::Status(record.final_status()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::tests::{at, attendee};
    use crate::attendance::Status;
    use chrono::TimeDelta;

    #[test]
    fn test_keywords_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_keyword(field.keyword()), Some(field));
        }
        assert_eq!(Field::from_keyword("first_joined"), None);
        assert_eq!(Field::from_keyword("Name"), None);
    }

    #[test]
    fn test_read_fields() {
        let a = attendee(
            "Alice",
            &[(Status::Joined, at(10, 0, 0)), (Status::Left, at(10, 5, 0))],
        );
        assert_eq!(Field::Name.read(&a), Value::Str(Cow::Borrowed("Alice")));
        assert_eq!(Field::Total.read(&a), Value::Dur(TimeDelta::minutes(5)));
        assert_eq!(Field::FinalStatus.read(&a), Value::Status(Status::Left));
        assert_eq!(
            Field::Durations.read(&a),
            Value::DurList(Cow::Owned(vec![TimeDelta::minutes(5)]))
        );
    }
}
