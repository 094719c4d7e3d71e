//! Whole-second UTC timestamps and their ISO-8601 interchange form.

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only textual form accepted or produced: `YYYY-MM-DDTHH:MM:SSZ`.
pub const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Seconds since the Unix epoch, UTC. Sub-second precision is dropped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct FileTimestamp(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTimestamp {
    #[error("timestamp {0:?} is not of the form YYYY-MM-DDTHH:MM:SSZ")]
    Format(String),
    #[error("epoch second {0} is outside the representable range")]
    OutOfRange(i64),
}

impl FileTimestamp {
    pub const fn from_epoch_seconds(seconds: i64) -> Self {
        FileTimestamp(seconds)
    }

    pub const fn epoch_seconds(self) -> i64 {
        self.0
    }

    /// Truncates towards the earlier whole second, also before 1970.
    pub fn from_system_time(time: SystemTime) -> Self {
        FileTimestamp(DateTime::<Utc>::from(time).timestamp())
    }

    pub fn to_system_time(self) -> Result<SystemTime, InvalidTimestamp> {
        self.to_datetime().map(SystemTime::from)
    }

    fn to_datetime(self) -> Result<DateTime<Utc>, InvalidTimestamp> {
        DateTime::<Utc>::from_timestamp(self.0, 0).ok_or(InvalidTimestamp::OutOfRange(self.0))
    }

    pub fn parse_iso8601(raw: &str) -> Result<Self, InvalidTimestamp> {
        let naive = NaiveDateTime::parse_from_str(raw, ISO8601_FORMAT)
            .map_err(|_| InvalidTimestamp::Format(raw.to_owned()))?;
        let parsed = FileTimestamp(naive.and_utc().timestamp());
        // Reject anything that would not encode back to the same text,
        // e.g. unpadded fields or years beyond four digits.
        match parsed.to_iso8601() {
            Ok(encoded) if encoded == raw => Ok(parsed),
            _ => Err(InvalidTimestamp::Format(raw.to_owned())),
        }
    }

    pub fn to_iso8601(self) -> Result<String, InvalidTimestamp> {
        Ok(self.to_datetime()?.format(ISO8601_FORMAT).to_string())
    }
}

impl fmt::Display for FileTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_iso8601() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "@{}", self.0),
        }
    }
}

impl TryFrom<String> for FileTimestamp {
    type Error = InvalidTimestamp;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        FileTimestamp::parse_iso8601(&raw)
    }
}

impl From<FileTimestamp> for String {
    fn from(timestamp: FileTimestamp) -> Self {
        timestamp.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Last second of year 9999, the upper end of the four-digit-year form.
    const MAX_FOUR_DIGIT_YEAR: i64 = 253_402_300_799;

    #[test]
    fn encodes_known_instants() {
        assert_eq!(
            FileTimestamp::from_epoch_seconds(0).to_iso8601().unwrap(),
            "1970-01-01T00:00:00Z"
        );
        assert_eq!(
            FileTimestamp::from_epoch_seconds(1_431_445_838).to_iso8601().unwrap(),
            "2015-05-12T15:50:38Z"
        );
    }

    #[test]
    fn string_round_trip_is_exact() {
        for raw in [
            "1970-01-01T00:00:00Z",
            "2000-02-29T23:59:59Z",
            "2015-05-12T15:50:38Z",
            "1969-12-31T23:59:59Z",
        ] {
            let parsed = FileTimestamp::parse_iso8601(raw).unwrap();
            assert_eq!(parsed.to_iso8601().unwrap(), raw);
        }
    }

    #[test]
    fn integer_round_trip_for_many_values() {
        // xorshift64, seeded, so failures reproduce.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..1_000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let seconds = (state % (MAX_FOUR_DIGIT_YEAR as u64)) as i64;

            let ts = FileTimestamp::from_epoch_seconds(seconds);
            let text = ts.to_iso8601().unwrap();
            assert_eq!(FileTimestamp::parse_iso8601(&text).unwrap(), ts, "{text}");
        }
    }

    #[test]
    fn rejects_other_shapes() {
        for raw in [
            "2015-05-12 15:50:38Z",
            "2015-05-12T15:50:38",
            "2015-05-12T15:50:38.123Z",
            "2015-05-12T15:50:38+00:00",
            "2015-5-12T15:50:38Z",
            "",
        ] {
            assert!(FileTimestamp::parse_iso8601(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn system_time_drops_subseconds() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(FileTimestamp::from_system_time(time).epoch_seconds(), 1);

        let before = SystemTime::UNIX_EPOCH - Duration::from_millis(500);
        assert_eq!(FileTimestamp::from_system_time(before).epoch_seconds(), -1);
    }
}
