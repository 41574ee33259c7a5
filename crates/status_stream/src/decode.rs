use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;
use crate::model::{Deletion, Status};
use crate::reader::RawRecord;

/// A decoded stream record. Exactly one variant applies per record, chosen by
/// which marker fields the record carries.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Status(Box<Status>),
    Deletion(Deletion),
    /// A record with no recognised markers, preserved verbatim. Upstream control
    /// messages (rate-limit notices, warnings) arrive here too.
    Unknown(Value),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Deletion(_) => "deletion",
            Self::Unknown(_) => "unknown",
        }
    }
}

const DELETION_MARKER: &str = "delete";
const STATUS_MARKERS: [&str; 2] = ["user", "text"];

/// Maps a raw record onto an [`Event`].
///
/// Resolution order: a `delete` field wins, then `user` + `text` marks a status,
/// anything else is [`Event::Unknown`]. Unmodelled fields never fail a decode;
/// a recognised field with the wrong shape (including a bad timestamp) does.
pub fn decode(record: RawRecord) -> Result<Event, DecodeError> {
    if let Some(deletion) = marker(&record, DELETION_MARKER) {
        return match Deletion::deserialize(deletion) {
            Ok(deletion) => Ok(Event::Deletion(deletion)),
            Err(source) => Err(DecodeError {
                variant: "deletion",
                source,
                record,
            }),
        };
    }

    if STATUS_MARKERS.iter().all(|key| marker(&record, key).is_some()) {
        return match Status::deserialize(&record) {
            Ok(status) => Ok(Event::Status(Box::new(status))),
            Err(source) => Err(DecodeError {
                variant: "status",
                source,
                record,
            }),
        };
    }

    Ok(Event::Unknown(record))
}

/// A marker set to `null` counts as absent.
fn marker<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|value| !value.is_null())
}

/// Wire format for `created_at` fields, e.g. `Wed Aug 27 13:08:45 +0000 2008`.
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Serde adapter for optional timestamps in [`TIMESTAMP_FORMAT`].
pub mod timestamp {
    use chrono::{DateTime, FixedOffset};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn parse(raw: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
        DateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
    }

    pub fn serialize<S>(
        value: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        parse(&raw)
            .map(Some)
            .map_err(|err| D::Error::custom(format!("invalid timestamp `{raw}`: {err}")))
    }
}
