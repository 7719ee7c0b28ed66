use std::collections::HashMap;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of an isolated chat workspace with its own set of classes.
pub type GroupId = String;

/// Deterministic identity of a registered class within its group.
pub type EventKey = String;

/// Full persisted schedule: group -> event key -> event.
pub type ScheduleMap = HashMap<GroupId, HashMap<EventKey, ClassEvent>>;

/// One registered weekly class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ClassEvent {
    pub name: String,
    #[serde(with = "weekday_index")]
    #[schema(value_type = u8, minimum = 0, maximum = 6, example = 0)]
    pub day: Weekday,
    #[serde(with = "time_hhmm")]
    #[schema(value_type = String, example = "14:30")]
    pub time: NaiveTime,
    #[serde(default)]
    pub description: String,
    pub channel_id: u64,
}

impl ClassEvent {
    /// Key used for upsert and removal identity. Stable across registrations;
    /// ignores description and channel_id.
    pub fn key(&self) -> EventKey {
        event_key(&self.name, self.day, self.time)
    }
}

pub fn event_key(name: &str, day: Weekday, time: NaiveTime) -> EventKey {
    format!("{}_{}_{}", name, weekday_label(day), time.format("%H:%M"))
}

/// Canonical lowercase label, also used as the weekday part of event keys.
pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Persisted weekday encoding: 0 = Monday .. 6 = Sunday.
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    Some(match index {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        6 => Weekday::Sun,
        _ => return None,
    })
}

mod weekday_index {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(day.num_days_from_monday() as u8)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let index = u8::deserialize(deserializer)?;
        super::weekday_from_index(index)
            .ok_or_else(|| serde::de::Error::custom(format!("weekday must be 0-6, got {index}")))
    }
}

mod time_hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
