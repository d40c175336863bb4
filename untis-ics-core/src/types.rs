use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Status code WebUntis attaches to lessons that no longer take place
pub const CANCELLED_CODE: &str = "cancelled";
/// Status code of an unchanged lesson; never shown in descriptions
pub const REGULAR_CODE: &str = "regular";

/// A subject, room, teacher or class reference inside a lesson
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedElement {
    #[serde(default)]
    pub id: Option<i64>,
    /// Short name, e.g. "M" or "101"
    #[serde(default)]
    pub name: Option<String>,
    /// Long name, e.g. "Mathematics"
    #[serde(default)]
    pub longname: Option<String>,
}

impl NamedElement {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: None,
            name: Some(name.clone()),
            longname: Some(name),
        }
    }

    /// Long name, falling back to the short name
    pub fn long_name(&self) -> &str {
        non_blank(self.longname.as_deref())
            .or_else(|| non_blank(self.name.as_deref()))
            .unwrap_or_default()
    }

    /// Short name, falling back to the long name
    pub fn short_name(&self) -> &str {
        non_blank(self.name.as_deref())
            .or_else(|| non_blank(self.longname.as_deref()))
            .unwrap_or_default()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// One timetable period as returned by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLesson {
    #[serde(default)]
    pub id: Option<i64>,
    /// Calendar date encoded as `YYYYMMDD`
    #[serde(deserialize_with = "de_yyyymmdd")]
    pub date: u32,
    /// `HHMM`, e.g. `945` for 09:45
    pub start_time: u32,
    /// `HHMM`
    pub end_time: u32,
    #[serde(rename = "su", default)]
    pub subjects: Vec<NamedElement>,
    #[serde(rename = "ro", default)]
    pub rooms: Vec<NamedElement>,
    #[serde(rename = "te", default)]
    pub teachers: Vec<NamedElement>,
    #[serde(rename = "kl", default)]
    pub classes: Vec<NamedElement>,
    /// Status tag such as `cancelled` or `irregular`; absent for regular lessons
    #[serde(default)]
    pub code: Option<String>,
    #[serde(rename = "substText", default)]
    pub substitution_text: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub activity_type: Option<String>,
}

impl RawLesson {
    pub fn is_cancelled(&self) -> bool {
        self.code.as_deref() == Some(CANCELLED_CODE)
    }
}

/// WebUntis sends dates as numbers, other sources as strings
fn de_yyyymmdd<'de, D>(de: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        Text(String),
    }

    match NumberOrString::deserialize(de)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid YYYYMMDD date: {s:?}"))
        }),
    }
}

/// Local wall-clock date and time of an event boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventDateTime {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl EventDateTime {
    pub const fn new(year: u32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
        }
    }

    /// Splits a `YYYYMMDD` date and a `HHMM` time without validating either
    pub const fn from_parts(date: u32, time: u32) -> Self {
        Self {
            year: date / 10000,
            month: (date / 100) % 100,
            day: date % 100,
            hour: time / 100,
            minute: time % 100,
        }
    }

    pub const fn as_tuple(&self) -> (u32, u32, u32, u32, u32) {
        (self.year, self.month, self.day, self.hour, self.minute)
    }

    pub const fn same_day(&self, other: &Self) -> bool {
        self.year == other.year && self.month == other.month && self.day == other.day
    }

    pub const fn same_time_of_day(&self, other: &Self) -> bool {
        self.hour == other.hour && self.minute == other.minute
    }

    /// `None` when the fields do not form a real date and time
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let year = i32::try_from(self.year).ok()?;
        NaiveDate::from_ymd_opt(year, self.month, self.day)?.and_hms_opt(self.hour, self.minute, 0)
    }
}

/// One event of the generated feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start: EventDateTime,
    pub end: EventDateTime,
    /// Never empty
    pub title: String,
    /// Never empty; falls back to a placeholder
    pub location: String,
    /// One line per present annotation, possibly empty
    pub description: String,
    /// Stable across regenerations of the same lesson
    pub uid: String,
    pub sequence: u32,
}

impl CalendarEvent {
    /// New event covering `self.start..next.end`, everything else from `self`
    pub fn extended_to(&self, next: &Self) -> Self {
        Self {
            end: next.end,
            ..self.clone()
        }
    }
}

/// iCalendar `METHOD` of the generated feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CalendarMethod {
    #[default]
    Publish,
    Request,
}

impl CalendarMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "PUBLISH",
            Self::Request => "REQUEST",
        }
    }
}

/// Feed-level settings for the ICS encoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcsOptions {
    /// `PRODID` of the calendar
    pub product_id: String,
    pub method: CalendarMethod,
    /// `X-WR-CALNAME`, shown by most clients as the subscription name
    pub calendar_name: Option<String>,
}

impl Default for IcsOptions {
    fn default() -> Self {
        Self {
            product_id: "-//untis-ics//Timetable Calendar//EN".to_string(),
            method: CalendarMethod::Publish,
            calendar_name: None,
        }
    }
}

/// Login data for the timetable backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where and how to reach the timetable backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Host name, e.g. `mese.webuntis.com`
    pub server: String,
    pub school: String,
    /// Client identifier sent on login
    pub client_name: String,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}
