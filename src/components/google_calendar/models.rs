use serde::{Deserialize, Serialize};

/// Outcome of an operation that needs the user's Google credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorized<T> {
    /// Credentials were available and the operation produced a value
    Ready(T),
    /// No usable credentials; the user must (re)connect their calendar
    AuthRequired,
}

impl<T> Authorized<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Authorized<U> {
        match self {
            Authorized::Ready(value) => Authorized::Ready(f(value)),
            Authorized::AuthRequired => Authorized::AuthRequired,
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, Authorized::AuthRequired)
    }
}

/// Start or end of an event, as Google reports it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    pub fn at(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            ..Default::default()
        }
    }
}

/// Simplified calendar event representation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(rename = "htmlLink", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Page of events returned by the list endpoint
#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventList {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
}

/// Body sent to the insert endpoint
#[derive(Debug, Serialize)]
pub(crate) struct NewEvent<'a> {
    pub summary: &'a str,
    pub start: EventTime,
    pub end: EventTime,
}

/// Identifier and link of a newly created event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    #[serde(rename = "htmlLink")]
    pub link: String,
}
