use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Kind of calendar entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Meeting,
    Training,
    Maintenance,
    Holiday,
    Announcement,
    Interview,
    #[default]
    Other,
}

impl EventType {
    pub const ALL: [Self; 7] = [
        Self::Meeting,
        Self::Training,
        Self::Maintenance,
        Self::Holiday,
        Self::Announcement,
        Self::Interview,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::Training => "training",
            Self::Maintenance => "maintenance",
            Self::Holiday => "holiday",
            Self::Announcement => "announcement",
            Self::Interview => "interview",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidEvent(format!("unknown event type '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(Error::InvalidEvent(format!("unknown priority '{other}'"))),
        }
    }
}

/// Repeat rule of a canonical event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceType {
    pub fn is_recurring(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Value for the iCalendar `FREQ` rule part
    pub fn ical_frequency(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Daily => Some("DAILY"),
            Self::Weekly => Some("WEEKLY"),
            Self::Monthly => Some("MONTHLY"),
            Self::Yearly => Some("YEARLY"),
        }
    }

    pub fn from_ical_frequency(freq: &str) -> Option<Self> {
        match freq.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Interview and training linkage carried along with an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
}

/// Calendar event as stored, or a virtual recurring instance derived from one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    /// Owning tenant
    pub practice_id: String,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Local wall-clock time, e.g. `09:00`
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_all_day: bool,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub event_type: EventType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: Priority,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recurrence_type: RecurrenceType,
    /// Inclusive bound on instance generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub is_recurring_instance: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl CalendarEvent {
    /// Whole days between start and end date
    pub fn span_days(&self) -> i64 {
        self.end_date
            .signed_duration_since(self.start_date)
            .num_days()
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence_type.is_recurring()
    }

    /// Whether `date` falls within `[start_date, end_date]`
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn validate(&self) -> Result<()> {
        validate_dates(self.start_date, self.end_date)
    }

    /// Apply the fields present in `patch`
    pub fn apply_patch(&mut self, patch: &EventPatch) {
        if let Some(ref title) = patch.title {
            self.title.clone_from(title);
        }
        if let Some(ref description) = patch.description {
            self.description = Some(description.clone());
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(ref start_time) = patch.start_time {
            self.start_time.clone_from(start_time);
        }
        if let Some(ref end_time) = patch.end_time {
            self.end_time.clone_from(end_time);
        }
        if let Some(is_all_day) = patch.is_all_day {
            self.is_all_day = is_all_day;
        }
        if let Some(event_type) = patch.event_type {
            self.event_type = event_type;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(ref attendees) = patch.attendees {
            self.attendees.clone_from(attendees);
        }
        if let Some(ref location) = patch.location {
            self.location = Some(location.clone());
        }
        if let Some(recurrence_type) = patch.recurrence_type {
            self.recurrence_type = recurrence_type;
        }
        if let Some(recurrence_end_date) = patch.recurrence_end_date {
            self.recurrence_end_date = Some(recurrence_end_date);
        }
    }
}

/// Payload for creating an event; the store assigns `id` and `createdAt`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub practice_id: String,
    pub created_by: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_all_day: bool,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub event_type: EventType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: Priority,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recurrence_type: RecurrenceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl EventDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidEvent("title is required".to_string()));
        }
        validate_dates(self.start_date, self.end_date)
    }

    /// Turn the draft into a canonical event with store-assigned identity
    pub fn into_event(self, id: String, created_at: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id,
            practice_id: self.practice_id,
            created_by: self.created_by,
            created_at: Some(created_at),
            title: self.title,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time,
            end_time: self.end_time,
            is_all_day: self.is_all_day,
            event_type: self.event_type,
            priority: self.priority,
            attendees: self.attendees,
            location: self.location,
            recurrence_type: self.recurrence_type,
            recurrence_end_date: self.recurrence_end_date,
            is_recurring_instance: false,
            parent_event_id: None,
            details: self.details,
        }
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_all_day: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_type: Option<RecurrenceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_end_date: Option<NaiveDate>,
}

impl EventPatch {
    /// Rejects a patch whose own dates are inverted
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            validate_dates(start, end)?;
        }
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(Error::InvalidEvent("title must not be empty".to_string()));
        }
        Ok(())
    }
}

/// ICS generation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcsOptions {
    pub calendar_name: Option<String>,
    /// IANA zone used as `TZID` for timed events
    pub timezone: String,
    pub include_description: bool,
    pub reminder_minutes: Option<u32>,
}

impl Default for IcsOptions {
    fn default() -> Self {
        Self {
            calendar_name: Some("Praxiskalender".to_string()),
            timezone: "Europe/Berlin".to_string(),
            include_description: true,
            reminder_minutes: None,
        }
    }
}

fn validate_dates(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(Error::InvalidEvent(format!(
            "startDate {start} is after endDate {end}"
        )));
    }
    Ok(())
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
