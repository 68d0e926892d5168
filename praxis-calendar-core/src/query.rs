use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    CalendarEvent, Error, EventType, Priority, Result,
    recurrence::{DateWindow, expand},
};

/// Months either side of a target date that are expanded before filtering
pub const ON_DATE_WINDOW_MONTHS: u32 = 3;

/// Default look-ahead for [`upcoming`]
pub const DEFAULT_UPCOMING_DAYS: u32 = 7;

/// All entries, canonical or virtual, that cover `date`.
///
/// Recurring events are expanded over three months either side of `date`.
/// Events spanning more than that are an accepted blind spot.
pub fn instances_on_date(events: &[CalendarEvent], date: NaiveDate) -> Vec<CalendarEvent> {
    let window = DateWindow::around(date, ON_DATE_WINDOW_MONTHS);
    expand(events, &window)
        .into_iter()
        .filter(|event| event.covers(date))
        .collect()
}

/// Entries starting between today and `days` days from now, earliest first
pub fn upcoming(events: &[CalendarEvent], days: u32) -> Vec<CalendarEvent> {
    upcoming_from(events, Local::now().date_naive(), days)
}

/// Same as [`upcoming`] with an explicit reference date.
///
/// Entries sharing a start date keep their expansion order.
pub fn upcoming_from(events: &[CalendarEvent], today: NaiveDate, days: u32) -> Vec<CalendarEvent> {
    let window = DateWindow::following(today, days);
    let mut found: Vec<_> = expand(events, &window)
        .into_iter()
        .filter(|event| window.contains(event.start_date))
        .collect();
    found.sort_by_key(|event| event.start_date);
    found
}

/// Ordering for event lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    DateAsc,
    DateDesc,
    TitleAsc,
    TitleDesc,
}

impl std::str::FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "date-asc" => Ok(Self::DateAsc),
            "date-desc" => Ok(Self::DateDesc),
            "title-asc" => Ok(Self::TitleAsc),
            "title-desc" => Ok(Self::TitleDesc),
            other => Err(Error::Config(format!("unknown sort order '{other}'"))),
        }
    }
}

/// Search and facet filter applied to an already expanded list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    /// Empty means any type
    pub types: Vec<EventType>,
    /// Empty means any priority
    pub priorities: Vec<Priority>,
    pub sort: SortOrder,
}

impl EventFilter {
    pub fn matches(&self, event: &CalendarEvent) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let in_title = event.title.to_lowercase().contains(&term);
            let in_description = event
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_title && !in_description {
                return false;
            }
        }

        (self.types.is_empty() || self.types.contains(&event.event_type))
            && (self.priorities.is_empty() || self.priorities.contains(&event.priority))
    }

    pub fn apply(&self, events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
        let mut kept: Vec<_> = events.into_iter().filter(|e| self.matches(e)).collect();
        match self.sort {
            SortOrder::DateAsc => kept.sort_by_key(|e| e.start_date),
            SortOrder::DateDesc => kept.sort_by(|a, b| b.start_date.cmp(&a.start_date)),
            SortOrder::TitleAsc => kept.sort_by_cached_key(|e| e.title.to_lowercase()),
            SortOrder::TitleDesc => {
                kept.sort_by_cached_key(|e| std::cmp::Reverse(e.title.to_lowercase()));
            }
        }
        kept
    }
}
