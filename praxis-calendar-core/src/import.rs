//! Import of external iCalendar files as event drafts.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use chrono::{Days, NaiveDate, NaiveDateTime};
use ical::parser::ical::{IcalParser, component::IcalEvent};

use crate::{
    Error, EventDraft, EventType, Priority, RecurrenceType, Result, recurrence::nth_occurrence,
};

const UNTITLED: &str = "Ohne Titel";

/// Parse every `VEVENT` of the file at `path`
pub fn from_path<P: AsRef<Path>>(
    path: P,
    practice_id: &str,
    created_by: &str,
) -> Result<Vec<EventDraft>> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref).map_err(|err| {
        Error::Import(format!("cannot open {}: {}", path_ref.display(), err))
    })?;
    parse_ics(file, practice_id, created_by)
}

/// Turn external `VEVENT`s into drafts owned by `practice_id`.
///
/// Only `FREQ`, `UNTIL` and `COUNT` of a repeat rule carry over; events
/// without a usable `DTSTART` are skipped.
pub fn parse_ics<R: Read>(
    reader: R,
    practice_id: &str,
    created_by: &str,
) -> Result<Vec<EventDraft>> {
    let parser = IcalParser::new(BufReader::new(reader));
    let mut drafts = Vec::new();

    for calendar in parser {
        let calendar = calendar.map_err(|err| Error::Import(format!("invalid ICS: {err}")))?;

        for event in calendar.events {
            match draft_from_event(&event, practice_id, created_by) {
                Some(draft) => drafts.push(draft),
                None => tracing::warn!(
                    uid = event_property(&event, "UID").unwrap_or("-"),
                    "Skipping VEVENT without usable DTSTART"
                ),
            }
        }
    }

    tracing::info!(count = drafts.len(), practice_id, "Parsed ICS events");
    Ok(drafts)
}

fn draft_from_event(event: &IcalEvent, practice_id: &str, created_by: &str) -> Option<EventDraft> {
    let start = parse_moment(event_property(event, "DTSTART")?)?;
    let end = event_property(event, "DTEND").and_then(parse_moment);

    let (start_date, end_date, start_time, end_time, is_all_day) = match (start, end) {
        (Moment::Date(start), end) => {
            // DTEND of all-day events is exclusive
            let end = match end {
                Some(Moment::Date(end)) if end > start => end - Days::new(1),
                Some(Moment::DateTime(end)) if end.date() >= start => end.date(),
                _ => start,
            };
            (start, end, String::new(), String::new(), true)
        }
        (Moment::DateTime(start), end) => {
            let end = match end {
                Some(Moment::DateTime(end)) if end >= start => end,
                Some(Moment::Date(end)) if end > start.date() => {
                    (end - Days::new(1)).and_time(start.time())
                }
                _ => start,
            };
            (
                start.date(),
                end.date(),
                start.format("%H:%M").to_string(),
                end.format("%H:%M").to_string(),
                false,
            )
        }
    };

    let (recurrence_type, recurrence_end_date) = event_property(event, "RRULE")
        .map(|rule| parse_rrule(rule, start_date))
        .unwrap_or_default();

    Some(EventDraft {
        practice_id: practice_id.to_string(),
        created_by: created_by.to_string(),
        title: event_property(event, "SUMMARY")
            .map(unescape_text)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNTITLED.to_string()),
        description: event_property(event, "DESCRIPTION").map(unescape_text),
        start_date,
        end_date,
        start_time,
        end_time,
        is_all_day,
        event_type: event_property(event, "CATEGORIES")
            .and_then(|c| c.split(',').find_map(|c| c.parse().ok()))
            .unwrap_or(EventType::Other),
        priority: event_property(event, "PRIORITY")
            .and_then(|p| p.trim().parse::<u8>().ok())
            .map_or(Priority::Medium, priority_from_ical),
        location: event_property(event, "LOCATION").map(unescape_text),
        recurrence_type,
        recurrence_end_date,
        ..Default::default()
    })
}

#[derive(Debug, Clone, Copy)]
enum Moment {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

fn parse_moment(value: &str) -> Option<Moment> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        return Some(Moment::Date(date));
    }
    NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y%m%dT%H%M%S")
        .ok()
        .map(Moment::DateTime)
}

fn parse_rrule(rule: &str, start: NaiveDate) -> (RecurrenceType, Option<NaiveDate>) {
    let mut frequency = None;
    let mut until = None;
    let mut count = None;

    for part in rule.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_uppercase().as_str() {
            "FREQ" => frequency = RecurrenceType::from_ical_frequency(value),
            "UNTIL" => {
                until = parse_moment(value).map(|m| match m {
                    Moment::Date(date) => date,
                    Moment::DateTime(dt) => dt.date(),
                });
            }
            "COUNT" => count = value.trim().parse::<u32>().ok(),
            "INTERVAL" if value.trim() != "1" => {
                tracing::warn!(rule, "RRULE interval is not supported, importing every step");
            }
            _ => {}
        }
    }

    let Some(frequency) = frequency else {
        return (RecurrenceType::None, None);
    };

    // COUNT includes the first occurrence
    let until = until.or_else(|| {
        count.and_then(|count| nth_occurrence(frequency, start, count.saturating_sub(1)))
    });
    (frequency, until)
}

fn priority_from_ical(priority: u8) -> Priority {
    match priority {
        1..=4 => Priority::High,
        6..=9 => Priority::Low,
        _ => Priority::Medium,
    }
}

fn event_property<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a str> {
    event
        .properties
        .iter()
        .find(|prop| prop.name.eq_ignore_ascii_case(name))
        .and_then(|prop| prop.value.as_deref())
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAMPLE: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//DE\r\n\
BEGIN:VEVENT\r\n\
UID:a@example\r\n\
DTSTART;TZID=Europe/Berlin:20250106T083000\r\n\
DTEND;TZID=Europe/Berlin:20250106T091500\r\n\
SUMMARY:Teambesprechung\\, Raum 2\r\n\
DESCRIPTION:Agenda:\\nQM\r\n\
LOCATION:Praxis Süd\r\n\
CATEGORIES:MEETING\r\n\
PRIORITY:1\r\n\
RRULE:FREQ=WEEKLY;UNTIL=20250630T000000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:b@example\r\n\
DTSTART;VALUE=DATE:20250728\r\n\
DTEND;VALUE=DATE:20250809\r\n\
SUMMARY:Betriebsferien\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:c@example\r\n\
DTSTART;VALUE=DATE:20250301\r\n\
SUMMARY:Quartalsabschluss\r\n\
RRULE:FREQ=MONTHLY;COUNT=3\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:d@example\r\n\
SUMMARY:Kaputt\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn parsed() -> Vec<EventDraft> {
        parse_ics(SAMPLE.as_bytes(), "praxis-1", "user-1").unwrap()
    }

    #[test]
    fn skips_events_without_start() {
        assert_eq!(parsed().len(), 3);
    }

    #[test]
    fn imports_timed_weekly_event() {
        let drafts = parsed();
        let meeting = &drafts[0];

        assert_eq!(meeting.practice_id, "praxis-1");
        assert_eq!(meeting.created_by, "user-1");
        assert_eq!(meeting.title, "Teambesprechung, Raum 2");
        assert_eq!(meeting.description.as_deref(), Some("Agenda:\nQM"));
        assert_eq!(meeting.location.as_deref(), Some("Praxis Süd"));
        assert_eq!(meeting.start_date, date(2025, 1, 6));
        assert_eq!(meeting.start_time, "08:30");
        assert_eq!(meeting.end_time, "09:15");
        assert!(!meeting.is_all_day);
        assert_eq!(meeting.event_type, EventType::Meeting);
        assert_eq!(meeting.priority, Priority::High);
        assert_eq!(meeting.recurrence_type, RecurrenceType::Weekly);
        assert_eq!(meeting.recurrence_end_date, Some(date(2025, 6, 30)));
    }

    #[test]
    fn all_day_end_is_made_inclusive() {
        let drafts = parsed();
        let vacation = &drafts[1];

        assert!(vacation.is_all_day);
        assert_eq!(vacation.start_date, date(2025, 7, 28));
        assert_eq!(vacation.end_date, date(2025, 8, 8));
        assert_eq!(vacation.recurrence_type, RecurrenceType::None);
        assert!(vacation.validate().is_ok());
    }

    #[test]
    fn count_becomes_end_date() {
        let drafts = parsed();
        let closing = &drafts[2];

        assert_eq!(closing.end_date, closing.start_date);
        assert_eq!(closing.recurrence_type, RecurrenceType::Monthly);
        assert_eq!(closing.recurrence_end_date, Some(date(2025, 5, 1)));
    }

    #[test]
    fn missing_file_is_an_import_error() {
        assert!(matches!(
            from_path("/nonexistent/kalender.ics", "p", "u"),
            Err(Error::Import(_))
        ));
    }

    #[test]
    fn unescapes_text_values() {
        assert_eq!(unescape_text("a\\,b\\;c\\\\d\\ne"), "a,b;c\\d\ne");
    }
}
