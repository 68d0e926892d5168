use chrono::{Days, NaiveDate, NaiveTime, Utc};

use crate::{CalendarEvent, IcsOptions, Priority, Result};

/// Renders canonical events as an iCalendar feed
pub struct IcsGenerator {
    options: IcsOptions,
}

impl IcsGenerator {
    pub fn new(options: IcsOptions) -> Self {
        Self { options }
    }

    /// Generate the calendar.
    ///
    /// Virtual instances are skipped: recurring series are emitted once with
    /// an `RRULE` and calendar clients unroll them themselves.
    pub fn generate(&self, events: &[CalendarEvent]) -> Result<String> {
        let mut ics_content = String::new();

        ics_content.push_str("BEGIN:VCALENDAR\r\n");
        ics_content.push_str("VERSION:2.0\r\n");
        ics_content.push_str("PRODID:-//Effizienz Praxis//Praxiskalender//DE\r\n");
        ics_content.push_str("CALSCALE:GREGORIAN\r\n");
        ics_content.push_str("METHOD:PUBLISH\r\n");

        if let Some(ref name) = self.options.calendar_name {
            ics_content.push_str(&format!("X-WR-CALNAME:{}\r\n", escape_text(name)));
        }
        ics_content.push_str(&format!("X-WR-TIMEZONE:{}\r\n", self.options.timezone));

        let dtstamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        for event in events.iter().filter(|e| !e.is_recurring_instance) {
            self.add_event(&mut ics_content, event, &dtstamp);
        }

        ics_content.push_str("END:VCALENDAR\r\n");

        Ok(ics_content)
    }

    fn add_event(&self, ics_content: &mut String, event: &CalendarEvent, dtstamp: &str) {
        ics_content.push_str("BEGIN:VEVENT\r\n");
        ics_content.push_str(&format!("UID:{}@effizienz-praxis\r\n", event.id));
        ics_content.push_str(&format!("DTSTAMP:{dtstamp}\r\n"));

        let timed = timed_bounds(event);
        match timed {
            Some((start, end)) => {
                let tz = &self.options.timezone;
                ics_content.push_str(&format!(
                    "DTSTART;TZID={tz}:{}\r\n",
                    event.start_date.and_time(start).format("%Y%m%dT%H%M%S")
                ));
                ics_content.push_str(&format!(
                    "DTEND;TZID={tz}:{}\r\n",
                    event.end_date.and_time(end).format("%Y%m%dT%H%M%S")
                ));
            }
            None => {
                // All-day DTEND is exclusive
                let end = event
                    .end_date
                    .checked_add_days(Days::new(1))
                    .unwrap_or(event.end_date);
                ics_content.push_str(&format!(
                    "DTSTART;VALUE=DATE:{}\r\n",
                    ical_date(event.start_date)
                ));
                ics_content.push_str(&format!("DTEND;VALUE=DATE:{}\r\n", ical_date(end)));
            }
        }

        ics_content.push_str(&format!("SUMMARY:{}\r\n", escape_text(&event.title)));

        if let Some(ref location) = event.location {
            ics_content.push_str(&format!("LOCATION:{}\r\n", escape_text(location)));
        }

        if self.options.include_description {
            if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
                ics_content.push_str(&format!("DESCRIPTION:{}\r\n", escape_text(description)));
            }
        }

        ics_content.push_str(&format!(
            "CATEGORIES:{}\r\n",
            event.event_type.as_str().to_uppercase()
        ));
        ics_content.push_str(&format!("PRIORITY:{}\r\n", ical_priority(event.priority)));

        if let Some(freq) = event.recurrence_type.ical_frequency() {
            let mut rrule = format!("RRULE:FREQ={freq}");
            // UNTIL takes the value type of DTSTART, and UTC when DTSTART has a TZID
            if let Some(until) = event.recurrence_end_date {
                let until = if timed.is_some() {
                    format!("{}T235959Z", ical_date(until))
                } else {
                    ical_date(until)
                };
                rrule.push_str(&format!(";UNTIL={until}"));
            }
            ics_content.push_str(&format!("{rrule}\r\n"));
        }

        if let Some(reminder_minutes) = self.options.reminder_minutes {
            ics_content.push_str("BEGIN:VALARM\r\n");
            ics_content.push_str("ACTION:DISPLAY\r\n");
            ics_content.push_str(&format!("DESCRIPTION:{}\r\n", escape_text(&event.title)));
            ics_content.push_str(&format!("TRIGGER:-PT{reminder_minutes}M\r\n"));
            ics_content.push_str("END:VALARM\r\n");
        }

        ics_content.push_str("END:VEVENT\r\n");
    }
}

impl Default for IcsGenerator {
    fn default() -> Self {
        Self::new(IcsOptions::default())
    }
}

/// Escape TEXT values per RFC 5545
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Start and end times of a timed event, `None` for all-day ones
fn timed_bounds(event: &CalendarEvent) -> Option<(NaiveTime, NaiveTime)> {
    if event.is_all_day {
        return None;
    }
    let start = parse_time(&event.start_time)?;
    let end = parse_time(&event.end_time).unwrap_or(start);
    Some((start, end))
}

pub(crate) fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn ical_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn ical_priority(priority: Priority) -> u8 {
    match priority {
        Priority::High => 1,
        Priority::Medium => 5,
        Priority::Low => 9,
    }
}

#[cfg(test)]
mod tests;
