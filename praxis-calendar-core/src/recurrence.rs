//! Expansion of recurring events into virtual instances.
//!
//! Canonical events are stored once with a repeat rule. Views need one entry
//! per occurrence, so [`expand`] unrolls every rule up to the end of the
//! visible window. Generated instances are never persisted; they carry a
//! synthetic id that points back at their parent.

use chrono::{Days, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{CalendarEvent, Error, RecurrenceType, Result};

/// Upper bound on generated instances per source event
pub const MAX_INSTANCES_PER_EVENT: u32 = 365;

const INSTANCE_MARKER: &str = "-instance-";

/// Inclusive date range a view is interested in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidWindow(format!(
                "window start {start} is after window end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `months` calendar months either side of `center`
    pub fn around(center: NaiveDate, months: u32) -> Self {
        let span = Months::new(months);
        Self {
            start: center.checked_sub_months(span).unwrap_or(NaiveDate::MIN),
            end: center.checked_add_months(span).unwrap_or(NaiveDate::MAX),
        }
    }

    /// From `start` through `start + days`
    pub fn following(start: NaiveDate, days: u32) -> Self {
        Self {
            start,
            end: start
                .checked_add_days(Days::new(days.into()))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Expand recurring events into canonical events plus virtual instances.
///
/// Every input event is returned as-is, followed by its generated instances.
/// Generation starts one step after the event's own start date and stops at
/// the earlier of `recurrenceEndDate` and `window.end`, or after
/// [`MAX_INSTANCES_PER_EVENT`] instances. Instances before `window.start` are
/// not filtered out, and nothing is de-duplicated.
pub fn expand(events: &[CalendarEvent], window: &DateWindow) -> Vec<CalendarEvent> {
    let mut expanded = Vec::with_capacity(events.len());

    for event in events {
        expanded.push(event.clone());

        if !event.is_recurring() {
            continue;
        }

        let limit = event
            .recurrence_end_date
            .map_or(window.end, |until| until.min(window.end));
        let span = Duration::days(event.span_days());

        for step in 1..=MAX_INSTANCES_PER_EVENT {
            let Some(start) = nth_occurrence(event.recurrence_type, event.start_date, step) else {
                break;
            };
            if start > limit {
                break;
            }
            let Some(end) = start.checked_add_signed(span) else {
                break;
            };
            expanded.push(virtual_instance(event, start, end));
        }
    }

    tracing::debug!(
        canonical = events.len(),
        expanded = expanded.len(),
        until = %window.end,
        "Expanded recurring events"
    );

    expanded
}

/// Date of the `n`-th repetition after `anchor`.
///
/// Offsets are taken from the anchor rather than chained from the previous
/// occurrence, so a monthly rule on the 31st clamps to short months without
/// drifting to the 28th afterwards.
pub fn nth_occurrence(rule: RecurrenceType, anchor: NaiveDate, n: u32) -> Option<NaiveDate> {
    match rule {
        RecurrenceType::None => None,
        RecurrenceType::Daily => anchor.checked_add_days(Days::new(n.into())),
        RecurrenceType::Weekly => anchor.checked_add_days(Days::new(u64::from(n) * 7)),
        RecurrenceType::Monthly => anchor.checked_add_months(Months::new(n)),
        RecurrenceType::Yearly => anchor.checked_add_months(Months::new(n.checked_mul(12)?)),
    }
}

/// Synthetic id of the instance of `parent_id` starting on `date`
pub fn instance_id(parent_id: &str, date: NaiveDate) -> String {
    format!("{parent_id}{INSTANCE_MARKER}{}", date.format("%Y-%m-%d"))
}

/// Store key for an event id; instance ids map back to their parent
pub fn canonical_id(id: &str) -> &str {
    id.split_once(INSTANCE_MARKER).map_or(id, |(parent, _)| parent)
}

fn virtual_instance(parent: &CalendarEvent, start: NaiveDate, end: NaiveDate) -> CalendarEvent {
    CalendarEvent {
        id: instance_id(&parent.id, start),
        start_date: start,
        end_date: end,
        is_recurring_instance: true,
        parent_event_id: Some(parent.id.clone()),
        ..parent.clone()
    }
}

#[cfg(test)]
mod tests;
