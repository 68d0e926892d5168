pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{CalendarEvent, EventDraft, EventPatch, Result};

pub use http::HttpEventStore;
pub use memory::MemoryEventStore;

/// Persistence for canonical events.
///
/// Implementations only ever see canonical ids; virtual instance ids are
/// mapped back with [`crate::recurrence::canonical_id`] before they get here.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Store name, used in logs
    fn name(&self) -> &str;

    /// Events of one practice. With `from`, events that cannot produce
    /// anything on or after that date may be left out.
    async fn list(&self, practice_id: &str, from: Option<NaiveDate>)
    -> Result<Vec<CalendarEvent>>;

    async fn create(&self, draft: &EventDraft) -> Result<CalendarEvent>;

    async fn update(&self, id: &str, patch: &EventPatch) -> Result<CalendarEvent>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Whether `event` can still show up on or after `from`
pub(crate) fn relevant_from(event: &CalendarEvent, from: NaiveDate) -> bool {
    if event.end_date >= from {
        return true;
    }
    event.is_recurring() && event.recurrence_end_date.is_none_or(|until| until >= from)
}
