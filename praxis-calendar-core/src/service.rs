//! Tenant-scoped calendar access on top of an [`EventStore`].
//!
//! Reads go through a short-lived cache and fail open: when the store cannot
//! be reached the calendar shows up empty instead of erroring. This hides
//! outages from end users, so every such failure is logged as a warning.
//! Use the `try_` variants where the caller needs to know.

use chrono::{Local, NaiveDate};

use crate::{
    CalendarEvent, EventDraft, EventPatch, Result,
    cache::{CacheBackend, CacheManager},
    query,
    recurrence::{DateWindow, canonical_id, expand},
    store::EventStore,
};

/// Months either side of today covered by [`CalendarService::expanded`]
pub const DEFAULT_WINDOW_MONTHS: u32 = 12;

pub struct CalendarService<S: EventStore, C: CacheBackend> {
    store: S,
    cache_manager: CacheManager<C>,
}

impl<S: EventStore, C: CacheBackend> CalendarService<S, C> {
    pub fn new(store: S, cache_manager: CacheManager<C>) -> Self {
        Self {
            store,
            cache_manager,
        }
    }

    /// Canonical events of a practice, from cache when possible
    pub async fn try_events(&self, practice_id: &str) -> Result<Vec<CalendarEvent>> {
        match self.cache_manager.cached_events(practice_id).await {
            Ok(Some(events)) => {
                tracing::debug!(practice_id, "Event cache hit");
                return Ok(events);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(practice_id, "Ignoring unreadable event cache: {}", e),
        }

        let mut events = self.store.list(practice_id, None).await?;
        // The store is trusted to filter, but never leak another tenant's events
        events.retain(|e| e.practice_id == practice_id);

        if let Err(e) = self.cache_manager.cache_events(practice_id, &events).await {
            tracing::warn!(practice_id, "Failed to cache events: {}", e);
        }
        Ok(events)
    }

    /// Like [`Self::try_events`], but an unreachable store yields no events
    pub async fn events(&self, practice_id: &str) -> Vec<CalendarEvent> {
        self.try_events(practice_id).await.unwrap_or_else(|e| {
            tracing::warn!(
                practice_id,
                store = self.store.name(),
                "Event store unavailable, showing empty calendar: {}",
                e
            );
            Vec::new()
        })
    }

    /// Canonical events plus recurring instances up to the end of `window`.
    /// Without a window, one year either side of today.
    pub async fn expanded(
        &self,
        practice_id: &str,
        window: Option<DateWindow>,
    ) -> Vec<CalendarEvent> {
        let window = window.unwrap_or_else(|| {
            DateWindow::around(Local::now().date_naive(), DEFAULT_WINDOW_MONTHS)
        });
        let events = self.events(practice_id).await;
        expand(&events, &window)
    }

    pub async fn on_date(&self, practice_id: &str, date: NaiveDate) -> Vec<CalendarEvent> {
        let events = self.events(practice_id).await;
        query::instances_on_date(&events, date)
    }

    pub async fn upcoming(&self, practice_id: &str, days: u32) -> Vec<CalendarEvent> {
        let events = self.events(practice_id).await;
        query::upcoming(&events, days)
    }

    pub async fn create(&self, practice_id: &str, mut draft: EventDraft) -> Result<CalendarEvent> {
        draft.practice_id = practice_id.to_string();
        draft.validate()?;

        let event = self.store.create(&draft).await?;
        tracing::info!(practice_id, event_id = %event.id, "Created calendar event");
        self.invalidate(practice_id).await;
        Ok(event)
    }

    /// Update an event; instance ids address their parent series
    pub async fn update(
        &self,
        practice_id: &str,
        id: &str,
        patch: &EventPatch,
    ) -> Result<CalendarEvent> {
        patch.validate()?;
        let id = canonical_id(id);

        let event = self.store.update(id, patch).await?;
        tracing::info!(practice_id, event_id = id, "Updated calendar event");
        self.invalidate(practice_id).await;
        Ok(event)
    }

    /// Delete an event; instance ids delete the whole series
    pub async fn delete(&self, practice_id: &str, id: &str) -> Result<()> {
        let id = canonical_id(id);

        self.store.delete(id).await?;
        tracing::info!(practice_id, event_id = id, "Deleted calendar event");
        self.invalidate(practice_id).await;
        Ok(())
    }

    async fn invalidate(&self, practice_id: &str) {
        if let Err(e) = self.cache_manager.invalidate_events(practice_id).await {
            tracing::warn!(practice_id, "Failed to invalidate event cache: {}", e);
        }
    }
}
