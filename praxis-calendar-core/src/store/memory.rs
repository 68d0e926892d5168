use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    CalendarEvent, Error, EventDraft, EventPatch, Result,
    recurrence::canonical_id,
    store::{EventStore, relevant_from},
};

/// Event store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<CalendarEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }

    /// Copy of everything stored, across all practices
    pub async fn snapshot(&self) -> Vec<CalendarEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(
        &self,
        practice_id: &str,
        from: Option<NaiveDate>,
    ) -> Result<Vec<CalendarEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.practice_id == practice_id)
            .filter(|e| from.is_none_or(|from| relevant_from(e, from)))
            .cloned()
            .collect())
    }

    async fn create(&self, draft: &EventDraft) -> Result<CalendarEvent> {
        draft.validate()?;
        let event = draft
            .clone()
            .into_event(Uuid::new_v4().to_string(), Utc::now());
        self.events.write().await.push(event.clone());
        Ok(event)
    }

    async fn update(&self, id: &str, patch: &EventPatch) -> Result<CalendarEvent> {
        let id = canonical_id(id);
        let mut events = self.events.write().await;
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let mut updated = event.clone();
        updated.apply_patch(patch);
        updated.validate()?;
        *event = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = canonical_id(id);
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| e.id != id);
        if events.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}
