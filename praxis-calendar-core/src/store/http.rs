use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{
    Client, Response, StatusCode, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    CalendarEvent, Error, EventDraft, EventPatch, Result, config::StoreConfig,
    recurrence::canonical_id, store::EventStore,
};

/// Client for the REST event store
pub struct HttpEventStore {
    client: Client,
    base_url: String,
}

/// List responses come either bare or wrapped in `{"events": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum EventList {
    Bare(Vec<CalendarEvent>),
    Wrapped { events: Vec<CalendarEvent> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SingleEvent {
    Bare(CalendarEvent),
    Wrapped { event: CalendarEvent },
}

impl HttpEventStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(ref key) = config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                Error::Config("EVENT_STORE_API_KEY contains invalid characters".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("praxis-calendar/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.base_url)
    }

    /// URL of a single event; the id is percent-encoded as one path segment
    fn event_url(&self, id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.events_url())
            .map_err(|e| Error::Config(format!("invalid event store URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("{} cannot carry an event id", self.base_url)))?
            .push(canonical_id(id));
        Ok(url)
    }

    /// Map transport errors onto the crate's error type
    fn handle_error_req(error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout
        } else {
            Error::Http(error)
        }
    }

    async fn check_status(response: Response, id: Option<&str>) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(Error::NotFound(id.to_string()));
            }
        }

        let message = response
            .text()
            .await
            .ok()
            .filter(|body| !body.trim().is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
        Err(Error::Store {
            status: status.as_u16(),
            message,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response, id: Option<&str>) -> Result<T> {
        let response = Self::check_status(response, id).await?;
        let bytes = response.bytes().await.map_err(Self::handle_error_req)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn list(
        &self,
        practice_id: &str,
        from: Option<NaiveDate>,
    ) -> Result<Vec<CalendarEvent>> {
        let mut query = vec![("practiceId", practice_id.to_string())];
        if let Some(from) = from {
            query.push(("from", from.format("%Y-%m-%d").to_string()));
        }

        tracing::debug!(practice_id, ?from, "Fetching events from store");
        let response = self
            .client
            .get(self.events_url())
            .query(&query)
            .send()
            .await
            .map_err(Self::handle_error_req)?;

        let events = match Self::read_json::<EventList>(response, None).await? {
            EventList::Bare(events) | EventList::Wrapped { events } => events,
        };
        tracing::debug!(practice_id, count = events.len(), "Fetched events");
        Ok(events)
    }

    async fn create(&self, draft: &EventDraft) -> Result<CalendarEvent> {
        let response = self
            .client
            .post(self.events_url())
            .json(draft)
            .send()
            .await
            .map_err(Self::handle_error_req)?;

        match Self::read_json::<SingleEvent>(response, None).await? {
            SingleEvent::Bare(event) | SingleEvent::Wrapped { event } => Ok(event),
        }
    }

    async fn update(&self, id: &str, patch: &EventPatch) -> Result<CalendarEvent> {
        let response = self
            .client
            .put(self.event_url(id)?)
            .json(patch)
            .send()
            .await
            .map_err(Self::handle_error_req)?;

        match Self::read_json::<SingleEvent>(response, Some(canonical_id(id))).await? {
            SingleEvent::Bare(event) | SingleEvent::Wrapped { event } => Ok(event),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.event_url(id)?)
            .send()
            .await
            .map_err(Self::handle_error_req)?;

        Self::check_status(response, Some(canonical_id(id))).await?;
        Ok(())
    }
}
