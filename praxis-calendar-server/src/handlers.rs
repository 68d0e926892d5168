use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use chrono::NaiveDate;
use praxis_calendar_core::{prelude::*, query::DEFAULT_UPCOMING_DAYS};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state
pub struct AppState<S: EventStore, C: CacheBackend> {
    pub service: Arc<CalendarService<S, C>>,
}

impl<S: EventStore, C: CacheBackend> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

#[derive(Serialize)]
struct EventsResponse {
    events: Vec<CalendarEvent>,
}

/// Query parameters of the event list
#[derive(Deserialize, Default)]
struct ListEventsQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    search: Option<String>,
    /// Comma-separated event types
    #[serde(rename = "type")]
    types: Option<String>,
    /// Comma-separated priorities
    priority: Option<String>,
    sort: Option<String>,
}

impl ListEventsQuery {
    fn window(&self) -> Result<Option<DateWindow>, AppError> {
        match (self.from, self.to) {
            (None, None) => Ok(None),
            (Some(from), Some(to)) => Ok(Some(DateWindow::new(from, to)?)),
            _ => Err(AppError(praxis_calendar_core::Error::InvalidWindow(
                "'from' and 'to' must be given together".to_string(),
            ))),
        }
    }

    fn filter(&self) -> Result<EventFilter, AppError> {
        Ok(EventFilter {
            search: self.search.clone(),
            types: parse_list(self.types.as_deref())?,
            priorities: parse_list(self.priority.as_deref())?,
            sort: self
                .sort
                .as_deref()
                .map(str::parse::<SortOrder>)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

#[derive(Deserialize)]
struct UpcomingQuery {
    days: Option<u32>,
}

#[derive(Deserialize)]
struct IcsQuery {
    name: Option<String>,
    reminder: Option<u32>,
}

pub fn create_app<S, C>(service: Arc<CalendarService<S, C>>) -> Router
where
    S: EventStore + 'static,
    C: CacheBackend + 'static,
{
    let state = AppState { service };

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route(
            "/practices/{practice_id}/events",
            get(list_events_handler::<S, C>).post(create_event_handler::<S, C>),
        )
        .route(
            "/practices/{practice_id}/events/{event_id}",
            put(update_event_handler::<S, C>).delete(delete_event_handler::<S, C>),
        )
        .route(
            "/practices/{practice_id}/events/on/{date}",
            get(events_on_date_handler::<S, C>),
        )
        .route(
            "/practices/{practice_id}/events/upcoming",
            get(upcoming_events_handler::<S, C>),
        )
        .route(
            "/practices/{practice_id}/calendar.ics",
            get(calendar_feed_handler::<S, C>),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Effizienz Praxis Calendar Service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "events": "/practices/{practiceId}/events",
            "onDate": "/practices/{practiceId}/events/on/{date}",
            "upcoming": "/practices/{practiceId}/events/upcoming",
            "feed": "/practices/{practiceId}/calendar.ics"
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Expanded events of a practice, optionally filtered and sorted
async fn list_events_handler<S: EventStore, C: CacheBackend>(
    State(state): State<AppState<S, C>>,
    Path(practice_id): Path<String>,
    Query(params): Query<ListEventsQuery>,
) -> Result<Json<EventsResponse>, AppError> {
    let window = params.window()?;
    let filter = params.filter()?;

    let events = state.service.expanded(&practice_id, window).await;
    Ok(Json(EventsResponse {
        events: filter.apply(events),
    }))
}

async fn create_event_handler<S: EventStore, C: CacheBackend>(
    State(state): State<AppState<S, C>>,
    Path(practice_id): Path<String>,
    Json(draft): Json<EventDraft>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.service.create(&practice_id, draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event_handler<S: EventStore, C: CacheBackend>(
    State(state): State<AppState<S, C>>,
    Path((practice_id, event_id)): Path<(String, String)>,
    Json(patch): Json<EventPatch>,
) -> Result<Json<CalendarEvent>, AppError> {
    let event = state
        .service
        .update(&practice_id, &event_id, &patch)
        .await?;
    Ok(Json(event))
}

async fn delete_event_handler<S: EventStore, C: CacheBackend>(
    State(state): State<AppState<S, C>>,
    Path((practice_id, event_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state.service.delete(&practice_id, &event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn events_on_date_handler<S: EventStore, C: CacheBackend>(
    State(state): State<AppState<S, C>>,
    Path((practice_id, date)): Path<(String, NaiveDate)>,
) -> Json<EventsResponse> {
    let events = state.service.on_date(&practice_id, date).await;
    Json(EventsResponse { events })
}

async fn upcoming_events_handler<S: EventStore, C: CacheBackend>(
    State(state): State<AppState<S, C>>,
    Path(practice_id): Path<String>,
    Query(params): Query<UpcomingQuery>,
) -> Json<EventsResponse> {
    let days = params.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    let events = state.service.upcoming(&practice_id, days).await;
    Json(EventsResponse { events })
}

/// iCalendar feed of the practice's canonical events
async fn calendar_feed_handler<S: EventStore, C: CacheBackend>(
    State(state): State<AppState<S, C>>,
    Path(practice_id): Path<String>,
    Query(params): Query<IcsQuery>,
) -> Result<Response, AppError> {
    let events = state.service.events(&practice_id).await;

    let options = IcsOptions {
        calendar_name: Some(params.name.unwrap_or_else(|| format!("Praxiskalender {practice_id}"))),
        reminder_minutes: params.reminder,
        ..Default::default()
    };
    let ics_content = IcsGenerator::new(options).generate(&events)?;

    Ok((
        StatusCode::OK,
        [("Content-Type", "text/calendar; charset=utf-8")],
        ics_content,
    )
        .into_response())
}

fn parse_list<T>(raw: Option<&str>) -> Result<Vec<T>, AppError>
where
    T: std::str::FromStr<Err = praxis_calendar_core::Error>,
{
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
    })
    .transpose()
    .map(Option::unwrap_or_default)
    .map_err(AppError)
}

/// Error returned by handlers
#[derive(Debug)]
struct AppError(praxis_calendar_core::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use praxis_calendar_core::Error;

        let (status, error_message) = match &self.0 {
            Error::InvalidEvent(_) | Error::InvalidWindow(_) | Error::Config(_) => {
                (StatusCode::BAD_REQUEST, "invalid request")
            }
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not found"),
            Error::Store { .. } | Error::Http(_) => (StatusCode::BAD_GATEWAY, "event store error"),
            Error::Timeout => (StatusCode::GATEWAY_TIMEOUT, "event store timeout"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<praxis_calendar_core::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
