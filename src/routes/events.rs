//! Event endpoints: Canvas relay, .ics downloads, Google Calendar listing.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use canvascal_core::ics::{self, CalendarDocument};
use canvascal_core::{CanvasCalError, Event};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::canvas::{self, CanvasCalendarEvent};
use crate::google::{DEFAULT_MAX_RESULTS, GoogleEvent};
use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/test-canvas", get(canvas_events))
        .route("/canvas.ics", get(canvas_ics))
        .route("/ics", post(events_ics))
        .route("/calendar-events", get(calendar_events))
}

/// Optional date window; defaults to today through three weeks out.
#[derive(Debug, Default, Deserialize)]
pub struct DateWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateWindow {
    fn resolve(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), CanvasCalError> {
        let start = self.start_date.unwrap_or(today);
        let end = self.end_date.unwrap_or(canvas::default_window(start).1);

        if end < start {
            return Err(CanvasCalError::Validation(format!(
                "end_date {} is before start_date {}",
                end, start
            )));
        }

        Ok((start, end))
    }
}

async fn fetch_canvas(state: &AppState, window: &DateWindow) -> Result<Vec<CanvasCalendarEvent>, AppError> {
    let (start, end) = window.resolve(Utc::now().date_naive())?;
    Ok(state.canvas.calendar_events(start, end).await?)
}

/// GET /test-canvas - Canvas events as JSON
async fn canvas_events(
    State(state): State<AppState>,
    Query(window): Query<DateWindow>,
) -> Result<Json<Vec<CanvasCalendarEvent>>, AppError> {
    Ok(Json(fetch_canvas(&state, &window).await?))
}

/// GET /canvas.ics - Canvas events as a downloadable calendar
async fn canvas_ics(
    State(state): State<AppState>,
    Query(window): Query<DateWindow>,
) -> Result<Response, AppError> {
    let canvas_events = fetch_canvas(&state, &window).await?;
    let events: Vec<Event> = canvas_events.iter().filter_map(CanvasCalendarEvent::to_event).collect();

    let skipped = canvas_events.len() - events.len();
    if skipped > 0 {
        tracing::debug!(skipped, "Skipped Canvas events without a title or start time");
    }

    let document = ics::encode(&events, &state.product_id)?;
    Ok(ics_download(document, "canvas.ics"))
}

/// POST /ics - Encode caller-supplied events
async fn events_ics(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Event>>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(events) = payload.map_err(|e| CanvasCalError::Validation(e.body_text()))?;
    let document = ics::encode(&events, &state.product_id)?;
    Ok(ics_download(document, "schedule.ics"))
}

fn ics_download(document: CalendarDocument, filename: &str) -> Response {
    tracing::info!(events = document.event_count(), filename, "Serving calendar file");

    (
        [
            (header::CONTENT_TYPE, CalendarDocument::MIME_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        document.into_bytes(),
    )
        .into_response()
}

/// GET /calendar-events - Upcoming events on the user's primary Google calendar
async fn calendar_events(State(state): State<AppState>) -> Result<Json<Vec<GoogleEvent>>, AppError> {
    let credential = state
        .broker
        .credential()
        .ok_or(CanvasCalError::NotAuthenticated)?;

    if credential.is_expired(Utc::now()) {
        tracing::debug!("Access token expired, refreshing");
        let credential = state.broker.refresh().await?;
        return Ok(Json(state.google.upcoming_events(&credential, DEFAULT_MAX_RESULTS).await?));
    }

    Ok(Json(state.google.upcoming_events(&credential, DEFAULT_MAX_RESULTS).await?))
}
