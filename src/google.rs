//! Read access to the user's Google Calendar.

use anyhow::{Context, Result};
use canvascal_core::{CanvasCalError, Credential};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google's alias for the user's main calendar
const PRIMARY_CALENDAR_ID: &str = "primary";

pub const DEFAULT_MAX_RESULTS: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<GoogleEventTime>,
    pub end: Option<GoogleEventTime>,
    pub html_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    /// For all-day events
    pub date: Option<String>,
    /// For timed events
    pub date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventsListResponse {
    items: Option<Vec<GoogleEvent>>,
}

pub struct GoogleCalendar {
    client: Client,
    api_base: String,
}

impl GoogleCalendar {
    pub fn new() -> Self {
        Self::with_api_base(CALENDAR_API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
        }
    }

    /// Upcoming events from the primary calendar, soonest first.
    pub async fn upcoming_events(
        &self,
        credential: &Credential,
        max_results: u32,
    ) -> Result<Vec<GoogleEvent>> {
        let url = format!("{}/calendars/{}/events", self.api_base, PRIMARY_CALENDAR_ID);
        let time_min = Utc::now().to_rfc3339();
        let max_results = max_results.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(&credential.access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CanvasCalError::Upstream(format!("Google Calendar unreachable: {}", e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(CanvasCalError::NotAuthenticated.into());
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CanvasCalError::Upstream(format!(
                "Calendar API error {}: {}",
                status, body
            ))
            .into());
        }

        let events: EventsListResponse = response
            .json()
            .await
            .context("Failed to parse Google Calendar events")?;

        Ok(events.items.unwrap_or_default())
    }
}

impl Default for GoogleCalendar {
    fn default() -> Self {
        Self::new()
    }
}
