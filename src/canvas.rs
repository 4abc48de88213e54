//! Canvas LMS calendar events API.

use anyhow::{Context, Result};
use canvascal_core::{CanvasCalError, Event};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::{Client, Url, header};
use serde::{Deserialize, Serialize};

/// How far ahead to look when the caller gives no end date.
pub const DEFAULT_WINDOW_DAYS: i64 = 21;

const PER_PAGE: &str = "100";

/// Upper bound on `Link: rel="next"` hops for one request.
pub const MAX_PAGES: usize = 50;

/// A calendar event as returned by `GET /api/v1/calendar_events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasCalendarEvent {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub location_name: Option<String>,
    pub html_url: Option<String>,
}

impl CanvasCalendarEvent {
    /// Convert to an encodable event. Events without a start time or title are
    /// dropped; a missing end collapses to the start.
    pub fn to_event(&self) -> Option<Event> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let start = self.start_at?;
        let end = self.end_at.filter(|end| *end >= start).unwrap_or(start);

        let mut event = Event::new(title, start, end);
        event.description = self.description.clone().filter(|d| !d.is_empty());
        event.location = self.location_name.clone().filter(|l| !l.is_empty());
        Some(event)
    }
}

pub struct CanvasClient {
    client: Client,
    base_url: String,
    token: String,
}

impl CanvasClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Fetch every calendar event between `start_date` and `end_date`,
    /// following `Link: rel="next"` pagination.
    pub async fn calendar_events(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<CanvasCalendarEvent>> {
        let url = Url::parse(&format!("{}/api/v1/calendar_events", self.base_url))
            .map_err(|e| CanvasCalError::Config(format!("Invalid CANVAS_URL: {}", e)))?;
        let start = start_date.to_string();
        let end = end_date.to_string();

        let mut request = self.client.get(url.clone()).query(&[
            ("start_date", start.as_str()),
            ("end_date", end.as_str()),
            ("per_page", PER_PAGE),
        ]);

        let mut all_events = Vec::new();
        let mut pages = 0;

        loop {
            pages += 1;
            let response = request
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| CanvasCalError::Upstream(format!("Canvas unreachable: {}", e)))?;

            tracing::debug!(status = %response.status(), url = %response.url(), "Canvas response");

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(CanvasCalError::Upstream(format!(
                    "Canvas calendar_events returned {}: {}",
                    status, body
                ))
                .into());
            }

            let next = response
                .headers()
                .get(header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link);

            let page: Vec<CanvasCalendarEvent> = response
                .json()
                .await
                .context("Failed to parse Canvas calendar events")?;
            all_events.extend(page);

            let Some(next) = next else {
                break;
            };

            if pages >= MAX_PAGES {
                tracing::warn!(pages, "Canvas pagination limit reached; remaining pages skipped");
                break;
            }

            // The bearer token only ever goes back to the configured Canvas host
            let next = Url::parse(&next)
                .ok()
                .filter(|next| next.origin() == url.origin())
                .ok_or_else(|| {
                    CanvasCalError::Upstream(format!("Canvas returned a foreign next link: {}", next))
                })?;
            request = self.client.get(next);
        }

        tracing::info!(count = all_events.len(), %start_date, %end_date, "Fetched Canvas events");
        Ok(all_events)
    }
}

pub fn default_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today, today + Duration::days(DEFAULT_WINDOW_DAYS))
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
fn next_link(header: &str) -> Option<String> {
    header
        .split(',')
        .find(|part| part.contains("rel=\"next\""))
        .and_then(|part| part.split(';').next())
        .map(|target| target.trim().trim_start_matches('<').trim_end_matches('>').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_next_link() {
        let header = r#"<https://canvas.test/api/v1/calendar_events?page=1>; rel="current", <https://canvas.test/api/v1/calendar_events?page=2>; rel="next", <https://canvas.test/api/v1/calendar_events?page=1>; rel="first""#;

        assert_eq!(
            next_link(header).as_deref(),
            Some("https://canvas.test/api/v1/calendar_events?page=2")
        );
        assert_eq!(next_link(r#"<https://canvas.test/x>; rel="last""#), None);
    }

    #[test]
    fn test_default_window_is_three_weeks() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();
        let (start, end) = default_window(today);

        assert_eq!(start, today);
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 11, 20).unwrap());
    }

    #[test]
    fn test_to_event() {
        let canvas = CanvasCalendarEvent {
            id: Some(42),
            title: Some("CS 320 Midterm".to_string()),
            start_at: Some(Utc.with_ymd_and_hms(2025, 10, 30, 15, 0, 0).unwrap()),
            end_at: None,
            description: Some(String::new()),
            location_name: Some("Clark A201".to_string()),
            html_url: None,
        };

        let event = canvas.to_event().unwrap();
        assert_eq!(event.title, "CS 320 Midterm");
        assert_eq!(event.end, event.start);
        assert_eq!(event.description, None);
        assert_eq!(event.location.as_deref(), Some("Clark A201"));
    }

    #[test]
    fn test_to_event_skips_untimed_or_untitled() {
        let untimed = CanvasCalendarEvent {
            id: None,
            title: Some("Undated".to_string()),
            start_at: None,
            end_at: None,
            description: None,
            location_name: None,
            html_url: None,
        };
        assert_eq!(untimed.to_event(), None);

        let untitled = CanvasCalendarEvent {
            title: Some(" ".to_string()),
            start_at: Some(Utc::now()),
            ..untimed
        };
        assert_eq!(untitled.to_event(), None);
    }

    #[tokio::test]
    async fn test_calendar_events_follows_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/calendar_events"))
            .and(query_param("start_date", "2025-10-30"))
            .and(query_param("end_date", "2025-11-20"))
            .and(query_param("per_page", "100"))
            .and(header_eq("authorization", "Bearer canvas-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "link",
                        format!("<{}/api/v1/calendar_events?page=2>; rel=\"next\"", server.uri()).as_str(),
                    )
                    .set_body_json(serde_json::json!([
                        { "id": 1, "title": "CS 320 Midterm", "start_at": "2025-10-30T15:00:00Z", "end_at": "2025-10-30T16:15:00Z" }
                    ])),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/calendar_events"))
            .and(query_param("page", "2"))
            .and(header_eq("authorization", "Bearer canvas-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 2, "title": "CS 314 Demo", "start_at": "2025-11-14T17:00:00Z", "end_at": "2025-11-14T18:00:00Z", "location_name": "CSU Engineering" }
            ])))
            .mount(&server)
            .await;

        let client = CanvasClient::new(format!("{}/", server.uri()), "canvas-token");
        let events = client
            .calendar_events(
                NaiveDate::from_ymd_opt(2025, 10, 30).unwrap(),
                NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
            )
            .await
            .unwrap();

        let titles: Vec<_> = events.iter().filter_map(|e| e.title.as_deref()).collect();
        assert_eq!(titles, vec!["CS 320 Midterm", "CS 314 Demo"]);
    }

    #[tokio::test]
    async fn test_pagination_stops_at_page_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/calendar_events"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "link",
                        format!("<{}/api/v1/calendar_events?page=again>; rel=\"next\"", server.uri()).as_str(),
                    )
                    .set_body_json(serde_json::json!([
                        { "id": 1, "title": "Looping", "start_at": "2025-10-30T15:00:00Z" }
                    ])),
            )
            .expect(MAX_PAGES as u64)
            .mount(&server)
            .await;

        let client = CanvasClient::new(server.uri(), "canvas-token");
        let (start, end) = default_window(NaiveDate::from_ymd_opt(2025, 10, 30).unwrap());
        let events = client.calendar_events(start, end).await.unwrap();

        assert_eq!(events.len(), MAX_PAGES);
    }

    #[tokio::test]
    async fn test_next_link_to_other_host_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/calendar_events"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "link",
                        "<https://attacker.test/api/v1/calendar_events?page=2>; rel=\"next\"",
                    )
                    .set_body_json(serde_json::json!([])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = CanvasClient::new(server.uri(), "canvas-token");
        let (start, end) = default_window(NaiveDate::from_ymd_opt(2025, 10, 30).unwrap());
        let err = client.calendar_events(start, end).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CanvasCalError>(),
            Some(CanvasCalError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_canvas_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid access token"))
            .mount(&server)
            .await;

        let client = CanvasClient::new(server.uri(), "bad");
        let (start, end) = default_window(Utc::now().date_naive());
        let err = client.calendar_events(start, end).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CanvasCalError>(),
            Some(CanvasCalError::Upstream(_))
        ));
    }
}
