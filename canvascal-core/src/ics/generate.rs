//! ICS document generation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::escape::{escape_text, push_folded};
use crate::error::{CanvasCalError, CanvasCalResult};
use crate::event::Event;

pub const DEFAULT_PRODUCT_ID: &str = "-//canvascal//CanvasEvents//EN";

/// A serialized VCALENDAR. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDocument {
    content: String,
    event_count: usize,
}

impl CalendarDocument {
    pub const MIME_TYPE: &'static str = "text/calendar; charset=utf-8";

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.content.into_bytes()
    }

    /// Number of VEVENT blocks in the document.
    pub fn event_count(&self) -> usize {
        self.event_count
    }
}

/// Format a UTC instant as an iCalendar DATE-TIME (`YYYYMMDDTHHMMSSZ`).
/// Sub-second precision is dropped.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Encode `events` into one VCALENDAR, stamped with the current time.
pub fn encode(events: &[Event], product_id: &str) -> CanvasCalResult<CalendarDocument> {
    encode_at(events, product_id, Utc::now())
}

/// Encode `events` into one VCALENDAR with `DTSTAMP` set to `now`.
///
/// Every event is validated before anything is written, so a bad event
/// rejects the whole batch. Each VEVENT gets a fresh random UID.
pub fn encode_at(
    events: &[Event],
    product_id: &str,
    now: DateTime<Utc>,
) -> CanvasCalResult<CalendarDocument> {
    if product_id.trim().is_empty() || product_id.chars().any(char::is_control) {
        return Err(CanvasCalError::Validation(format!(
            "invalid PRODID '{}'",
            product_id.escape_debug()
        )));
    }

    for (index, event) in events.iter().enumerate() {
        event
            .validate()
            .map_err(|e| CanvasCalError::Validation(format!("event {}: {}", index, e)))?;
    }

    let dtstamp = format_timestamp(now);

    let mut out = String::new();
    push_folded(&mut out, "BEGIN:VCALENDAR");
    push_folded(&mut out, "VERSION:2.0");
    push_folded(&mut out, "CALSCALE:GREGORIAN");
    push_folded(&mut out, &format!("PRODID:{}", product_id));

    for event in events {
        push_event(&mut out, event, &dtstamp);
    }

    push_folded(&mut out, "END:VCALENDAR");

    Ok(CalendarDocument {
        content: out,
        event_count: events.len(),
    })
}

fn push_event(out: &mut String, event: &Event, dtstamp: &str) {
    let description = event.description.as_deref().unwrap_or_default();
    let location = event.location.as_deref().unwrap_or_default();

    push_folded(out, "BEGIN:VEVENT");
    push_folded(out, &format!("UID:{}", Uuid::new_v4()));
    push_folded(out, &format!("DTSTAMP:{}", dtstamp));
    push_folded(out, &format!("SUMMARY:{}", escape_text(&event.title)));
    push_folded(out, &format!("DTSTART:{}", format_timestamp(event.start)));
    push_folded(out, &format!("DTEND:{}", format_timestamp(event.end)));
    push_folded(out, &format!("DESCRIPTION:{}", escape_text(description)));
    push_folded(out, &format!("LOCATION:{}", escape_text(location)));
    push_folded(out, "END:VEVENT");
}
