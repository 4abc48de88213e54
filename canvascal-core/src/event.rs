//! Calendar event input for the .ics encoder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CanvasCalError, CanvasCalResult};

/// A single timed event. Times are always UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Absent titles deserialize as empty and are caught by `validate`.
    #[serde(default)]
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Event {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Event {
            title: title.into(),
            start,
            end,
            description: None,
            location: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Requires a non-blank title and `end >= start`.
    pub fn validate(&self) -> CanvasCalResult<()> {
        if self.title.trim().is_empty() {
            return Err(CanvasCalError::Validation("event title is empty".into()));
        }

        if self.end < self.start {
            return Err(CanvasCalError::Validation(format!(
                "'{}' ends ({}) before it starts ({})",
                self.title,
                self.end.to_rfc3339(),
                self.start.to_rfc3339()
            )));
        }

        Ok(())
    }
}
