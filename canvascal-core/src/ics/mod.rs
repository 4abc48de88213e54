//! ICS file generation.
//!
//! This module writes .ics documents according to RFC 5545.

mod escape;
mod generate;

pub use escape::escape_text;
pub use generate::{CalendarDocument, DEFAULT_PRODUCT_ID, encode, encode_at, format_timestamp};
