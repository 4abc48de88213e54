//! Core types for canvascal.
//!
//! This crate holds the two pieces the relay server is built around:
//! - `broker` drives the OAuth2 authorization-code flow and owns the stored credential
//! - `ics` turns `Event`s into an iCalendar document

pub mod broker;
pub mod credential;
pub mod error;
pub mod event;
pub mod ics;
pub mod store;
pub mod token;

pub use broker::{AuthorizationRequest, CredentialBroker};
pub use credential::Credential;
pub use error::{CanvasCalError, CanvasCalResult};
pub use event::Event;
pub use store::{CredentialStore, FileStore, MemoryStore};
pub use token::{GoogleTokenEndpoint, TokenEndpoint, TokenGrant};
