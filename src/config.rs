//! Server configuration, read from the environment (and a `.env` file if present).
//!
//! Keys:
//!   CLIENT_ID, SECRET_ID, REDIRECT      Google OAuth client
//!   CANVAS_URL, CANVAS_TOKEN            Canvas instance and access token
//!   PORT                                listen port (default 3000)
//!   TOKEN_PATH                          credential file (default tokens.json)
//!   TOKEN_TIMEOUT_SECS                  token request timeout (default 30)
//!   ICS_PRODUCT_ID                      PRODID written to .ics files

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use canvascal_core::ics::DEFAULT_PRODUCT_ID;
use config::{Config, Environment};
use serde::Deserialize;

fn default_port() -> u16 {
    3000
}

fn default_token_path() -> PathBuf {
    PathBuf::from("tokens.json")
}

fn default_token_timeout_secs() -> u64 {
    30
}

fn default_product_id() -> String {
    DEFAULT_PRODUCT_ID.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    #[serde(rename = "secret_id")]
    pub client_secret: String,
    #[serde(rename = "redirect")]
    pub redirect_uri: String,

    pub canvas_url: String,
    pub canvas_token: String,

    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(default = "default_token_timeout_secs")]
    pub token_timeout_secs: u64,
    #[serde(default = "default_product_id")]
    pub ics_product_id: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        Self::from_environment(Environment::default())
    }

    fn from_environment(environment: Environment) -> Result<Self> {
        Config::builder()
            .add_source(environment)
            .build()
            .context("Failed to read configuration from the environment")?
            .try_deserialize()
            .context(
                "Missing or invalid configuration. \
                CLIENT_ID, SECRET_ID, REDIRECT, CANVAS_URL and CANVAS_TOKEN must be set",
            )
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.token_timeout_secs)
    }
}
