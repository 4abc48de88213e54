use std::sync::Arc;

use anyhow::{Context, Result};
use canvascal_core::{AuthorizationRequest, CredentialBroker, FileStore, GoogleTokenEndpoint};

use crate::canvas::CanvasClient;
use crate::config::AppConfig;
use crate::google::GoogleCalendar;

pub type Broker = CredentialBroker<FileStore, GoogleTokenEndpoint>;

/// Shared application state.
///
/// One broker serves every route, so the OAuth flow lives in one place.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<Broker>,
    pub canvas: Arc<CanvasClient>,
    pub google: Arc<GoogleCalendar>,
    pub product_id: Arc<str>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let request = AuthorizationRequest::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.redirect_uri.clone(),
        );

        let endpoint = GoogleTokenEndpoint::new(config.token_timeout())?;
        let store = FileStore::new(&config.token_path);
        let broker = CredentialBroker::new(request, store, endpoint)
            .context("Invalid Google OAuth configuration")?;

        Ok(Self::from_parts(
            broker,
            CanvasClient::new(config.canvas_url.clone(), config.canvas_token.clone()),
            GoogleCalendar::new(),
            &config.ics_product_id,
        ))
    }

    pub fn from_parts(
        broker: Broker,
        canvas: CanvasClient,
        google: GoogleCalendar,
        product_id: &str,
    ) -> Self {
        AppState {
            broker: Arc::new(broker),
            canvas: Arc::new(canvas),
            google: Arc::new(google),
            product_id: Arc::from(product_id),
        }
    }
}
