//! OAuth2 authorization-code flow and the single source of truth for
//! "can we call the calendar API right now".
//!
//! The broker never refreshes on its own: `credential()` and
//! `is_authenticated()` only report what is stored. Callers that care about
//! expiry check `Credential::is_expired` and call `refresh()` themselves.

use std::collections::BTreeSet;

use chrono::Utc;
use url::Url;

use crate::credential::Credential;
use crate::error::{CanvasCalError, CanvasCalResult};
use crate::store::CredentialStore;
use crate::token::TokenEndpoint;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// OAuth client settings, built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: BTreeSet<String>,
}

impl AuthorizationRequest {
    /// A request for full Google Calendar access.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        AuthorizationRequest {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: BTreeSet::from([CALENDAR_SCOPE.to_string()]),
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    fn scope_param(&self) -> String {
        self.scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}

pub struct CredentialBroker<S, T> {
    request: AuthorizationRequest,
    auth_endpoint: Url,
    store: S,
    endpoint: T,
}

impl<S: CredentialStore, T: TokenEndpoint> CredentialBroker<S, T> {
    pub fn new(request: AuthorizationRequest, store: S, endpoint: T) -> CanvasCalResult<Self> {
        Self::with_auth_endpoint(request, GOOGLE_AUTH_URL, store, endpoint)
    }

    pub fn with_auth_endpoint(
        request: AuthorizationRequest,
        auth_endpoint: &str,
        store: S,
        endpoint: T,
    ) -> CanvasCalResult<Self> {
        if request.client_id.trim().is_empty() {
            return Err(CanvasCalError::Config("client_id is empty".into()));
        }

        Url::parse(&request.redirect_uri).map_err(|e| {
            CanvasCalError::Config(format!("invalid redirect_uri '{}': {}", request.redirect_uri, e))
        })?;

        let auth_endpoint = Url::parse(auth_endpoint).map_err(|e| {
            CanvasCalError::Config(format!("invalid authorization endpoint: {}", e))
        })?;

        Ok(CredentialBroker {
            request,
            auth_endpoint,
            store,
            endpoint,
        })
    }

    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// The provider's consent-screen URL.
    ///
    /// Always asks for offline access and forces the consent prompt, otherwise a
    /// returning user gets no refresh token.
    pub fn authorization_url(&self) -> Url {
        let mut url = self.auth_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.request.client_id)
            .append_pair("redirect_uri", &self.request.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.request.scope_param())
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        url
    }

    /// Trade a one-time authorization code for tokens and persist them,
    /// replacing any previous credential. On failure the store is untouched.
    pub async fn exchange_code(&self, code: &str) -> CanvasCalResult<Credential> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CanvasCalError::AuthExchange("authorization code is empty".into()));
        }

        let grant = self.endpoint.exchange(code, &self.request).await?;
        let credential = Credential::from_grant(grant, &self.request, Utc::now())?;
        self.store.save(&credential.to_bytes()?)?;

        tracing::info!(
            has_refresh_token = credential.refresh_token.is_some(),
            expiry = ?credential.expiry,
            "Stored new credential"
        );

        if credential.refresh_token.is_none() {
            tracing::warn!("Provider issued no refresh token; access ends when the token expires");
        }

        Ok(credential)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential().is_some()
    }

    /// The stored credential, or `None` when there is none or it can't be read.
    pub fn credential(&self) -> Option<Credential> {
        match self.load() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "Treating unreadable credential as unauthenticated");
                None
            }
        }
    }

    fn load(&self) -> CanvasCalResult<Option<Credential>> {
        let bytes = self
            .store
            .load()
            .map_err(|e| CanvasCalError::CredentialLoad(e.to_string()))?;

        match bytes {
            Some(bytes) => Credential::from_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Exchange the stored refresh token for a new access token and store the
    /// result. The old refresh token is kept when the provider doesn't send one.
    pub async fn refresh(&self) -> CanvasCalResult<Credential> {
        let current = self.credential().ok_or(CanvasCalError::NotAuthenticated)?;

        let Some(refresh_token) = current.refresh_token else {
            tracing::warn!("Stored credential has no refresh token; sign in again");
            return Err(CanvasCalError::NotAuthenticated);
        };

        let grant = self.endpoint.refresh(&refresh_token, &self.request).await?;
        let mut refreshed = Credential::from_grant(grant, &self.request, Utc::now())?;

        // Google typically doesn't return a new refresh_token on refresh
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token);
        }

        self.store.save(&refreshed.to_bytes()?)?;
        tracing::info!(expiry = ?refreshed.expiry, "Refreshed credential");

        Ok(refreshed)
    }
}
