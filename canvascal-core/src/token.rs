//! Token endpoint collaborator.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::broker::AuthorizationRequest;
use crate::error::{CanvasCalError, CanvasCalResult};

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Upper bound on a single token request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space-separated granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Something that trades authorization codes and refresh tokens for tokens.
pub trait TokenEndpoint: Send + Sync {
    fn exchange(
        &self,
        code: &str,
        request: &AuthorizationRequest,
    ) -> impl Future<Output = CanvasCalResult<TokenGrant>> + Send;

    fn refresh(
        &self,
        refresh_token: &str,
        request: &AuthorizationRequest,
    ) -> impl Future<Output = CanvasCalResult<TokenGrant>> + Send;
}

/// Error body returned by OAuth2 token endpoints.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthErrorBody {
    fn describe(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {}", self.error, description),
            None => self.error.clone(),
        }
    }
}

/// Google's OAuth2 token endpoint over HTTPS.
#[derive(Debug, Clone)]
pub struct GoogleTokenEndpoint {
    client: Client,
    token_url: String,
}

impl GoogleTokenEndpoint {
    pub fn new(timeout: Duration) -> CanvasCalResult<Self> {
        Self::with_token_url(GOOGLE_TOKEN_URL, timeout)
    }

    pub fn with_token_url(token_url: impl Into<String>, timeout: Duration) -> CanvasCalResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CanvasCalError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(GoogleTokenEndpoint {
            client,
            token_url: token_url.into(),
        })
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> CanvasCalResult<TokenGrant> {
        let response = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| CanvasCalError::Upstream(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            return response.json::<TokenGrant>().await.map_err(|e| {
                CanvasCalError::Upstream(format!("invalid token endpoint response: {}", e))
            });
        }

        let body = response.text().await.unwrap_or_default();

        // 400/401 carry OAuth errors such as invalid_grant (expired or reused code)
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let reason = serde_json::from_str::<OAuthErrorBody>(&body)
                .map(|e| e.describe())
                .unwrap_or(body);
            return Err(CanvasCalError::AuthExchange(reason));
        }

        Err(CanvasCalError::Upstream(format!(
            "token endpoint returned {}: {}",
            status, body
        )))
    }
}

impl TokenEndpoint for GoogleTokenEndpoint {
    async fn exchange(
        &self,
        code: &str,
        request: &AuthorizationRequest,
    ) -> CanvasCalResult<TokenGrant> {
        self.post_form(&[
            ("code", code),
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.as_str()),
            ("redirect_uri", request.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        request: &AuthorizationRequest,
    ) -> CanvasCalResult<TokenGrant> {
        self.post_form(&[
            ("refresh_token", refresh_token),
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .await
    }
}
