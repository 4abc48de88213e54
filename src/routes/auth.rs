//! OAuth endpoints: consent redirect, callback, and status.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use canvascal_core::CanvasCalError;
use serde::{Deserialize, Serialize};

use crate::routes::AppError;
use crate::state::AppState;

pub const SUCCESS_MESSAGE: &str =
    "Authentication successful! You can close this window and return to the extension.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(start_auth))
        .route("/redirect", get(callback))
        .route("/auth-status", get(auth_status))
}

/// GET / - Send the user to Google's consent screen
async fn start_auth(State(state): State<AppState>) -> Redirect {
    Redirect::to(state.broker.authorization_url().as_str())
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    /// Set by the provider when the user declines consent
    pub error: Option<String>,
}

/// GET /redirect - OAuth callback
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    if let Some(error) = params.error {
        tracing::warn!(%error, "Authorization was not granted");
        return Ok(auth_failed(&error));
    }

    let Some(code) = params.code else {
        return Ok(auth_failed("missing authorization code"));
    };

    match state.broker.exchange_code(&code).await {
        Ok(_) => Ok(SUCCESS_MESSAGE.into_response()),
        Err(CanvasCalError::AuthExchange(reason)) => {
            tracing::warn!(%reason, "Authorization code exchange rejected");
            Ok(auth_failed(&reason))
        }
        Err(e) => Err(e.into()),
    }
}

fn auth_failed(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        format!("Error during authentication: {}", reason),
    )
        .into_response()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
}

/// GET /auth-status
async fn auth_status(State(state): State<AppState>) -> Json<AuthStatus> {
    Json(AuthStatus {
        authenticated: state.broker.is_authenticated(),
    })
}
