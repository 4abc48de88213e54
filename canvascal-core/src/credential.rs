//! The persisted OAuth credential.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::AuthorizationRequest;
use crate::error::{CanvasCalError, CanvasCalResult};
use crate::token::TokenGrant;

/// Tokens obtained from the provider, stored as a single flat record.
///
/// A stored credential always carries an access token. It is replaced as a
/// whole on every exchange and never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scope: BTreeSet<String>,
}

impl Credential {
    /// Build a credential from a token endpoint response received at `issued_at`.
    ///
    /// Falls back to the requested scopes when the provider doesn't echo them.
    pub fn from_grant(
        grant: TokenGrant,
        request: &AuthorizationRequest,
        issued_at: DateTime<Utc>,
    ) -> CanvasCalResult<Self> {
        if grant.access_token.trim().is_empty() {
            return Err(CanvasCalError::AuthExchange(
                "token endpoint returned an empty access token".into(),
            ));
        }

        let scope = match grant.scope.as_deref() {
            Some(granted) => granted.split_whitespace().map(str::to_string).collect(),
            None => request.scopes.clone(),
        };

        let expiry = grant
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime));

        Ok(Credential {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.filter(|t| !t.is_empty()),
            expiry,
            scope,
        })
    }

    pub fn is_well_formed(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// Whether the access token has passed its expiry. Credentials without an
    /// expiry never report as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| now >= expiry)
    }

    pub(crate) fn to_bytes(&self) -> CanvasCalResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> CanvasCalResult<Self> {
        let credential: Credential = serde_json::from_slice(bytes)
            .map_err(|e| CanvasCalError::CredentialLoad(e.to_string()))?;

        if !credential.is_well_formed() {
            return Err(CanvasCalError::CredentialLoad(
                "stored credential has no access token".into(),
            ));
        }

        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> AuthorizationRequest {
        AuthorizationRequest::new("client", "secret", "http://localhost:3000/redirect")
    }

    fn grant() -> TokenGrant {
        TokenGrant {
            access_token: "ya29.access".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_in: Some(3599),
            scope: Some("https://www.googleapis.com/auth/calendar openid".to_string()),
        }
    }

    #[test]
    fn test_from_grant_computes_absolute_expiry() {
        let issued_at = Utc.with_ymd_and_hms(2025, 10, 30, 15, 0, 0).unwrap();
        let credential = Credential::from_grant(grant(), &request(), issued_at).unwrap();

        assert_eq!(
            credential.expiry,
            Some(Utc.with_ymd_and_hms(2025, 10, 30, 15, 59, 59).unwrap())
        );
        assert_eq!(credential.scope.len(), 2);
        assert!(credential.scope.contains("openid"));
    }

    #[test]
    fn test_from_grant_uses_requested_scopes_when_missing() {
        let mut grant = grant();
        grant.scope = None;
        grant.expires_in = None;

        let credential = Credential::from_grant(grant, &request(), Utc::now()).unwrap();

        assert_eq!(credential.scope, request().scopes);
        assert_eq!(credential.expiry, None);
    }

    #[test]
    fn test_from_grant_ignores_out_of_range_lifetime() {
        let mut grant = grant();
        grant.expires_in = Some(i64::MAX);

        let credential = Credential::from_grant(grant, &request(), Utc::now()).unwrap();
        assert_eq!(credential.expiry, None);
    }

    #[test]
    fn test_from_grant_rejects_empty_access_token() {
        let mut grant = grant();
        grant.access_token = "  ".to_string();

        let err = Credential::from_grant(grant, &request(), Utc::now()).unwrap_err();
        assert!(matches!(err, CanvasCalError::AuthExchange(_)));
    }

    #[test]
    fn test_is_expired() {
        let now = Utc.with_ymd_and_hms(2025, 10, 30, 15, 0, 0).unwrap();
        let mut credential = Credential::from_grant(grant(), &request(), now).unwrap();

        assert!(!credential.is_expired(now));
        assert!(credential.is_expired(now + Duration::hours(1)));

        credential.expiry = None;
        assert!(!credential.is_expired(now + Duration::days(365)));
    }

    #[test]
    fn test_from_bytes_rejects_corrupt_and_incomplete_records() {
        assert!(matches!(
            Credential::from_bytes(b"{not json"),
            Err(CanvasCalError::CredentialLoad(_))
        ));
        assert!(matches!(
            Credential::from_bytes(br#"{"access_token": ""}"#),
            Err(CanvasCalError::CredentialLoad(_))
        ));
        assert!(matches!(
            Credential::from_bytes(br#"{"refresh_token": "1//x"}"#),
            Err(CanvasCalError::CredentialLoad(_))
        ));
    }

    #[test]
    fn test_bytes_survive_a_save_load_cycle() {
        let credential = Credential::from_grant(grant(), &request(), Utc::now()).unwrap();
        let bytes = credential.to_bytes().unwrap();

        assert_eq!(Credential::from_bytes(&bytes).unwrap(), credential);
    }
}
