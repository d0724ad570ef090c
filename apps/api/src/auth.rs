//! Caller authentication.
//!
//! Sign-up and login live with the identity provider. This service only
//! resolves an access token to a user id, via `AuthProvider`, and exposes the
//! result to handlers through the `AuthUser` extractor.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Cookie the web app stores the access token under.
const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider is not configured")]
    NotConfigured,

    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider returned status {0}")]
    Upstream(u16),
}

/// Resolves access tokens to identities.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `Ok(None)` means the token is invalid or expired.
    async fn verify(&self, token: &str) -> Result<Option<Identity>, AuthError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Supabase-backed provider
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: Uuid,
    email: Option<String>,
}

/// Verifies tokens against `GET {SUPABASE_URL}/auth/v1/user`.
#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    base_url: Option<String>,
    anon_key: Option<String>,
}

impl SupabaseAuth {
    pub fn new(base_url: Option<String>, anon_key: Option<String>) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(10)).build()?,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            anon_key,
        })
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn verify(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        let (Some(base_url), Some(anon_key)) = (&self.base_url, &self.anon_key) else {
            return Err(AuthError::NotConfigured);
        };

        let response = self
            .client
            .get(format!("{base_url}/auth/v1/user"))
            .header("apikey", anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let user: SupabaseUser = response.json().await?;
                Ok(Some(Identity {
                    user_id: user.id,
                    email: user.email,
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            other => Err(AuthError::Upstream(other.as_u16())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extractor
// ────────────────────────────────────────────────────────────────────────────

/// The authenticated caller. Rejects with 401 when no valid token is present.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.user_id
    }
}

/// Bearer token first, then the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| {
            c.trim()
                .strip_prefix(ACCESS_TOKEN_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        match state.auth.verify(token).await {
            Ok(Some(identity)) => Ok(AuthUser(identity)),
            Ok(None) => {
                debug!("Rejected invalid or expired access token");
                Err(AppError::Unauthorized)
            }
            Err(e) => {
                error!("Token verification failed: {e}");
                Err(AppError::Internal(anyhow::anyhow!(e)))
            }
        }
    }
}

/// Token → identity table for tests.
#[cfg(test)]
pub struct StaticAuth {
    pub tokens: std::collections::HashMap<String, Identity>,
}

#[cfg(test)]
#[async_trait]
impl AuthProvider for StaticAuth {
    async fn verify(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        Ok(self.tokens.get(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_token(&headers), Some("abc.def"));
    }

    #[test]
    fn test_extract_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sb-access-token=tok123; other=1"),
        );
        assert_eq!(extract_token(&headers), Some("tok123"));
    }

    #[test]
    fn test_bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer fromheader"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=fromcookie"));
        assert_eq!(extract_token(&headers), Some("fromheader"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token-other=x"));
        assert_eq!(extract_token(&headers), None);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_errors() {
        let auth = SupabaseAuth::new(None, None).unwrap();
        assert!(matches!(
            auth.verify("token").await,
            Err(AuthError::NotConfigured)
        ));
    }
}
