//! Identity provider — password sign-in and sign-out against a GoTrue-style
//! auth REST API.
//!
//! The session only needs the acting user's id and display name; both come
//! from the `user` object of the token response via
//! [`Identity::from_account`].

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use scene::session::Identity;
use serde::Deserialize;
use tracing::info;

use crate::config::AuthConfig;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Request(String),
    #[error("auth rejected: status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("auth response parse failed: {0}")]
    Parse(String),
}

impl AuthError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_AUTH_REQUEST",
            Self::Rejected { .. } => "E_AUTH_REJECTED",
            Self::Parse(_) => "E_AUTH_PARSE",
        }
    }
}

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub identity: Identity,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AccountUser,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: AccountMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct AccountMetadata {
    #[serde(default)]
    full_name: Option<String>,
}

impl AccountUser {
    pub(crate) fn identity(&self) -> Identity {
        Identity::from_account(&self.id, self.user_metadata.full_name.as_deref(), self.email.as_deref())
    }
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// [`IdentityProvider`] over HTTP.
#[derive(Debug, Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoTrueClient {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(AuthError::Rejected { status, body })
}

#[async_trait::async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let resp = self
            .http
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        let body = check_status(resp)
            .await?
            .text()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| AuthError::Parse(e.to_string()))?;

        let identity = token.user.identity();
        info!(user_id = %identity.user_id, user_name = %identity.user_name, "signed in");
        Ok(AuthSession { access_token: token.access_token, identity })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let resp = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        check_status(resp).await?;
        info!("signed out");
        Ok(())
    }
}
