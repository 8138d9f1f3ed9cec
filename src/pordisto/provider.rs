//! Identity provider client.
//!
//! The gate consumes three capabilities: password sign-in, bearer token
//! validation, and a server-side role check. Handlers only see the
//! [`IdentityProvider`] trait, so tests run against fakes and the gate logic
//! never depends on the hosted backend directly. Provider error text stays in
//! the logs; clients get the fixed messages from the handlers.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use uuid::Uuid;

use super::APP_USER_AGENT;

/// Back-office roles known to the authorization store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
        }
    }
}

/// Session material returned by a successful password sign-in.
/// Forwarded to the client verbatim under `data`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: serde_json::Value,
}

/// Server-validated claims extracted from a bearer token.
#[derive(Clone, Debug)]
pub struct Claims {
    pub sub: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError>;

    async fn validate_token(&self, token: &str) -> Result<Claims, ProviderError>;

    async fn has_role(&self, user_id: Uuid, role: Role) -> Result<bool, ProviderError>;
}

#[derive(Deserialize)]
struct UserPayload {
    id: Uuid,
    email: Option<String>,
}

/// HTTP client for the hosted auth backend.
pub struct HttpIdentityProvider {
    client: Client,
    base_url: Url,
    api_key: SecretString,
}

impl HttpIdentityProvider {
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, api_key: SecretString) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|err| ProviderError::Unavailable(err.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let url = self.endpoint("auth/v1/token?grant_type=password")?;

        let response = self
            .client
            .post(url)
            .header("apikey", self.api_key.expose_secret())
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!(
                "sign-in returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::InvalidCredentials);
        }

        response
            .json::<Session>()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))
    }

    async fn validate_token(&self, token: &str) -> Result<Claims, ProviderError> {
        let url = self.endpoint("auth/v1/user")?;

        let response = self
            .client
            .get(url)
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::InvalidToken);
        }

        let user: UserPayload = response
            .json()
            .await
            .map_err(|_| ProviderError::InvalidToken)?;

        Ok(Claims {
            sub: user.id,
            email: user.email,
        })
    }

    async fn has_role(&self, user_id: Uuid, role: Role) -> Result<bool, ProviderError> {
        let url = self.endpoint("rest/v1/rpc/has_role")?;

        let response = self
            .client
            .post(url)
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({ "_user_id": user_id, "_role": role.as_str() }))
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "role check returned {status}"
            )));
        }

        response
            .json::<bool>()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))
    }
}
