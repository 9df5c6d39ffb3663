//! Identity verification client.
//!
//! The cart service never inspects bearer credentials itself: tokens are
//! forwarded to the identity service, which answers with the resolved entity.
//! Everything downstream of the auth middleware only ever sees the resolved
//! user identifier.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

/// Errors from identity verification.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity service could not be reached (timeout or transport
    /// failure). Retryable by the caller.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),

    /// The identity service rejected the credential.
    #[error("invalid token")]
    InvalidToken,
}

/// Outcome of a token verification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    /// Whether the credential is valid.
    pub is_valid: bool,
    /// The entity the credential resolves to.
    #[serde(default)]
    pub entity_id: String,
}

/// Token verification against the identity service.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Resolve a bearer token to an identity.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

/// Client for the identity service's `POST /verify` endpoint.
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIdentityClient {
    /// Create a new identity client with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the underlying client cannot be built.
    pub fn new(base_url: &url::Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/verify", base_url.as_str().trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityClient {
    #[instrument(skip_all)]
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&VerifyRequest { token })
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::InvalidToken);
        }

        response
            .json::<VerifiedIdentity>()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("malformed identity response: {e}")))
    }
}
