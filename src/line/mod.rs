//! LINE identity verification
//!
//! LIFF clients send the ID token obtained from `liff.getIDToken()`. The token is
//! checked against the LINE Platform verify endpoint and must have been issued for
//! our channel.

use crate::settings::LineSettings;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use url::Url;

/// Identity extracted from a verified ID token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineUserInfo {
    pub line_user_id: String,
    pub display_name: Option<String>,
}

/// ID token verification errors
#[derive(Debug)]
pub enum LineVerifyError {
    Configuration(String),
    Request(String),
    Rejected(String),
    AudienceMismatch,
}

impl fmt::Display for LineVerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineVerifyError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            LineVerifyError::Request(msg) => write!(f, "Verify request failed: {msg}"),
            LineVerifyError::Rejected(msg) => write!(f, "ID token rejected: {msg}"),
            LineVerifyError::AudienceMismatch => {
                write!(f, "Token was not issued for this channel")
            }
        }
    }
}

impl std::error::Error for LineVerifyError {}

/// Verifies LINE ID tokens
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    /// Verify an ID token and return the LINE identity it carries
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The channel is not configured
    /// - The verify endpoint cannot be reached
    /// - LINE rejects the token
    /// - The token audience is a different channel
    async fn verify(&self, id_token: &str) -> Result<LineUserInfo, LineVerifyError>;
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    sub: String,
    aud: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VerifyErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Verifier backed by the LINE Platform `oauth2/v2.1/verify` endpoint
pub struct LineIdTokenVerifier {
    client: reqwest::Client,
    channel_id: String,
    verify_url: Url,
}

impl LineIdTokenVerifier {
    /// Build a verifier from settings
    ///
    /// # Errors
    ///
    /// Returns an error if the verify endpoint is not a valid URL.
    pub fn from_settings(settings: &LineSettings) -> Result<Self, LineVerifyError> {
        let verify_url = Url::parse(&settings.verify_url).map_err(|e| {
            LineVerifyError::Configuration(format!(
                "Invalid LINE verify URL '{}': {e}",
                settings.verify_url
            ))
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            channel_id: settings.channel_id.clone(),
            verify_url,
        })
    }
}

#[async_trait]
impl IdTokenVerifier for LineIdTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<LineUserInfo, LineVerifyError> {
        if self.channel_id.is_empty() {
            return Err(LineVerifyError::Configuration(
                "LINE_CHANNEL_ID is not set".to_string(),
            ));
        }

        let response = self
            .client
            .post(self.verify_url.clone())
            .form(&[("id_token", id_token), ("client_id", self.channel_id.as_str())])
            .send()
            .await
            .map_err(|e| LineVerifyError::Request(e.to_string()))?;

        let success = response.status().is_success();
        let body = response
            .text()
            .await
            .map_err(|e| LineVerifyError::Request(e.to_string()))?;

        interpret_verify_response(success, &body, &self.channel_id)
    }
}

/// Turn the verify endpoint's reply into a LINE identity
fn interpret_verify_response(
    success: bool,
    body: &str,
    channel_id: &str,
) -> Result<LineUserInfo, LineVerifyError> {
    if !success {
        let error: VerifyErrorResponse = serde_json::from_str(body).unwrap_or_default();
        let message = error
            .error_description
            .or(error.error)
            .unwrap_or_else(|| "Failed to verify LINE ID token".to_string());
        return Err(LineVerifyError::Rejected(message));
    }

    let data: VerifyResponse = serde_json::from_str(body)
        .map_err(|e| LineVerifyError::Request(format!("Malformed verify response: {e}")))?;

    if data.aud != channel_id {
        return Err(LineVerifyError::AudienceMismatch);
    }

    Ok(LineUserInfo {
        line_user_id: data.sub,
        display_name: data.name,
    })
}
