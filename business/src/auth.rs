//! Auth API client: OTP verification and resend.
//!
//! Both endpoints are scoped by the flow's session token, sent as a bearer
//! credential.

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::StorefrontConfig;
use crate::StorefrontError;
use crate::http::{Client, Response};

/// Request payload for OTP verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOtpRequest {
    pub code: String,
}

/// Request payload for requesting a new code.
#[derive(Debug, Clone, Serialize)]
pub struct ResendOtpRequest {
    pub email: String,
}

fn default_success() -> bool {
    true
}

/// Body shared by both endpoints.
///
/// `success` defaults to true so a bare `{"token": "..."}` on a 2xx counts as
/// a pass; the server sets it to false to reject with a 200.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    pub token: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthApi {
    client: Client,
    config: StorefrontConfig,
}

impl AuthApi {
    pub fn new(config: StorefrontConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// POST `/auth/verify-otp`
    ///
    /// Returns the new token the server issued, if any.
    pub async fn verify_otp(
        &self,
        session_token: &str,
        code: &str,
    ) -> Result<Option<String>, StorefrontError> {
        let url = format!("{}/auth/verify-otp", self.config.api_url());
        let body = VerifyOtpRequest {
            code: code.to_owned(),
        };

        let response = self
            .client
            .post(url)
            .bearer(session_token)
            .timeout(self.config.request_timeout())
            .json(&body)
            .map_err(|e| StorefrontError::network(format!("Internal error: {e}")))?
            .send()
            .await
            .inspect_err(|e| error!("verify_otp: {e}"))?;

        let parsed = Self::parse(&response, "Invalid verification code")?;
        info!("verify_otp: code accepted");
        Ok(parsed.token)
    }

    /// POST `/auth/resend-otp`
    ///
    /// Returns the server's confirmation message, if any.
    pub async fn resend_otp(
        &self,
        session_token: &str,
        email: &str,
    ) -> Result<Option<String>, StorefrontError> {
        let url = format!("{}/auth/resend-otp", self.config.api_url());
        let body = ResendOtpRequest {
            email: email.to_owned(),
        };

        let response = self
            .client
            .post(url)
            .bearer(session_token)
            .timeout(self.config.request_timeout())
            .json(&body)
            .map_err(|e| StorefrontError::network(format!("Internal error: {e}")))?
            .send()
            .await
            .inspect_err(|e| error!("resend_otp: {e}"))?;

        let parsed = Self::parse(&response, "Could not send a new code")?;
        info!("resend_otp: new code requested");
        Ok(parsed.message)
    }

    /// Maps a response to an `AuthResponse` or the user-facing failure.
    fn parse(response: &Response, rejected: &str) -> Result<AuthResponse, StorefrontError> {
        if !response.is_success() {
            let message = response.failure_message();
            info!("auth: request failed with status {}: {message}", response.status);
            return Err(StorefrontError::network(message));
        }

        let parsed = if response.body.is_empty() {
            AuthResponse {
                success: true,
                token: None,
                message: None,
            }
        } else {
            response.json::<AuthResponse>().map_err(|e| {
                error!("auth: failed to parse response: {e}");
                StorefrontError::network("Failed to parse server response")
            })?
        };

        if parsed.success {
            Ok(parsed)
        } else {
            Err(StorefrontError::network(
                parsed.message.unwrap_or_else(|| rejected.to_owned()),
            ))
        }
    }
}
