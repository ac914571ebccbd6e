//! Error taxonomy shared by both controllers.
//!
//! Every `Display` string here is shown to the shopper as-is.

use thiserror::Error;

use crate::http::HttpError;

/// Problems caught locally, before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter the complete {expected}-digit code")]
    IncompleteCode { expected: usize },
    #[error("Please select at least one item")]
    NothingSelected,
    #[error("You can request a new code in {seconds} seconds")]
    ResendLocked { seconds: u32 },
    #[error("Please wait for the current request to finish")]
    Busy,
    #[error("This item is no longer in your wishlist")]
    UnknownItem,
    #[error("This code has already been verified")]
    AlreadyVerified,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorefrontError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The request failed or the server rejected it. Retryable by the user.
    #[error("{message}")]
    Network { message: String },
    /// No session token at mount. Not retryable on the current screen.
    #[error("Your session has expired. Please start again.")]
    SessionExpired,
}

impl StorefrontError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

impl From<HttpError> for StorefrontError {
    fn from(err: HttpError) -> Self {
        Self::network(err.to_string())
    }
}
