//! Session tokens kept in the persisted key-value slot.
//!
//! Two tokens are tracked:
//! - `session_token`: scopes a multi-step flow (registration, password reset).
//!   Written by the step before OTP entry, cleared once the code is verified.
//! - `auth_token`: the signed-in shopper's bearer token, used by the wishlist.

use log::{info, warn};
use storefront_states::SharedStore;

use crate::StorefrontError;

pub const SESSION_TOKEN_KEY: &str = "session_token";
pub const AUTH_TOKEN_KEY: &str = "auth_token";

#[derive(Debug, Clone)]
pub struct SessionSlot {
    store: SharedStore,
}

impl SessionSlot {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Reads the flow token, treating a blank value as absent.
    pub fn session_token(&self) -> Result<String, StorefrontError> {
        Self::read(&self.store, SESSION_TOKEN_KEY)
    }

    pub fn auth_token(&self) -> Result<String, StorefrontError> {
        Self::read(&self.store, AUTH_TOKEN_KEY)
    }

    /// Ends the flow after a successful verification.
    ///
    /// A store that cannot be written is logged, not reported: the code was
    /// verified either way.
    pub fn complete_verification(&self, auth_token: Option<&str>) {
        if let Err(e) = self.store.remove(SESSION_TOKEN_KEY) {
            warn!("SessionSlot: failed to clear session token: {e}");
        }
        if let Some(token) = auth_token {
            if let Err(e) = self.store.set(AUTH_TOKEN_KEY, token) {
                warn!("SessionSlot: failed to store auth token: {e}");
            } else {
                info!("SessionSlot: stored auth token after verification");
            }
        }
    }

    fn read(store: &SharedStore, key: &str) -> Result<String, StorefrontError> {
        match store.get(key) {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => {
                info!("SessionSlot: no {key} in store");
                Err(StorefrontError::SessionExpired)
            }
        }
    }
}
