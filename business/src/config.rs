use std::time::Duration;

use log::info;
use serde::Deserialize;
use ustr::Ustr;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

/// Environment overrides, read as `STOREFRONT_*` variables.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    storefront_api_base_url: Option<String>,
    storefront_request_timeout_secs: Option<u64>,
}

impl StorefrontConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Builds the config from process environment variables, falling back to
    /// [`StorefrontConfig::default`] for anything unset.
    pub fn from_env() -> Result<Self, serde_env::Error> {
        let raw: RawConfig = serde_env::from_iter(std::env::vars())?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();
        let config = Self {
            api_base_url: raw
                .storefront_api_base_url
                .unwrap_or(defaults.api_base_url),
            request_timeout_secs: raw
                .storefront_request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
        };
        info!("StorefrontConfig: using API at {}", config.api_url());
        config
    }

    pub fn api_url(&self) -> Ustr {
        if self.api_base_url.is_empty() {
            Ustr::from("/api")
        } else {
            Ustr::from(&format!("{}/api", self.api_base_url.trim_end_matches('/')))
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        let api_base_url = if cfg!(feature = "env_test") {
            "https://storefront-test.example.com"
        } else if cfg!(feature = "env_pr") {
            "https://storefront-pr.example.com"
        } else {
            "https://storefront.example.com"
        };
        Self::new(api_base_url)
    }
}
