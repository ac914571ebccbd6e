//! Wishlist API client.
//!
//! All calls carry the signed-in shopper's bearer token.

use chrono::{DateTime, Utc};
use log::{error, info};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::StorefrontConfig;
use crate::StorefrontError;
use crate::http::{Client, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn is_purchasable(self) -> bool {
        self == Self::InStock
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: Ustr,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub image_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// `GET /wishlist` returns either `{"items": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WishlistBody {
    Wrapped { items: Vec<WishlistItem> },
    Bare(Vec<WishlistItem>),
}

#[derive(Debug, Deserialize)]
struct ActionBody {
    success: Option<bool>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WishlistApi {
    client: Client,
    config: StorefrontConfig,
}

impl WishlistApi {
    pub fn new(config: StorefrontConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// GET `/wishlist`
    pub async fn fetch(&self, token: &str) -> Result<Vec<WishlistItem>, StorefrontError> {
        let url = format!("{}/wishlist", self.config.api_url());

        let response = self
            .client
            .get(url)
            .bearer(token)
            .timeout(self.config.request_timeout())
            .send()
            .await
            .inspect_err(|e| error!("fetch_wishlist: {e}"))?;

        if !response.is_success() {
            return Err(StorefrontError::network(response.failure_message()));
        }

        let body: WishlistBody = response.json().map_err(|e| {
            error!("fetch_wishlist: failed to parse response: {e}");
            StorefrontError::network("Failed to parse server response")
        })?;
        let items = match body {
            WishlistBody::Wrapped { items } | WishlistBody::Bare(items) => items,
        };
        info!("fetch_wishlist: {} items", items.len());
        Ok(items)
    }

    /// POST `/wishlist/items/{id}/cart`
    pub async fn move_to_cart(&self, token: &str, id: Ustr) -> Result<(), StorefrontError> {
        let url = self.item_url(id, Some("cart"))?;

        let response = self
            .client
            .post(url)
            .bearer(token)
            .timeout(self.config.request_timeout())
            .send()
            .await
            .inspect_err(|e| error!("move_to_cart({id}): {e}"))?;

        Self::check(&response, "Could not move the item to your cart")
    }

    /// DELETE `/wishlist/items/{id}`
    pub async fn remove(&self, token: &str, id: Ustr) -> Result<(), StorefrontError> {
        let url = self.item_url(id, None)?;

        let response = self
            .client
            .delete(url)
            .bearer(token)
            .timeout(self.config.request_timeout())
            .send()
            .await
            .inspect_err(|e| error!("remove_wishlist_item({id}): {e}"))?;

        Self::check(&response, "Could not remove the item")
    }

    /// `{api}/wishlist/items/{id}[/{action}]` with `id` percent-encoded as
    /// a single path segment.
    fn item_url(&self, id: Ustr, action: Option<&str>) -> Result<String, StorefrontError> {
        let base = self.config.api_url();
        let invalid = || StorefrontError::network("Invalid API address");
        let mut url = Url::parse(&base).map_err(|e| {
            error!("wishlist: bad API URL {base}: {e}");
            invalid()
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                error!("wishlist: API URL {base} cannot take item paths");
                invalid()
            })?
            .pop_if_empty()
            .extend(["wishlist", "items", id.as_str()])
            .extend(action);
        Ok(url.into())
    }

    /// A 2xx passes unless its body says `"success": false`.
    fn check(response: &Response, rejected: &str) -> Result<(), StorefrontError> {
        if !response.is_success() {
            return Err(StorefrontError::network(response.failure_message()));
        }
        match response.json::<ActionBody>() {
            Ok(ActionBody {
                success: Some(false),
                message,
            }) => Err(StorefrontError::network(
                message.unwrap_or_else(|| rejected.to_owned()),
            )),
            _ => Ok(()),
        }
    }
}
