//! Wishlist selection and bulk actions.
//!
//! [`Selection`] is the pure model (selected ids, per-row busy flags and
//! per-row errors, validated against the backing list). [`WishlistController`]
//! owns the backing list, a `Selection`, and the add/remove/load requests.

mod api;
mod controller;
mod selection;

pub use api::{StockStatus, WishlistApi, WishlistItem};
pub use controller::WishlistController;
pub use selection::{BusyStatus, Selection};
