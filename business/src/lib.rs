//! Storefront controllers: OTP entry and wishlist bulk actions.
//!
//! Each controller owns its state. Network calls run on spawned tokio tasks
//! and report back over a channel; the view calls `sync()` once per frame
//! (or awaits `next_update()`) to fold the results in.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod notice;
pub mod otp;
pub mod session;
pub mod wishlist;

pub use auth::AuthApi;
pub use config::StorefrontConfig;
pub use error::{StorefrontError, ValidationError};
pub use notice::{Notice, NoticeLevel, Notices};
pub use otp::{
    FocusTarget, NoFocus, OTP_LENGTH, OtpController, OtpOutcome, OtpState, RESEND_COOLDOWN_SECS,
    RejectedInput,
};
pub use session::{AUTH_TOKEN_KEY, SESSION_TOKEN_KEY, SessionSlot};
pub use wishlist::{
    BusyStatus, Selection, StockStatus, WishlistApi, WishlistController, WishlistItem,
};
