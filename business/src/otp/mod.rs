//! One-time-passcode entry.
//!
//! [`OtpState`] is the pure, synchronous model: digits, focus, paste handling
//! and the resend countdown. [`OtpController`] owns one of those together
//! with the countdown ticker and the verify/resend requests.

mod controller;
mod state;

pub use controller::{FocusTarget, NoFocus, OtpController, OtpOutcome};
pub use state::{OTP_LENGTH, OtpState, RESEND_COOLDOWN_SECS, RejectedInput};
