//! The OTP entry controller.
//!
//! The controller owns an [`OtpState`] and is the only thing that mutates it.
//! Background work (the countdown ticker, verify and resend requests) never
//! touches the state directly: it sends an `OtpUpdate` through a channel
//! whose receiver lives in the controller, and the owner applies updates with
//! [`OtpController::sync`] or [`OtpController::next_update`] between other
//! events. Dropping the controller cancels the ticker and every request, and
//! anything that still arrives afterwards has nowhere to go.

use std::time::Duration;

use flume::{Receiver, Sender};
use log::{debug, info, warn};
use storefront_states::{TaskHandle, TaskId, TaskSet, Ticker};

use super::state::{OTP_LENGTH, OtpState};
use crate::auth::AuthApi;
use crate::notice::{Notice, Notices};
use crate::session::SessionSlot;
use crate::{StorefrontError, ValidationError};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// View capability for moving the caret between cells.
pub trait FocusTarget: Send {
    fn request_focus(&mut self, index: usize);
}

/// Focus target for views that manage focus themselves.
#[derive(Debug, Default)]
pub struct NoFocus;

impl FocusTarget for NoFocus {
    fn request_focus(&mut self, _index: usize) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OtpOutcome {
    #[default]
    Pending,
    /// The code was accepted; the view should move on.
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OtpOp {
    Verify,
    Resend,
}

#[derive(Debug)]
enum OtpUpdate {
    Tick,
    Verified { token: Option<String> },
    VerifyFailed { message: String },
    Resent { message: Option<String> },
    ResendFailed { message: String },
    Settled { task: TaskId, op: OtpOp },
}

/// Clears the in-flight flag for its request however the task ends.
struct SettleGuard {
    tx: Sender<OtpUpdate>,
    task: TaskId,
    op: OtpOp,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(OtpUpdate::Settled {
            task: self.task,
            op: self.op,
        });
    }
}

pub struct OtpController {
    state: OtpState,
    outcome: OtpOutcome,
    email: String,
    session_token: String,
    api: AuthApi,
    session: SessionSlot,
    focus_target: Box<dyn FocusTarget>,
    notices: Notices,
    tx: Sender<OtpUpdate>,
    rx: Receiver<OtpUpdate>,
    ticker: Option<Ticker>,
    tasks: TaskSet,
}

impl std::fmt::Debug for OtpController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpController")
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .field("email", &self.email)
            .field("ticker", &self.ticker.is_some())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl OtpController {
    /// Mounts the controller and starts the resend countdown.
    ///
    /// Fails with [`StorefrontError::SessionExpired`] when the flow has no
    /// session token; the caller should send the shopper back a step.
    /// Must be called from within a tokio runtime.
    pub fn mount(
        api: AuthApi,
        session: SessionSlot,
        email: impl Into<String>,
    ) -> Result<Self, StorefrontError> {
        let session_token = session.session_token()?;
        let email = email.into();
        let (tx, rx) = flume::unbounded();

        info!("OtpController: mounted for {email}");
        let mut controller = Self {
            state: OtpState::new(),
            outcome: OtpOutcome::Pending,
            email,
            session_token,
            api,
            session,
            focus_target: Box::new(NoFocus),
            notices: Notices::default(),
            tx,
            rx,
            ticker: None,
            tasks: TaskSet::default(),
        };
        controller.start_countdown();
        Ok(controller)
    }

    pub fn with_focus_target(mut self, target: impl FocusTarget + 'static) -> Self {
        self.focus_target = Box::new(target);
        self
    }

    pub fn state(&self) -> &OtpState {
        &self.state
    }

    pub fn outcome(&self) -> OtpOutcome {
        self.outcome
    }

    pub fn is_verified(&self) -> bool {
        self.outcome == OtpOutcome::Verified
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    /// Returns `false` when the input was rejected.
    pub fn set_digit(&mut self, index: usize, value: &str) -> bool {
        match self.state.set_digit(index, value) {
            Ok(focus) => {
                self.forward_focus(focus);
                true
            }
            Err(_) => {
                debug!("OtpController: rejected input {value:?} for cell {index}");
                false
            }
        }
    }

    pub fn handle_backspace(&mut self, index: usize) {
        let focus = self.state.handle_backspace(index);
        self.forward_focus(focus);
    }

    /// Returns `false` when the pasted text was ignored.
    pub fn handle_paste(&mut self, raw: &str) -> bool {
        let focus = self.state.handle_paste(raw);
        let accepted = focus.is_some();
        self.forward_focus(focus);
        accepted
    }

    /// Sends the assembled code for verification.
    ///
    /// An incomplete code is reported without any request. The outcome of
    /// the request arrives later as an update.
    pub fn submit(&mut self) -> Result<(), StorefrontError> {
        self.ensure_pending()?;
        if self.state.is_submitting || self.state.is_resending {
            return Err(self.report(ValidationError::Busy.into()));
        }
        let Some(code) = self.state.code() else {
            info!("OtpController: submit with incomplete code");
            return Err(self.report(
                ValidationError::IncompleteCode {
                    expected: OTP_LENGTH,
                }
                .into(),
            ));
        };

        info!("OtpController: verifying code");
        self.state.is_submitting = true;
        let handle = self.tasks.issue("verify-otp");
        let guard = self.settle_guard(&handle, OtpOp::Verify);
        let tx = self.tx.clone();
        let api = self.api.clone();
        let session_token = self.session_token.clone();

        spawn_cancellable(handle, guard, async move {
            let update = match api.verify_otp(&session_token, &code).await {
                Ok(token) => OtpUpdate::Verified { token },
                Err(err) => OtpUpdate::VerifyFailed {
                    message: err.to_string(),
                },
            };
            if tx.send(update).is_err() {
                debug!("OtpController: verify finished after teardown");
            }
        });
        Ok(())
    }

    /// Requests a new code once the countdown has run out.
    pub fn resend(&mut self) -> Result<(), StorefrontError> {
        self.ensure_pending()?;
        if !self.state.resend_allowed() {
            let seconds = self.state.countdown_seconds();
            return Err(self.report(ValidationError::ResendLocked { seconds }.into()));
        }
        if self.state.is_submitting || self.state.is_resending {
            return Err(self.report(ValidationError::Busy.into()));
        }

        info!("OtpController: requesting a new code for {}", self.email);
        self.state.is_resending = true;
        let handle = self.tasks.issue("resend-otp");
        let guard = self.settle_guard(&handle, OtpOp::Resend);
        let tx = self.tx.clone();
        let api = self.api.clone();
        let session_token = self.session_token.clone();
        let email = self.email.clone();

        spawn_cancellable(handle, guard, async move {
            let update = match api.resend_otp(&session_token, &email).await {
                Ok(message) => OtpUpdate::Resent { message },
                Err(err) => OtpUpdate::ResendFailed {
                    message: err.to_string(),
                },
            };
            if tx.send(update).is_err() {
                debug!("OtpController: resend finished after teardown");
            }
        });
        Ok(())
    }

    /// Applies every update that has already arrived. Never waits.
    ///
    /// Returns the number of updates applied.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.rx.try_recv() {
            self.apply(update);
            applied += 1;
        }
        applied
    }

    /// Waits for the next update and applies it.
    pub async fn next_update(&mut self) {
        // The controller holds a sender itself, so the channel never disconnects.
        if let Ok(update) = self.rx.recv_async().await {
            self.apply(update);
        }
    }

    /// Waits until neither a verify nor a resend request is in flight.
    pub async fn settle(&mut self) {
        self.sync();
        while self.state.is_submitting || self.state.is_resending {
            self.next_update().await;
        }
    }

    fn apply(&mut self, update: OtpUpdate) {
        match update {
            OtpUpdate::Tick => {
                if self.ticker.is_some() && self.state.tick() {
                    debug!("OtpController: countdown finished");
                    self.ticker = None;
                }
            }
            OtpUpdate::Verified { token } => {
                info!("OtpController: code verified");
                self.session.complete_verification(token.as_deref());
                self.outcome = OtpOutcome::Verified;
                self.notices.push(Notice::success("Verification successful"));
            }
            OtpUpdate::VerifyFailed { message } => {
                warn!("OtpController: verification failed: {message}");
                self.notices.push(Notice::error(message));
            }
            OtpUpdate::Resent { message } => {
                info!("OtpController: new code sent");
                self.state.restart_countdown();
                self.start_countdown();
                self.notices.push(Notice::success(
                    message.unwrap_or_else(|| "A new code has been sent".to_owned()),
                ));
            }
            OtpUpdate::ResendFailed { message } => {
                warn!("OtpController: resend failed: {message}");
                self.notices.push(Notice::error(message));
            }
            OtpUpdate::Settled { task, op } => {
                self.tasks.retire(task);
                match op {
                    OtpOp::Verify => self.state.is_submitting = false,
                    OtpOp::Resend => self.state.is_resending = false,
                }
            }
        }
    }

    fn start_countdown(&mut self) {
        // Replacing the ticker drops, and so cancels, the previous one.
        self.ticker = Some(Ticker::spawn(TICK_PERIOD, self.tx.clone(), |_| {
            OtpUpdate::Tick
        }));
    }

    /// The flow token is spent once a code is verified.
    fn ensure_pending(&mut self) -> Result<(), StorefrontError> {
        if self.is_verified() {
            return Err(self.report(ValidationError::AlreadyVerified.into()));
        }
        Ok(())
    }

        fn forward_focus(&mut self, focus: Option<usize>) {
        if let Some(index) = focus {
            self.focus_target.request_focus(index);
        }
    }

    fn settle_guard(&self, handle: &TaskHandle, op: OtpOp) -> SettleGuard {
        SettleGuard {
            tx: self.tx.clone(),
            task: handle.id(),
            op,
        }
    }

    fn report(&mut self, err: StorefrontError) -> StorefrontError {
        self.notices.push(Notice::from(&err));
        err
    }
}

impl Drop for OtpController {
    fn drop(&mut self) {
        debug!(
            "OtpController: unmounting with {} request(s) in flight",
            self.tasks.len()
        );
        self.ticker = None;
        self.tasks.cancel_all();
    }
}

/// Runs `work` until it finishes or `handle` is cancelled, holding `guard`
/// for the whole lifetime of the task.
fn spawn_cancellable<F>(handle: TaskHandle, guard: SettleGuard, work: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = handle.cancellation_token();
    tokio::spawn(async move {
        let _guard = guard;
        tokio::select! {
            _ = token.cancelled() => {
                debug!("OtpController: {} cancelled", handle.id().label());
            }
            _ = work => {}
        }
    });
}
