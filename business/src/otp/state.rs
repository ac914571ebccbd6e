use thiserror::Error;

/// Number of cells in a code.
pub const OTP_LENGTH: usize = 6;

/// Seconds a shopper waits before another code can be requested.
pub const RESEND_COOLDOWN_SECS: u32 = 60;

/// Digits, focus and countdown for one OTP entry screen.
///
/// Every mutator that moves focus returns the new focus index so the owner
/// can forward it to the view; `None` means focus stays where it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpState {
    digits: [Option<char>; OTP_LENGTH],
    focus: usize,
    countdown_seconds: u32,
    pub(crate) is_submitting: bool,
    pub(crate) is_resending: bool,
}

impl Default for OtpState {
    fn default() -> Self {
        Self {
            digits: [None; OTP_LENGTH],
            focus: 0,
            countdown_seconds: RESEND_COOLDOWN_SECS,
            is_submitting: false,
            is_resending: false,
        }
    }
}

/// Input that cannot go into a cell. The view simply does not update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a cell holds a single digit")]
pub struct RejectedInput;

/// `Some(digit)` for a single ASCII digit, `None` for the empty string.
/// Anything else is rejected.
fn parse_cell(value: &str) -> Result<Option<char>, RejectedInput> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(c), None) if c.is_ascii_digit() => Ok(Some(c)),
        _ => Err(RejectedInput),
    }
}

impl OtpState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one cell. Rejected input leaves the state untouched.
    ///
    /// Returns `Ok(Some(next))` when a digit was written to any cell but the
    /// last, which moves focus to the following cell.
    pub fn set_digit(
        &mut self,
        index: usize,
        value: &str,
    ) -> Result<Option<usize>, RejectedInput> {
        if index >= OTP_LENGTH {
            return Err(RejectedInput);
        }
        let cell = parse_cell(value)?;
        self.digits[index] = cell;

        if cell.is_some() && index < OTP_LENGTH - 1 {
            self.focus = index + 1;
            Ok(Some(self.focus))
        } else {
            Ok(None)
        }
    }

    /// Backspace on an already empty cell steps back one cell.
    pub fn handle_backspace(&mut self, index: usize) -> Option<usize> {
        if index == 0 || index >= OTP_LENGTH || self.digits[index].is_some() {
            return None;
        }
        self.focus = index - 1;
        Some(self.focus)
    }

    /// Fills every cell from pasted text.
    ///
    /// Only text that is exactly [`OTP_LENGTH`] ASCII digits (after trimming
    /// surrounding whitespace) is used; anything else is ignored entirely.
    pub fn handle_paste(&mut self, raw: &str) -> Option<usize> {
        let text = raw.trim();
        if text.len() != OTP_LENGTH || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        for (cell, c) in self.digits.iter_mut().zip(text.chars()) {
            *cell = Some(c);
        }
        self.focus = OTP_LENGTH - 1;
        Some(self.focus)
    }

    /// One second passed. Returns `true` once resending is allowed.
    pub fn tick(&mut self) -> bool {
        self.countdown_seconds = self.countdown_seconds.saturating_sub(1);
        self.resend_allowed()
    }

    pub fn restart_countdown(&mut self) {
        self.countdown_seconds = RESEND_COOLDOWN_SECS;
    }

    /// Empties every cell and focuses the first one.
    pub fn clear(&mut self) {
        self.digits = [None; OTP_LENGTH];
        self.focus = 0;
    }

    /// The assembled code, once every cell is filled.
    pub fn code(&self) -> Option<String> {
        self.digits.iter().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    pub fn digit(&self, index: usize) -> Option<char> {
        self.digits.get(index).copied().flatten()
    }

    /// Cell contents as the view renders them: one digit or an empty string.
    pub fn digits(&self) -> [String; OTP_LENGTH] {
        self.digits.map(|cell| cell.map(String::from).unwrap_or_default())
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn countdown_seconds(&self) -> u32 {
        self.countdown_seconds
    }

    pub fn resend_allowed(&self) -> bool {
        self.countdown_seconds == 0
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn is_resending(&self) -> bool {
        self.is_resending
    }
}
