//! One-time-code entry state machine.
//!
//! The sign-in/sign-up shell renders 8 single-character cells; this module owns
//! the keystroke handling behind them. The machine is deliberately split in two:
//! `CodeEntry` is the pure cell/focus state (trivially testable, no IO), and
//! `CodeEntryFlow` drives submission through a `CodeSubmitter` the moment the
//! code completes—there is no explicit submit button on the happy path.

use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::BackendGateway;

/// Number of cells; one-time codes are exactly this long.
pub const CODE_LEN: usize = 8;

/// KeyEvent
///
/// The only two keystrokes the machine reacts to. Anything else is filtered out
/// before it gets here (or inside `apply`, for non-alphanumeric characters).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyEvent {
    Char(char),
    Backspace,
}

/// Phase
///
/// `Editing → Submitting → {done | back to Editing with an error}`. The machine
/// has no terminal success state of its own; the caller's continuation takes
/// over once submission succeeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Editing,
    Submitting,
}

/// CodeEntry
///
/// The 8 cells plus a focus index. Mutable only through `apply`; every rule of
/// the entry UX lives in that one function.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeEntry {
    cells: [Option<char>; CODE_LEN],
    focus: usize,
    phase: Phase,
    error: Option<String>,
}

impl Default for CodeEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeEntry {
    pub fn new() -> Self {
        Self {
            cells: [None; CODE_LEN],
            focus: 0,
            phase: Phase::Editing,
            error: None,
        }
    }

    pub fn cell(&self, index: usize) -> Option<char> {
        self.cells.get(index).copied().flatten()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// code
    ///
    /// The concatenated 8-character string, available only while every cell is
    /// filled.
    pub fn code(&self) -> Option<String> {
        if self.is_complete() {
            Some(self.cells.iter().flatten().collect())
        } else {
            None
        }
    }

    /// apply
    ///
    /// Advances the machine by one keystroke and returns the completed code the
    /// instant all 8 cells become non-empty (the auto-submit trigger).
    ///
    /// Rules:
    /// - Only ASCII alphanumerics are accepted; any other character leaves the
    ///   focused cell's value untouched.
    /// - Accepted input writes to the focused cell and advances focus, except at
    ///   the last cell, which keeps focus.
    /// - Backspace on a filled cell clears it in place; on an empty cell it only
    ///   moves focus back (it never deletes across cells).
    /// - While a submission is in flight every keystroke is ignored.
    pub fn apply(&mut self, event: KeyEvent) -> Option<String> {
        if self.phase == Phase::Submitting {
            return None;
        }

        match event {
            KeyEvent::Char(c) => {
                if !c.is_ascii_alphanumeric() {
                    return None;
                }
                self.cells[self.focus] = Some(c);
                if self.focus + 1 < CODE_LEN {
                    self.focus += 1;
                }
                if self.is_complete() {
                    self.phase = Phase::Submitting;
                    return self.code();
                }
                None
            }
            KeyEvent::Backspace => {
                if self.cells[self.focus].is_some() {
                    self.cells[self.focus] = None;
                } else if self.focus > 0 {
                    self.focus -= 1;
                }
                None
            }
        }
    }

    /// reject
    ///
    /// Records a failed submission: back to editing with an inline error, all
    /// cell values intact so the user can retry in place.
    fn reject(&mut self, message: String) {
        self.phase = Phase::Editing;
        self.error = Some(message);
    }
}

/// CodeSubmitter
///
/// The submission seam, so the flow can be driven in tests without a backend.
/// `Err` carries the inline message to surface; the real implementation keeps it
/// generic regardless of what actually went wrong upstream.
#[async_trait]
pub trait CodeSubmitter: Send + Sync {
    async fn submit(&self, email: &str, code: &str) -> Result<(), String>;
}

/// GatewayCodeSubmitter
///
/// The production submitter: posts the code through the backend gateway's verify
/// endpoint. Any non-2xx reply, malformed body, or transport failure surfaces as
/// the same generic invalid-code message—the entry form is not the place for
/// transport diagnostics.
pub struct GatewayCodeSubmitter {
    gateway: Arc<dyn BackendGateway>,
}

impl GatewayCodeSubmitter {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl CodeSubmitter for GatewayCodeSubmitter {
    async fn submit(&self, email: &str, code: &str) -> Result<(), String> {
        match self.gateway.verify_code(email, code).await {
            Ok(reply) if (200..300).contains(&reply.status) => Ok(()),
            Ok(_) | Err(_) => Err("invalid code".to_string()),
        }
    }
}

/// FlowEvent
///
/// What a keystroke amounted to, from the caller's perspective. `Completed` is
/// the cue to run the continuation (navigate into the dashboard); `Rejected`
/// means an error message is now set and editing has resumed.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    Pending,
    Completed,
    Rejected,
}

/// CodeEntryFlow
///
/// Binds the cell machine to an email and a submitter. Owns the auto-submit:
/// the keystroke that fills the last empty cell also performs the verification
/// round-trip before returning.
pub struct CodeEntryFlow {
    entry: CodeEntry,
    email: String,
    submitter: Arc<dyn CodeSubmitter>,
}

impl CodeEntryFlow {
    pub fn new(email: impl Into<String>, submitter: Arc<dyn CodeSubmitter>) -> Self {
        Self {
            entry: CodeEntry::new(),
            email: email.into(),
            submitter,
        }
    }

    pub fn entry(&self) -> &CodeEntry {
        &self.entry
    }

    /// handle_key
    ///
    /// Feeds one keystroke through the machine, submitting automatically when it
    /// completes the code. Roughly one submission per completion: a rejected code
    /// stays on screen and only resubmits after the user edits it back to
    /// completeness.
    pub async fn handle_key(&mut self, event: KeyEvent) -> FlowEvent {
        let Some(code) = self.entry.apply(event) else {
            return FlowEvent::Pending;
        };

        match self.submitter.submit(&self.email, &code).await {
            Ok(()) => FlowEvent::Completed,
            Err(message) => {
                self.entry.reject(message);
                FlowEvent::Rejected
            }
        }
    }
}
