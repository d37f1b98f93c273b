//! Password prompt state machine.

use tracing::{debug, warn};
use veil_core::keysym::{self, KeyAction, Keysym};
use veil_core::{PasswordBuffer, VisualState};

use crate::{CredentialHash, PasswordVerifier};

/// Result of feeding one key press into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Key was not relevant; nothing changed.
    Ignored,
    /// Buffer contents changed.
    Edited,
    /// Buffer was wiped by cancel.
    Cleared,
    /// Accept was pressed and the candidate did not match.
    Rejected,
    /// Accept was pressed and the candidate matched. Terminal.
    Accepted,
}

/// Owns the password buffer and decides when to unlock.
///
/// Transitions: `Neutral -> Typing` on text, back to `Neutral` on cancel or
/// backspace-to-empty, `Typing -> Accepted` on a matching accept, and
/// `Typing -> Rejected` on a failed one. The rejected flag stays set for the
/// rest of the process.
#[derive(Debug)]
pub struct AuthStateMachine<V> {
    verifier: V,
    hash: CredentialHash,
    buffer: PasswordBuffer,
    rejected: bool,
    fail_on_clear: bool,
}

impl<V: PasswordVerifier> AuthStateMachine<V> {
    /// Creates a machine in the `Neutral` state.
    pub fn new(verifier: V, hash: CredentialHash) -> Self {
        Self {
            verifier,
            hash,
            buffer: PasswordBuffer::new(),
            rejected: false,
            fail_on_clear: false,
        }
    }

    /// When set, an empty buffer always shows the rejected styling.
    pub fn with_fail_on_clear(mut self, fail_on_clear: bool) -> Self {
        self.fail_on_clear = fail_on_clear;
        self
    }

    /// Applies one key press.
    pub fn handle_key(&mut self, keysym: Keysym) -> KeyOutcome {
        match keysym::classify(keysym) {
            KeyAction::Ignore => KeyOutcome::Ignored,
            KeyAction::Accept => self.accept(),
            KeyAction::Cancel => {
                self.buffer.clear();
                KeyOutcome::Cleared
            }
            KeyAction::Backspace => {
                if self.buffer.pop_char() {
                    KeyOutcome::Edited
                } else {
                    KeyOutcome::Ignored
                }
            }
            KeyAction::Text(ch) => {
                if self.buffer.push_char(ch) {
                    KeyOutcome::Edited
                } else {
                    KeyOutcome::Ignored
                }
            }
        }
    }

    /// Current overlay appearance.
    pub fn visual_state(&self) -> VisualState {
        VisualState::derive(self.buffer.len(), self.rejected || self.fail_on_clear)
    }

    /// Read-only view of the buffer, for length and wipe checks.
    pub fn buffer(&self) -> &PasswordBuffer {
        &self.buffer
    }

    /// Returns `true` once any attempt has failed.
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    fn accept(&mut self) -> KeyOutcome {
        let verdict = {
            let attempt = self.buffer.take_attempt();
            self.verifier.verify(attempt.as_bytes(), &self.hash)
        };

        match verdict {
            Ok(true) => {
                debug!(stage = "auth", action = "accepted");
                KeyOutcome::Accepted
            }
            Ok(false) => {
                self.rejected = true;
                debug!(stage = "auth", action = "rejected");
                KeyOutcome::Rejected
            }
            Err(error) => {
                self.rejected = true;
                warn!(stage = "auth", action = "verify_failed", %error);
                KeyOutcome::Rejected
            }
        }
    }
}
