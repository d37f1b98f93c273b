//! Bounded acquisition of pointer and keyboard ownership.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::display::{DisplayError, DisplayServer, GrabDenial, GrabStatus, OutputInfo};

/// Retry budget for input grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabPolicy {
    /// Total attempts per output.
    pub attempts: u32,
    /// Pause between consecutive attempts.
    pub interval: Duration,
}

impl Default for GrabPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            interval: Duration::from_millis(100),
        }
    }
}

/// Suspends the caller between grab attempts.
pub trait Sleeper {
    /// Sleeps for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Input ownership that could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    /// Pointer only.
    Pointer,
    /// Keyboard only.
    Keyboard,
    /// Neither device.
    Both,
}

impl MissingInput {
    fn from_held(pointer: bool, keyboard: bool) -> Option<Self> {
        match (pointer, keyboard) {
            (true, true) => None,
            (false, true) => Some(Self::Pointer),
            (true, false) => Some(Self::Keyboard),
            (false, false) => Some(Self::Both),
        }
    }

    /// Returns `true` when the pointer is missing.
    pub fn includes_pointer(self) -> bool {
        matches!(self, Self::Pointer | Self::Both)
    }

    /// Returns `true` when the keyboard is missing.
    pub fn includes_keyboard(self) -> bool {
        matches!(self, Self::Keyboard | Self::Both)
    }
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointer => f.write_str("pointer"),
            Self::Keyboard => f.write_str("keyboard"),
            Self::Both => f.write_str("pointer and keyboard"),
        }
    }
}

/// Grab acquisition failures.
#[derive(Debug, Error)]
pub enum GrabError {
    /// Every attempt found the device grabbed by another client.
    #[error("unable to grab {missing} for output {output} after {attempts} attempts")]
    Unavailable {
        /// Output index.
        output: usize,
        /// Ownership still missing.
        missing: MissingInput,
        /// Attempts made.
        attempts: u32,
    },
    /// Server refused a grab definitively.
    #[error("unable to grab {missing} for output {output}: denied ({reason:?})")]
    Denied {
        /// Output index.
        output: usize,
        /// Ownership still missing.
        missing: MissingInput,
        /// Refusal reason of the last denied request.
        reason: GrabDenial,
    },
    /// Display request failed.
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Obtains pointer and keyboard ownership for one output.
///
/// Each attempt requests only the ownerships not yet held. Attempts are
/// separated by `policy.interval`; there is no sleep after the last one. A
/// definitive denial ends the loop early.
pub fn acquire_input<D, S>(
    display: &mut D,
    output: &OutputInfo,
    window: D::Window,
    policy: GrabPolicy,
    sleeper: &mut S,
) -> Result<(), GrabError>
where
    D: DisplayServer + ?Sized,
    S: Sleeper + ?Sized,
{
    let mut pointer = false;
    let mut keyboard = false;
    let mut denial = None;
    let mut attempts = 0;

    while attempts < policy.attempts {
        if attempts > 0 {
            sleeper.sleep(policy.interval);
        }
        attempts += 1;

        if !pointer {
            match display.grab_pointer(output, window)? {
                GrabStatus::Success => pointer = true,
                GrabStatus::AlreadyGrabbed => {}
                GrabStatus::Denied(reason) => denial = Some(reason),
            }
        }
        if !keyboard {
            match display.grab_keyboard(output, window)? {
                GrabStatus::Success => keyboard = true,
                GrabStatus::AlreadyGrabbed => {}
                GrabStatus::Denied(reason) => denial = Some(reason),
            }
        }

        if pointer && keyboard {
            info!(stage = "grab", action = "acquired", output = output.index, attempts);
            return Ok(());
        }
        if denial.is_some() {
            break;
        }
        debug!(stage = "grab", action = "retry", output = output.index, attempts, pointer, keyboard);
    }

    let missing = MissingInput::from_held(pointer, keyboard).unwrap_or(MissingInput::Both);
    if missing.includes_pointer() {
        error!(stage = "grab", action = "pointer_failed", output = output.index, attempts);
    }
    if missing.includes_keyboard() {
        error!(stage = "grab", action = "keyboard_failed", output = output.index, attempts);
    }

    Err(match denial {
        Some(reason) => GrabError::Denied {
            output: output.index,
            missing,
            reason,
        },
        None => GrabError::Unavailable {
            output: output.index,
            missing,
            attempts,
        },
    })
}
