#![warn(missing_docs)]
//! # veil-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `veil` workspace.
//!
//! ## Responsibilities
//! - Represent captured desktop images ([`Frame`]) and output geometry.
//! - Hold the in-progress password in a bounded, self-wiping buffer.
//! - Derive the overlay [`VisualState`] from input progress.
//! - Classify X keysyms into password-editing actions.
//!
//! ## Data flow
//! The display backend reports raw keysyms -> [`keysym::classify`] turns them
//! into [`keysym::KeyAction`] values -> the auth state machine edits a
//! [`PasswordBuffer`] -> the renderer asks for the derived [`VisualState`].
//!
//! ## Ownership and lifetimes
//! Frames own their pixel buffers. The password buffer is a fixed array owned
//! by exactly one state machine; attempts borrow it through a scoped guard.
//!
//! ## Error model
//! Geometry and shape validation failures return [`CoreError`].
//!
//! ## Security and privacy notes
//! [`PasswordBuffer`] zeroes its whole backing array whenever an attempt ends
//! and on drop. Its `Debug` output never includes contents.
//!
//! ## Example
//! ```rust
//! use veil_core::{PasswordBuffer, VisualState};
//!
//! let mut buffer = PasswordBuffer::new();
//! assert!(buffer.push_char('a'));
//! assert_eq!(VisualState::derive(buffer.len(), false), VisualState::Typing);
//! buffer.clear();
//! assert!(buffer.is_wiped());
//! ```

mod frame;
pub mod keysym;
mod secret;

pub use frame::{Frame, OutputRegion, PixelFormat};
pub use secret::{AttemptGuard, PASSWORD_CAPACITY, PasswordBuffer};

use thiserror::Error;

/// Overlay appearance derived from password input progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualState {
    /// Nothing typed and no failed attempt yet.
    Neutral,
    /// At least one byte is buffered.
    Typing,
    /// Buffer is empty after a failed attempt.
    Rejected,
}

impl VisualState {
    /// Derives the visual state from buffer length and the rejected flag.
    ///
    /// Buffered input always wins over the rejected styling, so a user who
    /// starts retyping after a failure sees the typing feedback again.
    pub fn derive(buffered_len: usize, rejected: bool) -> Self {
        if buffered_len > 0 {
            Self::Typing
        } else if rejected {
            Self::Rejected
        } else {
            Self::Neutral
        }
    }
}

/// Error type for core validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Pixel buffer length does not match declared geometry.
    #[error("invalid frame shape: expected {expected} bytes, got {actual}")]
    InvalidFrameShape {
        /// Expected byte count (`width * height * 4`).
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },
    /// Width and height overflow the addressable buffer size.
    #[error("frame dimensions overflow: {width}x{height}")]
    DimensionOverflow {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}
