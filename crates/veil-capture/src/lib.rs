#![warn(missing_docs)]
//! # veil-capture
//!
//! ## Purpose
//! Provides the one-shot desktop capture taken when the screen is locked.
//!
//! ## Responsibilities
//! - Define a backend-agnostic capture trait.
//! - Capture the X11 root window on Unix targets.
//! - Expose a deterministic synthetic backend for CI and unit tests.
//! - Crop the shared capture to each output's region.
//!
//! ## Data flow
//! Lock setup calls [`CaptureBackend::capture_desktop`] once -> the resulting
//! [`Frame`] is cropped per output with [`crop_for_output`] -> the crop is
//! scrambled into that output's backdrop.
//!
//! ## Ownership and lifetimes
//! Captured frames are owned values. The X11 backend borrows the caller's
//! connection for the duration of the capture only.
//!
//! ## Error model
//! Protocol failures return [`CaptureError`]; the locker treats them as fatal
//! setup errors. A server pixel layout the backend cannot read is not an error:
//! the capture degrades to a black desktop and logs a warning.
//!
//! ## Security and privacy notes
//! Captured pixels are kept in memory only and never written to disk or logs.

#[cfg(unix)]
mod x11;

#[cfg(unix)]
pub use x11::X11CaptureBackend;

use thiserror::Error;
use veil_core::{CoreError, Frame, OutputRegion, PixelFormat};

/// Trait implemented by concrete capture providers.
pub trait CaptureBackend {
    /// Captures the full visible desktop once.
    ///
    /// # Errors
    /// Returns [`CaptureError`] when the backend cannot produce a frame.
    fn capture_desktop(&self) -> Result<Frame, CaptureError>;
}

/// Deterministic gradient backend for tests and headless runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticCaptureBackend {
    width: u32,
    height: u32,
}

impl SyntheticCaptureBackend {
    /// Creates a backend producing `width x height` frames.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for SyntheticCaptureBackend {
    fn default() -> Self {
        Self::new(64, 48)
    }
}

impl CaptureBackend for SyntheticCaptureBackend {
    fn capture_desktop(&self) -> Result<Frame, CaptureError> {
        let mut frame = Frame::black(self.width, self.height, PixelFormat::Bgrx)?;
        for y in 0..self.height {
            for x in 0..self.width {
                let offset = frame.offset(x, y);
                let pixel = &mut frame.pixels_mut()[offset..offset + Frame::BYTES_PER_PIXEL];
                pixel.copy_from_slice(&[(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 0]);
            }
        }
        Ok(frame)
    }
}

/// Crops the shared desktop capture to one output.
///
/// # Errors
/// Returns [`CaptureError::Core`] when the region size overflows.
pub fn crop_for_output(desktop: &Frame, region: OutputRegion) -> Result<Frame, CaptureError> {
    Ok(desktop.crop(region)?)
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Frame construction failed.
    #[error("capture frame invalid: {0}")]
    Core(#[from] CoreError),
    /// Backend runtime failure.
    #[error("capture backend failure: {0}")]
    Backend(String),
}
