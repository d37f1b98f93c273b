#![warn(missing_docs)]
//! # veil-scramble
//!
//! ## Purpose
//! Turns the captured desktop into an unreadable backdrop for the lock overlay.
//!
//! ## Responsibilities
//! - Shift pixels horizontally by a random offset held for bands of columns.
//! - Fill pixels whose source column leaves the image with black.
//! - Keep output geometry identical to the input.
//!
//! ## Data flow
//! Cropped per-output [`Frame`] -> [`scramble_columns`] -> backdrop stored in
//! the output's lock session and redrawn beneath every repaint.
//!
//! ## Ownership and lifetimes
//! The transform reads a borrowed frame and returns a new owned frame, so the
//! shared desktop capture can be cropped and scrambled once per output.
//!
//! ## Error model
//! The transform cannot fail on a validated [`Frame`].
//!
//! ## Security and privacy notes
//! This is cosmetic only. Shapes and colours of the desktop remain partly
//! recognisable; the opaque overlay painted on top is what hides input.

use rand::Rng;
use veil_core::Frame;

/// Number of consecutive columns that share one shift offset.
pub const BAND_WIDTH: u32 = 5;

/// Largest absolute horizontal shift. Offsets are drawn from `[-MAX_SHIFT, MAX_SHIFT)`.
pub const MAX_SHIFT: i64 = 10;

/// Scrambles `frame` column band by column band.
///
/// For every band of [`BAND_WIDTH`] columns a shift `s` is drawn; output pixel
/// `(x, y)` takes the channels of input pixel `(x + s, y)`, or black when
/// `x + s` falls outside `[0, width)`.
pub fn scramble_columns<R>(frame: &Frame, rng: &mut R) -> Frame
where
    R: Rng + ?Sized,
{
    let width = frame.width();
    let height = frame.height();
    let mut output = frame.clone();
    let bpp = Frame::BYTES_PER_PIXEL;

    let mut shift = 0_i64;
    for x in 0..width {
        if x % BAND_WIDTH == 0 {
            shift = rng.random_range(-MAX_SHIFT..MAX_SHIFT);
        }

        let source_x = i64::from(x) + shift;
        let in_bounds = source_x >= 0 && source_x < i64::from(width);

        for y in 0..height {
            let dst = frame.offset(x, y);
            if in_bounds {
                let src = frame.offset(source_x as u32, y);
                output.pixels_mut()[dst..dst + bpp].copy_from_slice(&frame.pixels()[src..src + bpp]);
            } else {
                output.pixels_mut()[dst..dst + bpp].fill(0);
            }
        }
    }

    output
}
