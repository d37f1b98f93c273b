//! X11 root window capture.
//!
//! The server hands back Z-pixmap data in its own byte order and pixel size.
//! 32-bit pixels in either byte order are turned into [`PixelFormat::Bgrx`];
//! any other layout yields a black backdrop so the lock still proceeds.

use tracing::warn;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, ImageFormat, ImageOrder};

use veil_core::{Frame, PixelFormat};

use crate::{CaptureBackend, CaptureError};

/// How the root window's pixels arrive from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerLayout {
    /// 32 bits per pixel, least significant byte first: already `Bgrx`.
    Native,
    /// 32 bits per pixel, most significant byte first.
    Swapped,
    /// Anything else; the desktop is not read.
    Unreadable,
}

fn server_layout(byte_order: ImageOrder, bits_per_pixel: Option<u8>) -> ServerLayout {
    match (bits_per_pixel, byte_order) {
        (Some(32), ImageOrder::LSB_FIRST) => ServerLayout::Native,
        (Some(32), ImageOrder::MSB_FIRST) => ServerLayout::Swapped,
        _ => ServerLayout::Unreadable,
    }
}

/// Reorders MSB-first `xRGB` words into `Bgrx` bytes in place.
fn swap_pixel_bytes(data: &mut [u8]) {
    for pixel in data.chunks_exact_mut(Frame::BYTES_PER_PIXEL) {
        pixel.reverse();
    }
}

/// Captures the root window of one X screen through an existing connection.
pub struct X11CaptureBackend<'c, C: Connection> {
    conn: &'c C,
    screen: usize,
}

impl<'c, C: Connection> X11CaptureBackend<'c, C> {
    /// Creates a backend capturing `screen` on `conn`.
    pub fn new(conn: &'c C, screen: usize) -> Self {
        Self { conn, screen }
    }
}

impl<C: Connection> CaptureBackend for X11CaptureBackend<'_, C> {
    fn capture_desktop(&self) -> Result<Frame, CaptureError> {
        let setup = self.conn.setup();
        let root = setup
            .roots
            .get(self.screen)
            .ok_or_else(|| CaptureError::Backend(format!("no screen {}", self.screen)))?;
        let width = root.width_in_pixels;
        let height = root.height_in_pixels;

        let bits_per_pixel = setup
            .pixmap_formats
            .iter()
            .find(|format| format.depth == root.root_depth)
            .map(|format| format.bits_per_pixel);
        let layout = server_layout(setup.image_byte_order, bits_per_pixel);
        if layout == ServerLayout::Unreadable {
            warn!(
                stage = "capture",
                action = "black_backdrop",
                depth = root.root_depth,
                ?bits_per_pixel,
                byte_order = ?setup.image_byte_order,
            );
            return Ok(Frame::black(u32::from(width), u32::from(height), PixelFormat::Bgrx)?);
        }

        let mut data = self
            .conn
            .get_image(ImageFormat::Z_PIXMAP, root.root, 0, 0, width, height, !0)
            .map_err(|error| CaptureError::Backend(error.to_string()))?
            .reply()
            .map_err(|error| CaptureError::Backend(error.to_string()))?
            .data;
        if layout == ServerLayout::Swapped {
            swap_pixel_bytes(&mut data);
        }

        Ok(Frame::new(u32::from(width), u32::from(height), PixelFormat::Bgrx, data)?)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for server pixel layout handling.

    use super::*;

    #[test]
    fn only_32_bit_pixels_are_read() {
        assert_eq!(server_layout(ImageOrder::LSB_FIRST, Some(32)), ServerLayout::Native);
        assert_eq!(server_layout(ImageOrder::MSB_FIRST, Some(32)), ServerLayout::Swapped);
        assert_eq!(server_layout(ImageOrder::LSB_FIRST, Some(24)), ServerLayout::Unreadable);
        assert_eq!(server_layout(ImageOrder::LSB_FIRST, Some(16)), ServerLayout::Unreadable);
        assert_eq!(server_layout(ImageOrder::MSB_FIRST, None), ServerLayout::Unreadable);
    }

    #[test]
    fn msb_first_pixels_become_bgrx() {
        // 0x00112233 and 0x00445566 as big-endian words
        let mut data = vec![0x00, 0x11, 0x22, 0x33, 0x00, 0x44, 0x55, 0x66];
        swap_pixel_bytes(&mut data);
        assert_eq!(data, vec![0x33, 0x22, 0x11, 0x00, 0x66, 0x55, 0x44, 0x00]);

        let frame = Frame::new(2, 1, PixelFormat::Bgrx, data).expect("valid frame");
        assert_eq!(frame.pixel(0, 0).expect("in bounds"), &[0x33, 0x22, 0x11, 0x00]);
    }
}
