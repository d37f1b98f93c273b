//! Owned desktop images and output geometry.

use crate::CoreError;

/// Byte layout of one 4-byte pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Blue, green, red, padding. Native X11 ZPixmap layout on LSB-first servers.
    Bgrx,
    /// Red, green, blue, alpha.
    Rgba,
}

impl PixelFormat {
    /// Returns byte offsets of the red, green and blue channels.
    pub fn rgb_offsets(self) -> [usize; 3] {
        match self {
            Self::Bgrx => [2, 1, 0],
            Self::Rgba => [0, 1, 2],
        }
    }
}

/// Rectangle of the desktop covered by one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRegion {
    /// Left edge in desktop coordinates.
    pub x: i32,
    /// Top edge in desktop coordinates.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Captured image with validated geometry.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Frame {
    /// Bytes per pixel for every supported format.
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Constructs a validated frame.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidFrameShape`] when the buffer length is not
    /// exactly `width * height * 4`.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, CoreError> {
        let expected = required_len(width, height)?;
        if pixels.len() != expected {
            return Err(CoreError::InvalidFrameShape {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// Creates an all-black frame.
    pub fn black(width: u32, height: u32, format: PixelFormat) -> Result<Self, CoreError> {
        let len = required_len(width, height)?;
        Ok(Self {
            width,
            height,
            format,
            pixels: vec![0; len],
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel byte layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes in row-major order.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable raw pixel bytes. The length cannot change through this slice.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Returns the 4 bytes of pixel `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        Some(&self.pixels[offset..offset + Self::BYTES_PER_PIXEL])
    }

    /// Byte offset of pixel `(x, y)`. Callers must stay in bounds.
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL
    }

    /// Copies the part of the frame covered by `region`.
    ///
    /// Areas of the region that fall outside this frame are black, so an output
    /// larger than the captured desktop is still fully covered.
    pub fn crop(&self, region: OutputRegion) -> Result<Frame, CoreError> {
        let mut cropped = Frame::black(region.width, region.height, self.format)?;
        let row_len = region.width as usize * Self::BYTES_PER_PIXEL;

        for dst_y in 0..region.height {
            let src_y = i64::from(region.y) + i64::from(dst_y);
            if src_y < 0 || src_y >= i64::from(self.height) {
                continue;
            }

            // Invariant: only the horizontal overlap of both rows is copied.
            let src_x_start = i64::from(region.x).max(0);
            let src_x_end = (i64::from(region.x) + i64::from(region.width)).min(i64::from(self.width));
            if src_x_start >= src_x_end {
                continue;
            }

            let span = (src_x_end - src_x_start) as usize * Self::BYTES_PER_PIXEL;
            let src_offset = self.offset(src_x_start as u32, src_y as u32);
            let dst_x = (src_x_start - i64::from(region.x)) as usize;
            let dst_offset = dst_y as usize * row_len + dst_x * Self::BYTES_PER_PIXEL;

            cropped.pixels[dst_offset..dst_offset + span]
                .copy_from_slice(&self.pixels[src_offset..src_offset + span]);
        }

        Ok(cropped)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pixel contents are desktop captures; keep them out of logs.
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

fn required_len(width: u32, height: u32) -> Result<usize, CoreError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(Frame::BYTES_PER_PIXEL))
        .ok_or(CoreError::DimensionOverflow { width, height })
}
