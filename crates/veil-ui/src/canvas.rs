//! Anti-aliased painter writing into an owned [`Frame`].
//!
//! Shapes are rasterised with `tiny-skia` on an opaque RGBA pixmap and copied
//! back into the surface's own pixel format when the repaint ends. Text is not
//! rasterised here; labels are recorded as [`LabelRun`] values so the display
//! backend can draw them with its own fonts after uploading the surface.

use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use veil_core::Frame;

use crate::{OverlayPainter, Rgba};

const PIXMAP_RGB: [usize; 3] = [0, 1, 2];
const PIXMAP_ALPHA: usize = 3;

/// Label recorded for the display backend to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRun {
    /// Text to draw.
    pub text: String,
    /// Horizontal center in surface pixels.
    pub center_x: f64,
    /// Vertical center in surface pixels.
    pub center_y: f64,
    /// Text colour.
    pub color: Rgba,
}

/// [`OverlayPainter`] over an in-memory surface.
///
/// A zero-sized surface has no pixmap; every shape is then a no-op.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    surface: Frame,
    pixmap: Option<Pixmap>,
    labels: Vec<LabelRun>,
}

impl RasterCanvas {
    /// Wraps `surface`. Its size and pixel format are kept for the whole repaint.
    pub fn new(surface: Frame) -> Self {
        let mut pixmap = Pixmap::new(surface.width(), surface.height());
        if let Some(pixmap) = pixmap.as_mut() {
            copy_into_pixmap(pixmap, &surface);
        }
        Self {
            surface,
            pixmap,
            labels: Vec::new(),
        }
    }

    /// Consumes the canvas, returning the surface and the labels to draw on top.
    pub fn into_parts(mut self) -> (Frame, Vec<LabelRun>) {
        if let Some(pixmap) = &self.pixmap {
            let offsets = self.surface.format().rgb_offsets();
            for (dst, src) in self
                .surface
                .pixels_mut()
                .chunks_exact_mut(Frame::BYTES_PER_PIXEL)
                .zip(pixmap.data().chunks_exact(Frame::BYTES_PER_PIXEL))
            {
                for (to, from) in offsets.iter().zip(PIXMAP_RGB) {
                    dst[*to] = src[from];
                }
            }
        }
        (self.surface, self.labels)
    }
}

/// Copies `frame` into the top-left of `pixmap` as opaque RGBA; the rest is black.
fn copy_into_pixmap(pixmap: &mut Pixmap, frame: &Frame) {
    let pixmap_width = pixmap.width();
    let width = pixmap_width.min(frame.width());
    let height = pixmap.height().min(frame.height());
    let offsets = frame.format().rgb_offsets();
    let data = pixmap.data_mut();

    for (index, pixel) in data.chunks_exact_mut(Frame::BYTES_PER_PIXEL).enumerate() {
        let x = (index % pixmap_width as usize) as u32;
        let y = (index / pixmap_width as usize) as u32;
        if x < width && y < height {
            let src = frame.offset(x, y);
            for (to, from) in PIXMAP_RGB.iter().zip(offsets) {
                pixel[*to] = frame.pixels()[src + from];
            }
        } else {
            pixel[..PIXMAP_ALPHA].fill(0);
        }
        pixel[PIXMAP_ALPHA] = u8::MAX;
    }
}

fn paint(color: Rgba) -> Option<Paint<'static>> {
    let color = Color::from_rgba(
        color.r.clamp(0.0, 1.0),
        color.g.clamp(0.0, 1.0),
        color.b.clamp(0.0, 1.0),
        color.a.clamp(0.0, 1.0),
    )?;
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    Some(paint)
}

impl OverlayPainter for RasterCanvas {
    fn size(&self) -> (u32, u32) {
        (self.surface.width(), self.surface.height())
    }

    fn draw_backdrop(&mut self, backdrop: &Frame) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            copy_into_pixmap(pixmap, backdrop);
        }
    }

    fn fill_circle(&mut self, center_x: f64, center_y: f64, radius: f64, color: Rgba) {
        let (Some(pixmap), Some(paint)) = (self.pixmap.as_mut(), paint(color)) else {
            return;
        };
        if let Some(path) = PathBuilder::from_circle(center_x as f32, center_y as f32, radius as f32) {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    fn stroke_ring(&mut self, center_x: f64, center_y: f64, radius: f64, line_width: f64, color: Rgba) {
        let (Some(pixmap), Some(paint)) = (self.pixmap.as_mut(), paint(color)) else {
            return;
        };
        let Some(path) = PathBuilder::from_circle(center_x as f32, center_y as f32, radius as f32) else {
            return;
        };
        let stroke = Stroke {
            width: line_width as f32,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba) {
        let (Some(pixmap), Some(paint)) = (self.pixmap.as_mut(), paint(color)) else {
            return;
        };
        if let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    fn draw_centered_label(&mut self, text: &str, center_x: f64, center_y: f64, color: Rgba) {
        self.labels.push(LabelRun {
            text: text.to_string(),
            center_x,
            center_y,
            color,
        });
    }
}
