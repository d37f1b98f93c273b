#![warn(missing_docs)]
//! # veil-ui
//!
//! ## Purpose
//! Defines what the lock overlay looks like for each [`VisualState`].
//!
//! ## Responsibilities
//! - Describe overlay geometry and colours in one [`OverlayStyle`].
//! - Define the [`OverlayPainter`] drawing contract used once per output per
//!   repaint.
//! - Choose the random marker position shown while typing.
//! - Provide [`RasterCanvas`], an anti-aliased `tiny-skia` painter over an owned [`Frame`].
//!
//! ## Data flow
//! Repaint request + derived [`VisualState`] -> [`paint_overlay`] issues
//! drawing calls -> painter surface is handed to the display backend.
//!
//! ## Ownership and lifetimes
//! Painters own their surface for the duration of one repaint. Backdrops are
//! borrowed from the output's lock session and never mutated.
//!
//! ## Error model
//! Painting is infallible; geometry outside the surface is clipped.
//!
//! ## Security and privacy notes
//! The overlay never reflects typed content: the marker position is random
//! and carries no information about which key was pressed.
//!
//! ## Example
//! ```rust
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use veil_core::{Frame, PixelFormat, VisualState};
//! use veil_ui::{OverlayStyle, RasterCanvas, paint_overlay};
//!
//! let backdrop = Frame::black(320, 240, PixelFormat::Bgrx).expect("valid frame");
//! let mut canvas = RasterCanvas::new(backdrop.clone());
//! let mut rng = StdRng::seed_from_u64(7);
//! paint_overlay(&mut canvas, &backdrop, VisualState::Neutral, &OverlayStyle::default(), &mut rng);
//! let (_surface, labels) = canvas.into_parts();
//! assert_eq!(labels[0].text, "Locked");
//! ```

mod canvas;

pub use canvas::{LabelRun, RasterCanvas};

use rand::Rng;
use veil_core::{Frame, VisualState};

/// Straight-alpha colour with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Opacity.
    pub a: f32,
}

impl Rgba {
    /// Builds a colour from its four channels.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Geometry and colours of the lock overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Radius of the centered ring indicator.
    pub ring_radius: f64,
    /// Stroke width of the ring.
    pub ring_line_width: f64,
    /// Ring stroke colour.
    pub ring_color: Rgba,
    /// Fill colour inside the ring.
    pub ring_fill: Rgba,
    /// Text drawn at the ring center.
    pub label: String,
    /// Label colour.
    pub label_color: Rgba,
    /// Radius of the typing marker dot.
    pub marker_radius: f64,
    /// Typing marker colour.
    pub marker_color: Rgba,
    /// Marker grid columns.
    pub marker_columns: u32,
    /// Marker grid rows.
    pub marker_rows: u32,
    /// Half-size of the centered square the marker must stay out of.
    pub exclusion_half_size: f64,
    /// Upper bound on rejection-sampling draws per repaint.
    pub max_marker_draws: u32,
    /// Full-output wash shown after a failed attempt.
    pub rejected_wash: Rgba,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            ring_radius: 130.0,
            ring_line_width: 20.0,
            ring_color: Rgba::new(1.0, 1.0, 1.0, 0.8),
            ring_fill: Rgba::new(0.0, 0.0, 0.0, 0.4),
            label: "Locked".to_string(),
            label_color: Rgba::new(1.0, 1.0, 1.0, 1.0),
            marker_radius: 30.0,
            marker_color: Rgba::new(0.0, 1.0, 0.0, 0.5),
            marker_columns: 15,
            marker_rows: 8,
            exclusion_half_size: 260.0,
            max_marker_draws: 64,
            rejected_wash: Rgba::new(1.0, 0.1, 0.1, 0.5),
        }
    }
}

/// Drawing operations the overlay needs from a surface.
pub trait OverlayPainter {
    /// Surface size in pixels as `(width, height)`.
    fn size(&self) -> (u32, u32);

    /// Replaces the whole surface with `backdrop`.
    fn draw_backdrop(&mut self, backdrop: &Frame);

    /// Blends a filled disc.
    fn fill_circle(&mut self, center_x: f64, center_y: f64, radius: f64, color: Rgba);

    /// Blends a circular outline of `line_width` centered on `radius`.
    fn stroke_ring(&mut self, center_x: f64, center_y: f64, radius: f64, line_width: f64, color: Rgba);

    /// Blends an axis-aligned rectangle.
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba);

    /// Draws `text` centered on the given point.
    fn draw_centered_label(&mut self, text: &str, center_x: f64, center_y: f64, color: Rgba);
}

/// Paints one output's overlay for `state`.
///
/// Every state starts from the backdrop. `Typing` adds one marker dot and
/// then the same ring and label as `Neutral`; `Rejected` covers the output
/// with the red wash instead.
pub fn paint_overlay<P, R>(
    painter: &mut P,
    backdrop: &Frame,
    state: VisualState,
    style: &OverlayStyle,
    rng: &mut R,
) where
    P: OverlayPainter + ?Sized,
    R: Rng + ?Sized,
{
    let (width, height) = painter.size();
    painter.draw_backdrop(backdrop);

    match state {
        VisualState::Typing => {
            if let Some((x, y)) = sample_marker_position(width, height, style, rng) {
                painter.fill_circle(x, y, style.marker_radius, style.marker_color);
            }
            paint_ring(painter, width, height, style);
        }
        VisualState::Neutral => paint_ring(painter, width, height, style),
        VisualState::Rejected => {
            painter.fill_rect(0.0, 0.0, f64::from(width), f64::from(height), style.rejected_wash);
        }
    }
}

fn paint_ring<P>(painter: &mut P, width: u32, height: u32, style: &OverlayStyle)
where
    P: OverlayPainter + ?Sized,
{
    let (center_x, center_y) = center(width, height);
    painter.stroke_ring(
        center_x,
        center_y,
        style.ring_radius,
        style.ring_line_width,
        style.ring_color,
    );
    painter.fill_circle(center_x, center_y, style.ring_radius, style.ring_fill);
    painter.draw_centered_label(&style.label, center_x, center_y, style.label_color);
}

fn center(width: u32, height: u32) -> (f64, f64) {
    (f64::from(width / 2), f64::from(height / 2))
}

/// Picks a marker cell center outside the centered exclusion square.
///
/// Cells come from a `marker_columns x marker_rows` grid over the output.
/// Returns `None` when `max_marker_draws` draws all land inside the square,
/// which is always the case on outputs too small to have a valid cell.
pub fn sample_marker_position<R>(
    width: u32,
    height: u32,
    style: &OverlayStyle,
    rng: &mut R,
) -> Option<(f64, f64)>
where
    R: Rng + ?Sized,
{
    if style.marker_columns == 0 || style.marker_rows == 0 {
        return None;
    }

    let (center_x, center_y) = center(width, height);
    let half = style.exclusion_half_size;

    for _ in 0..style.max_marker_draws {
        let column = rng.random_range(0..style.marker_columns);
        let row = rng.random_range(0..style.marker_rows);
        let x = (f64::from(column) + 0.5) / f64::from(style.marker_columns) * f64::from(width);
        let y = (f64::from(row) + 0.5) / f64::from(style.marker_rows) * f64::from(height);

        let outside = x < center_x - half
            || x > center_x + half
            || y < center_y - half
            || y > center_y + half;
        if outside {
            return Some((x, y));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    //! Unit tests for marker sampling.

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn tiny_output_never_gets_a_marker() {
        let style = OverlayStyle::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..32 {
            assert_eq!(sample_marker_position(400, 300, &style, &mut rng), None);
        }
    }

    #[test]
    fn markers_land_on_cell_centers_outside_exclusion() {
        let style = OverlayStyle::default();
        let (width, height) = (1920_u32, 1080_u32);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let (x, y) = sample_marker_position(width, height, &style, &mut rng)
                .expect("a large output has valid cells");
            let column = x / f64::from(width) * 15.0 - 0.5;
            let row = y / f64::from(height) * 8.0 - 0.5;
            assert!((column - column.round()).abs() < 1e-9);
            assert!((row - row.round()).abs() < 1e-9);
            assert!((x - 960.0).abs() > 260.0 || (y - 540.0).abs() > 260.0);
        }
    }

    #[test]
    fn zero_draw_budget_skips_marker() {
        let style = OverlayStyle {
            max_marker_draws: 0,
            ..OverlayStyle::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(sample_marker_position(1920, 1080, &style, &mut rng), None);
    }
}
