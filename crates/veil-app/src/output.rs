//! Output reconfiguration handling.

use rand::Rng;
use tracing::{debug, info};
use veil_core::VisualState;

use crate::AppError;
use crate::display::DisplayServer;
use crate::render::OverlayRenderer;
use crate::session::LockSessionSet;

/// Applies a size change reported for one covering window.
pub struct OutputChangeHandler<'a, D, R>
where
    D: DisplayServer + ?Sized,
{
    display: &'a mut D,
    sessions: &'a mut LockSessionSet<D::Window>,
    renderer: &'a mut OverlayRenderer<R>,
}

impl<'a, D, R> OutputChangeHandler<'a, D, R>
where
    D: DisplayServer + ?Sized,
    R: Rng,
{
    /// Borrows the pieces a reconfiguration touches.
    pub fn new(
        display: &'a mut D,
        sessions: &'a mut LockSessionSet<D::Window>,
        renderer: &'a mut OverlayRenderer<R>,
    ) -> Self {
        Self {
            display,
            sessions,
            renderer,
        }
    }

    /// Resizes and repaints the output covered by `window`.
    ///
    /// Returns `false` without touching anything when `window` is not a
    /// covering window.
    pub fn handle(
        self,
        window: D::Window,
        width: u32,
        height: u32,
        state: VisualState,
    ) -> Result<bool, AppError> {
        if self.sessions.find(window).is_none() {
            debug!(stage = "output", action = "unknown_window", window = ?window);
            return Ok(false);
        }

        self.display.resize(window, width, height)?;
        let Some(session) = self.sessions.set_geometry(window, width, height) else {
            return Ok(false);
        };

        info!(stage = "output", action = "resized", output = session.index, width, height);
        self.renderer.repaint(&mut *self.display, session, state)?;
        self.display.flush()?;
        Ok(true)
    }
}
