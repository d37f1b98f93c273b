//! Overlay repaints and the blocking authentication loop.

use rand::Rng;
use tracing::{debug, info};
use veil_auth::{AuthStateMachine, KeyOutcome, PasswordVerifier};
use veil_core::{Frame, VisualState};
use veil_ui::{OverlayStyle, RasterCanvas, paint_overlay};

use crate::AppError;
use crate::display::{DisplayServer, LockEvent};
use crate::output::OutputChangeHandler;
use crate::session::{LockSession, LockSessionSet};

/// Paints overlays through [`RasterCanvas`] and presents them.
#[derive(Debug)]
pub struct OverlayRenderer<R> {
    style: OverlayStyle,
    rng: R,
}

impl<R: Rng> OverlayRenderer<R> {
    /// Creates a renderer drawing `style` with marker positions from `rng`.
    pub fn new(style: OverlayStyle, rng: R) -> Self {
        Self { style, rng }
    }

    /// Repaints one output.
    pub fn repaint<D>(
        &mut self,
        display: &mut D,
        session: &LockSession<D::Window>,
        state: VisualState,
    ) -> Result<(), AppError>
    where
        D: DisplayServer + ?Sized,
    {
        let surface = Frame::black(session.width, session.height, session.backdrop.format())?;
        let mut canvas = RasterCanvas::new(surface);
        paint_overlay(&mut canvas, &session.backdrop, state, &self.style, &mut self.rng);

        let (surface, labels) = canvas.into_parts();
        display.present(session.window, &surface, &labels)?;
        Ok(())
    }

    /// Repaints every locked output, then flushes.
    pub fn repaint_all<D>(
        &mut self,
        display: &mut D,
        sessions: &LockSessionSet<D::Window>,
        state: VisualState,
    ) -> Result<(), AppError>
    where
        D: DisplayServer + ?Sized,
    {
        for session in sessions.iter() {
            self.repaint(display, session, state)?;
        }
        display.flush()?;
        Ok(())
    }
}

/// Single-threaded dispatch loop run while the screen is locked.
pub struct RenderLoop<'a, D, V, R>
where
    D: DisplayServer + ?Sized,
{
    display: &'a mut D,
    sessions: &'a mut LockSessionSet<D::Window>,
    machine: &'a mut AuthStateMachine<V>,
    renderer: &'a mut OverlayRenderer<R>,
    bell_percent: i8,
}

impl<'a, D, V, R> RenderLoop<'a, D, V, R>
where
    D: DisplayServer + ?Sized,
    V: PasswordVerifier,
    R: Rng,
{
    /// Wires the loop to its collaborators.
    pub fn new(
        display: &'a mut D,
        sessions: &'a mut LockSessionSet<D::Window>,
        machine: &'a mut AuthStateMachine<V>,
        renderer: &'a mut OverlayRenderer<R>,
        bell_percent: i8,
    ) -> Self {
        Self {
            display,
            sessions,
            machine,
            renderer,
            bell_percent,
        }
    }

    /// Runs until a matching password is entered.
    ///
    /// # Errors
    /// Returns [`AppError::Display`] when the display connection fails; the
    /// caller must treat that as fatal.
    pub fn run(self) -> Result<(), AppError> {
        let Self {
            display,
            sessions,
            machine,
            renderer,
            bell_percent,
        } = self;

        renderer.repaint_all(display, sessions, machine.visual_state())?;

        loop {
            match display.next_event()? {
                LockEvent::Key(keysym) => {
                    let outcome = machine.handle_key(keysym);
                    match outcome {
                        KeyOutcome::Accepted => {
                            info!(stage = "auth", action = "unlocked");
                            return Ok(());
                        }
                        KeyOutcome::Rejected => display.bell(bell_percent)?,
                        KeyOutcome::Ignored | KeyOutcome::Edited | KeyOutcome::Cleared => {}
                    }
                    renderer.repaint_all(display, sessions, machine.visual_state())?;
                }
                LockEvent::OutputChanged { window, width, height } => {
                    OutputChangeHandler::new(&mut *display, &mut *sessions, &mut *renderer).handle(
                        window,
                        width,
                        height,
                        machine.visual_state(),
                    )?;
                }
                LockEvent::Other => {
                    debug!(stage = "render", action = "raise");
                    for session in sessions.iter() {
                        display.raise(session.window)?;
                    }
                    display.flush()?;
                }
            }
        }
    }
}
