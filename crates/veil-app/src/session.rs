//! Per-output lock lifecycle.

use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};
use veil_capture::{CaptureError, crop_for_output};
use veil_core::Frame;
use veil_scramble::scramble_columns;

use crate::display::{DisplayError, DisplayServer, OutputInfo};
use crate::grab::{GrabError, GrabPolicy, Sleeper, acquire_input};

/// Lock state of one output.
#[derive(Debug, Clone)]
pub struct LockSession<W> {
    /// Output enumeration index.
    pub index: usize,
    /// Covering window.
    pub window: W,
    /// Current output width.
    pub width: u32,
    /// Current output height.
    pub height: u32,
    /// Scrambled capture drawn beneath the overlay.
    pub backdrop: Frame,
}

/// Every locked output, in enumeration order.
///
/// Membership is fixed once [`lock_outputs`] returns; only geometry changes.
#[derive(Debug, Clone)]
pub struct LockSessionSet<W> {
    sessions: Vec<LockSession<W>>,
}

impl<W: Copy + Eq> LockSessionSet<W> {
    /// Number of locked outputs.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` when no output is locked.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &LockSession<W>> {
        self.sessions.iter()
    }

    /// Finds the session covered by `window`.
    pub fn find(&self, window: W) -> Option<&LockSession<W>> {
        self.sessions.iter().find(|session| session.window == window)
    }

    /// Records new geometry for the session covered by `window`.
    pub fn set_geometry(&mut self, window: W, width: u32, height: u32) -> Option<&LockSession<W>> {
        let session = self.sessions.iter_mut().find(|session| session.window == window)?;
        session.width = width;
        session.height = height;
        Some(session)
    }
}

/// Lock setup failures.
#[derive(Debug, Error)]
pub enum LockError {
    /// Input could not be grabbed; earlier outputs stay locked until exit.
    #[error("{source} ({locked} outputs locked before the failure)")]
    Grab {
        /// Outputs fully locked before this one.
        locked: usize,
        /// Grab failure.
        #[source]
        source: GrabError,
    },
    /// Backdrop could not be built.
    #[error(transparent)]
    Backdrop(#[from] CaptureError),
    /// Display request failed.
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Crops the desktop capture to `output` and scrambles it.
pub fn capture_and_obscure<R>(desktop: &Frame, output: &OutputInfo, rng: &mut R) -> Result<Frame, CaptureError>
where
    R: Rng + ?Sized,
{
    let cropped = crop_for_output(desktop, output.region)?;
    Ok(scramble_columns(&cropped, rng))
}

/// Locks every output in enumeration order.
///
/// The first failure stops the sequence; later outputs are never attempted
/// and no partially built set is returned.
pub fn lock_outputs<D, S, R>(
    display: &mut D,
    desktop: &Frame,
    policy: GrabPolicy,
    sleeper: &mut S,
    rng: &mut R,
) -> Result<LockSessionSet<D::Window>, LockError>
where
    D: DisplayServer + ?Sized,
    S: Sleeper + ?Sized,
    R: Rng + ?Sized,
{
    let outputs = display.outputs()?;
    let mut sessions = Vec::with_capacity(outputs.len());

    for output in &outputs {
        let backdrop = capture_and_obscure(desktop, output, rng)?;
        let window = display.create_covering_window(output)?;

        acquire_input(display, output, window, policy, sleeper).map_err(|source| LockError::Grab {
            locked: sessions.len(),
            source,
        })?;

        display.map_raised(window)?;
        if !display.watch_output_changes(window)? {
            warn!(stage = "lock", action = "no_output_events", output = output.index);
        }
        display.watch_substructure(output)?;

        info!(stage = "lock", action = "locked", output = output.index);
        sessions.push(LockSession {
            index: output.index,
            window,
            width: output.region.width,
            height: output.region.height,
            backdrop,
        });
    }

    Ok(LockSessionSet { sessions })
}
