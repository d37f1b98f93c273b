//! Windowing capability the lock lifecycle is written against.
//!
//! [`crate::x11::X11DisplayServer`] is the production implementation; tests
//! drive the same lifecycle through a scripted fake.

use thiserror::Error;
use veil_core::keysym::Keysym;
use veil_core::{Frame, OutputRegion};
use veil_ui::LabelRun;

/// One display output detected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputInfo {
    /// Enumeration index, stable for the whole run.
    pub index: usize,
    /// Area of the captured desktop the output shows.
    pub region: OutputRegion,
}

/// Reason the server gave for refusing a grab outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabDenial {
    /// Request timestamp was older than the last grab.
    InvalidTime,
    /// Grab window is not viewable.
    NotViewable,
    /// Device is frozen by another client's grab.
    Frozen,
}

/// Result of one pointer or keyboard grab request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabStatus {
    /// Ownership obtained.
    Success,
    /// Another client holds it; retrying may succeed.
    AlreadyGrabbed,
    /// Definitive refusal; retrying will not help.
    Denied(GrabDenial),
}

/// Event delivered to the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent<W> {
    /// Key press already translated to a keysym.
    Key(Keysym),
    /// An output bound to `window` changed size.
    OutputChanged {
        /// Window the notification was selected on.
        window: W,
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// Anything else, such as another client mapping a window.
    Other,
}

/// Operations the locker needs from a display server.
pub trait DisplayServer {
    /// Handle of a covering window.
    type Window: Copy + Eq + std::fmt::Debug;

    /// Lists outputs in enumeration order.
    fn outputs(&self) -> Result<Vec<OutputInfo>, DisplayError>;

    /// Creates an unmapped override-redirect window covering `output`, with an
    /// invisible cursor and a backing surface.
    fn create_covering_window(&mut self, output: &OutputInfo) -> Result<Self::Window, DisplayError>;

    /// Requests exclusive pointer ownership for `output`.
    fn grab_pointer(&mut self, output: &OutputInfo, window: Self::Window) -> Result<GrabStatus, DisplayError>;

    /// Requests exclusive keyboard ownership for `output`.
    fn grab_keyboard(&mut self, output: &OutputInfo, window: Self::Window) -> Result<GrabStatus, DisplayError>;

    /// Maps `window` on top of the stacking order.
    fn map_raised(&mut self, window: Self::Window) -> Result<(), DisplayError>;

    /// Subscribes `window` to output reconfiguration notifications.
    ///
    /// Returns `false` when the server lacks the extension.
    fn watch_output_changes(&mut self, window: Self::Window) -> Result<bool, DisplayError>;

    /// Selects substructure notifications on the output's root window.
    fn watch_substructure(&mut self, output: &OutputInfo) -> Result<(), DisplayError>;

    /// Resizes `window` and its backing surface.
    fn resize(&mut self, window: Self::Window, width: u32, height: u32) -> Result<(), DisplayError>;

    /// Uploads a painted surface, draws `labels` over it and refreshes `window`.
    fn present(&mut self, window: Self::Window, surface: &Frame, labels: &[LabelRun]) -> Result<(), DisplayError>;

    /// Raises `window` above every other window.
    fn raise(&mut self, window: Self::Window) -> Result<(), DisplayError>;

    /// Rings the bell at `percent` volume.
    fn bell(&mut self, percent: i8) -> Result<(), DisplayError>;

    /// Sends buffered requests.
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Waits until the server has processed every request sent so far.
    fn sync(&mut self) -> Result<(), DisplayError>;

    /// Blocks until the next event arrives.
    fn next_event(&mut self) -> Result<LockEvent<Self::Window>, DisplayError>;
}

/// Display server failures.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Connection could not be opened.
    #[error("cannot open display: {0}")]
    Connect(String),
    /// Established connection failed.
    #[error("display connection failed: {0}")]
    Connection(String),
    /// Server returned an error for a request.
    #[error("display request failed: {0}")]
    Request(String),
    /// Window handle is not one this backend created.
    #[error("unknown window {0}")]
    UnknownWindow(String),
    /// Keyboard layout could not be loaded from the server.
    #[error("keyboard map unavailable: {0}")]
    Keyboard(String),
    /// Surface does not match what the server can display.
    #[error("cannot present surface: {0}")]
    Surface(String),
}
