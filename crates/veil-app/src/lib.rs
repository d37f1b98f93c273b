#![warn(missing_docs)]
//! # veil-app
//!
//! ## Purpose
//! Orchestrates credential checks, desktop capture, input grabs, overlay
//! rendering and the authentication loop for the `veil` screen locker.
//!
//! ## Responsibilities
//! - Parse the command line and load [`config::LockConfig`].
//! - Harden the process: OOM exemption and privilege drop.
//! - Lock every output or none, with bounded grab retries.
//! - Run the single-threaded event loop until the password matches.
//! - Follow output reconfiguration without exposing the desktop.
//!
//! ## Data flow
//! CLI + config -> identity and credential resolution -> display connection ->
//! desktop capture -> per-output [`session::lock_outputs`] -> post-lock command
//! -> [`render::RenderLoop`] -> exit.
//!
//! ## Ownership and lifetimes
//! The display backend, the session set, the state machine and the renderer
//! are owned by [`runtime::run_lock`] and lent to the loop for its whole run.
//! Nothing is shared across threads.
//!
//! ## Error model
//! Every setup failure is an [`AppError`] and ends the process with exit code
//! 1 before the loop starts. Inside the loop only display connection errors
//! propagate; failed attempts are absorbed by the state machine.
//!
//! ## Security and privacy notes
//! - A partial lock is never left running: any output failure aborts.
//! - The credential hash is checked before the display is touched.
//! - Logs never contain password bytes, the hash or captured pixels.

pub mod cli;
pub mod config;
pub mod display;
pub mod grab;
#[cfg(unix)]
pub mod keyboard;
pub mod output;
pub mod render;
pub mod runtime;
pub mod session;
pub mod system;
#[cfg(unix)]
pub mod x11;

pub use runtime::{exit_code, lock_and_wait, run_lock};

use thiserror::Error;
use veil_auth::AuthError;
use veil_capture::CaptureError;
use veil_core::CoreError;

use crate::config::ConfigError;
use crate::display::DisplayError;
use crate::session::LockError;
use crate::system::SystemError;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("VEIL_VERSION");

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "VEIL_LOG";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Process plumbing failed.
    #[error("system error: {0}")]
    System(#[from] SystemError),
    /// Credential resolution or self-check failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    /// Display server failure.
    #[error("display error: {0}")]
    Display(#[from] DisplayError),
    /// Desktop capture failed.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    /// An output could not be locked.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
    /// Frame construction failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
