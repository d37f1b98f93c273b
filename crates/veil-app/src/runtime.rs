//! Top-level lock sequence.

use rand::Rng;
use tracing::info;
use veil_auth::{AuthStateMachine, PasswordVerifier};
use veil_core::Frame;

use crate::AppError;
use crate::cli::Cli;
use crate::config::LockConfig;
use crate::display::DisplayServer;
use crate::grab::Sleeper;
use crate::render::{OverlayRenderer, RenderLoop};
use crate::session::lock_outputs;

/// Locks every output, then authenticates until unlock.
///
/// `on_locked` runs once all outputs are locked and the server has caught up,
/// before the first repaint.
///
/// # Errors
/// Returns the first setup failure; no repaint happens in that case.
pub fn run_lock<D, V, S, R, F>(
    display: &mut D,
    desktop: &Frame,
    machine: &mut AuthStateMachine<V>,
    config: &LockConfig,
    sleeper: &mut S,
    mut rng: R,
    on_locked: F,
) -> Result<(), AppError>
where
    D: DisplayServer + ?Sized,
    V: PasswordVerifier,
    S: Sleeper + ?Sized,
    R: Rng,
    F: FnOnce(),
{
    let mut sessions = lock_outputs(display, desktop, config.grab_policy(), sleeper, &mut rng)?;
    display.sync()?;
    info!(stage = "lock", action = "all_locked", outputs = sessions.len());
    on_locked();

    let mut renderer = OverlayRenderer::new(config.overlay_style(), rng);
    RenderLoop::new(display, &mut sessions, machine, &mut renderer, config.bell_percent).run()
}

/// Runs the full locker against the X server named by `$DISPLAY`.
///
/// Order matters: identity lookups and the OOM score need the initial
/// privileges, the hash is verified before any output is touched, and
/// privileges are dropped right after the display is opened.
#[cfg(unix)]
pub fn lock_and_wait(cli: &Cli, config: &LockConfig) -> Result<(), AppError> {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use veil_auth::{SystemCryptVerifier, SystemCredentialStore, resolve_hash, self_check};
    use veil_capture::{CaptureBackend, X11CaptureBackend};

    use crate::grab::ThreadSleeper;
    use crate::system::{drop_identity, drop_privileges, exempt_from_oom_killer, spawn_post_lock_command};
    use crate::x11::X11DisplayServer;

    let identity = drop_identity()?;
    exempt_from_oom_killer()?;

    let hash = resolve_hash(&SystemCredentialStore::default(), nix::unistd::getuid().as_raw())?;
    self_check(&SystemCryptVerifier, &hash)?;

    let mut display = X11DisplayServer::connect(&config.font)?;
    drop_privileges(&identity)?;

    let desktop = X11CaptureBackend::new(display.connection(), display.default_screen()).capture_desktop()?;
    let mut machine = AuthStateMachine::new(SystemCryptVerifier, hash).with_fail_on_clear(config.fail_on_clear);

    run_lock(
        &mut display,
        &desktop,
        &mut machine,
        config,
        &mut ThreadSleeper,
        StdRng::from_os_rng(),
        || {
            spawn_post_lock_command(&cli.command);
        },
    )
}

/// X11 is the only supported display server.
#[cfg(not(unix))]
pub fn lock_and_wait(_cli: &Cli, _config: &LockConfig) -> Result<(), AppError> {
    Err(crate::display::DisplayError::Connect("X11 requires a Unix target".to_string()).into())
}

/// Maps a run result to the process exit status.
pub fn exit_code(result: &Result<(), AppError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}
