#![warn(missing_docs)]
//! # veil binary
//!
//! Screen locker entry point.

use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;
use veil_app::cli::{CliAction, USAGE, parse_args};
use veil_app::config::LockConfig;
use veil_app::{AppError, LOG_ENV, app_version, exit_code, lock_and_wait};

/// CLI entry point.
fn main() -> ExitCode {
    init_logging();

    let cli = match parse_args(std::env::args_os()) {
        CliAction::PrintVersion => {
            eprintln!("veil-{}", app_version());
            return ExitCode::SUCCESS;
        }
        CliAction::Usage => {
            eprintln!("{USAGE}");
            return ExitCode::from(1);
        }
        CliAction::Lock(cli) => cli,
    };

    let result = LockConfig::load()
        .map_err(AppError::from)
        .and_then(|config| lock_and_wait(&cli, &config));
    if let Err(error) = &result {
        error!(stage = "app", action = "fatal", %error);
    }
    ExitCode::from(exit_code(&result))
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
