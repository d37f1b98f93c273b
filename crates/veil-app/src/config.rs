//! Runtime configuration loaded from JSON and the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use veil_ui::OverlayStyle;

use crate::grab::GrabPolicy;

/// Explicit config file path.
pub const CONFIG_ENV: &str = "VEIL_CONFIG";

/// Locker settings. Every field has a default.
///
/// The identity privileges are dropped to is not part of this file; it is
/// fixed at build time (see [`crate::system::DROP_USER`]).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockConfig {
    /// An empty buffer shows the rejected wash.
    pub fail_on_clear: bool,
    /// Bell volume on a failed attempt, `-100..=100`.
    pub bell_percent: i8,
    /// Text drawn inside the ring.
    pub label: String,
    /// X core font used for the label.
    pub font: String,
    /// Grab attempts per output.
    pub grab_attempts: u32,
    /// Pause between grab attempts.
    pub grab_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            fail_on_clear: false,
            bell_percent: 100,
            label: "Locked".to_string(),
            font: "fixed".to_string(),
            grab_attempts: 6,
            grab_interval_ms: 100,
        }
    }
}

impl LockConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed JSON or unknown fields.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Loads the file at `path`; a missing file yields defaults.
    ///
    /// While running with elevated privileges the file must also be readable
    /// by the invoking user.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match readable_by_invoker(path).and_then(|()| std::fs::read_to_string(path)) {
            Ok(raw) => {
                info!(stage = "config", action = "loaded", path = %path.display());
                Self::from_json(&raw)
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(stage = "config", action = "defaults", path = %path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Loads and validates the file at the standard location.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match default_config_path() {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the locker cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grab_attempts == 0 {
            return Err(ConfigError::Invalid("grab_attempts must be at least 1"));
        }
        if !(-100..=100).contains(&self.bell_percent) {
            return Err(ConfigError::Invalid("bell_percent must be within -100..=100"));
        }
        if self.font.is_empty() {
            return Err(ConfigError::Invalid("font must not be empty"));
        }
        Ok(())
    }

    /// Grab retry budget.
    pub fn grab_policy(&self) -> GrabPolicy {
        GrabPolicy {
            attempts: self.grab_attempts,
            interval: Duration::from_millis(self.grab_interval_ms),
        }
    }

    /// Overlay style with the configured label.
    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            label: self.label.clone(),
            ..OverlayStyle::default()
        }
    }
}

/// Checks `path` against the real user id when the process is setuid or setgid.
#[cfg(unix)]
fn readable_by_invoker(path: &Path) -> std::io::Result<()> {
    use nix::unistd::{AccessFlags, access, getegid, geteuid, getgid, getuid};

    if getuid() == geteuid() && getgid() == getegid() {
        return Ok(());
    }
    access(path, AccessFlags::R_OK).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn readable_by_invoker(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// `$VEIL_CONFIG`, else the XDG config directory, else `~/.config`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(explicit));
    }

    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .filter(|value| !value.is_empty())
                .map(|home| PathBuf::from(home).join(".config"))
        })?;
    Some(base.join("veil").join("config.json"))
}

/// Configuration failures. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// JSON was malformed.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
