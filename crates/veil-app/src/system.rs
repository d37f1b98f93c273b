//! Process-level hardening around the lock.

use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Command};

use nix::unistd::{Gid, Group, Uid, User};
use thiserror::Error;
use tracing::{error, info};

/// User privileges are dropped to. Set `VEIL_DROP_USER` at build time to change it.
pub const DROP_USER: &str = match option_env!("VEIL_DROP_USER") {
    Some(user) => user,
    None => "nobody",
};

/// Group privileges are dropped to. Set `VEIL_DROP_GROUP` at build time to change it.
pub const DROP_GROUP: &str = match option_env!("VEIL_DROP_GROUP") {
    Some(group) => group,
    None => "nogroup",
};

/// Unprivileged identity the process switches to after opening the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIdentity {
    /// User name as configured.
    pub user: String,
    /// Group name as configured.
    pub group: String,
    /// Resolved user id.
    pub uid: Uid,
    /// Resolved group id.
    pub gid: Gid,
}

/// Process plumbing failures.
#[derive(Debug, Error)]
pub enum SystemError {
    /// Configured user does not exist.
    #[error("no such user: {0}")]
    NoSuchUser(String),
    /// Configured group does not exist.
    #[error("no such group: {0}")]
    NoSuchGroup(String),
    /// The drop identity resolves to the superuser or its group.
    #[error("refusing to drop privileges to {kind} id 0 ({name})")]
    PrivilegedTarget {
        /// `"user"` or `"group"`.
        kind: &'static str,
        /// Name that resolved to id 0.
        name: String,
    },
    /// User or group database lookup failed.
    #[error("identity lookup failed: {0}")]
    Lookup(#[source] nix::Error),
    /// OOM score could not be written for lack of privileges.
    #[error("unable to disable the OOM killer, install veil setuid or setgid: {0}")]
    OomPermission(#[source] io::Error),
    /// OOM score could not be written.
    #[error("unable to disable the OOM killer: {0}")]
    OomAdjust(#[source] io::Error),
    /// A privilege drop syscall failed.
    #[error("{call} failed: {source}")]
    PrivilegeDrop {
        /// Failing call.
        call: &'static str,
        /// Underlying errno.
        #[source]
        source: nix::Error,
    },
}

/// Resolves the build-time [`DROP_USER`] and [`DROP_GROUP`].
pub fn drop_identity() -> Result<DropIdentity, SystemError> {
    resolve_drop_identity(DROP_USER, DROP_GROUP)
}

/// Resolves `user` and `group` to ids, refusing id 0 for either.
///
/// # Errors
/// Returns [`SystemError::NoSuchUser`] or [`SystemError::NoSuchGroup`] when a
/// name is unknown, and [`SystemError::PrivilegedTarget`] for root.
pub fn resolve_drop_identity(user: &str, group: &str) -> Result<DropIdentity, SystemError> {
    let resolved_user = User::from_name(user)
        .map_err(SystemError::Lookup)?
        .ok_or_else(|| SystemError::NoSuchUser(user.to_string()))?;
    let resolved_group = Group::from_name(group)
        .map_err(SystemError::Lookup)?
        .ok_or_else(|| SystemError::NoSuchGroup(group.to_string()))?;

    if resolved_user.uid.is_root() {
        return Err(SystemError::PrivilegedTarget {
            kind: "user",
            name: user.to_string(),
        });
    }
    if resolved_group.gid.as_raw() == 0 {
        return Err(SystemError::PrivilegedTarget {
            kind: "group",
            name: group.to_string(),
        });
    }

    Ok(DropIdentity {
        user: user.to_string(),
        group: group.to_string(),
        uid: resolved_user.uid,
        gid: resolved_group.gid,
    })
}

/// Clears supplementary groups, then switches group and user.
///
/// # Errors
/// Returns [`SystemError::PrivilegeDrop`] naming the first call that failed.
pub fn drop_privileges(identity: &DropIdentity) -> Result<(), SystemError> {
    #[cfg(not(target_vendor = "apple"))]
    nix::unistd::setgroups(&[]).map_err(|source| SystemError::PrivilegeDrop {
        call: "setgroups",
        source,
    })?;
    nix::unistd::setgid(identity.gid).map_err(|source| SystemError::PrivilegeDrop {
        call: "setgid",
        source,
    })?;
    nix::unistd::setuid(identity.uid).map_err(|source| SystemError::PrivilegeDrop {
        call: "setuid",
        source,
    })?;

    info!(stage = "system", action = "privileges_dropped", user = %identity.user, group = %identity.group);
    Ok(())
}

/// Asks the kernel never to pick this process when memory runs out.
///
/// A missing score file is not an error; any other failure is.
pub fn exempt_from_oom_killer() -> Result<(), SystemError> {
    if cfg!(target_os = "linux") {
        write_oom_score(Path::new("/proc/self/oom_score_adj"))
    } else {
        Ok(())
    }
}

/// Writes the minimum OOM score to `path`.
pub fn write_oom_score(path: &Path) -> Result<(), SystemError> {
    let classify = |error: io::Error| {
        if error.kind() == io::ErrorKind::PermissionDenied {
            SystemError::OomPermission(error)
        } else {
            SystemError::OomAdjust(error)
        }
    };

    let mut file = match std::fs::OpenOptions::new().write(true).open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(classify(error)),
    };
    file.write_all(b"-1000").map_err(classify)?;
    file.flush().map_err(classify)?;

    info!(stage = "system", action = "oom_exempt");
    Ok(())
}

/// Starts the post-lock command, if one was given.
///
/// The child runs in its own process group. Spawn failures are logged and
/// swallowed: the screen must stay locked either way.
pub fn spawn_post_lock_command(command: &[String]) -> Option<Child> {
    let (program, args) = command.split_first()?;
    let mut builder = Command::new(program);
    builder.args(args);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt as _;
        builder.process_group(0);
    }

    match builder.spawn() {
        Ok(child) => {
            info!(stage = "system", action = "post_lock_spawned", program = %program, pid = child.id());
            Some(child)
        }
        Err(spawn_error) => {
            error!(stage = "system", action = "post_lock_failed", program = %program, error = %spawn_error);
            None
        }
    }
}
