//! Credential store access and hash resolution.

use std::fs;
use std::path::{Path, PathBuf};

use nix::unistd::{Uid, User};
use tracing::debug;
use zeroize::Zeroize;

use crate::AuthError;

const DEFAULT_PASSWD_PATH: &str = "/etc/passwd";
const DEFAULT_SHADOW_PATH: &str = "/etc/shadow";

/// Stored one-way password representation, e.g. `$6$salt$digest`.
///
/// Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Wraps a stored hash string.
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Raw hash string for the hashing primitive.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Scheme identifier between the first two `$`, e.g. `"6"`.
    pub fn scheme(&self) -> Option<&str> {
        self.0.strip_prefix('$')?.split('$').next()
    }
}

impl std::fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialHash(<redacted>)")
    }
}

impl Drop for CredentialHash {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Where the usable hash lives, chosen from the primary passwd field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The passwd field is the hash itself.
    Primary,
    /// The passwd field is `x`; the hash is in the shadow store.
    Shadow,
    /// The passwd field is `*`; the hash is behind a platform shadow API.
    PlatformShadow,
}

impl CredentialSource {
    /// Selects the source by inspecting the primary passwd field.
    pub fn for_primary_field(field: &str) -> Self {
        match field {
            "x" => Self::Shadow,
            "*" => Self::PlatformShadow,
            _ => Self::Primary,
        }
    }
}

/// One passwd record.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    /// Login name.
    pub name: String,
    /// Numeric user id.
    pub uid: u32,
    /// Primary password field.
    pub passwd: String,
}

impl std::fmt::Debug for PasswdEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswdEntry")
            .field("name", &self.name)
            .field("uid", &self.uid)
            .finish_non_exhaustive()
    }
}

/// Read access to the system's password databases.
pub trait CredentialStore {
    /// Returns the passwd record for `uid`.
    fn passwd_entry(&self, uid: u32) -> Result<PasswdEntry, AuthError>;

    /// Returns the shadow hash for login `name`.
    fn shadow_hash(&self, name: &str) -> Result<String, AuthError>;

    /// Returns the hash from a platform-specific shadow lookup.
    fn platform_shadow_hash(&self, uid: u32) -> Result<String, AuthError> {
        Err(AuthError::StoreUnavailable(format!(
            "cannot retrieve shadow entry for uid {uid}: no platform shadow lookup on this system"
        )))
    }
}

/// Store backed by NSS (`getpwuid`) and the shadow file.
#[derive(Debug, Clone)]
pub struct SystemCredentialStore {
    shadow_path: PathBuf,
}

impl SystemCredentialStore {
    /// Creates a store reading shadow entries from `shadow_path`.
    pub fn with_shadow_path(shadow_path: impl Into<PathBuf>) -> Self {
        Self {
            shadow_path: shadow_path.into(),
        }
    }
}

impl Default for SystemCredentialStore {
    fn default() -> Self {
        Self::with_shadow_path(DEFAULT_SHADOW_PATH)
    }
}

impl CredentialStore for SystemCredentialStore {
    fn passwd_entry(&self, uid: u32) -> Result<PasswdEntry, AuthError> {
        let user = User::from_uid(Uid::from_raw(uid))
            .map_err(|error| AuthError::StoreUnavailable(format!("getpwuid: {error}")))?
            .ok_or(AuthError::NoSuchIdentity(uid))?;

        Ok(PasswdEntry {
            name: user.name.clone(),
            uid,
            passwd: user.passwd.to_string_lossy().into_owned(),
        })
    }

    fn shadow_hash(&self, name: &str) -> Result<String, AuthError> {
        read_shadow_hash(&self.shadow_path, name)
    }
}

/// Store reading both databases from flat files.
///
/// Useful for alternate roots and for tests; it does not consult NSS.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    passwd_path: PathBuf,
    shadow_path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store over explicit passwd and shadow files.
    pub fn new(passwd_path: impl Into<PathBuf>, shadow_path: impl Into<PathBuf>) -> Self {
        Self {
            passwd_path: passwd_path.into(),
            shadow_path: shadow_path.into(),
        }
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWD_PATH, DEFAULT_SHADOW_PATH)
    }
}

impl CredentialStore for FileCredentialStore {
    fn passwd_entry(&self, uid: u32) -> Result<PasswdEntry, AuthError> {
        let contents = read_store(&self.passwd_path)?;
        contents
            .lines()
            .filter_map(parse_passwd_line)
            .find(|entry| entry.uid == uid)
            .ok_or(AuthError::NoSuchIdentity(uid))
    }

    fn shadow_hash(&self, name: &str) -> Result<String, AuthError> {
        read_shadow_hash(&self.shadow_path, name)
    }
}

/// Resolves the usable hash for `uid`, following the shadow placeholder.
///
/// # Errors
/// Returns [`AuthError::NoSuchIdentity`] or [`AuthError::StoreUnavailable`]
/// when a lookup fails, and [`AuthError::UnusableHash`] when the final field is
/// empty or a lock marker. All of these must stop the locker before it locks.
pub fn resolve_hash<S>(store: &S, uid: u32) -> Result<CredentialHash, AuthError>
where
    S: CredentialStore + ?Sized,
{
    let entry = store.passwd_entry(uid)?;
    let source = CredentialSource::for_primary_field(&entry.passwd);
    debug!(stage = "auth", action = "resolve_hash", user = %entry.name, source = ?source);

    let hash = match source {
        CredentialSource::Primary => entry.passwd.clone(),
        CredentialSource::Shadow => store.shadow_hash(&entry.name)?,
        CredentialSource::PlatformShadow => store.platform_shadow_hash(uid)?,
    };

    if !is_usable(&hash) {
        return Err(AuthError::UnusableHash(entry.name.clone()));
    }

    Ok(CredentialHash::new(hash))
}

fn is_usable(hash: &str) -> bool {
    !hash.is_empty() && !hash.starts_with('!') && !hash.starts_with('*')
}

fn read_store(path: &Path) -> Result<String, AuthError> {
    fs::read_to_string(path).map_err(|error| {
        AuthError::StoreUnavailable(format!("{}: {error}", path.display()))
    })
}

fn read_shadow_hash(path: &Path, name: &str) -> Result<String, AuthError> {
    let mut contents = read_store(path)?;
    let found = contents.lines().find_map(|line| {
        let mut fields = line.split(':');
        (fields.next() == Some(name)).then(|| fields.next().unwrap_or_default().to_string())
    });
    // Other users' hashes were read too.
    contents.zeroize();

    found.ok_or_else(|| {
        AuthError::StoreUnavailable(format!(
            "cannot retrieve shadow entry for {name}; make sure veil is installed setuid or setgid"
        ))
    })
}

fn parse_passwd_line(line: &str) -> Option<PasswdEntry> {
    let mut fields = line.split(':');
    let name = fields.next()?;
    let passwd = fields.next()?;
    let uid = fields.next()?.parse().ok()?;
    Some(PasswdEntry {
        name: name.to_string(),
        uid,
        passwd: passwd.to_string(),
    })
}
