#![warn(missing_docs)]
//! # veil-auth
//!
//! ## Purpose
//! Resolves the invoking user's password hash and decides, key by key, when
//! the screen may be unlocked.
//!
//! ## Responsibilities
//! - Read the passwd entry and follow the shadow placeholder to the real hash.
//! - Verify candidates through the system `crypt(3)`, whatever scheme the hash
//!   names.
//! - Model the password prompt as an explicit state machine.
//!
//! ## Data flow
//! [`resolve_hash`] reads a [`CredentialStore`] once at startup ->
//! [`self_check`] proves the hash is usable -> [`AuthStateMachine`] consumes
//! keysyms and asks a [`PasswordVerifier`] on accept.
//!
//! ## Ownership and lifetimes
//! The state machine owns its verifier, the [`CredentialHash`] and the
//! password buffer; callers only observe outcomes and the derived visual state.
//!
//! ## Error model
//! Store lookups fail with [`AuthError`] and are fatal to the caller. Hashing
//! errors during an attempt are absorbed by the state machine as a rejection.
//!
//! ## Security and privacy notes
//! Neither the hash nor candidate bytes are ever logged. Hash comparison is
//! constant time. Candidate bytes live only in the wiping password buffer.
//!
//! ## Example
//! ```rust
//! use veil_auth::{PasswordVerifier, SystemCryptVerifier, hash_password};
//!
//! let hash = hash_password(b"hunter2", "$6$saltsalt").unwrap();
//! assert!(SystemCryptVerifier.verify(b"hunter2", &hash).unwrap());
//! assert!(!SystemCryptVerifier.verify(b"hunter2x", &hash).unwrap());
//! ```

mod credential;
mod crypt;
mod machine;

pub use credential::{
    CredentialHash, CredentialSource, CredentialStore, FileCredentialStore, PasswdEntry,
    SystemCredentialStore, resolve_hash,
};
pub use crypt::{PasswordVerifier, SystemCryptVerifier, hash_password, self_check};
pub use machine::{AuthStateMachine, KeyOutcome};

use thiserror::Error;

/// Errors produced by credential resolution and hashing.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No passwd entry exists for the user id.
    #[error("no passwd entry for uid {0}")]
    NoSuchIdentity(u32),
    /// A credential store could not be read.
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),
    /// The resolved hash is empty or a lock marker.
    #[error("no usable password hash for {0}; make sure veil is installed setuid or setgid")]
    UnusableHash(String),
    /// The system `crypt(3)` rejected the hash or its scheme.
    #[error("unsupported password hash scheme: {0}")]
    UnsupportedScheme(String),
    /// Hash or candidate cannot be handed to `crypt(3)`.
    #[error("malformed password hash: {0}")]
    MalformedHash(&'static str),
}
