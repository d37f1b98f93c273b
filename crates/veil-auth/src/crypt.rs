//! Password hashing through the platform `crypt(3)`.
//!
//! Every scheme the system library understands is accepted: yescrypt (`$y$`),
//! bcrypt (`$2b$`), SHA-crypt (`$5$` / `$6$`), MD5-crypt (`$1$`) and whatever
//! else the local libcrypt was built with. A hash the library cannot process
//! comes back as a failure token and is reported as an unsupported scheme.

use std::ffi::{CStr, c_char};

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{AuthError, CredentialHash};

/// Checks a candidate password against a stored hash.
pub trait PasswordVerifier {
    /// Returns whether `candidate` hashes to `hash`.
    ///
    /// # Errors
    /// An error means the primitive itself failed (unknown scheme, malformed
    /// hash), not that the candidate is wrong.
    fn verify(&self, candidate: &[u8], hash: &CredentialHash) -> Result<bool, AuthError>;
}

/// Verifier backed by the system `crypt(3)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCryptVerifier;

impl PasswordVerifier for SystemCryptVerifier {
    fn verify(&self, candidate: &[u8], hash: &CredentialHash) -> Result<bool, AuthError> {
        let setting = c_setting(hash.as_str())?;
        // crypt(3) stops at the first NUL, so such a candidate could only
        // match a truncated password.
        let Some(key) = c_key(candidate) else {
            return Ok(false);
        };
        let computed = crypt(&key, &setting, hash.as_str())?;
        Ok(bool::from(computed.as_slice().ct_eq(hash.as_str().as_bytes())))
    }
}

/// Proves at startup that `hash` can be verified at all.
///
/// # Errors
/// Propagates the verifier error; the caller must refuse to lock.
pub fn self_check<V>(verifier: &V, hash: &CredentialHash) -> Result<(), AuthError>
where
    V: PasswordVerifier + ?Sized,
{
    verifier.verify(b"", hash).map(|_| ())
}

/// Hashes `key` with the scheme and salt named by `setting`, e.g. `$6$salt`
/// or `$y$j9T$salt`.
///
/// # Errors
/// Fails when the setting contains a NUL byte or the system library rejects
/// it.
pub fn hash_password(key: &[u8], setting: &str) -> Result<CredentialHash, AuthError> {
    let c_setting = c_setting(setting)?;
    let key = c_key(key).ok_or(AuthError::MalformedHash("password contains a NUL byte"))?;
    let computed = crypt(&key, &c_setting, setting)?;
    String::from_utf8(computed.to_vec())
        .map(CredentialHash::new)
        .map_err(|_| AuthError::MalformedHash("crypt output is not UTF-8"))
}

fn c_setting(setting: &str) -> Result<Vec<u8>, AuthError> {
    if setting.as_bytes().contains(&0) {
        return Err(AuthError::MalformedHash("hash contains a NUL byte"));
    }
    let mut bytes = Vec::with_capacity(setting.len() + 1);
    bytes.extend_from_slice(setting.as_bytes());
    bytes.push(0);
    Ok(bytes)
}

fn c_key(key: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if key.contains(&0) {
        return None;
    }
    let mut bytes = Zeroizing::new(Vec::with_capacity(key.len() + 1));
    bytes.extend_from_slice(key);
    bytes.push(0);
    Some(bytes)
}

/// `$id$` prefix of a hash for error messages, never the digest.
fn scheme_label(setting: &str) -> String {
    match setting.strip_prefix('$').and_then(|rest| rest.split_once('$')) {
        Some((id, _)) => format!("${id}$"),
        None => "traditional DES".to_string(),
    }
}

/// Copies the library result out, mapping NULL and `*` failure tokens.
///
/// # Safety
/// `result` must be NULL or point to a NUL-terminated string that stays valid
/// for the duration of the call.
unsafe fn take_result(result: *const c_char, setting: &str) -> Result<Zeroizing<Vec<u8>>, AuthError> {
    if result.is_null() {
        return Err(AuthError::UnsupportedScheme(scheme_label(setting)));
    }
    // Safety: non-null and NUL-terminated per the caller contract.
    let bytes = unsafe { CStr::from_ptr(result) }.to_bytes();
    if bytes.is_empty() || bytes[0] == b'*' {
        return Err(AuthError::UnsupportedScheme(scheme_label(setting)));
    }
    Ok(Zeroizing::new(bytes.to_vec()))
}

#[cfg(target_os = "linux")]
mod ffi {
    use std::ffi::{c_char, c_void};

    /// Larger than both glibc's and libxcrypt's `struct crypt_data`.
    pub const CRYPT_DATA_WORDS: usize = 32 * 1024;

    #[link(name = "crypt")]
    unsafe extern "C" {
        pub fn crypt_r(phrase: *const c_char, setting: *const c_char, data: *mut c_void) -> *mut c_char;
    }
}

#[cfg(target_os = "linux")]
fn crypt(key: &[u8], setting: &[u8], label: &str) -> Result<Zeroizing<Vec<u8>>, AuthError> {
    // Zero-filled scratch space doubles as the `initialized = 0` marker.
    let mut data = Zeroizing::new(vec![0_u64; ffi::CRYPT_DATA_WORDS]);
    // Safety: both strings are NUL-terminated, `data` is writable, 8-byte
    // aligned and larger than `struct crypt_data`; the result points into
    // `data`, which outlives `take_result`.
    unsafe {
        let result = ffi::crypt_r(
            key.as_ptr().cast::<c_char>(),
            setting.as_ptr().cast::<c_char>(),
            data.as_mut_ptr().cast(),
        );
        take_result(result, label)
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn crypt(key: &[u8], setting: &[u8], label: &str) -> Result<Zeroizing<Vec<u8>>, AuthError> {
    use std::sync::{Mutex, PoisonError};

    unsafe extern "C" {
        fn crypt(phrase: *const c_char, setting: *const c_char) -> *mut c_char;
    }

    // The non-reentrant variant returns a static buffer.
    static CRYPT_LOCK: Mutex<()> = Mutex::new(());
    let _guard = CRYPT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    // Safety: both strings are NUL-terminated and the static result buffer is
    // copied out before the lock is released.
    unsafe {
        let result = crypt(key.as_ptr().cast::<c_char>(), setting.as_ptr().cast::<c_char>());
        take_result(result, label)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the crypt(3) binding against reference hashes.

    use super::*;

    #[test]
    fn sha512_reference_vector() {
        let hash = hash_password(b"Hello world!", "$6$saltstring").expect("hash should compute");
        assert_eq!(
            hash.as_str(),
            "$6$saltstring$svn8UoSVapNtMuq1ukKS4tPQd8iKwSMHWjl/O817G3uBnIFNjnQJuesI68u4OTLiBFdcbYEdFCoEOfaS35inz1"
        );
    }

    #[test]
    fn bcrypt_reference_vector() {
        let hash = CredentialHash::new("$2b$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW");
        assert!(SystemCryptVerifier.verify(b"U*U", &hash).expect("verify should run"));
        assert!(!SystemCryptVerifier.verify(b"U*V", &hash).expect("verify should run"));
        self_check(&SystemCryptVerifier, &hash).expect("bcrypt should be verifiable");
    }

    #[test]
    fn yescrypt_hashes_verify() {
        let hash = hash_password(b"correct horse", "$y$j9T$F5Jx5fExrKuPp53xLKQ..1")
            .expect("hash should compute");
        assert!(hash.as_str().starts_with("$y$j9T$F5Jx5fExrKuPp53xLKQ..1$"));

        self_check(&SystemCryptVerifier, &hash).expect("yescrypt should be verifiable");
        assert!(SystemCryptVerifier.verify(b"correct horse", &hash).expect("verify should run"));
        assert!(!SystemCryptVerifier.verify(b"correct horsE", &hash).expect("verify should run"));
    }

    #[test]
    fn unknown_scheme_is_an_internal_error() {
        let hash = CredentialHash::new("$unknown$abc$def");
        match SystemCryptVerifier.verify(b"pw", &hash) {
            Err(AuthError::UnsupportedScheme(label)) => assert_eq!(label, "$unknown$"),
            other => panic!("expected unsupported scheme, got {other:?}"),
        }
        assert!(self_check(&SystemCryptVerifier, &hash).is_err());
    }

    #[test]
    fn nul_bytes_never_match() {
        let hash = hash_password(b"pw", "$6$abc").expect("hash should compute");
        assert!(!SystemCryptVerifier.verify(b"pw\0tail", &hash).expect("verify should run"));
        assert!(matches!(
            SystemCryptVerifier.verify(b"pw", &CredentialHash::new("$6$a\0bc")),
            Err(AuthError::MalformedHash(_))
        ));
    }
}
