//! Bounded password buffer with guaranteed wipe.

use zeroize::Zeroize;

/// Maximum number of password bytes accepted.
pub const PASSWORD_CAPACITY: usize = 256;

/// Fixed-capacity buffer for the in-progress candidate password.
///
/// The full backing array is zeroed on [`PasswordBuffer::clear`], when an
/// [`AttemptGuard`] goes out of scope, and on drop.
pub struct PasswordBuffer {
    bytes: [u8; PASSWORD_CAPACITY],
    len: usize,
}

impl PasswordBuffer {
    /// Creates an empty, zeroed buffer.
    pub fn new() -> Self {
        Self {
            bytes: [0; PASSWORD_CAPACITY],
            len: 0,
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends the UTF-8 encoding of `ch`.
    ///
    /// # Returns
    /// `false` (buffer untouched) when the encoded character does not fit.
    pub fn push_char(&mut self, ch: char) -> bool {
        let mut encoded = [0_u8; 4];
        let encoded_len = ch.encode_utf8(&mut encoded).len();
        let fits = self.len + encoded_len <= PASSWORD_CAPACITY;
        if fits {
            self.bytes[self.len..self.len + encoded_len].copy_from_slice(&encoded[..encoded_len]);
            self.len += encoded_len;
        }
        encoded.zeroize();
        fits
    }

    /// Removes the last UTF-8 character and zeroes its bytes.
    ///
    /// # Returns
    /// `false` when the buffer was already empty.
    pub fn pop_char(&mut self) -> bool {
        if self.len == 0 {
            return false;
        }

        loop {
            self.len -= 1;
            let byte = self.bytes[self.len];
            self.bytes[self.len] = 0;
            let is_continuation = byte & 0b1100_0000 == 0b1000_0000;
            if !is_continuation || self.len == 0 {
                break;
            }
        }
        true
    }

    /// Zeroes the whole backing array and empties the buffer.
    pub fn clear(&mut self) {
        self.bytes.zeroize();
        self.len = 0;
    }

    /// Starts a verification attempt over the buffered bytes.
    ///
    /// The returned guard wipes the buffer when dropped, whatever the outcome
    /// of the attempt and whichever path leaves the caller's scope.
    pub fn take_attempt(&mut self) -> AttemptGuard<'_> {
        AttemptGuard { buffer: self }
    }

    /// Returns `true` when empty and every backing byte is zero.
    pub fn is_wiped(&self) -> bool {
        self.len == 0 && self.bytes.iter().all(|byte| *byte == 0)
    }
}

impl Default for PasswordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PasswordBuffer {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for PasswordBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordBuffer")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Scoped view of the buffered candidate during one verification attempt.
pub struct AttemptGuard<'a> {
    buffer: &'a mut PasswordBuffer,
}

impl AttemptGuard<'_> {
    /// Candidate bytes for the verifier.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer.bytes[..self.buffer.len]
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.buffer.clear();
    }
}
