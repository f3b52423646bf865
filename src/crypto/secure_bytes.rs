//! Secret byte buffer with automatic zeroing on drop
//!
//! Holds passphrase-derived key material and plaintext private sections.
//! The buffer is:
//! 1. Locked in memory where possible (kept out of swap)
//! 2. Zeroed and unlocked when dropped, on every exit path
//! 3. Never printed by `Debug`

use std::ops::{Deref, DerefMut};
use zeroize::Zeroize;

/// A secure container for sensitive bytes that zeroes itself on drop
pub struct SecureBytes {
    data: Vec<u8>,
    /// Length passed to mlock, zero when not locked
    locked_len: usize,
}

impl SecureBytes {
    /// Take ownership of `data`. The vector must not be grown afterwards,
    /// a reallocation would leave an unwiped copy behind.
    pub fn new(data: Vec<u8>) -> Self {
        let mut secure = Self {
            data,
            locked_len: 0,
        };
        secure.lock_memory();
        secure
    }

    /// Create a zeroed buffer of `len` bytes, to be filled in place
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0u8; len])
    }

    #[cfg(unix)]
    fn lock_memory(&mut self) {
        if self.data.is_empty() {
            return;
        }
        // Best effort: mlock fails without CAP_IPC_LOCK once RLIMIT_MEMLOCK is exhausted
        let rc = unsafe {
            libc::mlock(
                self.data.as_ptr() as *const libc::c_void,
                self.data.len(),
            )
        };
        if rc == 0 {
            self.locked_len = self.data.len();
        }
    }

    #[cfg(not(unix))]
    fn lock_memory(&mut self) {}

    #[cfg(unix)]
    fn unlock_memory(&mut self) {
        if self.locked_len > 0 {
            unsafe {
                libc::munlock(self.data.as_ptr() as *const libc::c_void, self.locked_len);
            }
            self.locked_len = 0;
        }
    }

    #[cfg(not(unix))]
    fn unlock_memory(&mut self) {}

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split into two borrowed halves, e.g. cipher key and IV
    pub fn split_at(&self, mid: usize) -> (&[u8], &[u8]) {
        self.data.split_at(mid)
    }
}

impl Deref for SecureBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for SecureBytes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for SecureBytes {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl Default for SecureBytes {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            locked_len: 0,
        }
    }
}

impl Zeroize for SecureBytes {
    fn zeroize(&mut self) {
        self.data.zeroize();
    }
}

impl Drop for SecureBytes {
    fn drop(&mut self) {
        // Wipe the full allocation before the pages are unlocked
        self.data.as_mut_slice().zeroize();
        self.unlock_memory();
        self.data.zeroize();
    }
}

// Prevent accidental debug printing of secrets
impl std::fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureBytes")
            .field("len", &self.data.len())
            .field("data", &"[REDACTED]")
            .finish()
    }
}
