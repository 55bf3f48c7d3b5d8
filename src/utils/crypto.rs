//! # Session Cipher
//!
//! AES-256 in CTR mode, one independent instance per traffic direction.
//!
//! The 16-byte counter block is seeded with the 12-byte per-session nonce
//! and a 32-bit big-endian counter starting at 1, not 0, to avoid keystream
//! reuse with any nonce-derived value at counter 0 used elsewhere.

use crate::error::{BleError, Result};
use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr32BE;
use rand_core::{OsRng, RngCore};

type Aes256Ctr = Ctr32BE<Aes256>;

/// Session key length in bytes (SHA-256 output of the SRP exchange).
pub const SESSION_KEY_LEN: usize = 32;

/// Per-direction nonce length in bytes (96-bit).
pub const NONCE_LEN: usize = 12;

/// Initial value of the 32-bit counter field.
const COUNTER_INITIAL: u32 = 1;

/// One direction of the session's keystream.
///
/// CTR mode is symmetric, so the same operation both encrypts and decrypts;
/// the direction split exists because each side of the link advances its own
/// keystream independently.
pub struct SessionCipher {
    inner: Aes256Ctr,
}

impl SessionCipher {
    /// Create a cipher from the derived session key and a direction nonce.
    ///
    /// # Errors
    /// Returns `BleError::InvalidKeyLength` if the key is not 32 bytes.
    pub fn new(key: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<Self> {
        if key.len() != SESSION_KEY_LEN {
            return Err(BleError::InvalidKeyLength(key.len()));
        }

        let mut iv = [0u8; 16];
        iv[..NONCE_LEN].copy_from_slice(nonce);
        iv[NONCE_LEN..].copy_from_slice(&COUNTER_INITIAL.to_be_bytes());

        let inner = Aes256Ctr::new_from_slices(key, &iv)
            .map_err(|_| BleError::InvalidKeyLength(key.len()))?;
        Ok(Self { inner })
    }

    /// Apply the keystream to `data`, advancing this direction's counter.
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.inner.apply_keystream(&mut out);
        out
    }
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never expose keystream state
        f.debug_struct("SessionCipher").finish_non_exhaustive()
    }
}

/// Generate a cryptographically secure random 96-bit nonce.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}
