//! # Password Verifier Store
//!
//! Long-term authentication material: a short random salt and the SRP
//! verification value derived from it. The plaintext password is never
//! stored; the verifier is a one-way password-hash-to-exponent transform
//! over the 1024-bit group with SHA-256.
//!
//! Credentials are produced once when the password is set or changed and
//! consumed once per handshake. One device, one shared secret; they are not
//! per-peer.

use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use srp::client::SrpClient;
use srp::groups::G_1024;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Fixed username baked into the authentication exchange.
pub const API_USERNAME: &[u8] = b"apiservice";

/// Salt length in bytes.
pub const SALT_LEN: usize = 4;

/// Salted verification key for the SRP exchange.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VerifierCredentials {
    salt: [u8; SALT_LEN],
    verifier: Vec<u8>,
}

impl VerifierCredentials {
    /// Derive fresh credentials from a password with a random salt.
    pub fn derive(password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self::derive_with_salt(password, salt)
    }

    /// Derive credentials with a caller-provided salt.
    pub fn derive_with_salt(password: &str, salt: [u8; SALT_LEN]) -> Self {
        let client = SrpClient::<Sha256>::new(&G_1024);
        let verifier = client.compute_verifier(API_USERNAME, password.as_bytes(), &salt);
        Self { salt, verifier }
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn verifier(&self) -> &[u8] {
        &self.verifier
    }
}

impl std::fmt::Debug for VerifierCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the verifier is password-equivalent for offline attack; keep it out of logs
        f.debug_struct("VerifierCredentials")
            .field("salt", &self.salt)
            .finish_non_exhaustive()
    }
}
