//! # Session State Machine
//!
//! Per-connection authentication and encryption context, driven by the
//! 4-phase SRP-6a exchange.
//!
//! State path: `Idle → AwaitingProof → Authenticated` on success,
//! `→ Failed` on a bad proof. No retries within this layer: a failed phase
//! terminates the session and the peer must reconnect to restart from
//! `Idle`.
//!
//! The cipher pair is created only in phase 3, after the client proof has
//! verified, and the session flips to `Authenticated` only once both
//! directions are initialized. Nothing is ever encrypted or decrypted
//! before that point.

use crate::error::{BleError, Result};
use crate::protocol::credentials::VerifierCredentials;
use crate::protocol::srp::{SrpErrorCode, SrpPhase, EPHEMERAL_LEN, PHASE_UNKNOWN, PROOF_LEN};
use crate::utils::crypto::{self, SessionCipher, NONCE_LEN};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use srp::groups::G_1024;
use srp::server::{SrpServer, SrpServerVerifier};
use tracing::{debug, instrument, warn};
use zeroize::Zeroize;

/// Server private ephemeral length in bytes.
const EPHEMERAL_SECRET_LEN: usize = 64;

/// Handshake progress for one connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No exchange in progress.
    Idle,
    /// Phase 2 sent; waiting for the client proof.
    AwaitingProof,
    /// Phase 4 sent; both session ciphers are live.
    Authenticated,
    /// Terminal failure; the peer must reconnect.
    Failed,
}

/// Authentication/encryption context for one connected peer.
///
/// Created empty when a transport connection is established, populated
/// incrementally across handshake phases, and reset when the transport
/// disconnects. Exactly one session is live at a time.
pub struct Session {
    state: HandshakeState,
    /// Ephemeral handshake state: created at phase 1, consumed at phase 3
    /// regardless of outcome, never persisted.
    verifier: Option<SrpServerVerifier<Sha256>>,
    encryptor: Option<SessionCipher>,
    decryptor: Option<SessionCipher>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: HandshakeState::Idle,
            verifier: None,
            encryptor: None,
            decryptor: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn authenticated(&self) -> bool {
        self.state == HandshakeState::Authenticated
    }

    /// Drop all handshake and cipher state, returning to `Idle`.
    pub fn reset(&mut self) {
        *self = Session::new();
    }

    /// Process one handshake frame and produce the reply payload
    /// (`phase-code ‖ body` or `phase-code ‖ error-code`).
    ///
    /// The reply is always sent in the clear: the payload *is* the
    /// key-exchange material.
    #[instrument(skip_all, fields(phase = phase, state = ?self.state))]
    pub fn process_handshake(
        &mut self,
        credentials: Option<&VerifierCredentials>,
        phase: u8,
        body: &[u8],
    ) -> Vec<u8> {
        match SrpPhase::from_code(phase) {
            Some(SrpPhase::Phase1) => self.process_phase1(credentials, body),
            Some(SrpPhase::Phase3) => self.process_phase3(body),
            Some(SrpPhase::Phase2) | Some(SrpPhase::Phase4) => {
                // server-originated phases looped back to us
                warn!(phase, "received a server-phase code from the peer");
                error_reply(PHASE_UNKNOWN, SrpErrorCode::WrongStep)
            }
            None => {
                warn!(phase, "unknown handshake phase code");
                error_reply(PHASE_UNKNOWN, SrpErrorCode::WrongStep)
            }
        }
    }

    /// Phase 1: client presents `A`; reply with `salt ‖ B` or an error code.
    fn process_phase1(
        &mut self,
        credentials: Option<&VerifierCredentials>,
        body: &[u8],
    ) -> Vec<u8> {
        if self.state != HandshakeState::Idle {
            warn!("phase 1 while an exchange is already in progress");
            return error_reply(SrpPhase::Phase2.code(), SrpErrorCode::WrongStep);
        }

        let Some(creds) = credentials else {
            // no password has ever been configured; nothing to verify against
            warn!("phase 1 without configured verifier credentials");
            return error_reply(SrpPhase::Phase2.code(), SrpErrorCode::AllocationError);
        };

        if body.len() != EPHEMERAL_LEN {
            warn!(len = body.len(), "phase 1 payload has wrong length");
            return error_reply(SrpPhase::Phase2.code(), SrpErrorCode::IncorrectLength);
        }

        let mut b = [0u8; EPHEMERAL_SECRET_LEN];
        OsRng.fill_bytes(&mut b);

        let server = SrpServer::<Sha256>::new(&G_1024);
        let b_pub = server.compute_public_ephemeral(&b, creds.verifier());

        let reply = match server.process_reply(&b, creds.verifier(), body) {
            Ok(verifier) => {
                self.verifier = Some(verifier);
                self.state = HandshakeState::AwaitingProof;
                debug!("phase 1 accepted; awaiting client proof");

                let mut payload = Vec::with_capacity(1 + creds.salt().len() + EPHEMERAL_LEN);
                payload.push(SrpPhase::Phase2.code());
                payload.extend_from_slice(creds.salt());
                payload.extend_from_slice(&pad_left(&b_pub, EPHEMERAL_LEN));
                payload
            }
            Err(e) => {
                // degenerate A (A mod N == 0): no session mutation, stay Idle
                warn!(error = %e, "unable to offer B for the presented A");
                error_reply(SrpPhase::Phase2.code(), SrpErrorCode::BOfferingError)
            }
        };

        b.zeroize();
        reply
    }

    /// Phase 3: client presents `M1`; on success reply with
    /// `M2 ‖ tx_nonce ‖ rx_nonce` and bring both ciphers up.
    fn process_phase3(&mut self, body: &[u8]) -> Vec<u8> {
        if self.state != HandshakeState::AwaitingProof {
            warn!(state = ?self.state, "phase 3 out of sequence");
            return error_reply(SrpPhase::Phase4.code(), SrpErrorCode::WrongStep);
        }

        // the ephemeral exchange state is consumed here whatever the outcome
        let Some(verifier) = self.verifier.take() else {
            self.state = HandshakeState::Failed;
            return error_reply(SrpPhase::Phase4.code(), SrpErrorCode::AllocationError);
        };

        if body.len() != PROOF_LEN {
            warn!(len = body.len(), "phase 3 payload has wrong length");
            self.state = HandshakeState::Failed;
            return error_reply(SrpPhase::Phase4.code(), SrpErrorCode::IncorrectLength);
        }

        if let Err(e) = verifier.verify_client(body) {
            warn!(error = %e, "client proof rejected");
            self.state = HandshakeState::Failed;
            return error_reply(SrpPhase::Phase4.code(), SrpErrorCode::BadProofOfKey);
        }

        // the wire session key is the SHA-256 hash of the group-sized
        // shared secret, not the secret itself
        let key = Sha256::digest(verifier.key());
        let tx_nonce = crypto::generate_nonce();
        let rx_nonce = crypto::generate_nonce();

        // the server encrypts what it transmits with the peer's rx stream
        // and decrypts what the peer transmits with the tx stream
        let encryptor = SessionCipher::new(&key, &rx_nonce);
        let decryptor = SessionCipher::new(&key, &tx_nonce);
        let (encryptor, decryptor) = match (encryptor, decryptor) {
            (Ok(enc), Ok(dec)) => (enc, dec),
            _ => {
                self.state = HandshakeState::Failed;
                return error_reply(SrpPhase::Phase4.code(), SrpErrorCode::AllocationError);
            }
        };

        let mut payload = Vec::with_capacity(1 + PROOF_LEN + 2 * NONCE_LEN);
        payload.push(SrpPhase::Phase4.code());
        payload.extend_from_slice(verifier.proof());
        payload.extend_from_slice(&tx_nonce);
        payload.extend_from_slice(&rx_nonce);

        self.encryptor = Some(encryptor);
        self.decryptor = Some(decryptor);
        // both ciphers are initialized; only now does the session authenticate
        self.state = HandshakeState::Authenticated;
        debug!("client proof verified; session authenticated");

        payload
    }

    /// Encrypt an outbound payload with this session's transmit stream.
    ///
    /// # Errors
    /// Returns `BleError::NotAuthenticated` before phase 4 completes.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        if !self.authenticated() {
            return Err(BleError::NotAuthenticated);
        }
        let cipher = self.encryptor.as_mut().ok_or(BleError::NotAuthenticated)?;
        Ok(cipher.process(plaintext))
    }

    /// Decrypt an inbound payload with this session's receive stream.
    ///
    /// # Errors
    /// Returns `BleError::NotAuthenticated` before phase 4 completes.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if !self.authenticated() {
            return Err(BleError::NotAuthenticated);
        }
        let cipher = self.decryptor.as_mut().ok_or(BleError::NotAuthenticated)?;
        Ok(cipher.process(ciphertext))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Reply payload carrying an error code in place of the phase body.
fn error_reply(phase: u8, code: SrpErrorCode) -> Vec<u8> {
    vec![phase, code.code()]
}

/// Left-pad `bytes` with zeros to `len`; values longer than `len` are
/// returned unchanged.
fn pad_left(bytes: &[u8], len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes.to_vec();
    }
    let mut padded = vec![0u8; len - bytes.len()];
    padded.extend_from_slice(bytes);
    padded
}
