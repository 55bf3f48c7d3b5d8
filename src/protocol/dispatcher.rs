//! # Packet Dispatcher
//!
//! Classifies every inbound raw frame by its marker byte and routes it to
//! the handshake state machine or the decrypt-and-deliver path. Handshake
//! frames never touch the session cipher; data frames never reach the
//! handshake machine.
//!
//! Outbound application payloads are wrapped in a relay envelope and
//! encrypted before transmission. Handshake replies bypass encryption
//! entirely: the reply *is* the key-exchange material.

use crate::core::frame::{Frame, InnerFrame, MARKER_RELAY_OUTPUT, RELAY_INTERFACE_BLE};
use crate::error::{constants, BleError, Result};
use crate::protocol::credentials::VerifierCredentials;
use crate::protocol::session::{HandshakeState, Session};
use crate::protocol::srp::SrpPhase;
use crate::utils::metrics::Metrics;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, warn};

/// Outcome of routing one inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A handshake reply to transmit in the clear.
    Reply(Vec<u8>),
    /// A decrypted application payload for the data observers.
    Deliver(Vec<u8>),
    /// A control frame dropped silently.
    Ignored,
}

/// Routes raw frames between the handshake machine and the session cipher.
pub struct Dispatcher {
    session: Arc<Mutex<Session>>,
    credentials: Arc<Mutex<Option<VerifierCredentials>>>,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(
        session: Arc<Mutex<Session>>,
        credentials: Arc<Mutex<Option<VerifierCredentials>>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            session,
            credentials,
            metrics,
        }
    }

    /// Classify and route one inbound raw frame.
    ///
    /// # Errors
    /// - `BleError::MalformedFrame`: envelope validation failed; the caller
    ///   must abort the receive path (a malformed encrypted frame may mean a
    ///   desynchronized cipher stream that cannot be recovered in place).
    /// - `BleError::NotAuthenticated`: a data frame arrived before phase 4
    ///   completed; nothing is delivered and no key material leaks.
    #[instrument(skip(self, raw), fields(len = raw.len()))]
    pub fn dispatch_inbound(&self, raw: &[u8]) -> Result<Dispatch> {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                Metrics::incr(&self.metrics.malformed_frames);
                return Err(e);
            }
        };

        match frame {
            Frame::HandshakeRequest { phase, body } | Frame::HandshakeReply { phase, body } => {
                self.dispatch_handshake(phase, &body)
            }
            Frame::Data { marker, ciphertext } => {
                debug!(marker, "routing encrypted data frame");
                self.dispatch_data(&ciphertext)
            }
        }
    }

    fn dispatch_handshake(&self, phase: u8, body: &[u8]) -> Result<Dispatch> {
        let credentials = self
            .credentials
            .lock()
            .map_err(|_| BleError::Custom(constants::ERR_SESSION_POISONED.into()))?
            .clone();
        let mut session = self.lock_session()?;

        if phase == SrpPhase::Phase1.code() {
            Metrics::incr(&self.metrics.handshakes_total);
        }

        let payload = session.process_handshake(credentials.as_ref(), phase, body);
        match session.state() {
            HandshakeState::Authenticated => Metrics::incr(&self.metrics.handshakes_success),
            HandshakeState::Failed => Metrics::incr(&self.metrics.handshakes_failed),
            _ => {}
        }
        drop(session);

        Ok(Dispatch::Reply(Frame::handshake_reply(payload)?.encode()))
    }

    fn dispatch_data(&self, ciphertext: &[u8]) -> Result<Dispatch> {
        let mut session = self.lock_session()?;
        if !session.authenticated() {
            Metrics::incr(&self.metrics.unauthenticated_rejects);
            warn!("data frame before authentication rejected");
            return Err(BleError::NotAuthenticated);
        }

        let plaintext = session.decrypt(ciphertext)?;
        drop(session);

        match InnerFrame::decode(&plaintext) {
            Ok(InnerFrame::Control) => {
                debug!("dropping local control frame");
                Ok(Dispatch::Ignored)
            }
            Ok(InnerFrame::Relay { interface, data }) => {
                debug!(interface, len = data.len(), "delivering relay payload");
                Metrics::incr(&self.metrics.frames_delivered);
                Ok(Dispatch::Deliver(data))
            }
            Err(e) => {
                Metrics::incr(&self.metrics.malformed_frames);
                Err(e)
            }
        }
    }

    /// Wrap an outbound application payload and encrypt it for transmission.
    ///
    /// # Errors
    /// Returns `BleError::NotAuthenticated` before the handshake completes.
    #[instrument(skip(self, payload), fields(len = payload.len()))]
    pub fn encode_outbound(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let envelope = InnerFrame::encode_relay(RELAY_INTERFACE_BLE, payload);

        let mut session = self.lock_session()?;
        let ciphertext = session.encrypt(&envelope)?;
        drop(session);

        Metrics::incr(&self.metrics.frames_sent);
        Ok(Frame::Data {
            marker: MARKER_RELAY_OUTPUT,
            ciphertext,
        }
        .encode())
    }

    /// Reset the session to a fresh unauthenticated state.
    pub fn reset_session(&self) -> Result<()> {
        self.lock_session()?.reset();
        Ok(())
    }

    /// Whether the current session has completed the handshake.
    pub fn authenticated(&self) -> Result<bool> {
        Ok(self.lock_session()?.authenticated())
    }

    fn lock_session(&self) -> Result<std::sync::MutexGuard<'_, Session>> {
        self.session
            .lock()
            .map_err(|_| BleError::Custom(constants::ERR_SESSION_POISONED.into()))
    }
}
