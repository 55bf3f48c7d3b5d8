//! Shared test doubles and a handshake client for integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use ble_link::core::frame::Frame;
use ble_link::error::{BleError, Result};
use ble_link::transport::{EventSink, GattPeripheral, RadioModule, TransportEvent};
use sha2::{Digest, Sha256};
use srp::client::{SrpClient, SrpClientVerifier};
use srp::groups::G_1024;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory Bluetooth controller double.
#[derive(Default)]
pub struct FakePeripheral {
    pub available: AtomicBool,
    pub advertised_name: Mutex<Option<String>>,
    pub notified: Mutex<Vec<Vec<u8>>>,
    pub sink: Mutex<Option<EventSink>>,
}

impl FakePeripheral {
    pub fn available() -> Arc<Self> {
        let peripheral = Arc::new(Self::default());
        peripheral.available.store(true, Ordering::SeqCst);
        peripheral
    }

    /// Drive an event into the sink the transport registered.
    pub fn emit(&self, event: TransportEvent) {
        let sink = self.sink.lock().unwrap().clone().expect("sink registered");
        sink(event);
    }

    /// Pop the oldest frame the service notified to the central.
    pub fn take_notified(&self) -> Vec<u8> {
        let mut notified = self.notified.lock().unwrap();
        assert!(!notified.is_empty(), "no frame was notified");
        notified.remove(0)
    }

    pub fn notified_count(&self) -> usize {
        self.notified.lock().unwrap().len()
    }
}

/// Local handle implementing the peripheral seam over the shared double.
///
/// The trait and `Arc` are both foreign from this test crate's point of
/// view, so the impl has to live on a local type.
pub struct PeripheralHandle(pub Arc<FakePeripheral>);

impl GattPeripheral for PeripheralHandle {
    fn is_available(&self) -> bool {
        self.0.available.load(Ordering::SeqCst)
    }

    fn set_event_sink(&self, sink: EventSink) {
        *self.0.sink.lock().unwrap() = Some(sink);
    }

    fn start_advertising(&self, name: &str) -> Result<()> {
        *self.0.advertised_name.lock().unwrap() = Some(name.to_string());
        Ok(())
    }

    fn stop_advertising(&self) -> Result<()> {
        Ok(())
    }

    fn notify(&self, frame: &[u8]) -> Result<()> {
        self.0.notified.lock().unwrap().push(frame.to_vec());
        Ok(())
    }
}

/// In-memory relay radio double.
#[derive(Default)]
pub struct FakeRadio {
    pub answers_at: Option<u32>,
    pub ble_enabled: AtomicBool,
    pub transmitted: Mutex<Vec<Vec<u8>>>,
    pub password: Mutex<Option<String>>,
    pub sink: Mutex<Option<EventSink>>,
}

impl FakeRadio {
    pub fn answering_at(baud: u32) -> Arc<Self> {
        Arc::new(Self {
            answers_at: Some(baud),
            ..Self::default()
        })
    }

    pub fn emit(&self, event: TransportEvent) {
        let sink = self.sink.lock().unwrap().clone().expect("sink registered");
        sink(event);
    }
}

/// Local handle implementing the radio seam over the shared double.
pub struct RadioHandle(pub Arc<FakeRadio>);

impl RadioModule for RadioHandle {
    fn probe(&self, baud: u32) -> Result<()> {
        if self.0.answers_at == Some(baud) {
            Ok(())
        } else {
            Err(BleError::Transport(format!("no response at {baud} baud")))
        }
    }

    fn set_event_sink(&self, sink: EventSink) {
        *self.0.sink.lock().unwrap() = Some(sink);
    }

    fn enable_ble(&self) -> Result<()> {
        self.0.ble_enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable_ble(&self) -> Result<()> {
        self.0.ble_enabled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn transmit_relay(&self, frame: &[u8]) -> Result<()> {
        self.0.transmitted.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    fn set_parameter(&self, _parameter: &str, _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn apply_changes(&self) -> Result<()> {
        Ok(())
    }

    fn set_password(&self, password: &str) -> Result<()> {
        *self.0.password.lock().unwrap() = Some(password.to_string());
        Ok(())
    }
}

/// Wire constants shared with the service under test.
pub const PHASE_1: u8 = 0x01;
pub const PHASE_3: u8 = 0x03;
pub const MARKER_RELAY_TX: u8 = 0x2D;
pub const EPHEMERAL_LEN: usize = 128;
pub const PROOF_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

const USERNAME: &[u8] = b"apiservice";

/// Mobile-central side of the SRP exchange, framed for the wire.
pub struct HandshakeClient {
    secret: [u8; 64],
    verifier: Option<SrpClientVerifier<Sha256>>,
    key: Option<Vec<u8>>,
    pub tx_nonce: [u8; NONCE_LEN],
    pub rx_nonce: [u8; NONCE_LEN],
}

impl HandshakeClient {
    pub fn new() -> Self {
        let mut secret = [0u8; 64];
        rand_core::RngCore::fill_bytes(&mut rand_core::OsRng, &mut secret);
        Self {
            secret,
            verifier: None,
            key: None,
            tx_nonce: [0; NONCE_LEN],
            rx_nonce: [0; NONCE_LEN],
        }
    }

    /// Encoded phase-1 frame carrying the public ephemeral `A`.
    pub fn phase1_frame(&self) -> Vec<u8> {
        let client = SrpClient::<Sha256>::new(&G_1024);
        let a_pub = client.compute_public_ephemeral(&self.secret);
        Frame::HandshakeRequest {
            phase: PHASE_1,
            body: pad_left(&a_pub, EPHEMERAL_LEN),
        }
        .encode()
    }

    /// Consume the phase-2 reply frame and build the phase-3 proof frame.
    pub fn phase3_frame(&mut self, password: &str, phase2_raw: &[u8]) -> Vec<u8> {
        let (phase, body) = decode_reply(phase2_raw);
        assert_eq!(phase, 0x02, "expected a phase-2 reply");
        assert!(body.len() > 2, "phase-2 reply carried an error: {body:?}");
        let salt = &body[..4];
        let b_pub = &body[4..];

        let client = SrpClient::<Sha256>::new(&G_1024);
        let verifier = client
            .process_reply(&self.secret, USERNAME, password.as_bytes(), salt, b_pub)
            .expect("server reply should be processable");
        let m1 = verifier.proof().to_vec();
        self.verifier = Some(verifier);

        Frame::HandshakeRequest {
            phase: PHASE_3,
            body: m1,
        }
        .encode()
    }

    /// Consume the phase-4 reply frame, verifying `M2` and keeping the
    /// session key and nonces.
    pub fn finish(&mut self, phase4_raw: &[u8]) {
        let (phase, body) = decode_reply(phase4_raw);
        assert_eq!(phase, 0x04, "expected a phase-4 reply");
        assert_eq!(body.len(), PROOF_LEN + 2 * NONCE_LEN);

        let verifier = self.verifier.as_ref().expect("phase 2 processed");
        verifier
            .verify_server(&body[..PROOF_LEN])
            .expect("server proof should verify");

        // the session key is the SHA-256 hash of the shared secret
        self.key = Some(Sha256::digest(verifier.key()).to_vec());
        self.tx_nonce = body[PROOF_LEN..PROOF_LEN + NONCE_LEN].try_into().unwrap();
        self.rx_nonce = body[PROOF_LEN + NONCE_LEN..].try_into().unwrap();
    }

    /// Encrypted data frame carrying `payload` toward the device.
    pub fn data_frame(&self, payload: &[u8]) -> Vec<u8> {
        let mut inner = vec![MARKER_RELAY_TX, 0x01];
        inner.extend_from_slice(payload);
        Frame::Data {
            marker: MARKER_RELAY_TX,
            ciphertext: self.apply_ctr(&self.tx_nonce, &inner),
        }
        .encode()
    }

    /// Decrypt a data frame received from the device, unwrapping the relay
    /// envelope.
    pub fn open_data_frame(&self, raw: &[u8]) -> Vec<u8> {
        let ciphertext = match Frame::decode(raw).expect("well-formed frame") {
            Frame::Data { ciphertext, .. } => ciphertext,
            other => panic!("expected a data frame, got {other:?}"),
        };
        let inner = self.apply_ctr(&self.rx_nonce, &ciphertext);
        assert!(inner.len() > 2, "relay envelope too short");
        inner[2..].to_vec()
    }

    // One-shot CTR application; the counter restarts per call, which is fine
    // for tests that send a single frame per direction.
    fn apply_ctr(&self, nonce: &[u8; NONCE_LEN], data: &[u8]) -> Vec<u8> {
        use aes::cipher::{KeyIvInit, StreamCipher};
        type Aes256Ctr = ctr::Ctr32BE<aes::Aes256>;

        let key = self.key.as_ref().expect("handshake finished");
        let mut iv = [0u8; 16];
        iv[..NONCE_LEN].copy_from_slice(nonce);
        iv[NONCE_LEN..].copy_from_slice(&1u32.to_be_bytes());

        let mut cipher = Aes256Ctr::new_from_slices(key, &iv).unwrap();
        let mut out = data.to_vec();
        cipher.apply_keystream(&mut out);
        out
    }
}

impl Default for HandshakeClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a handshake reply frame into `(phase, body)`.
pub fn decode_reply(raw: &[u8]) -> (u8, Vec<u8>) {
    match Frame::decode(raw).expect("well-formed reply frame") {
        Frame::HandshakeReply { phase, body } => (phase, body),
        other => panic!("expected a handshake reply, got {other:?}"),
    }
}

fn pad_left(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut padded = vec![0u8; len.saturating_sub(bytes.len())];
    padded.extend_from_slice(bytes);
    padded
}
