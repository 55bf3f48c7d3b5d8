//! # Frame Envelope Codec
//!
//! Tagged decode of the outer byte envelope and the post-decryption relay
//! envelope.
//!
//! Every inbound raw frame is classified here, at the envelope boundary,
//! into a closed set of variants before any further logic touches the
//! payload. Handshake frames are identified by the marker byte at a fixed
//! offset and never reach the decryption path; everything else is treated
//! as ciphertext.

use crate::error::{constants, BleError, Result};
use bytes::{BufMut, BytesMut};

/// Start delimiter of the outer envelope.
pub const START_DELIMITER: u8 = 0x7E;

/// Offset of the marker byte within the outer envelope.
pub const MARKER_OFFSET: usize = 3;

/// Inbound client-initiated handshake request wrapper.
pub const MARKER_HANDSHAKE_REQUEST: u8 = 0x2C;

/// Vendor/unknown frame carrying handshake bytes (both directions).
pub const MARKER_HANDSHAKE_VENDOR: u8 = 0xAC;

/// Relay transmit request (peer to device).
pub const MARKER_RELAY_TX: u8 = 0x2D;

/// Relay output (device to peer).
pub const MARKER_RELAY_OUTPUT: u8 = 0xAD;

/// Local control frame, found after decryption; dropped silently.
pub const MARKER_LOCAL_CONTROL: u8 = 0x08;

/// Relay interface identifier for the BLE interface.
pub const RELAY_INTERFACE_BLE: u8 = 0x01;

/// Smallest well-formed envelope: delimiter, length, marker, checksum.
pub const MIN_FRAME_LEN: usize = 5;

/// A decoded outer envelope.
///
/// Handshake frames carry a phase code as the first payload byte; data
/// frames carry opaque ciphertext that only the session cipher may open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Marker `0x2C`: client-initiated handshake request.
    HandshakeRequest { phase: u8, body: Vec<u8> },
    /// Marker `0xAC`: vendor frame carrying handshake bytes.
    HandshakeReply { phase: u8, body: Vec<u8> },
    /// Any other marker: encrypted application-data frame.
    Data { marker: u8, ciphertext: Vec<u8> },
}

impl Frame {
    /// Build a handshake reply frame (vendor marker) from a phase payload.
    pub fn handshake_reply(payload: Vec<u8>) -> Result<Self> {
        let (phase, body) = split_phase(&payload)?;
        Ok(Frame::HandshakeReply {
            phase,
            body: body.to_vec(),
        })
    }

    /// Marker byte this frame is encoded with.
    pub fn marker(&self) -> u8 {
        match self {
            Frame::HandshakeRequest { .. } => MARKER_HANDSHAKE_REQUEST,
            Frame::HandshakeReply { .. } => MARKER_HANDSHAKE_VENDOR,
            Frame::Data { marker, .. } => *marker,
        }
    }

    /// Encode into the outer envelope.
    pub fn encode(&self) -> Vec<u8> {
        let payload: Vec<u8> = match self {
            Frame::HandshakeRequest { phase, body } | Frame::HandshakeReply { phase, body } => {
                let mut p = Vec::with_capacity(1 + body.len());
                p.push(*phase);
                p.extend_from_slice(body);
                p
            }
            Frame::Data { ciphertext, .. } => ciphertext.clone(),
        };

        let mut buf = BytesMut::with_capacity(MIN_FRAME_LEN + payload.len());
        buf.put_u8(START_DELIMITER);
        buf.put_u16((payload.len() + 1) as u16);
        buf.put_u8(self.marker());
        buf.put_slice(&payload);
        buf.put_u8(checksum(self.marker(), &payload));
        buf.to_vec()
    }

    /// Decode a raw inbound frame.
    ///
    /// # Errors
    /// Returns `BleError::MalformedFrame` when the envelope fails structural
    /// validation. Callers must abort the receive path on this error; a
    /// malformed frame may indicate a desynchronized cipher stream.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < MIN_FRAME_LEN {
            return Err(BleError::MalformedFrame(
                constants::ERR_FRAME_TOO_SHORT.into(),
            ));
        }
        if raw[0] != START_DELIMITER {
            return Err(BleError::MalformedFrame(
                constants::ERR_FRAME_BAD_DELIMITER.into(),
            ));
        }

        let declared = u16::from_be_bytes([raw[1], raw[2]]) as usize;
        // declared covers marker + payload; add delimiter, length and checksum
        if declared == 0 || raw.len() != declared + 4 {
            return Err(BleError::MalformedFrame(
                constants::ERR_FRAME_BAD_LENGTH.into(),
            ));
        }

        let marker = raw[MARKER_OFFSET];
        let payload = &raw[MARKER_OFFSET + 1..raw.len() - 1];
        if checksum(marker, payload) != raw[raw.len() - 1] {
            return Err(BleError::MalformedFrame(
                constants::ERR_FRAME_BAD_CHECKSUM.into(),
            ));
        }

        match marker {
            MARKER_HANDSHAKE_REQUEST => {
                let (phase, body) = split_phase(payload)?;
                Ok(Frame::HandshakeRequest {
                    phase,
                    body: body.to_vec(),
                })
            }
            MARKER_HANDSHAKE_VENDOR => {
                let (phase, body) = split_phase(payload)?;
                Ok(Frame::HandshakeReply {
                    phase,
                    body: body.to_vec(),
                })
            }
            _ => Ok(Frame::Data {
                marker,
                ciphertext: payload.to_vec(),
            }),
        }
    }
}

/// A decoded inner envelope, produced after decrypting a data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InnerFrame {
    /// Loop-back of an administrative command; dropped silently.
    Control,
    /// Relay envelope wrapping an opaque application payload.
    Relay { interface: u8, data: Vec<u8> },
}

impl InnerFrame {
    /// Wrap an outbound application payload in a relay envelope.
    pub fn encode_relay(interface: u8, data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + data.len());
        buf.push(MARKER_RELAY_OUTPUT);
        buf.push(interface);
        buf.extend_from_slice(data);
        buf
    }

    /// Decode a decrypted payload into the inner envelope.
    ///
    /// # Errors
    /// Returns `BleError::MalformedFrame` when the plaintext does not start
    /// with a known inner marker.
    pub fn decode(plaintext: &[u8]) -> Result<Self> {
        match plaintext.first() {
            Some(&MARKER_LOCAL_CONTROL) => Ok(InnerFrame::Control),
            Some(&MARKER_RELAY_TX) | Some(&MARKER_RELAY_OUTPUT) if plaintext.len() >= 2 => {
                Ok(InnerFrame::Relay {
                    interface: plaintext[1],
                    data: plaintext[2..].to_vec(),
                })
            }
            _ => Err(BleError::MalformedFrame(
                constants::ERR_INNER_ENVELOPE.into(),
            )),
        }
    }
}

/// Checksum over marker and payload: `0xFF` minus the wrapping byte sum.
fn checksum(marker: u8, payload: &[u8]) -> u8 {
    let sum = payload
        .iter()
        .fold(marker, |acc, b| acc.wrapping_add(*b));
    0xFF_u8.wrapping_sub(sum)
}

fn split_phase(payload: &[u8]) -> Result<(u8, &[u8])> {
    match payload.split_first() {
        Some((phase, body)) => Ok((*phase, body)),
        None => Err(BleError::MalformedFrame(
            constants::ERR_FRAME_TOO_SHORT.into(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_request_roundtrip() {
        let frame = Frame::HandshakeRequest {
            phase: 0x01,
            body: vec![0xAA; 128],
        };
        let raw = frame.encode();
        assert_eq!(raw[0], START_DELIMITER);
        assert_eq!(raw[MARKER_OFFSET], MARKER_HANDSHAKE_REQUEST);
        // phase code sits at offset 4 in the reference encoding
        assert_eq!(raw[4], 0x01);
        assert_eq!(Frame::decode(&raw).unwrap(), frame);
    }

    #[test]
    fn test_vendor_reply_roundtrip() {
        let frame = Frame::handshake_reply(vec![0x02, 1, 2, 3, 4]).unwrap();
        let raw = frame.encode();
        assert_eq!(raw[MARKER_OFFSET], MARKER_HANDSHAKE_VENDOR);
        match Frame::decode(&raw).unwrap() {
            Frame::HandshakeReply { phase, body } => {
                assert_eq!(phase, 0x02);
                assert_eq!(body, vec![1, 2, 3, 4]);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_data_frame_roundtrip() {
        let frame = Frame::Data {
            marker: MARKER_RELAY_TX,
            ciphertext: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        let raw = frame.encode();
        assert_eq!(Frame::decode(&raw).unwrap(), frame);
    }

    #[test]
    fn test_empty_buffer_rejected() {
        assert!(matches!(
            Frame::decode(&[]),
            Err(BleError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_bad_delimiter_rejected() {
        let mut raw = Frame::Data {
            marker: MARKER_RELAY_TX,
            ciphertext: vec![1, 2, 3],
        }
        .encode();
        raw[0] = 0x00;
        assert!(matches!(
            Frame::decode(&raw),
            Err(BleError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let raw = Frame::Data {
            marker: MARKER_RELAY_TX,
            ciphertext: vec![1, 2, 3, 4, 5],
        }
        .encode();
        assert!(matches!(
            Frame::decode(&raw[..raw.len() - 2]),
            Err(BleError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let mut raw = Frame::Data {
            marker: MARKER_RELAY_TX,
            ciphertext: vec![1, 2, 3],
        }
        .encode();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        assert!(matches!(
            Frame::decode(&raw),
            Err(BleError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_handshake_frame_without_phase_rejected() {
        // envelope is structurally valid but the payload is empty
        let mut raw = vec![START_DELIMITER, 0x00, 0x01, MARKER_HANDSHAKE_REQUEST];
        raw.push(checksum(MARKER_HANDSHAKE_REQUEST, &[]));
        assert!(matches!(
            Frame::decode(&raw),
            Err(BleError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_inner_control_frame() {
        assert_eq!(
            InnerFrame::decode(&[MARKER_LOCAL_CONTROL, 0x42]).unwrap(),
            InnerFrame::Control
        );
    }

    #[test]
    fn test_inner_relay_roundtrip() {
        let encoded = InnerFrame::encode_relay(RELAY_INTERFACE_BLE, b"hello");
        match InnerFrame::decode(&encoded).unwrap() {
            InnerFrame::Relay { interface, data } => {
                assert_eq!(interface, RELAY_INTERFACE_BLE);
                assert_eq!(data, b"hello");
            }
            other => panic!("unexpected inner frame: {other:?}"),
        }
    }

    #[test]
    fn test_inner_garbage_rejected() {
        assert!(InnerFrame::decode(&[0x77, 0x01, 0x02]).is_err());
        assert!(InnerFrame::decode(&[]).is_err());
    }
}
