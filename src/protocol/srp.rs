//! # SRP Wire Codes
//!
//! Phase and error codes of the 4-phase SRP-6a exchange, as they appear on
//! the wire. The phase code is the first payload byte of every handshake
//! frame (offset 4 of the outer envelope); error replies carry one of the
//! [`SrpErrorCode`] values in place of the phase body.

/// Length of the client ephemeral `A` on the wire (1024-bit group).
pub const EPHEMERAL_LEN: usize = 128;

/// Length of the proof values `M1`/`M2` (SHA-256 output).
pub const PROOF_LEN: usize = 32;

/// Phase code used in replies to a request whose phase code is unknown.
pub const PHASE_UNKNOWN: u8 = 0xFF;

/// Handshake phases, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SrpPhase {
    /// Client presents its public ephemeral value `A`.
    Phase1 = 0x01,
    /// Server presents the stored salt and its public ephemeral `B`.
    Phase2 = 0x02,
    /// Client presents its session proof `M1`.
    Phase3 = 0x03,
    /// Server presents its proof `M2` and two fresh 12-byte nonces.
    Phase4 = 0x04,
}

impl SrpPhase {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(SrpPhase::Phase1),
            0x02 => Some(SrpPhase::Phase2),
            0x03 => Some(SrpPhase::Phase3),
            0x04 => Some(SrpPhase::Phase4),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SrpPhase::Phase1 => "Phase 1: Client presents A value",
            SrpPhase::Phase2 => "Phase 2: Server presents B and salt",
            SrpPhase::Phase3 => "Phase 3: Client presents M1 session key validation value",
            SrpPhase::Phase4 => {
                "Phase 4: Server presents M2 session key validation value and two 12-byte nonces"
            }
        }
    }
}

/// Error codes sent back to the peer in place of a phase body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SrpErrorCode {
    /// Unable to offer `B`; usually `A mod N == 0`.
    BOfferingError = 0x80,
    /// Incorrect payload length.
    IncorrectLength = 0x81,
    /// Bad proof of key.
    BadProofOfKey = 0x82,
    /// Resource allocation error.
    AllocationError = 0x83,
    /// Request contained a step not in the correct sequence.
    WrongStep = 0x84,
}

impl SrpErrorCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x80 => Some(SrpErrorCode::BOfferingError),
            0x81 => Some(SrpErrorCode::IncorrectLength),
            0x82 => Some(SrpErrorCode::BadProofOfKey),
            0x83 => Some(SrpErrorCode::AllocationError),
            0x84 => Some(SrpErrorCode::WrongStep),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SrpErrorCode::BOfferingError => {
                "Unable to offer B (cryptographic error with content, usually A mod N == 0)"
            }
            SrpErrorCode::IncorrectLength => "Incorrect payload length",
            SrpErrorCode::BadProofOfKey => "Bad proof of key",
            SrpErrorCode::AllocationError => "Resource allocation error",
            SrpErrorCode::WrongStep => "Request contained a step not in the correct sequence",
        }
    }
}
