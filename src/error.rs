//! # Error Types
//!
//! Comprehensive error handling for the BLE session layer.
//!
//! This module defines all error variants that can occur while operating the
//! secure channel, from transport selection failures to handshake protocol
//! violations and cipher misuse.
//!
//! ## Error Categories
//! - **Transport Errors**: no usable radio, I/O failures, send while disconnected
//! - **Protocol Errors**: malformed frames, handshake failures
//! - **Cryptographic Errors**: use of the session cipher before authentication
//! - **Configuration Errors**: invalid TOML, bad parameter values
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Transport selection errors
    pub const ERR_BLUETOOTH_UNSUPPORTED: &str =
        "Bluetooth is not supported by either the local adapter or an attached radio module";

    /// Session / dispatcher errors
    pub const ERR_NOT_AUTHENTICATED: &str =
        "Session is not authenticated; encrypted traffic rejected";
    pub const ERR_SESSION_POISONED: &str = "Session lock poisoned";

    /// Frame envelope errors
    pub const ERR_FRAME_TOO_SHORT: &str = "Frame shorter than the minimum envelope size";
    pub const ERR_FRAME_BAD_DELIMITER: &str = "Frame does not begin with the start delimiter";
    pub const ERR_FRAME_BAD_LENGTH: &str = "Frame length field disagrees with the buffer";
    pub const ERR_FRAME_BAD_CHECKSUM: &str = "Frame checksum mismatch";
    pub const ERR_INNER_ENVELOPE: &str = "Decrypted payload is not a valid relay envelope";

    /// Service lifecycle errors
    pub const ERR_SERVICE_ACTIVE: &str = "Operation requires the service to be stopped";
    pub const ERR_NOT_CONNECTED: &str = "No peer is connected";
}

/// `BleError` is the primary error type for all session-layer operations.
#[derive(Error, Debug)]
pub enum BleError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Bluetooth not supported: no usable local adapter or radio module")]
    BluetoothUnsupported,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No peer is connected")]
    NotConnected,

    #[error("Service is active; stop it before reconfiguring")]
    ServiceActive,

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Session not authenticated")]
    NotAuthenticated,

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid key length: {0} bytes")]
    InvalidKeyLength(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using `BleError`
pub type Result<T> = std::result::Result<T, BleError>;
