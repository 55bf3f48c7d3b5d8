//! # Core Wire Components
//!
//! Low-level frame handling for the BLE channel.
//!
//! This module provides the foundation for the session layer: the outer
//! envelope that every raw frame travels in, and the inner relay envelope
//! that application payloads are wrapped in before encryption.
//!
//! ## Wire Format
//! ```text
//! [Delimiter(1)] [Length(2, BE)] [Marker(1)] [Payload(N)] [Checksum(1)]
//! ```
//!
//! ## Security
//! - The marker byte at offset 3 is inspected before any payload is touched
//! - Length and checksum validation happen before allocation-heavy work
//! - Malformed frames abort the receive path instead of being dropped silently

pub mod frame;
