//! # Service Layer
//!
//! The public face of the crate: [`BleService`] ties the selected transport,
//! the handshake state machine, and the observer registries together into
//! one lifecycle-managed secure channel.

pub mod ble;

pub use ble::BleService;
