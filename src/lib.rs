//! # BLE Link
//!
//! Secure BLE session layer for embedded devices: one bidirectional data
//! channel to a single mobile central, authenticated with SRP-6a and
//! encrypted per session with AES-CTR.
//!
//! The channel rides on whichever radio the hardware offers. A host with
//! its own Bluetooth controller advertises directly as a GATT peripheral; a
//! host without one drives a serial-attached relay radio that runs the BLE
//! stack itself. Either way the layers above see the same frame channel.
//!
//! ## Architecture
//! - [`core`]: wire envelope encoding and validation
//! - [`protocol`]: SRP handshake state machine, credentials, dispatch
//! - [`transport`]: GATT and serial relay transports behind one trait
//! - [`service`]: the [`BleService`] lifecycle facade
//! - [`config`]: TOML/env configuration
//! - [`utils`]: session cipher, observers, stop gate, logging, metrics
//!
//! ## Example
//! ```no_run
//! use ble_link::config::BleConfig;
//! use ble_link::service::BleService;
//! use std::sync::Arc;
//!
//! # fn demo(gatt: Box<dyn ble_link::transport::GattPeripheral>) -> ble_link::Result<()> {
//! let config = BleConfig::default();
//! let service = BleService::initialize(config, Some(gatt), None)?;
//!
//! service.set_password("device-password")?;
//! service.add_data_callback(Arc::new(|payload: &[u8]| {
//!     println!("received {} bytes", payload.len());
//! }));
//! service.start_service()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use config::BleConfig;
pub use error::{BleError, Result};
pub use service::BleService;
pub use transport::TransportKind;
