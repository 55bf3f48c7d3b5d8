//! # Transport Abstraction
//!
//! One bidirectional frame channel to the connected BLE central, backed by
//! whichever radio the hardware offers:
//!
//! - [`LocalTransport`](gatt::LocalTransport): the host's own Bluetooth
//!   controller, exposed as a GATT peripheral.
//! - [`RelayTransport`](relay::RelayTransport): a serial-attached radio
//!   module that runs the BLE stack itself and relays frames over UART.
//!
//! Selection happens once at initialization via [`select_transport`]: the
//! local controller is preferred, the serial relay is probed as a fallback,
//! and if neither is present the device has no BLE path at all.
//!
//! Hardware access goes through the [`GattPeripheral`] and [`RadioModule`]
//! seams so the session layer never touches a bus directly.

pub mod gatt;
pub mod relay;

use crate::config::BleConfig;
use crate::error::{BleError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use gatt::LocalTransport;
pub use relay::RelayTransport;

/// Which radio backs the active transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Host Bluetooth controller advertising directly.
    Local,
    /// Serial-attached relay radio.
    Relay,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Local => write!(f, "local GATT peripheral"),
            TransportKind::Relay => write!(f, "serial relay radio"),
        }
    }
}

/// Events surfaced by a transport to the layer above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A central connected. At most one peer is ever connected.
    Connected,
    /// The central disconnected or the link dropped.
    Disconnected,
    /// One raw inbound frame, exactly as received.
    Frame(Vec<u8>),
}

/// Callback invoked by a transport for every [`TransportEvent`].
pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// A started, bidirectional frame channel to the peer.
///
/// Implementations deliver inbound traffic through the [`EventSink`] given
/// to [`Transport::start`] and accept outbound frames through
/// [`Transport::send`]. All methods take `&self`; implementations manage
/// their own interior state.
pub trait Transport: Send + Sync {
    /// Bring the channel up and begin delivering events to `sink`.
    fn start(&self, sink: EventSink) -> Result<()>;

    /// Tear the channel down. Idempotent.
    fn stop(&self) -> Result<()>;

    /// Transmit one raw frame to the connected peer.
    ///
    /// # Errors
    /// Returns `BleError::NotConnected` when no peer is connected.
    fn send(&self, frame: &[u8]) -> Result<()>;

    /// Whether a peer is currently connected.
    fn is_connected(&self) -> bool;

    /// Change the name advertised to scanning centrals.
    fn configure_advertising_name(&self, name: &str) -> Result<()>;

    /// Push a changed password down to the radio, where it keeps one.
    fn set_password(&self, password: &str) -> Result<()>;

    /// Which radio backs this transport.
    fn kind(&self) -> TransportKind;
}

/// Host Bluetooth controller seam.
///
/// Implemented over the platform Bluetooth stack in production and by test
/// doubles elsewhere. The peripheral owns connection tracking and surfaces
/// it through the sink handed to [`GattPeripheral::set_event_sink`].
pub trait GattPeripheral: Send + Sync {
    /// Whether the host has a usable Bluetooth controller at all.
    fn is_available(&self) -> bool;

    /// Register the sink that receives connection and frame events.
    fn set_event_sink(&self, sink: EventSink);

    /// Begin advertising under `name` and accept one central.
    fn start_advertising(&self, name: &str) -> Result<()>;

    /// Stop advertising and drop any connected central.
    fn stop_advertising(&self) -> Result<()>;

    /// Notify one frame to the connected central.
    fn notify(&self, frame: &[u8]) -> Result<()>;
}

/// Serial-attached radio module seam.
pub trait RadioModule: Send + Sync {
    /// Try to talk to the module at `baud`; `Ok` means it answered.
    fn probe(&self, baud: u32) -> Result<()>;

    /// Register the sink that receives connection and frame events.
    fn set_event_sink(&self, sink: EventSink);

    /// Enable the module's BLE stack and start advertising.
    fn enable_ble(&self) -> Result<()>;

    /// Disable the module's BLE stack.
    fn disable_ble(&self) -> Result<()>;

    /// Queue one relay frame for transmission to the connected central.
    fn transmit_relay(&self, frame: &[u8]) -> Result<()>;

    /// Write one named module parameter.
    fn set_parameter(&self, parameter: &str, value: &[u8]) -> Result<()>;

    /// Commit queued parameter writes to the module.
    fn apply_changes(&self) -> Result<()>;

    /// Store the authentication password on the module.
    fn set_password(&self, password: &str) -> Result<()>;
}

/// Pick the transport for this device: the local controller when available,
/// otherwise a relay radio probed across the configured baud rates.
///
/// # Errors
/// Returns `BleError::BluetoothUnsupported` when neither path is viable.
pub fn select_transport(
    config: &BleConfig,
    gatt: Option<Box<dyn GattPeripheral>>,
    radio: Option<Box<dyn RadioModule>>,
) -> Result<Box<dyn Transport>> {
    if let Some(peripheral) = gatt {
        if peripheral.is_available() {
            info!("using the local Bluetooth controller");
            return Ok(Box::new(LocalTransport::new(
                peripheral,
                config.service.advertising_name.clone(),
            )));
        }
        debug!("local Bluetooth controller not available");
    }

    if let Some(module) = radio {
        for &baud in &config.relay.baud_candidates {
            match module.probe(baud) {
                Ok(()) => {
                    // answering is not enough: the module must be able to
                    // bring its BLE stack up; it stays down until start
                    if let Err(e) = module.enable_ble().and_then(|()| module.disable_ble()) {
                        warn!(baud, error = %e, "relay radio answered but cannot enable BLE");
                        break;
                    }
                    info!(baud, device = %config.relay.device, "relay radio detected");
                    return Ok(Box::new(RelayTransport::new(module)));
                }
                Err(e) => debug!(baud, error = %e, "relay probe failed"),
            }
        }
        warn!(device = %config.relay.device, "no usable relay radio found");
    }

    Err(BleError::BluetoothUnsupported)
}
