//! # Serial Relay Transport
//!
//! Frame channel through a serial-attached radio module. The module runs
//! the BLE stack itself; the host drives it over UART, forwarding outbound
//! frames as relay transmissions and receiving inbound traffic through the
//! module's event sink.
//!
//! The advertising name maps onto the module's identifier parameter and has
//! to be committed with an explicit apply, matching how these radios stage
//! configuration writes.

use crate::error::{BleError, Result};
use crate::transport::{EventSink, RadioModule, Transport, TransportEvent, TransportKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Module parameter holding the advertised identifier.
const PARAM_IDENTIFIER: &str = "BI";

/// Transport backed by a serial-attached relay radio.
pub struct RelayTransport {
    module: Box<dyn RadioModule>,
    connected: Arc<AtomicBool>,
    started: AtomicBool,
}

impl RelayTransport {
    pub fn new(module: Box<dyn RadioModule>) -> Self {
        Self {
            module,
            connected: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
        }
    }
}

impl Transport for RelayTransport {
    #[instrument(skip_all)]
    fn start(&self, sink: EventSink) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BleError::Transport("transport already started".into()));
        }

        let connected = Arc::clone(&self.connected);
        let tracking_sink: EventSink = Arc::new(move |event: TransportEvent| {
            match event {
                TransportEvent::Connected => connected.store(true, Ordering::SeqCst),
                TransportEvent::Disconnected => connected.store(false, Ordering::SeqCst),
                TransportEvent::Frame(_) => {}
            }
            sink(event);
        });
        self.module.set_event_sink(tracking_sink);

        self.module.enable_ble()?;
        info!("relay radio BLE stack enabled");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.connected.store(false, Ordering::SeqCst);
        self.module.disable_ble()?;
        debug!("relay radio BLE stack disabled");
        Ok(())
    }

    fn send(&self, frame: &[u8]) -> Result<()> {
        if !self.is_connected() {
            return Err(BleError::NotConnected);
        }
        self.module.transmit_relay(frame)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn configure_advertising_name(&self, name: &str) -> Result<()> {
        self.module
            .set_parameter(PARAM_IDENTIFIER, name.as_bytes())?;
        self.module.apply_changes()?;
        info!(name, "relay radio identifier updated");
        Ok(())
    }

    fn set_password(&self, password: &str) -> Result<()> {
        // the radio keeps its own copy for its on-module authentication
        self.module.set_password(password)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Relay
    }
}
