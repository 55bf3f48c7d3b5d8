//! # Local GATT Transport
//!
//! Frame channel over the host's own Bluetooth controller. The controller
//! advertises the configured name, accepts a single central, and carries
//! frames over a characteristic notification pair.
//!
//! Connection tracking lives here: the peripheral's events are observed on
//! their way to the session layer so [`Transport::is_connected`] answers
//! without a round-trip to the controller.

use crate::config::MAX_ADVERTISING_NAME_LEN;
use crate::error::{BleError, Result};
use crate::transport::{EventSink, GattPeripheral, Transport, TransportEvent, TransportKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// Transport backed by the host Bluetooth controller.
pub struct LocalTransport {
    peripheral: Box<dyn GattPeripheral>,
    advertising_name: Mutex<String>,
    connected: Arc<AtomicBool>,
    started: AtomicBool,
}

impl LocalTransport {
    pub fn new(peripheral: Box<dyn GattPeripheral>, advertising_name: String) -> Self {
        Self {
            peripheral,
            advertising_name: Mutex::new(advertising_name),
            connected: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
        }
    }

    fn current_name(&self) -> String {
        self.advertising_name
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Transport for LocalTransport {
    #[instrument(skip_all)]
    fn start(&self, sink: EventSink) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BleError::Transport("transport already started".into()));
        }

        // observe connection state on the way past
        let connected = Arc::clone(&self.connected);
        let tracking_sink: EventSink = Arc::new(move |event: TransportEvent| {
            match event {
                TransportEvent::Connected => connected.store(true, Ordering::SeqCst),
                TransportEvent::Disconnected => connected.store(false, Ordering::SeqCst),
                TransportEvent::Frame(_) => {}
            }
            sink(event);
        });
        self.peripheral.set_event_sink(tracking_sink);

        let name = self.current_name();
        self.peripheral.start_advertising(&name)?;
        info!(name, "advertising as a GATT peripheral");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.connected.store(false, Ordering::SeqCst);
        self.peripheral.stop_advertising()?;
        debug!("stopped advertising");
        Ok(())
    }

    fn send(&self, frame: &[u8]) -> Result<()> {
        if !self.is_connected() {
            return Err(BleError::NotConnected);
        }
        self.peripheral.notify(frame)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn configure_advertising_name(&self, name: &str) -> Result<()> {
        if name.is_empty() || name.len() > MAX_ADVERTISING_NAME_LEN || !name.is_ascii() {
            return Err(BleError::Config(format!(
                "invalid advertising name: {name:?}"
            )));
        }

        *self
            .advertising_name
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = name.to_string();

        // a live advertisement picks the new name up immediately
        if self.started.load(Ordering::SeqCst) {
            self.peripheral.stop_advertising()?;
            self.peripheral.start_advertising(name)?;
            info!(name, "advertising name updated");
        }
        Ok(())
    }

    fn set_password(&self, _password: &str) -> Result<()> {
        // nothing to push to hardware: the verifier lives host-side
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Local
    }
}
