//! # BLE Service Facade
//!
//! One secure channel to one BLE central, end to end: the service selects a
//! transport at initialization, runs the authentication handshake over it,
//! and delivers decrypted application payloads to registered observers.
//!
//! ## Lifecycle
//! `initialize → start_service → (traffic) → stop_service`, with
//! [`BleService::wait_until_stopped`] available for a main task that should
//! park until someone stops the service. Stopping twice is safe; starting
//! while started is an error.
//!
//! ## Threading
//! Transport events arrive on the transport's own thread. The service keeps
//! its state behind locks and snapshots observer lists before invoking
//! them, so a callback may call back into the service without deadlocking.

use crate::config::BleConfig;
use crate::error::{constants, BleError, Result};
use crate::protocol::credentials::VerifierCredentials;
use crate::protocol::dispatcher::{Dispatch, Dispatcher};
use crate::protocol::session::Session;
use crate::transport::{
    select_transport, EventSink, GattPeripheral, RadioModule, Transport, TransportEvent,
    TransportKind,
};
use crate::utils::metrics::Metrics;
use crate::utils::{CallbackId, CallbackRegistry, StopGate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Observer invoked on connect and disconnect events.
pub type ConnectionCallback = dyn Fn() + Send + Sync;

/// Observer invoked with each decrypted inbound payload.
pub type DataCallback = dyn Fn(&[u8]) + Send + Sync;

/// Secure BLE channel service for one embedded device.
pub struct BleService {
    config: BleConfig,
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
    credentials: Arc<Mutex<Option<VerifierCredentials>>>,
    metrics: Arc<Metrics>,
    gate: Arc<StopGate>,
    running: AtomicBool,
    connect_callbacks: Arc<CallbackRegistry<ConnectionCallback>>,
    disconnect_callbacks: Arc<CallbackRegistry<ConnectionCallback>>,
    data_callbacks: Arc<CallbackRegistry<DataCallback>>,
}

impl BleService {
    /// Build a service over an already selected transport.
    pub fn new(config: BleConfig, transport: Box<dyn Transport>) -> Result<Self> {
        config.validate_strict()?;

        let session = Arc::new(Mutex::new(Session::new()));
        let credentials = Arc::new(Mutex::new(None));
        let metrics = Arc::new(Metrics::new());
        let dispatcher = Arc::new(Dispatcher::new(
            session,
            Arc::clone(&credentials),
            Arc::clone(&metrics),
        ));

        Ok(Self {
            config,
            transport: Arc::from(transport),
            dispatcher,
            credentials,
            metrics,
            gate: Arc::new(StopGate::new()),
            running: AtomicBool::new(false),
            connect_callbacks: Arc::new(CallbackRegistry::new()),
            disconnect_callbacks: Arc::new(CallbackRegistry::new()),
            data_callbacks: Arc::new(CallbackRegistry::new()),
        })
    }

    /// Detect the available radio and build a service over it.
    ///
    /// The local controller is preferred; a serial relay radio is probed as
    /// the fallback.
    ///
    /// # Errors
    /// Returns `BleError::BluetoothUnsupported` when the device has no BLE
    /// path at all.
    #[instrument(skip_all)]
    pub fn initialize(
        config: BleConfig,
        gatt: Option<Box<dyn GattPeripheral>>,
        radio: Option<Box<dyn RadioModule>>,
    ) -> Result<Self> {
        let transport = select_transport(&config, gatt, radio)?;
        info!(kind = %transport.kind(), "BLE transport selected");
        Self::new(config, transport)
    }

    /// Start the transport and begin accepting a central.
    ///
    /// # Errors
    /// Returns `BleError::ServiceActive` if the service is already running.
    #[instrument(skip_all)]
    pub fn start_service(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BleError::ServiceActive);
        }

        self.gate.arm();
        if let Err(e) = self.transport.start(self.event_sink()) {
            self.running.store(false, Ordering::SeqCst);
            self.gate.release();
            return Err(e);
        }

        info!(name = %self.config.service.advertising_name, "BLE service started");
        Ok(())
    }

    /// Stop the transport and release anyone parked on
    /// [`BleService::wait_until_stopped`]. Idempotent.
    #[instrument(skip_all)]
    pub fn stop_service(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("stop requested but the service is not running");
            return Ok(());
        }

        self.transport.stop()?;
        self.dispatcher.reset_session()?;
        self.gate.release();
        self.metrics.log_summary();
        info!("BLE service stopped");
        Ok(())
    }

    /// Park until the service is stopped. Returns immediately if the
    /// service is not running.
    pub async fn wait_until_stopped(&self) {
        self.gate.wait().await;
    }

    /// Encrypt and transmit one application payload to the connected peer.
    ///
    /// # Errors
    /// - `BleError::NotConnected`: no central is connected.
    /// - `BleError::NotAuthenticated`: the handshake has not completed.
    #[instrument(skip_all, fields(len = payload.len()))]
    pub fn send_data(&self, payload: &[u8]) -> Result<()> {
        if !self.transport.is_connected() {
            return Err(BleError::NotConnected);
        }
        let frame = self.dispatcher.encode_outbound(payload)?;
        self.transport.send(&frame)
    }

    /// Derive and install fresh verifier credentials from `password`.
    ///
    /// The plaintext password is not retained host-side; a relay radio
    /// receives its own copy for on-module use.
    ///
    /// # Errors
    /// Returns `BleError::ServiceActive` while the service is running: key
    /// material is never swapped under a live session.
    pub fn set_password(&self, password: &str) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(BleError::ServiceActive);
        }

        let credentials = VerifierCredentials::derive(password);
        *self
            .credentials
            .lock()
            .map_err(|_| BleError::Custom(constants::ERR_SESSION_POISONED.into()))? =
            Some(credentials);
        self.transport.set_password(password)?;
        info!("authentication password updated");
        Ok(())
    }

    /// Change the name advertised to scanning centrals.
    pub fn configure_advertising_name(&self, name: &str) -> Result<()> {
        self.transport.configure_advertising_name(name)
    }

    /// Whether a central is currently connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Whether the connected central has completed the handshake.
    pub fn authenticated(&self) -> Result<bool> {
        self.dispatcher.authenticated()
    }

    /// Which radio backs the active transport.
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Observability counters for this service instance.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Register an observer for central connections.
    pub fn add_connect_callback(&self, callback: Arc<ConnectionCallback>) -> CallbackId {
        self.connect_callbacks.add(callback)
    }

    /// Remove a previously registered connect observer.
    pub fn del_connect_callback(&self, id: CallbackId) {
        self.connect_callbacks.remove(id);
    }

    /// Register an observer for central disconnections.
    pub fn add_disconnect_callback(&self, callback: Arc<ConnectionCallback>) -> CallbackId {
        self.disconnect_callbacks.add(callback)
    }

    /// Remove a previously registered disconnect observer.
    pub fn del_disconnect_callback(&self, id: CallbackId) {
        self.disconnect_callbacks.remove(id);
    }

    /// Register an observer for decrypted inbound payloads.
    pub fn add_data_callback(&self, callback: Arc<DataCallback>) -> CallbackId {
        self.data_callbacks.add(callback)
    }

    /// Remove a previously registered data observer.
    pub fn del_data_callback(&self, id: CallbackId) {
        self.data_callbacks.remove(id);
    }

    /// Build the sink the transport drives with connection and frame events.
    fn event_sink(&self) -> EventSink {
        let dispatcher = Arc::clone(&self.dispatcher);
        let transport = Arc::clone(&self.transport);
        let metrics = Arc::clone(&self.metrics);
        let connect_callbacks = Arc::clone(&self.connect_callbacks);
        let disconnect_callbacks = Arc::clone(&self.disconnect_callbacks);
        let data_callbacks = Arc::clone(&self.data_callbacks);

        Arc::new(move |event: TransportEvent| match event {
            TransportEvent::Connected => {
                Metrics::incr(&metrics.connections_total);
                // each connection starts from a clean, unauthenticated session
                if let Err(e) = dispatcher.reset_session() {
                    warn!(error = %e, "session reset on connect failed");
                }
                info!("central connected");
                for callback in connect_callbacks.snapshot() {
                    callback();
                }
            }
            TransportEvent::Disconnected => {
                if let Err(e) = dispatcher.reset_session() {
                    warn!(error = %e, "session reset on disconnect failed");
                }
                info!("central disconnected");
                for callback in disconnect_callbacks.snapshot() {
                    callback();
                }
            }
            TransportEvent::Frame(raw) => match dispatcher.dispatch_inbound(&raw) {
                Ok(Dispatch::Reply(frame)) => {
                    if let Err(e) = transport.send(&frame) {
                        warn!(error = %e, "handshake reply could not be sent");
                    }
                }
                Ok(Dispatch::Deliver(payload)) => {
                    for callback in data_callbacks.snapshot() {
                        callback(&payload);
                    }
                }
                Ok(Dispatch::Ignored) => {}
                // the receive path aborts for this frame; the session is
                // untouched and the next frame is processed normally
                Err(e) => warn!(error = %e, "inbound frame rejected"),
            },
        })
    }
}

impl std::fmt::Debug for BleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleService")
            .field("kind", &self.transport.kind())
            .field("running", &self.running.load(Ordering::SeqCst))
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
