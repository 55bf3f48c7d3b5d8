//! Service lifecycle, transport selection, and observer management.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use ble_link::config::BleConfig;
use ble_link::error::BleError;
use ble_link::service::BleService;
use ble_link::transport::{TransportEvent, TransportKind};
use common::{FakePeripheral, FakeRadio, PeripheralHandle, RadioHandle};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn local_service() -> (BleService, Arc<FakePeripheral>) {
    let peripheral = FakePeripheral::available();
    let service = BleService::initialize(
        BleConfig::default(),
        Some(Box::new(PeripheralHandle(Arc::clone(&peripheral)))),
        None,
    )
    .unwrap();
    (service, peripheral)
}

#[test]
fn test_initialize_prefers_the_local_controller() {
    let (service, _peripheral) = local_service();
    assert_eq!(service.transport_kind(), TransportKind::Local);
}

#[test]
fn test_initialize_falls_back_to_the_relay_radio() {
    let radio = FakeRadio::answering_at(115_200);
    let service =
        BleService::initialize(BleConfig::default(), None, Some(Box::new(RadioHandle(radio))))
            .unwrap();
    assert_eq!(service.transport_kind(), TransportKind::Relay);
}

#[test]
fn test_initialize_without_any_radio_fails() {
    assert!(matches!(
        BleService::initialize(BleConfig::default(), None, None),
        Err(BleError::BluetoothUnsupported)
    ));
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let config = BleConfig::default_with_overrides(|c| {
        c.service.advertising_name = String::new();
    });
    let peripheral = FakePeripheral::available();
    assert!(matches!(
        BleService::initialize(config, Some(Box::new(PeripheralHandle(peripheral))), None),
        Err(BleError::Config(_))
    ));
}

#[test]
fn test_start_twice_is_an_error() {
    let (service, _peripheral) = local_service();
    service.start_service().unwrap();
    assert!(matches!(
        service.start_service(),
        Err(BleError::ServiceActive)
    ));
}

#[test]
fn test_stop_is_idempotent() {
    let (service, _peripheral) = local_service();
    service.stop_service().unwrap();

    service.start_service().unwrap();
    service.stop_service().unwrap();
    service.stop_service().unwrap();

    // a stopped service can be started again
    service.start_service().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wait_until_stopped_parks_until_stop() {
    let (service, _peripheral) = local_service();
    service.start_service().unwrap();

    let service = Arc::new(service);
    let waiter = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.wait_until_stopped().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    service.stop_service().unwrap();
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should be released")
        .expect("waiter task should not panic");
}

#[tokio::test]
async fn test_wait_on_a_never_started_service_returns() {
    let (service, _peripheral) = local_service();
    service.wait_until_stopped().await;
}

#[test]
fn test_send_data_requires_a_connection() {
    let (service, peripheral) = local_service();
    service.start_service().unwrap();
    assert!(matches!(
        service.send_data(b"hello"),
        Err(BleError::NotConnected)
    ));

    peripheral.emit(TransportEvent::Connected);
    // connected but unauthenticated still refuses, one layer deeper
    assert!(matches!(
        service.send_data(b"hello"),
        Err(BleError::NotAuthenticated)
    ));
}

#[test]
fn test_password_change_requires_a_stopped_service() {
    let (service, _peripheral) = local_service();
    service.start_service().unwrap();
    assert!(matches!(
        service.set_password("hunter2"),
        Err(BleError::ServiceActive)
    ));

    service.stop_service().unwrap();
    service.set_password("hunter2").unwrap();
}

#[test]
fn test_password_is_forwarded_to_the_relay_radio() {
    let radio = FakeRadio::answering_at(9600);
    let service = BleService::initialize(
        BleConfig::default(),
        None,
        Some(Box::new(RadioHandle(Arc::clone(&radio)))),
    )
    .unwrap();

    service.set_password("hunter2").unwrap();
    assert_eq!(radio.password.lock().unwrap().as_deref(), Some("hunter2"));
}

#[test]
fn test_connection_observers_fire_in_order() {
    let (service, peripheral) = local_service();

    let connects = Arc::new(AtomicU32::new(0));
    let disconnects = Arc::new(AtomicU32::new(0));

    let connects_clone = Arc::clone(&connects);
    service.add_connect_callback(Arc::new(move || {
        connects_clone.fetch_add(1, Ordering::SeqCst);
    }));
    let disconnects_clone = Arc::clone(&disconnects);
    service.add_disconnect_callback(Arc::new(move || {
        disconnects_clone.fetch_add(1, Ordering::SeqCst);
    }));

    service.start_service().unwrap();
    peripheral.emit(TransportEvent::Connected);
    peripheral.emit(TransportEvent::Disconnected);
    peripheral.emit(TransportEvent::Connected);

    assert_eq!(connects.load(Ordering::SeqCst), 2);
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(service.metrics().connections_total.load(Ordering::SeqCst), 2);
}

#[test]
fn test_removed_observer_stays_silent() {
    let (service, peripheral) = local_service();

    let hits = Arc::new(AtomicU32::new(0));
    let hits_clone = Arc::clone(&hits);
    let id = service.add_connect_callback(Arc::new(move || {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    }));

    service.start_service().unwrap();
    peripheral.emit(TransportEvent::Connected);
    service.del_connect_callback(id);
    peripheral.emit(TransportEvent::Disconnected);
    peripheral.emit(TransportEvent::Connected);

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_advertising_name_reaches_the_peripheral() {
    let config = BleConfig::default_with_overrides(|c| {
        c.service.advertising_name = String::from("lab-42");
    });
    let peripheral = FakePeripheral::available();
    let service = BleService::initialize(
        config,
        Some(Box::new(PeripheralHandle(Arc::clone(&peripheral)))),
        None,
    )
    .unwrap();

    service.start_service().unwrap();
    assert_eq!(
        peripheral.advertised_name.lock().unwrap().as_deref(),
        Some("lab-42")
    );

    service.configure_advertising_name("lab-43").unwrap();
    assert_eq!(
        peripheral.advertised_name.lock().unwrap().as_deref(),
        Some("lab-43")
    );
}
