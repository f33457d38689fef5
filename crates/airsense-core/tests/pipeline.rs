//! End-to-end pipeline tests over the synthetic transport.
//!
//! These run without hardware: the synthetic generator stands in for a real
//! sensor, so the whole scan → connect → stream → store → alert path can be
//! exercised deterministically.

use std::sync::Arc;
use std::time::Duration;

use airsense_core::persist::{JsonFileStore, KeyValueStore, MemoryStore, SETTINGS_KEY};
use airsense_core::synthetic::{SYNTHETIC_DEVICE_ID, SyntheticTransport};
use airsense_core::{
    ConnectivityService, Error, ScanOptions, SensorStore, SensorTransport, SettingsPatch,
    StoreEvent, TransportMode,
};
use airsense_types::AlertThresholds;

fn new_service() -> ConnectivityService {
    let store = Arc::new(SensorStore::new(Arc::new(MemoryStore::new())));
    ConnectivityService::with_transport(
        Arc::new(SyntheticTransport::with_interval(Duration::from_millis(50))),
        store,
    )
}

#[tokio::test]
async fn scan_connect_and_stream() {
    let service = new_service();
    assert_eq!(service.mode(), TransportMode::Synthetic);

    // Scan discovers the demo device
    service.start_scan(ScanOptions::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let devices = service.store().available_devices();
    assert_eq!(devices.len(), 1);
    let device_id = devices[0].id.clone();

    // Connect and wait for a few readings to land in the store
    service.connect(&device_id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(service.store().current_reading().is_some());
    assert!(service.store().history_len() >= 2);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn concurrent_connect_attempts_are_rejected() {
    let transport = Arc::new(SyntheticTransport::new());
    let first = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move { transport.connect(SYNTHETIC_DEVICE_ID).await })
    };

    // The synthetic connect takes a second, so this one races into the guard
    tokio::time::sleep(Duration::from_millis(100)).await;
    let err = transport.connect(SYNTHETIC_DEVICE_ID).await.unwrap_err();
    assert!(matches!(err, Error::ConnectInProgress));

    first.await.unwrap().unwrap();
    assert!(transport.is_connected());
}

#[tokio::test]
async fn lowered_thresholds_raise_alerts_from_synthetic_data() {
    let store = Arc::new(SensorStore::new(Arc::new(MemoryStore::new())));
    let service = ConnectivityService::with_transport(
        Arc::new(SyntheticTransport::with_interval(Duration::from_millis(50))),
        Arc::clone(&store),
    );

    // Every synthetic CO2 value is at least 400, so this always trips
    store
        .update_settings(SettingsPatch {
            thresholds: Some(AlertThresholds {
                co2_warning: 400,
                co2_critical: 5000,
                ..AlertThresholds::default()
            }),
            ..SettingsPatch::default()
        })
        .await;

    let mut events = store.subscribe();
    service.connect(SYNTHETIC_DEVICE_ID).await.unwrap();

    let mut saw_alert = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(StoreEvent::AlertRaised { alert })) => {
                assert!(alert.id.starts_with("co2-warning-"));
                saw_alert = true;
                break;
            }
            Ok(Ok(_)) => {}
            _ => break,
        }
    }
    assert!(saw_alert, "expected a CO2 warning alert");
    assert!(!store.active_alerts().is_empty());

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn settings_survive_a_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();

    {
        let persistence = Arc::new(JsonFileStore::with_dir(dir.path()));
        let store = SensorStore::new(persistence);
        store
            .update_settings(SettingsPatch {
                update_interval_secs: Some(60),
                sound_enabled: Some(true),
                ..SettingsPatch::default()
            })
            .await;
    }

    // Simulated restart: new store over the same directory
    let persistence = Arc::new(JsonFileStore::with_dir(dir.path()));
    assert!(persistence.get(SETTINGS_KEY).await.unwrap().is_some());

    let store = SensorStore::new(persistence);
    store.load_settings().await.unwrap();
    let settings = store.settings();
    assert_eq!(settings.update_interval_secs, 60);
    assert!(settings.sound_enabled);
}
