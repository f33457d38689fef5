//! Central application state: readings, history, alerts, settings.
//!
//! [`SensorStore`] is the single owner of UI-facing state. Transports feed
//! readings in, frontends subscribe to [`StoreEvent`]s and read snapshots
//! out. History is bounded: the store keeps the most recent
//! [`HISTORY_CAP`] readings and drops the oldest beyond that.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use airsense_types::{
    Alert, AppSettings, DeviceInfo, SensorReading, SettingsPatch,
};

use crate::alerts;
use crate::error::Result;
use crate::events::{EventDispatcher, StoreEvent};
use crate::persist::{KeyValueStore, SETTINGS_KEY};

/// Maximum number of readings retained in history.
pub const HISTORY_CAP: usize = 1000;

#[derive(Debug, Default)]
struct StoreState {
    device: Option<DeviceInfo>,
    available_devices: Vec<DeviceInfo>,
    is_scanning: bool,
    current_reading: Option<SensorReading>,
    history: VecDeque<SensorReading>,
    active_alerts: Vec<Alert>,
    settings: AppSettings,
}

/// Shared application state with event broadcasting.
pub struct SensorStore {
    state: RwLock<StoreState>,
    events: EventDispatcher<StoreEvent>,
    persistence: Arc<dyn KeyValueStore>,
}

impl SensorStore {
    /// Create a store backed by the given persistence layer.
    pub fn new(persistence: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            events: EventDispatcher::default(),
            persistence,
        }
    }

    /// Subscribe to store events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // --- Readings and history ---

    /// Record a new reading: replaces the current reading, appends to
    /// history (dropping the oldest beyond [`HISTORY_CAP`]), and derives
    /// threshold alerts.
    pub fn update_reading(&self, reading: SensorReading) {
        let new_alerts = {
            let mut state = self.state.write().expect("lock poisoned");
            state.current_reading = Some(reading.clone());
            state.history.push_back(reading.clone());
            while state.history.len() > HISTORY_CAP {
                state.history.pop_front();
            }

            let new_alerts = alerts::evaluate(&reading, &state.settings.thresholds);
            state.active_alerts.extend(new_alerts.iter().cloned());
            new_alerts
        };

        self.events.send(StoreEvent::ReadingUpdated { reading });
        for alert in new_alerts {
            debug!(alert_id = %alert.id, "Alert raised");
            self.events.send(StoreEvent::AlertRaised { alert });
        }
    }

    /// The most recent reading, if any.
    pub fn current_reading(&self) -> Option<SensorReading> {
        self.state
            .read()
            .expect("lock poisoned")
            .current_reading
            .clone()
    }

    /// Snapshot of the retained history, oldest first.
    pub fn history(&self) -> Vec<SensorReading> {
        self.state
            .read()
            .expect("lock poisoned")
            .history
            .iter()
            .cloned()
            .collect()
    }

    /// Number of retained readings.
    pub fn history_len(&self) -> usize {
        self.state.read().expect("lock poisoned").history.len()
    }

    /// Drop all historical readings. The current reading is kept.
    pub fn clear_history(&self) {
        self.state.write().expect("lock poisoned").history.clear();
        self.events.send(StoreEvent::HistoryCleared);
    }

    // --- Alerts ---

    /// Append an alert directly (outside the evaluation pass).
    pub fn add_alert(&self, alert: Alert) {
        self.state
            .write()
            .expect("lock poisoned")
            .active_alerts
            .push(alert.clone());
        self.events.send(StoreEvent::AlertRaised { alert });
    }

    /// Dismiss an alert by id. A no-op for unknown ids.
    pub fn remove_alert(&self, alert_id: &str) {
        let removed = {
            let mut state = self.state.write().expect("lock poisoned");
            let before = state.active_alerts.len();
            state.active_alerts.retain(|a| a.id != alert_id);
            state.active_alerts.len() != before
        };
        if removed {
            self.events.send(StoreEvent::AlertDismissed {
                alert_id: alert_id.to_string(),
            });
        }
    }

    /// Snapshot of active alerts in creation order.
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.state
            .read()
            .expect("lock poisoned")
            .active_alerts
            .clone()
    }

    // --- Device and scan state ---

    /// Record the connected device (or `None` after disconnect).
    pub fn set_device(&self, device: Option<DeviceInfo>) {
        self.state.write().expect("lock poisoned").device = device.clone();
        self.events.send(StoreEvent::DeviceChanged { device });
    }

    /// The connected device, if any.
    pub fn device(&self) -> Option<DeviceInfo> {
        self.state.read().expect("lock poisoned").device.clone()
    }

    /// Record whether a scan is running.
    pub fn set_scanning(&self, is_scanning: bool) {
        self.state.write().expect("lock poisoned").is_scanning = is_scanning;
    }

    /// Whether a scan is running.
    pub fn is_scanning(&self) -> bool {
        self.state.read().expect("lock poisoned").is_scanning
    }

    /// Replace the list of discovered devices.
    pub fn set_available_devices(&self, devices: Vec<DeviceInfo>) {
        self.state.write().expect("lock poisoned").available_devices = devices;
    }

    /// Add a discovered device, replacing any previous entry with the same id.
    pub fn add_available_device(&self, device: DeviceInfo) {
        let mut state = self.state.write().expect("lock poisoned");
        state.available_devices.retain(|d| d.id != device.id);
        state.available_devices.push(device);
    }

    /// Snapshot of discovered devices.
    pub fn available_devices(&self) -> Vec<DeviceInfo> {
        self.state
            .read()
            .expect("lock poisoned")
            .available_devices
            .clone()
    }

    // --- Settings ---

    /// Snapshot of the current settings.
    pub fn settings(&self) -> AppSettings {
        self.state.read().expect("lock poisoned").settings.clone()
    }

    /// Apply a settings patch and persist the result.
    ///
    /// Persistence is best-effort: a failed write keeps the in-memory
    /// settings and logs a warning, matching interactive expectations (the
    /// toggle the user flipped stays flipped).
    pub async fn update_settings(&self, patch: SettingsPatch) {
        {
            let mut state = self.state.write().expect("lock poisoned");
            state.settings.apply(patch);
        }
        self.events.send(StoreEvent::SettingsUpdated);

        if let Err(e) = self.save_settings().await {
            warn!("Failed to persist settings: {}", e);
        }
    }

    /// Load persisted settings, if any.
    ///
    /// Missing keys leave the defaults in place. A corrupt document is
    /// logged and ignored rather than wiping the user's defaults.
    pub async fn load_settings(&self) -> Result<()> {
        let Some(stored) = self.persistence.get(SETTINGS_KEY).await? else {
            debug!("No persisted settings, using defaults");
            return Ok(());
        };

        match serde_json::from_str::<AppSettings>(&stored) {
            Ok(settings) => {
                self.state.write().expect("lock poisoned").settings = settings;
                self.events.send(StoreEvent::SettingsUpdated);
            }
            Err(e) => {
                warn!("Ignoring corrupt persisted settings: {}", e);
            }
        }
        Ok(())
    }

    /// Persist the current settings.
    pub async fn save_settings(&self) -> Result<()> {
        let json = serde_json::to_string(&self.settings())?;
        self.persistence.set(SETTINGS_KEY, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;
    use airsense_types::AlertThresholds;

    fn store() -> SensorStore {
        SensorStore::new(Arc::new(MemoryStore::new()))
    }

    fn reading(co2: u16, timestamp_ms: i64) -> SensorReading {
        SensorReading {
            co2,
            temperature: 22.0,
            humidity: 48.0,
            voc: 100,
            nox: 80,
            timestamp_ms,
        }
    }

    #[tokio::test]
    async fn test_update_reading_sets_current_and_history() {
        let store = store();
        store.update_reading(reading(650, 1));
        store.update_reading(reading(700, 2));

        assert_eq!(store.current_reading().unwrap().co2, 700);
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].co2, 650);
        assert_eq!(history[1].co2, 700);
    }

    #[tokio::test]
    async fn test_history_is_bounded_fifo() {
        let store = store();
        for i in 0..(HISTORY_CAP as i64 + 50) {
            store.update_reading(reading(650, i));
        }
        assert_eq!(store.history_len(), HISTORY_CAP);
        // Oldest 50 were dropped
        assert_eq!(store.history()[0].timestamp_ms, 50);
    }

    #[tokio::test]
    async fn test_threshold_crossing_raises_alert() {
        let store = store();
        let mut events = store.subscribe();

        store.update_reading(reading(1500, 1));

        let alerts = store.active_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "co2-critical-1");

        assert!(matches!(
            events.try_recv(),
            Ok(StoreEvent::ReadingUpdated { .. })
        ));
        assert!(matches!(
            events.try_recv(),
            Ok(StoreEvent::AlertRaised { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_alert_is_idempotent() {
        let store = store();
        store.update_reading(reading(1500, 1));
        assert_eq!(store.active_alerts().len(), 1);

        store.remove_alert("co2-critical-1");
        assert!(store.active_alerts().is_empty());

        // Second removal of the same id is a no-op
        store.remove_alert("co2-critical-1");
        assert!(store.active_alerts().is_empty());
    }

    #[tokio::test]
    async fn test_clear_history_keeps_current_reading() {
        let store = store();
        store.update_reading(reading(650, 1));
        store.clear_history();
        assert_eq!(store.history_len(), 0);
        assert!(store.current_reading().is_some());
    }

    #[tokio::test]
    async fn test_add_available_device_replaces_by_id() {
        let store = store();
        let mut device = DeviceInfo {
            id: "a".to_string(),
            name: "AirSense".to_string(),
            rssi: Some(-50),
            is_connected: false,
            battery_level: None,
        };
        store.add_available_device(device.clone());
        device.rssi = Some(-42);
        store.add_available_device(device);

        let devices = store.available_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].rssi, Some(-42));
    }

    #[tokio::test]
    async fn test_settings_persist_and_reload() {
        let persistence = Arc::new(MemoryStore::new());
        let store = SensorStore::new(Arc::clone(&persistence) as Arc<dyn KeyValueStore>);

        store
            .update_settings(SettingsPatch {
                dark_mode: Some(false),
                thresholds: Some(AlertThresholds {
                    co2_warning: 900,
                    ..AlertThresholds::default()
                }),
                ..SettingsPatch::default()
            })
            .await;

        // A fresh store over the same persistence sees the saved settings
        let reloaded = SensorStore::new(persistence);
        reloaded.load_settings().await.unwrap();
        let settings = reloaded.settings();
        assert!(!settings.dark_mode);
        assert_eq!(settings.thresholds.co2_warning, 900);
    }

    #[tokio::test]
    async fn test_corrupt_settings_fall_back_to_defaults() {
        let persistence = Arc::new(MemoryStore::new());
        persistence.set(SETTINGS_KEY, "not json").await.unwrap();

        let store = SensorStore::new(persistence);
        store.load_settings().await.unwrap();
        assert_eq!(store.settings(), AppSettings::default());
    }

    #[tokio::test]
    async fn test_custom_thresholds_drive_alert_evaluation() {
        let store = store();
        store
            .update_settings(SettingsPatch {
                thresholds: Some(AlertThresholds {
                    co2_warning: 600,
                    ..AlertThresholds::default()
                }),
                ..SettingsPatch::default()
            })
            .await;

        store.update_reading(reading(650, 1));
        let alerts = store.active_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "co2-warning-1");
    }
}
