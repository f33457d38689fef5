//! Event system for connection and reading notifications.
//!
//! Transports and the store broadcast their state changes through
//! [`tokio::sync::broadcast`] channels so multiple consumers (UI, logging,
//! tests) can observe them independently.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use airsense_types::{Alert, DeviceInfo, SensorReading};

/// Events emitted by a sensor transport.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum TransportEvent {
    /// A device was discovered during scanning.
    Discovered { device: DeviceInfo },
    /// Scanning stopped (timeout or explicit stop).
    ScanStopped,
    /// Successfully connected to a device.
    Connected { device: DeviceInfo },
    /// Disconnected from the device.
    Disconnected {
        device_id: String,
        reason: DisconnectReason,
    },
    /// A complete reading was assembled from notifications.
    Reading { reading: SensorReading },
    /// A non-fatal error occurred during transport operation.
    Error { message: String },
}

/// Reason for disconnection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// Normal disconnection requested by the user.
    UserRequested,
    /// The peripheral dropped the link.
    LinkLost,
    /// Transport is shutting down.
    Shutdown,
    /// BLE error occurred.
    BleError(String),
    /// Unknown reason.
    Unknown,
}

/// Events emitted by the sensor store.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum StoreEvent {
    /// Current reading replaced and appended to history.
    ReadingUpdated { reading: SensorReading },
    /// A new alert was raised.
    AlertRaised { alert: Alert },
    /// An alert was dismissed.
    AlertDismissed { alert_id: String },
    /// Settings were changed.
    SettingsUpdated,
    /// Connected device changed (or cleared).
    DeviceChanged { device: Option<DeviceInfo> },
    /// Historical readings were cleared.
    HistoryCleared,
}

/// Sender half of a transport event channel.
pub type TransportEventSender = broadcast::Sender<TransportEvent>;

/// Receiver half of a transport event channel.
pub type TransportEventReceiver = broadcast::Receiver<TransportEvent>;

/// Event dispatcher fanning events out to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> EventDispatcher<E> {
    /// Create a new event dispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: E) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: Clone> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatcher_fan_out() {
        let dispatcher: EventDispatcher<TransportEvent> = EventDispatcher::new(8);
        let mut rx1 = dispatcher.subscribe();
        let mut rx2 = dispatcher.subscribe();
        assert_eq!(dispatcher.receiver_count(), 2);

        dispatcher.send(TransportEvent::ScanStopped);

        assert!(matches!(rx1.recv().await, Ok(TransportEvent::ScanStopped)));
        assert!(matches!(rx2.recv().await, Ok(TransportEvent::ScanStopped)));
    }

    #[test]
    fn test_send_without_receivers_is_ok() {
        let dispatcher: EventDispatcher<StoreEvent> = EventDispatcher::default();
        dispatcher.send(StoreEvent::HistoryCleared);
    }

    #[test]
    fn test_event_serialization() {
        let event = TransportEvent::Disconnected {
            device_id: "demo".to_string(),
            reason: DisconnectReason::UserRequested,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"disconnected\""));
    }
}
