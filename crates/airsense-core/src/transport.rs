//! Transport abstraction over sensor backends.
//!
//! This module provides the [`SensorTransport`] trait that abstracts over the
//! native BLE backend and the synthetic generator, so the rest of the
//! application never branches on where readings come from.

use std::time::Duration;

use async_trait::async_trait;

use airsense_types::{DEFAULT_SCAN_TIMEOUT_MS, DeviceInfo};

use crate::error::Result;
use crate::events::TransportEventReceiver;

/// Where readings are coming from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Real Bluetooth Low Energy hardware.
    Ble,
    /// Synthetic reading generator.
    Synthetic,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ble => write!(f, "ble"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Options for device scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan before stopping automatically.
    pub timeout: Duration,
    /// Only report devices whose name carries the expected prefix.
    pub filter_by_name: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS),
            filter_by_name: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Report all devices, not just those matching the name prefix.
    #[must_use]
    pub fn all_devices(mut self) -> Self {
        self.filter_by_name = false;
        self
    }
}

/// Trait abstracting sensor transport operations.
///
/// Implementations exist for real BLE hardware ([`crate::BleTransport`]) and
/// for the synthetic generator ([`crate::SyntheticTransport`]). Consumers hold
/// a `Box<dyn SensorTransport>` and never care which one is behind it.
///
/// Discovered devices and assembled readings are delivered through the event
/// channel returned by [`subscribe_events`](Self::subscribe_events); the
/// methods here drive the transport's lifecycle.
#[async_trait]
pub trait SensorTransport: Send + Sync {
    /// Which backend this transport is.
    fn mode(&self) -> TransportMode;

    /// Check whether the backend is usable on this host.
    ///
    /// Returns `Ok(false)` (rather than an error) when the backend is simply
    /// absent, so callers can fall back to another transport.
    async fn initialize(&self) -> Result<bool>;

    /// Start scanning for devices.
    ///
    /// Discovered devices are emitted as [`TransportEvent::Discovered`]
    /// events while the scan runs. The scan stops on its own after
    /// `options.timeout` and emits [`TransportEvent::ScanStopped`].
    ///
    /// Returns [`crate::Error::ScanInProgress`] if a scan is already running.
    ///
    /// [`TransportEvent::Discovered`]: crate::events::TransportEvent::Discovered
    /// [`TransportEvent::ScanStopped`]: crate::events::TransportEvent::ScanStopped
    async fn start_scan(&self, options: ScanOptions) -> Result<()>;

    /// Stop an in-progress scan. A no-op when no scan is running.
    async fn stop_scan(&self) -> Result<()>;

    /// Connect to a discovered device by its identifier.
    ///
    /// Returns [`crate::Error::ConnectInProgress`] if another connection
    /// attempt is still running.
    async fn connect(&self, device_id: &str) -> Result<DeviceInfo>;

    /// Disconnect from the current device. A no-op when not connected.
    async fn disconnect(&self) -> Result<()>;

    /// Whether a device is currently connected.
    fn is_connected(&self) -> bool;

    /// Start streaming readings from the connected device.
    ///
    /// Readings are emitted as [`TransportEvent::Reading`] events until
    /// [`disconnect`](Self::disconnect) or [`shutdown`](Self::shutdown).
    ///
    /// [`TransportEvent::Reading`]: crate::events::TransportEvent::Reading
    async fn start_streaming(&self) -> Result<()>;

    /// Subscribe to this transport's event channel.
    fn subscribe_events(&self) -> TransportEventReceiver;

    /// Tear the transport down: stop scanning, disconnect, cancel background
    /// tasks. Idempotent.
    async fn shutdown(&self) -> Result<()>;
}
