//! Connectivity facade tying a transport to the sensor store.
//!
//! [`ConnectivityService`] owns exactly one [`SensorTransport`] and forwards
//! its events into a [`SensorStore`]. At startup it probes the Bluetooth
//! adapter and falls back to the synthetic generator when none is usable, so
//! callers get a working pipeline on every host without branching on the
//! backend themselves.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use airsense_types::DeviceInfo;

use crate::error::Result;
use crate::events::TransportEvent;
use crate::native::BleTransport;
use crate::store::SensorStore;
use crate::synthetic::SyntheticTransport;
use crate::transport::{ScanOptions, SensorTransport, TransportMode};

/// Drives a sensor transport and keeps the store in sync with it.
pub struct ConnectivityService {
    transport: Arc<dyn SensorTransport>,
    store: Arc<SensorStore>,
    pump_cancel: CancellationToken,
}

impl ConnectivityService {
    /// Probe the Bluetooth adapter and start the service over the best
    /// available transport: real BLE when an adapter is usable, the
    /// synthetic generator otherwise.
    pub async fn start(store: Arc<SensorStore>) -> Result<Self> {
        let ble = BleTransport::new();
        let transport: Arc<dyn SensorTransport> = if ble.initialize().await? {
            info!("Using Bluetooth transport");
            Arc::new(ble)
        } else {
            info!("Bluetooth unavailable, using synthetic transport");
            let synthetic = SyntheticTransport::new();
            synthetic.initialize().await?;
            Arc::new(synthetic)
        };

        Ok(Self::with_transport(transport, store))
    }

    /// Start the service over an explicit transport. Used by tests and by
    /// callers that want to force a backend (e.g. a demo mode flag).
    pub fn with_transport(transport: Arc<dyn SensorTransport>, store: Arc<SensorStore>) -> Self {
        let pump_cancel = CancellationToken::new();
        spawn_event_pump(
            transport.subscribe_events(),
            Arc::clone(&store),
            pump_cancel.clone(),
        );
        Self {
            transport,
            store,
            pump_cancel,
        }
    }

    /// Which backend is active.
    pub fn mode(&self) -> TransportMode {
        self.transport.mode()
    }

    /// The store this service feeds.
    pub fn store(&self) -> &Arc<SensorStore> {
        &self.store
    }

    /// Start a device scan. Discovered devices land in the store's
    /// available-device list as they arrive.
    pub async fn start_scan(&self, options: ScanOptions) -> Result<()> {
        self.store.set_available_devices(Vec::new());
        self.transport.start_scan(options).await?;
        self.store.set_scanning(true);
        Ok(())
    }

    /// Stop an in-progress scan.
    pub async fn stop_scan(&self) -> Result<()> {
        self.transport.stop_scan().await
    }

    /// Connect to a device and start streaming its readings into the store.
    ///
    /// A connection that cannot stream is useless, so a streaming-setup
    /// failure rolls the transport back to disconnected before the error
    /// is returned; the caller never observes a half-connected device.
    pub async fn connect(&self, device_id: &str) -> Result<DeviceInfo> {
        let info = self.transport.connect(device_id).await?;
        if let Err(e) = self.transport.start_streaming().await {
            warn!(device_id, "Streaming setup failed, disconnecting: {}", e);
            self.transport.disconnect().await?;
            return Err(e);
        }
        Ok(info)
    }

    /// Disconnect from the current device.
    pub async fn disconnect(&self) -> Result<()> {
        self.transport.disconnect().await
    }

    /// Whether a device is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Tear everything down: transport, background pump. Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        self.transport.shutdown().await?;
        self.pump_cancel.cancel();
        Ok(())
    }
}

fn spawn_event_pump(
    mut events: tokio::sync::broadcast::Receiver<TransportEvent>,
    store: Arc<SensorStore>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Event pump cancelled");
                    break;
                }
                event = events.recv() => {
                    match event {
                        Ok(TransportEvent::Discovered { device }) => {
                            store.add_available_device(device);
                        }
                        Ok(TransportEvent::ScanStopped) => {
                            store.set_scanning(false);
                        }
                        Ok(TransportEvent::Connected { device }) => {
                            store.set_device(Some(device));
                        }
                        Ok(TransportEvent::Disconnected { device_id, reason }) => {
                            debug!(device_id, ?reason, "Device disconnected");
                            store.set_device(None);
                        }
                        Ok(TransportEvent::Reading { reading }) => {
                            store.update_reading(reading);
                        }
                        Ok(TransportEvent::Error { message }) => {
                            warn!("Transport error: {}", message);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Event pump lagged behind transport");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            debug!("Transport event channel closed");
                            break;
                        }
                    }
                }
            }
        }
    });
}
