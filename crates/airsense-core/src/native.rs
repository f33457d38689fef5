//! Native Bluetooth Low Energy transport built on btleplug.
//!
//! [`BleTransport`] implements [`SensorTransport`] against real hardware:
//! it probes the adapter, runs name-filtered scans with a timeout, connects
//! and discovers the sensor's GATT services, then pumps characteristic
//! notifications through a [`ReadingAssembler`] to produce complete readings.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use airsense_types::ble::{
    AIRSENSE_SERVICE, BATTERY_LEVEL_CHARACTERISTIC, DEVICE_NAME_PREFIX,
    ENVIRONMENTAL_SENSING_SERVICE, characteristic_for_metric, metric_for_characteristic,
};
use airsense_types::{DeviceInfo, Metric, ReadingAssembler};

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::events::{
    DisconnectReason, EventDispatcher, TransportEvent, TransportEventReceiver,
};
use crate::transport::{ScanOptions, SensorTransport, TransportMode};

/// Render a [`PeripheralId`] as a plain string.
///
/// The Debug form wraps the inner identifier in `PeripheralId(...)`; this
/// strips the wrapper so the value can be shown to users and compared
/// against identifiers they paste back in.
fn peripheral_id_string(id: &btleplug::platform::PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Pick a stable device identifier from an advertised address and the
/// platform peripheral id.
///
/// macOS reports every address as all zeros, so the peripheral id is the
/// only usable handle there; everywhere else the Bluetooth address wins.
fn device_identifier(address: &str, id: &btleplug::platform::PeripheralId) -> String {
    if address == "00:00:00:00:00:00" {
        peripheral_id_string(id)
    } else {
        address.to_string()
    }
}

/// Sensor transport backed by a native Bluetooth adapter.
pub struct BleTransport {
    dispatcher: EventDispatcher<TransportEvent>,
    adapter: RwLock<Option<Adapter>>,
    peripheral: Arc<RwLock<Option<Peripheral>>>,
    connected: Arc<AtomicBool>,
    scanning: Arc<AtomicBool>,
    connect_busy: AtomicBool,
    scan_cancel: std::sync::Mutex<Option<CancellationToken>>,
    stream_cancel: std::sync::Mutex<Option<CancellationToken>>,
}

impl BleTransport {
    /// Create a transport. Call [`initialize`](SensorTransport::initialize)
    /// before anything else to probe the adapter.
    pub fn new() -> Self {
        Self {
            dispatcher: EventDispatcher::default(),
            adapter: RwLock::new(None),
            peripheral: Arc::new(RwLock::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            scanning: Arc::new(AtomicBool::new(false)),
            connect_busy: AtomicBool::new(false),
            scan_cancel: std::sync::Mutex::new(None),
            stream_cancel: std::sync::Mutex::new(None),
        }
    }

    async fn adapter(&self) -> Result<Adapter> {
        self.adapter
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::BluetoothUnavailable("adapter not initialized".to_string()))
    }

    /// Describe a discovered peripheral, filtering by advertised name.
    async fn describe_peripheral(
        peripheral: &Peripheral,
        filter_by_name: bool,
    ) -> Result<Option<DeviceInfo>> {
        let Some(props) = peripheral.properties().await? else {
            return Ok(None);
        };

        let name = props.local_name.clone();
        if filter_by_name
            && !name
                .as_deref()
                .is_some_and(|n| n.contains(DEVICE_NAME_PREFIX))
        {
            return Ok(None);
        }

        let address = props.address.to_string();
        let id = device_identifier(&address, &peripheral.id());

        Ok(Some(DeviceInfo {
            id,
            name: name.unwrap_or_else(|| "Unknown".to_string()),
            rssi: props.rssi,
            is_connected: false,
            battery_level: None,
        }))
    }

    /// Search the adapter's known peripherals for one matching the identifier.
    async fn find_peripheral(&self, adapter: &Adapter, identifier: &str) -> Result<Peripheral> {
        let identifier_lower = identifier.to_lowercase();

        for peripheral in adapter.peripherals().await? {
            let peripheral_id = peripheral_id_string(&peripheral.id()).to_lowercase();
            if peripheral_id == identifier_lower {
                return Ok(peripheral);
            }

            if let Ok(Some(props)) = peripheral.properties().await {
                let address = props.address.to_string().to_lowercase();
                if address != "00:00:00:00:00:00" && address == identifier_lower {
                    return Ok(peripheral);
                }
                if let Some(name) = &props.local_name
                    && name.to_lowercase() == identifier_lower
                {
                    return Ok(peripheral);
                }
            }
        }

        Err(Error::device_not_found(identifier))
    }

    /// Find a characteristic by UUID across the peripheral's services.
    fn find_characteristic(
        peripheral: &Peripheral,
        uuid: uuid::Uuid,
    ) -> Result<btleplug::api::Characteristic> {
        let services = peripheral.services();
        let service_count = services.len();
        services
            .iter()
            .flat_map(|s| s.characteristics.iter())
            .find(|c| c.uuid == uuid)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(uuid.to_string(), service_count))
    }

    /// Read the battery level if the peripheral exposes it.
    async fn read_battery(peripheral: &Peripheral) -> Option<u8> {
        let characteristic = Self::find_characteristic(peripheral, BATTERY_LEVEL_CHARACTERISTIC)
            .ok()?;
        match peripheral.read(&characteristic).await {
            Ok(data) => data.first().copied(),
            Err(e) => {
                debug!("Battery read failed: {}", e);
                None
            }
        }
    }

    fn cancel_scan_task(&self) {
        if let Some(token) = self.scan_cancel.lock().expect("lock poisoned").take() {
            token.cancel();
        }
    }

    fn cancel_stream_task(&self) {
        if let Some(token) = self.stream_cancel.lock().expect("lock poisoned").take() {
            token.cancel();
        }
    }
}

impl Default for BleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SensorTransport for BleTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Ble
    }

    async fn initialize(&self) -> Result<bool> {
        let manager = match Manager::new().await {
            Ok(m) => m,
            Err(e) => {
                warn!("Bluetooth manager unavailable: {}", e);
                return Ok(false);
            }
        };

        let adapters = match manager.adapters().await {
            Ok(a) => a,
            Err(e) => {
                warn!("Failed to enumerate Bluetooth adapters: {}", e);
                return Ok(false);
            }
        };

        match adapters.into_iter().next() {
            Some(adapter) => {
                info!("Bluetooth adapter found");
                *self.adapter.write().await = Some(adapter);
                Ok(true)
            }
            None => {
                warn!("No Bluetooth adapter present");
                Ok(false)
            }
        }
    }

    async fn start_scan(&self, options: ScanOptions) -> Result<()> {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ScanInProgress);
        }

        let adapter = match self.adapter().await {
            Ok(a) => a,
            Err(e) => {
                self.scanning.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let mut events = match adapter.events().await {
            Ok(e) => e,
            Err(e) => {
                self.scanning.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        if let Err(e) = adapter.start_scan(ScanFilter::default()).await {
            self.scanning.store(false, Ordering::SeqCst);
            return Err(e.into());
        }

        info!("BLE scan started ({:?} timeout)", options.timeout);

        let token = CancellationToken::new();
        *self.scan_cancel.lock().expect("lock poisoned") = Some(token.clone());

        let dispatcher = self.dispatcher.clone();
        let scanning = Arc::clone(&self.scanning);
        tokio::spawn(async move {
            let deadline = sleep(options.timeout);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Scan cancelled");
                        break;
                    }
                    _ = &mut deadline => {
                        debug!("Scan timeout reached");
                        break;
                    }
                    event = events.next() => {
                        let Some(event) = event else { break };
                        if let CentralEvent::DeviceDiscovered(id) = event {
                            let Ok(peripheral) = adapter.peripheral(&id).await else {
                                continue;
                            };
                            match Self::describe_peripheral(&peripheral, options.filter_by_name).await {
                                Ok(Some(device)) => {
                                    info!(device_id = %device.id, name = %device.name, "Discovered device");
                                    dispatcher.send(TransportEvent::Discovered { device });
                                }
                                Ok(None) => {}
                                Err(e) => debug!("Error describing peripheral: {}", e),
                            }
                        }
                    }
                }
            }

            if let Err(e) = adapter.stop_scan().await {
                warn!("Failed to stop scan: {}", e);
            }
            scanning.store(false, Ordering::SeqCst);
            dispatcher.send(TransportEvent::ScanStopped);
        });

        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        // The scan task resets the flag and emits ScanStopped on its way out
        self.cancel_scan_task();
        Ok(())
    }

    async fn connect(&self, device_id: &str) -> Result<DeviceInfo> {
        if self
            .connect_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ConnectInProgress);
        }

        let result = self.connect_inner(device_id).await;
        self.connect_busy.store(false, Ordering::SeqCst);

        match &result {
            Ok(info) => {
                self.dispatcher.send(TransportEvent::Connected {
                    device: info.clone(),
                });
            }
            Err(e) => {
                warn!(device_id, "Connection failed: {}", e);
            }
        }
        result
    }

    async fn disconnect(&self) -> Result<()> {
        self.cancel_stream_task();

        let peripheral = self.peripheral.write().await.take();
        let was_connected = self.connected.swap(false, Ordering::SeqCst);

        if let Some(peripheral) = peripheral {
            let device_id = device_identifier(
                &peripheral
                    .properties()
                    .await
                    .ok()
                    .flatten()
                    .map(|p| p.address.to_string())
                    .unwrap_or_default(),
                &peripheral.id(),
            );
            if let Err(e) = peripheral.disconnect().await {
                warn!("Error disconnecting: {}", e);
            }
            if was_connected {
                info!(device_id, "Disconnected");
                self.dispatcher.send(TransportEvent::Disconnected {
                    device_id,
                    reason: DisconnectReason::UserRequested,
                });
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn start_streaming(&self) -> Result<()> {
        let peripheral = self
            .peripheral
            .read()
            .await
            .clone()
            .ok_or(Error::NotConnected)?;

        // A fresh assembler per session: values from a previous connection
        // must never leak into this one
        let mut assembler = ReadingAssembler::new();

        // The Environmental Sensing trio is required; VOC/NOx live on the
        // custom service, which older firmware may not expose
        for metric in [Metric::Co2, Metric::Temperature, Metric::Humidity] {
            let characteristic =
                Self::find_characteristic(&peripheral, characteristic_for_metric(metric))?;
            peripheral.subscribe(&characteristic).await?;
            debug!(%metric, "Subscribed to characteristic");
        }
        for metric in [Metric::Voc, Metric::Nox] {
            match Self::find_characteristic(&peripheral, characteristic_for_metric(metric)) {
                Ok(characteristic) => {
                    peripheral.subscribe(&characteristic).await?;
                    debug!(%metric, "Subscribed to characteristic");
                }
                Err(e) => {
                    warn!(%metric, "Characteristic unavailable, skipping: {}", e);
                }
            }
        }

        let mut notifications = peripheral.notifications().await?;

        self.cancel_stream_task();
        let token = CancellationToken::new();
        *self.stream_cancel.lock().expect("lock poisoned") = Some(token.clone());

        let dispatcher = self.dispatcher.clone();
        let connected = Arc::clone(&self.connected);
        let device_id = peripheral_id_string(&peripheral.id());
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Notification pump cancelled");
                        break;
                    }
                    notification = notifications.next() => {
                        let Some(notification) = notification else {
                            // Stream ended underneath us: the link is gone
                            if connected.swap(false, Ordering::SeqCst) {
                                warn!(device_id, "Notification stream ended, link lost");
                                dispatcher.send(TransportEvent::Disconnected {
                                    device_id: device_id.clone(),
                                    reason: DisconnectReason::LinkLost,
                                });
                            }
                            break;
                        };

                        let Some(metric) = metric_for_characteristic(notification.uuid) else {
                            continue;
                        };
                        match metric.decode(&notification.value) {
                            Ok(value) => {
                                if let Some(reading) = assembler.ingest(value) {
                                    dispatcher.send(TransportEvent::Reading { reading });
                                }
                            }
                            Err(e) => {
                                warn!(%metric, "Failed to decode notification: {}", e);
                                dispatcher.send(TransportEvent::Error {
                                    message: format!("{} decode failed: {}", metric, e),
                                });
                            }
                        }
                    }
                }
            }
        });

        Ok(())
    }

    fn subscribe_events(&self) -> TransportEventReceiver {
        self.dispatcher.subscribe()
    }

    async fn shutdown(&self) -> Result<()> {
        self.stop_scan().await?;
        self.disconnect().await?;
        Ok(())
    }
}

impl BleTransport {
    async fn connect_inner(&self, device_id: &str) -> Result<DeviceInfo> {
        let adapter = self.adapter().await?;
        let peripheral = self.find_peripheral(&adapter, device_id).await?;

        peripheral.connect().await.map_err(|e| {
            Error::connection_failed(
                Some(device_id.to_string()),
                ConnectionFailureReason::BleError(e.to_string()),
            )
        })?;
        peripheral.discover_services().await?;

        // The sensor must expose either the standard Environmental Sensing
        // service or the custom AirSense service
        let services = peripheral.services();
        let has_sensor_service = services
            .iter()
            .any(|s| s.uuid == ENVIRONMENTAL_SENSING_SERVICE || s.uuid == AIRSENSE_SERVICE);
        if !has_sensor_service {
            let _ = peripheral.disconnect().await;
            return Err(Error::connection_failed(
                Some(device_id.to_string()),
                ConnectionFailureReason::ServiceMissing(
                    ENVIRONMENTAL_SENSING_SERVICE.to_string(),
                ),
            ));
        }

        let battery_level = Self::read_battery(&peripheral).await;
        let props = peripheral.properties().await?.unwrap_or_default();

        let info = DeviceInfo {
            id: device_identifier(&props.address.to_string(), &peripheral.id()),
            name: props
                .local_name
                .unwrap_or_else(|| DEVICE_NAME_PREFIX.to_string()),
            rssi: props.rssi,
            is_connected: true,
            battery_level,
        };

        *self.peripheral.write().await = Some(peripheral);
        self.connected.store(true, Ordering::SeqCst);
        info!(device_id = %info.id, name = %info.name, "Connected to device");

        Ok(info)
    }
}
