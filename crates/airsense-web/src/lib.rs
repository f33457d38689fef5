//! Web Bluetooth transport for AirSense sensors.
//!
//! Browsers expose BLE through the Web Bluetooth API, which has no free-form
//! scanning: discovery happens through a user-gesture-triggered device picker
//! ([`WebBluetoothService::request_device`]). Apart from that, the flow
//! mirrors the native transport: connect to GATT, resolve the sensor
//! characteristics, subscribe to notifications, and assemble complete
//! readings with the shared [`ReadingAssembler`].
//!
//! Works in Chromium-based browsers; Web Bluetooth is unavailable on iOS.
//! Build with `RUSTFLAGS=--cfg=web_sys_unstable_apis` for the wasm32 target.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Array, DataView, Function};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Bluetooth, BluetoothDevice, BluetoothLeScanFilterInit, BluetoothRemoteGattCharacteristic,
    BluetoothRemoteGattServer, BluetoothRemoteGattService, RequestDeviceOptions,
};

use airsense_types::ble::{
    AIRSENSE_SERVICE, CO2_CHARACTERISTIC, DEVICE_NAME_PREFIX, ENVIRONMENTAL_SENSING_SERVICE,
    HUMIDITY_CHARACTERISTIC, TEMPERATURE_CHARACTERISTIC, VOC_CHARACTERISTIC, NOX_CHARACTERISTIC,
};
use airsense_types::{DeviceInfo, Metric, ReadingAssembler};

#[wasm_bindgen(start)]
pub fn init() {
    log("AirSense web module initialized");
}

/// Log a message to the browser console.
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

fn err_str(context: &str, e: JsValue) -> JsValue {
    JsValue::from_str(&format!("{}: {:?}", context, e))
}

fn bluetooth() -> Option<Bluetooth> {
    web_sys::window()?.navigator().bluetooth()
}

/// Web Bluetooth driver with the same lifecycle as the native transport:
/// pick a device, connect, subscribe, disconnect.
#[wasm_bindgen]
pub struct WebBluetoothService {
    device: Option<BluetoothDevice>,
    server: Option<BluetoothRemoteGattServer>,
    characteristics: HashMap<Metric, BluetoothRemoteGattCharacteristic>,
    assembler: Rc<RefCell<ReadingAssembler>>,
    // Keeps notification closures alive for the lifetime of the
    // subscription, paired with the characteristic they are attached to so
    // they can be detached before being dropped
    listeners: Vec<(
        BluetoothRemoteGattCharacteristic,
        Closure<dyn FnMut(web_sys::Event)>,
    )>,
}

impl Default for WebBluetoothService {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WebBluetoothService {
    /// Create an idle service.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            device: None,
            server: None,
            characteristics: HashMap::new(),
            assembler: Rc::new(RefCell::new(ReadingAssembler::new())),
            listeners: Vec::new(),
        }
    }

    /// Whether this browser exposes Web Bluetooth at all.
    #[wasm_bindgen(js_name = isSupported)]
    pub fn is_supported() -> bool {
        bluetooth().is_some()
    }

    /// Check Bluetooth availability. Mirrors the native adapter probe:
    /// returns `false` rather than throwing when the API is missing.
    #[wasm_bindgen(js_name = initializeBluetooth)]
    pub async fn initialize_bluetooth(&self) -> bool {
        if !Self::is_supported() {
            log("Web Bluetooth not supported in this browser");
            return false;
        }
        true
    }

    /// Open the browser's device picker filtered to AirSense devices.
    ///
    /// This is the Web Bluetooth stand-in for scanning: it must be called
    /// from a user gesture and resolves to the selected device (as a JSON
    /// string of [`DeviceInfo`]) or rejects when the user cancels.
    #[wasm_bindgen(js_name = requestDevice)]
    pub async fn request_device(&mut self) -> Result<JsValue, JsValue> {
        let bluetooth =
            bluetooth().ok_or_else(|| JsValue::from_str("Web Bluetooth not supported"))?;

        let name_filter = BluetoothLeScanFilterInit::new();
        name_filter.set_name_prefix(DEVICE_NAME_PREFIX);

        let filters = Array::of1(&name_filter);
        let optional_services = Array::of2(
            &JsValue::from_str(&ENVIRONMENTAL_SENSING_SERVICE.to_string()),
            &JsValue::from_str(&AIRSENSE_SERVICE.to_string()),
        );

        let options = RequestDeviceOptions::new();
        options.set_filters(&filters);
        options.set_optional_services(&optional_services);

        let device: BluetoothDevice = JsFuture::from(bluetooth.request_device(&options))
            .await
            .map_err(|e| err_str("Device selection cancelled or failed", e))?
            .dyn_into()
            .map_err(|e| err_str("Unexpected picker result", e))?;

        log(&format!(
            "Device selected: {}",
            device.name().unwrap_or_default()
        ));

        let info = DeviceInfo {
            id: device.id(),
            name: device.name().unwrap_or_else(|| "Unknown".to_string()),
            // Web Bluetooth does not expose RSSI
            rssi: None,
            is_connected: false,
            battery_level: None,
        };
        self.device = Some(device);

        serde_json::to_string(&info)
            .map(|json| JsValue::from_str(&json))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Connect to the picked device's GATT server and resolve the sensor
    /// characteristics.
    ///
    /// The Environmental Sensing service (CO₂, temperature, humidity) is
    /// required; the custom AirSense service (VOC, NOx) is optional so older
    /// firmware still connects.
    #[wasm_bindgen(js_name = connectToDevice)]
    pub async fn connect_to_device(&mut self) -> Result<(), JsValue> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| JsValue::from_str("No device selected. Call requestDevice() first."))?;
        let gatt = device
            .gatt()
            .ok_or_else(|| JsValue::from_str("Device has no GATT server"))?;

        log("Connecting to GATT server...");
        let server: BluetoothRemoteGattServer = JsFuture::from(gatt.connect())
            .await
            .map_err(|e| err_str("Connection failed", e))?
            .dyn_into()
            .map_err(|e| err_str("Unexpected GATT result", e))?;

        let env_service =
            Self::get_service(&server, &ENVIRONMENTAL_SENSING_SERVICE.to_string()).await?;
        for (metric, uuid) in [
            (Metric::Co2, CO2_CHARACTERISTIC),
            (Metric::Temperature, TEMPERATURE_CHARACTERISTIC),
            (Metric::Humidity, HUMIDITY_CHARACTERISTIC),
        ] {
            let characteristic =
                Self::get_characteristic(&env_service, &uuid.to_string()).await?;
            self.characteristics.insert(metric, characteristic);
        }

        // VOC/NOx live on the custom service; missing is not fatal
        match Self::get_service(&server, &AIRSENSE_SERVICE.to_string()).await {
            Ok(custom_service) => {
                for (metric, uuid) in [
                    (Metric::Voc, VOC_CHARACTERISTIC),
                    (Metric::Nox, NOX_CHARACTERISTIC),
                ] {
                    let characteristic =
                        Self::get_characteristic(&custom_service, &uuid.to_string()).await?;
                    self.characteristics.insert(metric, characteristic);
                }
            }
            Err(e) => {
                web_sys::console::warn_1(&err_str("Custom service not available", e));
            }
        }

        self.server = Some(server);
        log("All characteristics discovered");
        Ok(())
    }

    /// Subscribe to notifications on every resolved characteristic.
    ///
    /// `on_reading` is called with a JSON string of each complete
    /// [`airsense_types::SensorReading`]. The assembler is reset first, so a
    /// re-subscribe never emits readings built from a previous session.
    #[wasm_bindgen(js_name = subscribeToSensorData)]
    pub async fn subscribe_to_sensor_data(&mut self, on_reading: Function) -> Result<(), JsValue> {
        let server = self
            .server
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Not connected to device"))?;
        if !server.connected() {
            return Err(JsValue::from_str("Not connected to device"));
        }

        self.assembler.borrow_mut().reset();
        self.clear_listeners();

        let metrics: Vec<(Metric, BluetoothRemoteGattCharacteristic)> = self
            .characteristics
            .iter()
            .map(|(m, c)| (*m, c.clone()))
            .collect();

        for (metric, characteristic) in metrics {
            JsFuture::from(characteristic.start_notifications())
                .await
                .map_err(|e| err_str("startNotifications failed", e))?;

            let assembler = Rc::clone(&self.assembler);
            let callback = on_reading.clone();
            let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
                let Some(target) = event.target() else { return };
                let Ok(characteristic) = target.dyn_into::<BluetoothRemoteGattCharacteristic>()
                else {
                    return;
                };
                let Some(value) = characteristic.value() else { return };
                handle_notification(&assembler, metric, &value, &callback);
            });
            characteristic
                .add_event_listener_with_callback(
                    "characteristicvaluechanged",
                    closure.as_ref().unchecked_ref(),
                )
                .map_err(|e| err_str("addEventListener failed", e))?;
            self.listeners.push((characteristic, closure));
        }

        log("Subscribed to all notifications");
        Ok(())
    }

    /// Disconnect and drop all session state. A no-op when not connected.
    #[wasm_bindgen(js_name = disconnect)]
    pub fn disconnect(&mut self) {
        if let Some(server) = &self.server
            && server.connected()
        {
            server.disconnect();
        }
        self.device = None;
        self.server = None;
        self.characteristics.clear();
        self.clear_listeners();
        self.assembler.borrow_mut().reset();
    }

    /// Whether the GATT server link is up.
    #[wasm_bindgen(js_name = isDeviceConnected)]
    pub fn is_device_connected(&self) -> bool {
        self.server.as_ref().is_some_and(|s| s.connected())
    }

    /// The picked device as a JSON string of [`DeviceInfo`], or `null`.
    #[wasm_bindgen(js_name = getDevice)]
    pub fn get_device(&self) -> JsValue {
        let Some(device) = &self.device else {
            return JsValue::NULL;
        };
        let info = DeviceInfo {
            id: device.id(),
            name: device.name().unwrap_or_else(|| "Unknown".to_string()),
            rssi: None,
            is_connected: self.is_device_connected(),
            battery_level: None,
        };
        serde_json::to_string(&info)
            .map(|json| JsValue::from_str(&json))
            .unwrap_or(JsValue::NULL)
    }
}

impl WebBluetoothService {
    /// Detach notification listeners from their characteristics before
    /// dropping the closures. A closure dropped while still registered
    /// throws on the next `characteristicvaluechanged` event.
    fn clear_listeners(&mut self) {
        for (characteristic, closure) in self.listeners.drain(..) {
            let _ = characteristic.remove_event_listener_with_callback(
                "characteristicvaluechanged",
                closure.as_ref().unchecked_ref(),
            );
        }
    }

    async fn get_service(
        server: &BluetoothRemoteGattServer,
        uuid: &str,
    ) -> Result<BluetoothRemoteGattService, JsValue> {
        JsFuture::from(server.get_primary_service_with_str(uuid))
            .await?
            .dyn_into()
            .map_err(|e| err_str("Unexpected service result", e))
    }

    async fn get_characteristic(
        service: &BluetoothRemoteGattService,
        uuid: &str,
    ) -> Result<BluetoothRemoteGattCharacteristic, JsValue> {
        JsFuture::from(service.get_characteristic_with_str(uuid))
            .await?
            .dyn_into()
            .map_err(|e| err_str("Unexpected characteristic result", e))
    }
}

/// Decode one notification payload and emit a reading if it completes a set.
fn handle_notification(
    assembler: &Rc<RefCell<ReadingAssembler>>,
    metric: Metric,
    value: &DataView,
    callback: &Function,
) {
    let len = value.byte_length();
    let mut bytes = vec![0u8; len];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = value.get_uint8(i);
    }

    let decoded = match metric.decode(&bytes) {
        Ok(v) => v,
        Err(e) => {
            web_sys::console::warn_1(
                &format!("Failed to decode {} notification: {}", metric, e).into(),
            );
            return;
        }
    };

    let timestamp_ms = js_sys::Date::now() as i64;
    if let Some(reading) = assembler.borrow_mut().ingest_at(decoded, timestamp_ms)
        && let Ok(json) = serde_json::to_string(&reading)
    {
        let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(&json));
    }
}
