//! Bluetooth UUIDs and wire constants for AirSense devices.
//!
//! The sensor exposes two GATT services: the standard Environmental Sensing
//! service for CO₂, temperature, and humidity, and a custom AirSense service
//! for the VOC and NOx indices. All characteristic payloads are 2-byte
//! little-endian values (see [`crate::Metric`] for the scaling rules).

use uuid::{Uuid, uuid};

use crate::types::Metric;

// --- Services ---

/// Standard Environmental Sensing service (0x181A).
pub const ENVIRONMENTAL_SENSING_SERVICE: Uuid = uuid!("0000181a-0000-1000-8000-00805f9b34fb");

/// Custom AirSense service carrying the VOC and NOx index characteristics.
pub const AIRSENSE_SERVICE: Uuid = uuid!("b5f90001-aa8d-4c54-b7e2-3e0c54c8d3a1");

/// Standard Battery service (0x180F).
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

// --- Environmental Sensing characteristics ---

/// CO₂ concentration characteristic (0x2B8C), uint16 LE, ppm.
pub const CO2_CHARACTERISTIC: Uuid = uuid!("00002b8c-0000-1000-8000-00805f9b34fb");

/// Temperature characteristic (0x2A6E), sint16 LE, 0.01 °C resolution.
pub const TEMPERATURE_CHARACTERISTIC: Uuid = uuid!("00002a6e-0000-1000-8000-00805f9b34fb");

/// Humidity characteristic (0x2A6F), uint16 LE, 0.01 % resolution.
pub const HUMIDITY_CHARACTERISTIC: Uuid = uuid!("00002a6f-0000-1000-8000-00805f9b34fb");

// --- AirSense service characteristics ---

/// VOC index characteristic, uint16 LE, 0-500.
pub const VOC_CHARACTERISTIC: Uuid = uuid!("b5f90002-aa8d-4c54-b7e2-3e0c54c8d3a1");

/// NOx index characteristic, uint16 LE, 0-500.
pub const NOX_CHARACTERISTIC: Uuid = uuid!("b5f90003-aa8d-4c54-b7e2-3e0c54c8d3a1");

// --- Battery characteristics ---

/// Battery level characteristic (0x2A19), uint8, percent.
pub const BATTERY_LEVEL_CHARACTERISTIC: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");

// --- Discovery ---

/// Advertised name substring used to filter scan results.
pub const DEVICE_NAME_PREFIX: &str = "AirSense";

/// Default scan window in milliseconds.
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 10_000;

/// Map a characteristic UUID to the metric it carries.
///
/// Returns `None` for characteristics the reading pipeline does not consume
/// (e.g. battery level).
#[must_use]
pub fn metric_for_characteristic(uuid: Uuid) -> Option<Metric> {
    match uuid {
        CO2_CHARACTERISTIC => Some(Metric::Co2),
        TEMPERATURE_CHARACTERISTIC => Some(Metric::Temperature),
        HUMIDITY_CHARACTERISTIC => Some(Metric::Humidity),
        VOC_CHARACTERISTIC => Some(Metric::Voc),
        NOX_CHARACTERISTIC => Some(Metric::Nox),
        _ => None,
    }
}

/// The characteristic a metric is notified on.
#[must_use]
pub fn characteristic_for_metric(metric: Metric) -> Uuid {
    match metric {
        Metric::Co2 => CO2_CHARACTERISTIC,
        Metric::Temperature => TEMPERATURE_CHARACTERISTIC,
        Metric::Humidity => HUMIDITY_CHARACTERISTIC,
        Metric::Voc => VOC_CHARACTERISTIC,
        Metric::Nox => NOX_CHARACTERISTIC,
    }
}
