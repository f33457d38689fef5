//! Platform-agnostic types for AirSense air-quality sensors.
//!
//! This crate contains the data model shared by every AirSense frontend and
//! transport: sensor readings, device descriptors, alerts, user settings,
//! air-quality classification, and the BLE wire constants. It is free of any
//! Bluetooth or async machinery so it can be used from native hosts and
//! `wasm32` alike.
//!
//! # Example
//!
//! ```
//! use airsense_types::{quality, Metric, MetricValue};
//!
//! // Decode a CO₂ characteristic payload (uint16 LE, ppm)
//! let value = Metric::Co2.decode(&[0x20, 0x03]).unwrap();
//! assert_eq!(value, MetricValue::Co2(800));
//!
//! // Classify it for display
//! let level = quality::co2_level(800);
//! assert_eq!(level.label(), "Moderate");
//! ```

pub mod assembler;
pub mod ble;
pub mod error;
pub mod quality;
pub mod settings;
pub mod types;

pub use assembler::ReadingAssembler;
pub use ble::{DEFAULT_SCAN_TIMEOUT_MS, DEVICE_NAME_PREFIX};
pub use error::ParseError;
pub use quality::{AirQualityLevel, ScoreBand, co2_level, nox_level, overall_score, score_band, voc_level};
pub use settings::{AlertThresholds, AppSettings, SettingsPatch};
pub use types::{
    Alert, AlertKind, AlertSeverity, DeviceInfo, DeviceInfoBuilder, Metric, MetricValue,
    SensorReading, SensorReadingBuilder, epoch_ms_now,
};
