//! Core types for AirSense sensor data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Minimum number of bytes in every sensor characteristic payload.
pub const METRIC_PAYLOAD_BYTES: usize = 2;

/// The five metrics an AirSense device reports, one BLE characteristic each.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new metrics
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum Metric {
    /// CO₂ concentration in ppm.
    Co2,
    /// Temperature in degrees Celsius.
    Temperature,
    /// Relative humidity percentage.
    Humidity,
    /// VOC index (0-500).
    Voc,
    /// NOx index (0-500).
    Nox,
}

impl Metric {
    /// Decode a raw characteristic payload into a typed metric value.
    ///
    /// Every characteristic carries a 2-byte little-endian integer:
    /// - CO₂, VOC, NOx: unsigned, used as-is
    /// - Temperature: signed, divided by 100 for °C
    /// - Humidity: unsigned, divided by 100 for %
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InsufficientBytes`] if `data` contains fewer
    /// than [`METRIC_PAYLOAD_BYTES`] bytes.
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn decode(&self, data: &[u8]) -> Result<MetricValue, ParseError> {
        use bytes::Buf;

        if data.len() < METRIC_PAYLOAD_BYTES {
            return Err(ParseError::InsufficientBytes {
                expected: METRIC_PAYLOAD_BYTES,
                actual: data.len(),
            });
        }

        let mut buf = data;
        Ok(match self {
            Metric::Co2 => MetricValue::Co2(buf.get_u16_le()),
            Metric::Temperature => MetricValue::Temperature(f32::from(buf.get_i16_le()) / 100.0),
            Metric::Humidity => MetricValue::Humidity(f32::from(buf.get_u16_le()) / 100.0),
            Metric::Voc => MetricValue::Voc(buf.get_u16_le()),
            Metric::Nox => MetricValue::Nox(buf.get_u16_le()),
        })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Co2 => write!(f, "CO₂"),
            Metric::Temperature => write!(f, "Temperature"),
            Metric::Humidity => write!(f, "Humidity"),
            Metric::Voc => write!(f, "VOC"),
            Metric::Nox => write!(f, "NOx"),
        }
    }
}

/// A decoded value for a single metric.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MetricValue {
    /// CO₂ concentration in ppm.
    Co2(u16),
    /// Temperature in °C.
    Temperature(f32),
    /// Relative humidity in %.
    Humidity(f32),
    /// VOC index.
    Voc(u16),
    /// NOx index.
    Nox(u16),
}

impl MetricValue {
    /// The metric this value belongs to.
    #[must_use]
    pub fn metric(&self) -> Metric {
        match self {
            MetricValue::Co2(_) => Metric::Co2,
            MetricValue::Temperature(_) => Metric::Temperature,
            MetricValue::Humidity(_) => Metric::Humidity,
            MetricValue::Voc(_) => Metric::Voc,
            MetricValue::Nox(_) => Metric::Nox,
        }
    }
}

/// Current epoch time in milliseconds.
///
/// Readings and alerts are stamped with epoch milliseconds so they can cross
/// serialization boundaries (JSON, IPC) without timezone baggage.
#[must_use]
pub fn epoch_ms_now() -> i64 {
    let now = time::OffsetDateTime::now_utc();
    (now.unix_timestamp_nanos() / 1_000_000) as i64
}

/// A complete snapshot of all five sensor metrics.
///
/// A reading is only ever produced once every metric has been observed at
/// least once in the subscription session; partial readings never escape the
/// assembler. Readings are immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// CO₂ concentration in ppm.
    pub co2: u16,
    /// Temperature in degrees Celsius (one decimal of precision).
    pub temperature: f32,
    /// Relative humidity percentage (0-100).
    pub humidity: f32,
    /// VOC index (0-500).
    pub voc: u16,
    /// NOx index (0-500).
    pub nox: u16,
    /// Epoch milliseconds at which the reading became complete.
    pub timestamp_ms: i64,
}

impl SensorReading {
    /// The timestamp as an [`time::OffsetDateTime`], if representable.
    #[must_use]
    pub fn captured_at(&self) -> Option<time::OffsetDateTime> {
        time::OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.timestamp_ms) * 1_000_000)
            .ok()
    }

    /// Create a builder for constructing a `SensorReading`.
    pub fn builder() -> SensorReadingBuilder {
        SensorReadingBuilder::default()
    }
}

/// Builder for constructing [`SensorReading`] values, mostly useful in tests
/// and data generators.
#[derive(Debug, Default)]
#[must_use]
pub struct SensorReadingBuilder {
    reading: SensorReading,
}

impl SensorReadingBuilder {
    /// Set CO₂ concentration.
    pub fn co2(mut self, co2: u16) -> Self {
        self.reading.co2 = co2;
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.reading.temperature = temperature;
        self
    }

    /// Set humidity.
    pub fn humidity(mut self, humidity: f32) -> Self {
        self.reading.humidity = humidity;
        self
    }

    /// Set the VOC index.
    pub fn voc(mut self, voc: u16) -> Self {
        self.reading.voc = voc;
        self
    }

    /// Set the NOx index.
    pub fn nox(mut self, nox: u16) -> Self {
        self.reading.nox = nox;
        self
    }

    /// Set the timestamp.
    pub fn timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.reading.timestamp_ms = timestamp_ms;
        self
    }

    /// Build the `SensorReading` without validation.
    #[must_use]
    pub fn build(self) -> SensorReading {
        self.reading
    }

    /// Build the `SensorReading` with validation.
    ///
    /// Validates that humidity is 0-100, the VOC/NOx indices are ≤500, and
    /// the temperature is within a plausible sensor range (-40 to 100 °C).
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] if any field is out of range.
    pub fn try_build(self) -> Result<SensorReading, ParseError> {
        let r = &self.reading;
        if !(0.0..=100.0).contains(&r.humidity) {
            return Err(ParseError::InvalidValue(format!(
                "humidity {} outside 0-100",
                r.humidity
            )));
        }
        if r.voc > 500 {
            return Err(ParseError::InvalidValue(format!(
                "voc index {} exceeds maximum of 500",
                r.voc
            )));
        }
        if r.nox > 500 {
            return Err(ParseError::InvalidValue(format!(
                "nox index {} exceeds maximum of 500",
                r.nox
            )));
        }
        if !(-40.0..=100.0).contains(&r.temperature) {
            return Err(ParseError::InvalidValue(format!(
                "temperature {} outside valid range (-40 to 100°C)",
                r.temperature
            )));
        }
        Ok(self.reading)
    }
}

/// Descriptor for a discovered or connected device.
///
/// Created on discovery/connect, replaced wholesale on reconnect, and
/// cleared (`None` in the store) on disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceInfo {
    /// Transport-assigned identifier, opaque but stable per session.
    pub id: String,
    /// Advertised device name.
    pub name: String,
    /// Signal strength in dBm. Absent on Web Bluetooth, which does not
    /// expose RSSI.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub rssi: Option<i16>,
    /// Whether the device is currently connected.
    pub is_connected: bool,
    /// Battery level percentage, when the device exposes the Battery service.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub battery_level: Option<u8>,
}

impl DeviceInfo {
    /// Create a builder for constructing `DeviceInfo`.
    pub fn builder() -> DeviceInfoBuilder {
        DeviceInfoBuilder::default()
    }
}

/// Builder for constructing [`DeviceInfo`].
#[derive(Debug, Default, Clone)]
#[must_use]
pub struct DeviceInfoBuilder {
    info: DeviceInfo,
}

impl DeviceInfoBuilder {
    /// Set the device identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.info.id = id.into();
        self
    }

    /// Set the device name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.info.name = name.into();
        self
    }

    /// Set the signal strength.
    pub fn rssi(mut self, rssi: i16) -> Self {
        self.info.rssi = Some(rssi);
        self
    }

    /// Set the connected flag.
    pub fn connected(mut self, connected: bool) -> Self {
        self.info.is_connected = connected;
        self
    }

    /// Set the battery level.
    pub fn battery_level(mut self, level: u8) -> Self {
        self.info.battery_level = Some(level);
        self
    }

    /// Build the `DeviceInfo`.
    #[must_use]
    pub fn build(self) -> DeviceInfo {
        self.info
    }
}

/// The metric an alert was raised for.
///
/// NOx is classified and displayed but has no configurable alert thresholds;
/// the variant exists for completeness of externally supplied alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AlertKind {
    Co2,
    Voc,
    Nox,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Co2 => write!(f, "co2"),
            AlertKind::Voc => write!(f, "voc"),
            AlertKind::Nox => write!(f, "nox"),
        }
    }
}

/// Alert severity.
///
/// Ordered so that threshold comparisons like `severity >= Warning` work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    /// Title used by notification sinks.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "Warning",
            AlertSeverity::Critical => "Critical Alert",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// A threshold-crossing alert derived from a reading.
///
/// Alerts are append-only: they are created by the store's evaluation pass
/// and removed on explicit user dismissal, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alert {
    /// Unique id, derived from kind, severity, and creation time.
    pub id: String,
    /// The metric that crossed a threshold.
    pub kind: AlertKind,
    /// Warning or critical.
    pub severity: AlertSeverity,
    /// The offending metric value.
    pub value: u16,
    /// Human-readable message.
    pub message: String,
    /// Ordered list of recommended actions.
    pub recommendations: Vec<String>,
    /// Epoch milliseconds of the triggering reading.
    pub timestamp_ms: i64,
    /// Elapsed milliseconds since the alert started (0 at creation).
    pub duration_ms: i64,
}

impl Alert {
    /// Create a new alert with a derived id and zero duration.
    pub fn new(
        kind: AlertKind,
        severity: AlertSeverity,
        value: u16,
        message: impl Into<String>,
        recommendations: Vec<String>,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            id: format!("{kind}-{severity}-{timestamp_ms}"),
            kind,
            severity,
            value,
            message: message.into(),
            recommendations,
            timestamp_ms,
            duration_ms: 0,
        }
    }
}
