//! Assembly of per-characteristic notifications into atomic readings.
//!
//! BLE delivers each metric as a separate notification. The
//! [`ReadingAssembler`] merges them: it remembers the latest value seen for
//! every metric and emits a [`SensorReading`] whenever a notification arrives
//! while all five metrics are known.
//!
//! Values carry forward between emissions. Once the first complete reading
//! has been assembled, every subsequent notification produces a reading that
//! combines the fresh value with the latest stale values of the other
//! metrics. A stalled characteristic therefore goes unnoticed in the output;
//! callers that need a fresh start (e.g. after reconnecting) must call
//! [`reset`](ReadingAssembler::reset).

use crate::types::{MetricValue, SensorReading, epoch_ms_now};

/// Merges per-metric notification values into complete readings.
#[derive(Debug, Default)]
pub struct ReadingAssembler {
    co2: Option<u16>,
    temperature: Option<f32>,
    humidity: Option<f32>,
    voc: Option<u16>,
    nox: Option<u16>,
}

impl ReadingAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decoded metric value.
    ///
    /// Returns a complete reading if all five metrics have been seen at least
    /// once, timestamped at the moment of emission. Returns `None` while the
    /// initial set is still incomplete.
    pub fn ingest(&mut self, value: MetricValue) -> Option<SensorReading> {
        self.ingest_at(value, epoch_ms_now())
    }

    /// Like [`ingest`](Self::ingest) but with an explicit timestamp.
    pub fn ingest_at(&mut self, value: MetricValue, timestamp_ms: i64) -> Option<SensorReading> {
        match value {
            MetricValue::Co2(v) => self.co2 = Some(v),
            MetricValue::Temperature(v) => self.temperature = Some(v),
            MetricValue::Humidity(v) => self.humidity = Some(v),
            MetricValue::Voc(v) => self.voc = Some(v),
            MetricValue::Nox(v) => self.nox = Some(v),
        }
        self.emit(timestamp_ms)
    }

    /// Whether all five metrics have been seen since the last reset.
    pub fn is_complete(&self) -> bool {
        self.co2.is_some()
            && self.temperature.is_some()
            && self.humidity.is_some()
            && self.voc.is_some()
            && self.nox.is_some()
    }

    /// Forget all buffered values. Call before re-subscribing so a new
    /// session cannot emit readings built from a previous connection's data.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn emit(&self, timestamp_ms: i64) -> Option<SensorReading> {
        Some(SensorReading {
            co2: self.co2?,
            temperature: self.temperature?,
            humidity: self.humidity?,
            voc: self.voc?,
            nox: self.nox?,
            timestamp_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_set_emits_nothing() {
        let mut assembler = ReadingAssembler::new();
        assert!(assembler.ingest_at(MetricValue::Co2(800), 1).is_none());
        assert!(
            assembler
                .ingest_at(MetricValue::Temperature(22.5), 2)
                .is_none()
        );
        assert!(
            assembler
                .ingest_at(MetricValue::Humidity(48.0), 3)
                .is_none()
        );
        assert!(assembler.ingest_at(MetricValue::Voc(120), 4).is_none());
        assert!(!assembler.is_complete());
    }

    #[test]
    fn test_fifth_metric_completes_reading() {
        let mut assembler = ReadingAssembler::new();
        assembler.ingest_at(MetricValue::Co2(800), 1);
        assembler.ingest_at(MetricValue::Temperature(22.5), 2);
        assembler.ingest_at(MetricValue::Humidity(48.0), 3);
        assembler.ingest_at(MetricValue::Voc(120), 4);

        let reading = assembler.ingest_at(MetricValue::Nox(85), 5).unwrap();
        assert_eq!(reading.co2, 800);
        assert_eq!(reading.temperature, 22.5);
        assert_eq!(reading.humidity, 48.0);
        assert_eq!(reading.voc, 120);
        assert_eq!(reading.nox, 85);
        assert_eq!(reading.timestamp_ms, 5);
        assert!(assembler.is_complete());
    }

    #[test]
    fn test_values_carry_forward_after_completion() {
        let mut assembler = ReadingAssembler::new();
        assembler.ingest_at(MetricValue::Co2(800), 1);
        assembler.ingest_at(MetricValue::Temperature(22.5), 2);
        assembler.ingest_at(MetricValue::Humidity(48.0), 3);
        assembler.ingest_at(MetricValue::Voc(120), 4);
        assembler.ingest_at(MetricValue::Nox(85), 5);

        // A lone CO2 update now emits, reusing the other metrics' last values
        let reading = assembler.ingest_at(MetricValue::Co2(950), 6).unwrap();
        assert_eq!(reading.co2, 950);
        assert_eq!(reading.temperature, 22.5);
        assert_eq!(reading.nox, 85);
        assert_eq!(reading.timestamp_ms, 6);
    }

    #[test]
    fn test_duplicate_metric_before_completion_overwrites() {
        let mut assembler = ReadingAssembler::new();
        assembler.ingest_at(MetricValue::Co2(800), 1);
        assembler.ingest_at(MetricValue::Co2(810), 2);
        assembler.ingest_at(MetricValue::Temperature(22.5), 3);
        assembler.ingest_at(MetricValue::Humidity(48.0), 4);
        assembler.ingest_at(MetricValue::Voc(120), 5);

        let reading = assembler.ingest_at(MetricValue::Nox(85), 6).unwrap();
        assert_eq!(reading.co2, 810);
    }

    #[test]
    fn test_reset_requires_full_set_again() {
        let mut assembler = ReadingAssembler::new();
        assembler.ingest_at(MetricValue::Co2(800), 1);
        assembler.ingest_at(MetricValue::Temperature(22.5), 2);
        assembler.ingest_at(MetricValue::Humidity(48.0), 3);
        assembler.ingest_at(MetricValue::Voc(120), 4);
        assembler.ingest_at(MetricValue::Nox(85), 5);

        assembler.reset();
        assert!(!assembler.is_complete());
        assert!(assembler.ingest_at(MetricValue::Co2(900), 6).is_none());
    }

    #[test]
    fn test_ingest_stamps_current_time() {
        let mut assembler = ReadingAssembler::new();
        assembler.ingest(MetricValue::Co2(800));
        assembler.ingest(MetricValue::Temperature(22.5));
        assembler.ingest(MetricValue::Humidity(48.0));
        assembler.ingest(MetricValue::Voc(120));
        let reading = assembler.ingest(MetricValue::Nox(85)).unwrap();
        assert!(reading.timestamp_ms > 0);
    }
}
