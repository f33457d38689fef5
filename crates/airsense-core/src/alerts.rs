//! Threshold alert evaluation.
//!
//! Pure functions that derive alerts from a reading and the configured
//! thresholds. CO₂ and VOC each produce at most one alert per reading; a
//! critical crossing suppresses the warning for the same metric. NOx is
//! displayed and scored but never alerts.

use airsense_types::{Alert, AlertKind, AlertSeverity, AlertThresholds, SensorReading};

/// Evaluate a reading against the thresholds.
///
/// Returned alerts are timestamped with the reading's timestamp, so the same
/// reading always derives the same alerts.
pub fn evaluate(reading: &SensorReading, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if reading.co2 >= thresholds.co2_critical {
        alerts.push(Alert::new(
            AlertKind::Co2,
            AlertSeverity::Critical,
            reading.co2,
            format!("Critical CO₂ level: {} ppm", reading.co2),
            vec![
                "Leave the area immediately".to_string(),
                "Open all windows and doors".to_string(),
                "Turn on ventilation systems".to_string(),
            ],
            reading.timestamp_ms,
        ));
    } else if reading.co2 >= thresholds.co2_warning {
        alerts.push(Alert::new(
            AlertKind::Co2,
            AlertSeverity::Warning,
            reading.co2,
            format!("Elevated CO₂ level: {} ppm", reading.co2),
            vec![
                "Open windows or doors".to_string(),
                "Turn on ventilation fan".to_string(),
                "Take a break outside".to_string(),
            ],
            reading.timestamp_ms,
        ));
    }

    if reading.voc >= thresholds.voc_critical {
        alerts.push(Alert::new(
            AlertKind::Voc,
            AlertSeverity::Critical,
            reading.voc,
            format!("Critical VOC level: {}", reading.voc),
            vec![
                "Identify and remove chemical source".to_string(),
                "Leave the area if possible".to_string(),
                "Open all windows".to_string(),
            ],
            reading.timestamp_ms,
        ));
    } else if reading.voc >= thresholds.voc_warning {
        alerts.push(Alert::new(
            AlertKind::Voc,
            AlertSeverity::Warning,
            reading.voc,
            format!("Elevated VOC level: {}", reading.voc),
            vec![
                "Check for chemical sources".to_string(),
                "Remove cleaning products".to_string(),
                "Increase air circulation".to_string(),
            ],
            reading.timestamp_ms,
        ));
    }

    alerts
}
