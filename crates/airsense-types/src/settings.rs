//! Application settings and alert thresholds.
//!
//! Settings deserialize leniently: any field missing from a stored document
//! falls back to its default, so settings saved by an older build keep
//! loading after new fields are added.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Alert thresholds for the metrics that raise alerts.
///
/// NOx is displayed and scored but never raises alerts, so it carries no
/// threshold here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlertThresholds {
    /// CO₂ warning threshold (ppm).
    pub co2_warning: u16,
    /// CO₂ critical threshold (ppm).
    pub co2_critical: u16,
    /// VOC warning threshold (index).
    pub voc_warning: u16,
    /// VOC critical threshold (index).
    pub voc_critical: u16,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            co2_warning: 1000,
            co2_critical: 1500,
            voc_warning: 250,
            voc_critical: 400,
        }
    }
}

/// User-facing application settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AppSettings {
    /// Whether threshold alerts produce notifications.
    pub notifications_enabled: bool,
    /// Whether alerts vibrate the device.
    pub vibration_enabled: bool,
    /// Whether alerts play a sound.
    pub sound_enabled: bool,
    /// Suppress notifications during quiet hours.
    pub quiet_hours_enabled: bool,
    /// Quiet hours start, as a local `"HH:MM"` string.
    pub quiet_hours_start: Option<String>,
    /// Quiet hours end, as a local `"HH:MM"` string.
    pub quiet_hours_end: Option<String>,
    /// Dark color scheme.
    pub dark_mode: bool,
    /// Whether history charts are shown.
    pub charts_enabled: bool,
    /// Desired sensor update interval in seconds.
    pub update_interval_secs: u32,
    /// Alert thresholds.
    pub thresholds: AlertThresholds,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            vibration_enabled: true,
            sound_enabled: false,
            quiet_hours_enabled: false,
            quiet_hours_start: None,
            quiet_hours_end: None,
            dark_mode: true,
            charts_enabled: true,
            update_interval_secs: 5,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl AppSettings {
    /// Apply a partial update, replacing only the fields the patch carries.
    ///
    /// Thresholds are replaced wholesale when present.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.notifications_enabled {
            self.notifications_enabled = v;
        }
        if let Some(v) = patch.vibration_enabled {
            self.vibration_enabled = v;
        }
        if let Some(v) = patch.sound_enabled {
            self.sound_enabled = v;
        }
        if let Some(v) = patch.quiet_hours_enabled {
            self.quiet_hours_enabled = v;
        }
        if let Some(v) = patch.quiet_hours_start {
            self.quiet_hours_start = Some(v);
        }
        if let Some(v) = patch.quiet_hours_end {
            self.quiet_hours_end = Some(v);
        }
        if let Some(v) = patch.dark_mode {
            self.dark_mode = v;
        }
        if let Some(v) = patch.charts_enabled {
            self.charts_enabled = v;
        }
        if let Some(v) = patch.update_interval_secs {
            self.update_interval_secs = v;
        }
        if let Some(v) = patch.thresholds {
            self.thresholds = v;
        }
    }
}

/// Partial settings update. `None` fields leave the current value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SettingsPatch {
    pub notifications_enabled: Option<bool>,
    pub vibration_enabled: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub quiet_hours_enabled: Option<bool>,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub dark_mode: Option<bool>,
    pub charts_enabled: Option<bool>,
    pub update_interval_secs: Option<u32>,
    pub thresholds: Option<AlertThresholds>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert!(settings.notifications_enabled);
        assert!(settings.vibration_enabled);
        assert!(!settings.sound_enabled);
        assert!(!settings.quiet_hours_enabled);
        assert_eq!(settings.quiet_hours_start, None);
        assert_eq!(settings.quiet_hours_end, None);
        assert!(settings.dark_mode);
        assert!(settings.charts_enabled);
        assert_eq!(settings.update_interval_secs, 5);
        assert_eq!(settings.thresholds.co2_warning, 1000);
        assert_eq!(settings.thresholds.co2_critical, 1500);
        assert_eq!(settings.thresholds.voc_warning, 250);
        assert_eq!(settings.thresholds.voc_critical, 400);
    }

    #[test]
    fn test_apply_patch_changes_only_present_fields() {
        let mut settings = AppSettings::default();
        settings.apply(SettingsPatch {
            sound_enabled: Some(true),
            update_interval_secs: Some(30),
            ..SettingsPatch::default()
        });
        assert!(settings.sound_enabled);
        assert_eq!(settings.update_interval_secs, 30);
        // Untouched fields keep their defaults
        assert!(settings.notifications_enabled);
        assert!(settings.dark_mode);
    }

    #[test]
    fn test_apply_sets_quiet_hours_window() {
        let mut settings = AppSettings::default();
        settings.apply(SettingsPatch {
            quiet_hours_enabled: Some(true),
            quiet_hours_start: Some("22:00".to_string()),
            quiet_hours_end: Some("07:00".to_string()),
            ..SettingsPatch::default()
        });
        assert!(settings.quiet_hours_enabled);
        assert_eq!(settings.quiet_hours_start.as_deref(), Some("22:00"));
        assert_eq!(settings.quiet_hours_end.as_deref(), Some("07:00"));
    }

    #[test]
    fn test_apply_replaces_thresholds_wholesale() {
        let mut settings = AppSettings::default();
        settings.apply(SettingsPatch {
            thresholds: Some(AlertThresholds {
                co2_warning: 900,
                ..AlertThresholds::default()
            }),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.thresholds.co2_warning, 900);
        assert_eq!(settings.thresholds.co2_critical, 1500);
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut settings = AppSettings::default();
        let before = settings.clone();
        settings.apply(SettingsPatch::default());
        assert_eq!(settings, before);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{"dark_mode": false}"#).unwrap();
        assert!(!settings.dark_mode);
        assert!(settings.notifications_enabled);
        assert_eq!(settings.update_interval_secs, 5);
        assert_eq!(settings.thresholds, AlertThresholds::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_settings_roundtrip() {
        let mut settings = AppSettings::default();
        settings.update_interval_secs = 60;
        let json = serde_json::to_string(&settings).unwrap();
        let back: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
