//! Air-quality classification and composite scoring.
//!
//! Pure, stateless functions mapping raw metric values to qualitative levels
//! and a composite 0-100 score. The bin boundaries are half-open intervals,
//! inclusive below and exclusive above.
//!
//! # Example
//!
//! ```
//! use airsense_types::quality::{co2_level, overall_score, score_band, AirQualityLevel, ScoreBand};
//!
//! assert_eq!(co2_level(599), AirQualityLevel::Excellent);
//! assert_eq!(co2_level(600), AirQualityLevel::Good);
//!
//! let score = overall_score(400, 0, 0);
//! assert_eq!(score, 100);
//! assert_eq!(score_band(score), ScoreBand::Excellent);
//! ```

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Qualitative air-quality level for a single metric.
///
/// CO₂ uses all five levels; the VOC and NOx indices never classify as
/// `Excellent` (their best bin is `Good`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AirQualityLevel {
    Excellent,
    Good,
    Moderate,
    Poor,
    Bad,
}

impl AirQualityLevel {
    /// Display label for the level.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            AirQualityLevel::Excellent => "Excellent",
            AirQualityLevel::Good => "Good",
            AirQualityLevel::Moderate => "Moderate",
            AirQualityLevel::Poor => "Poor",
            AirQualityLevel::Bad => "Bad",
        }
    }

    /// Display color (hex) for the level.
    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            AirQualityLevel::Excellent | AirQualityLevel::Good => "#4CAF50",
            AirQualityLevel::Moderate => "#FFC107",
            AirQualityLevel::Poor => "#FF9800",
            AirQualityLevel::Bad => "#F44336",
        }
    }
}

impl fmt::Display for AirQualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify a CO₂ concentration (ppm).
///
/// Bins: <600 excellent, <800 good, <1000 moderate, <1500 poor, else bad.
#[must_use]
pub fn co2_level(ppm: u16) -> AirQualityLevel {
    if ppm < 600 {
        AirQualityLevel::Excellent
    } else if ppm < 800 {
        AirQualityLevel::Good
    } else if ppm < 1000 {
        AirQualityLevel::Moderate
    } else if ppm < 1500 {
        AirQualityLevel::Poor
    } else {
        AirQualityLevel::Bad
    }
}

/// Classify a VOC index (0-500).
///
/// Bins: <150 good, <250 moderate, <400 poor, else bad.
#[must_use]
pub fn voc_level(index: u16) -> AirQualityLevel {
    index_level(index)
}

/// Classify a NOx index (0-500). Same bins as VOC.
#[must_use]
pub fn nox_level(index: u16) -> AirQualityLevel {
    index_level(index)
}

fn index_level(index: u16) -> AirQualityLevel {
    if index < 150 {
        AirQualityLevel::Good
    } else if index < 250 {
        AirQualityLevel::Moderate
    } else if index < 400 {
        AirQualityLevel::Poor
    } else {
        AirQualityLevel::Bad
    }
}

/// Composite air-quality score in the 0-100 range.
///
/// The score is the rounded mean of three per-metric terms, each floored at
/// zero: `100 - (co2 - 400) / 20`, `100 - voc / 5`, and `100 - nox / 5`.
#[must_use]
pub fn overall_score(co2: u16, voc: u16, nox: u16) -> u8 {
    let co2_score = (100.0 - (f64::from(co2) - 400.0) / 20.0).max(0.0);
    let voc_score = (100.0 - f64::from(voc) / 5.0).max(0.0);
    let nox_score = (100.0 - f64::from(nox) / 5.0).max(0.0);

    let mean = (co2_score + voc_score + nox_score) / 3.0;
    mean.round().clamp(0.0, 100.0) as u8
}

/// Score bands used for headline display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScoreBand {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl ScoreBand {
    /// Display label for the band.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Moderate => "Moderate",
            ScoreBand::Poor => "Poor",
        }
    }
}

/// Band a composite score: ≥80 excellent, ≥60 good, ≥40 moderate, else poor.
#[must_use]
pub fn score_band(score: u8) -> ScoreBand {
    if score >= 80 {
        ScoreBand::Excellent
    } else if score >= 60 {
        ScoreBand::Good
    } else if score >= 40 {
        ScoreBand::Moderate
    } else {
        ScoreBand::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_co2_boundaries_exact() {
        assert_eq!(co2_level(0), AirQualityLevel::Excellent);
        assert_eq!(co2_level(599), AirQualityLevel::Excellent);
        assert_eq!(co2_level(600), AirQualityLevel::Good);
        assert_eq!(co2_level(799), AirQualityLevel::Good);
        assert_eq!(co2_level(800), AirQualityLevel::Moderate);
        assert_eq!(co2_level(999), AirQualityLevel::Moderate);
        assert_eq!(co2_level(1000), AirQualityLevel::Poor);
        assert_eq!(co2_level(1499), AirQualityLevel::Poor);
        assert_eq!(co2_level(1500), AirQualityLevel::Bad);
        assert_eq!(co2_level(u16::MAX), AirQualityLevel::Bad);
    }

    #[test]
    fn test_index_boundaries_exact() {
        for classify in [voc_level, nox_level] {
            assert_eq!(classify(0), AirQualityLevel::Good);
            assert_eq!(classify(149), AirQualityLevel::Good);
            assert_eq!(classify(150), AirQualityLevel::Moderate);
            assert_eq!(classify(249), AirQualityLevel::Moderate);
            assert_eq!(classify(250), AirQualityLevel::Poor);
            assert_eq!(classify(399), AirQualityLevel::Poor);
            assert_eq!(classify(400), AirQualityLevel::Bad);
            assert_eq!(classify(500), AirQualityLevel::Bad);
        }
    }

    #[test]
    fn test_score_endpoints() {
        // Every term at its floor ceiling
        assert_eq!(overall_score(400, 0, 0), 100);
        // Every term clamps at zero
        assert_eq!(overall_score(2400, 500, 500), 0);
    }

    #[test]
    fn test_score_mid_values() {
        // co2=1000 -> 70, voc=250 -> 50, nox=100 -> 80; mean = 66.67 -> 67
        assert_eq!(overall_score(1000, 250, 100), 67);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(score_band(100), ScoreBand::Excellent);
        assert_eq!(score_band(80), ScoreBand::Excellent);
        assert_eq!(score_band(79), ScoreBand::Good);
        assert_eq!(score_band(60), ScoreBand::Good);
        assert_eq!(score_band(59), ScoreBand::Moderate);
        assert_eq!(score_band(40), ScoreBand::Moderate);
        assert_eq!(score_band(39), ScoreBand::Poor);
        assert_eq!(score_band(0), ScoreBand::Poor);
    }

    #[test]
    fn test_level_colors() {
        assert_eq!(AirQualityLevel::Excellent.color(), "#4CAF50");
        assert_eq!(AirQualityLevel::Bad.color(), "#F44336");
    }

    proptest! {
        #[test]
        fn prop_co2_level_matches_bin_definition(ppm in 0u16..=10_000) {
            let level = co2_level(ppm);
            let expected = match ppm {
                0..=599 => AirQualityLevel::Excellent,
                600..=799 => AirQualityLevel::Good,
                800..=999 => AirQualityLevel::Moderate,
                1000..=1499 => AirQualityLevel::Poor,
                _ => AirQualityLevel::Bad,
            };
            prop_assert_eq!(level, expected);
        }

        #[test]
        fn prop_score_in_valid_range(co2 in 400u16..=5000, voc in 0u16..=500, nox in 0u16..=500) {
            let score = overall_score(co2, voc, nox);
            prop_assert!(score <= 100);
        }

        #[test]
        fn prop_score_monotone_in_co2(co2 in 400u16..=4999, voc in 0u16..=500, nox in 0u16..=500) {
            prop_assert!(overall_score(co2 + 1, voc, nox) <= overall_score(co2, voc, nox));
        }
    }
}
