//! Calibration profile for the phase segmentation engine
//!
//! Every threshold the engine compares against lives here, grouped by the
//! stage that reads it. Profiles load from JSON so a genre can be
//! recalibrated without recompiling; omitted fields fall back to the
//! defaults, which are tuned for synthesizer/electronic material.
//!
//! A profile is validated once, before any frame is processed, and is never
//! mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub segmentation: SegmentationConfig,
    pub structure: StructureThresholds,
    pub moods: MoodThresholds,
    pub character: CharacterThresholds,
}

/// Change detection and segment building parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Centered moving-average window for level crossings; also the
    /// distance under which candidates are merged
    pub smoothing_window_secs: f64,
    /// Length of the before/after windows compared by the step measure
    pub step_window_secs: f64,
    /// Neighbourhood whose median score is the local baseline
    pub local_window_secs: f64,
    /// Robust standard deviations of score noise a step must clear
    pub sensitivity_std: f32,
    /// Minimum step prominence, as a fraction of the track feature means
    pub min_change_score: f32,
    /// Weight of bandwidth/rolloff steps relative to energy/brightness
    pub secondary_weight: f32,
    /// Level-crossing hysteresis as a fraction of the 5-95 percentile range
    pub hysteresis_fraction: f32,
    /// Minimum (p95 - p5) / p95 before level crossings are considered
    pub min_dynamic_range: f32,
    /// Shortest phase allowed (except a trailing fade)
    pub min_segment_duration_secs: f64,
    /// Brightness substituted when the centroid is undefined (silence)
    pub silence_brightness_hz: f32,
    /// Largest tolerated frame spacing, in multiples of the median hop
    pub max_gap_hops: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            smoothing_window_secs: 2.0,
            step_window_secs: 3.0,
            local_window_secs: 16.0,
            sensitivity_std: 3.0,
            min_change_score: 0.3,
            secondary_weight: 0.25,
            hysteresis_fraction: 0.05,
            min_dynamic_range: 0.3,
            min_segment_duration_secs: 5.0,
            silence_brightness_hz: 20_000.0,
            max_gap_hops: 4.0,
        }
    }
}

/// Thresholds read by the structural type rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureThresholds {
    /// Energy at or below which a span counts as silence
    pub near_silent_energy: f32,
    /// Centroid at or above which a span counts as collapsed to noise floor
    pub very_high_brightness_hz: f32,
    /// Upper bound of "low" energy
    pub low_energy: f32,
    /// Upper bound of "mid" energy (lower bound is `low_energy`)
    pub mid_energy_high: f32,
    /// Onset rate below which rhythm counts as sparse
    pub low_rhythm_density: f32,
    /// Onset rate above which a span is rhythmic
    pub rhythmic_density: f32,
    /// Relative energy rise across a span that counts as a steep build
    pub steep_rise: f32,
    /// Relative rise/fall inside which the trend is flat
    pub flat_trend_band: f32,
    /// Track energy percentile rank marking the climax band
    pub climax_percentile: f32,
    /// Centroid from which a span counts as moderately bright
    pub moderate_brightness_hz: f32,
    /// Centroid from which brightness dominates the span character
    pub dominant_brightness_hz: f32,
}

impl Default for StructureThresholds {
    fn default() -> Self {
        Self {
            near_silent_energy: 0.005,
            very_high_brightness_hz: 8_000.0,
            low_energy: 0.1,
            mid_energy_high: 0.2,
            low_rhythm_density: 2.0,
            rhythmic_density: 4.0,
            steep_rise: 0.2,
            flat_trend_band: 0.1,
            climax_percentile: 75.0,
            moderate_brightness_hz: 1_500.0,
            dominant_brightness_hz: 3_000.0,
        }
    }
}

/// Predicate constants for the 17 mood tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodThresholds {
    pub very_low_energy: f32,
    pub low_energy: f32,
    pub high_energy: f32,
    pub extreme_energy: f32,
    pub low_brightness_hz: f32,
    pub high_brightness_hz: f32,
    pub very_high_brightness_hz: f32,
    pub high_bandwidth_hz: f32,
    pub very_low_rhythm_density: f32,
    pub low_rhythm_density: f32,
    pub high_rhythm_density: f32,
    pub very_high_rhythm_density: f32,
    /// Onset rate at which a pulse fuses into a continuous drone
    pub saturated_rhythm_density: f32,
    pub long_duration_secs: f64,
    /// Energy coefficient of variation at or below which energy is sustained
    pub sustained_variation: f32,
    pub low_roughness: f32,
    pub high_roughness: f32,
    /// Track percentile rank a rising span must reach to be uplifting
    pub uplifting_percentile: f32,
    /// Track percentile rank a rough loud span must reach to be aggressive
    pub aggressive_percentile: f32,
}

impl Default for MoodThresholds {
    fn default() -> Self {
        Self {
            very_low_energy: 0.02,
            low_energy: 0.06,
            high_energy: 0.12,
            extreme_energy: 0.25,
            low_brightness_hz: 1_000.0,
            high_brightness_hz: 2_500.0,
            very_high_brightness_hz: 6_000.0,
            high_bandwidth_hz: 2_500.0,
            very_low_rhythm_density: 0.5,
            low_rhythm_density: 2.0,
            high_rhythm_density: 5.0,
            very_high_rhythm_density: 7.0,
            saturated_rhythm_density: 7.5,
            long_duration_secs: 20.0,
            sustained_variation: 0.15,
            low_roughness: 0.3,
            high_roughness: 0.6,
            uplifting_percentile: 50.0,
            aggressive_percentile: 90.0,
        }
    }
}

/// Predicate constants for the 9 track-level character tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterThresholds {
    /// Mean track energy at or below which no character is assigned
    pub silence_energy: f32,
    pub narrow_bandwidth_hz: f32,
    pub wide_bandwidth_hz: f32,
    pub noise_bandwidth_hz: f32,
    pub low_roughness: f32,
    pub high_roughness: f32,
    pub narrow_harmonic_spread: f32,
    pub wide_harmonic_spread: f32,
    pub noise_harmonic_spread: f32,
    pub bright_centroid_hz: f32,
    pub bright_rolloff_hz: f32,
    pub warm_centroid_hz: f32,
    pub beat_density: f32,
}

impl Default for CharacterThresholds {
    fn default() -> Self {
        Self {
            silence_energy: 0.005,
            narrow_bandwidth_hz: 1_200.0,
            wide_bandwidth_hz: 2_500.0,
            noise_bandwidth_hz: 4_000.0,
            low_roughness: 0.3,
            high_roughness: 0.6,
            narrow_harmonic_spread: 0.25,
            wide_harmonic_spread: 0.5,
            noise_harmonic_spread: 0.8,
            bright_centroid_hz: 3_000.0,
            bright_rolloff_hz: 6_000.0,
            warm_centroid_hz: 1_500.0,
            beat_density: 4.0,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from a JSON file
    ///
    /// Fields missing from the file keep their default values.
    ///
    /// # Errors
    /// * `ConfigError::Unreadable` - file could not be read
    /// * `ConfigError::Malformed` - JSON does not match the schema
    /// * `ConfigError::InvalidValue` / `ConfigError::Inconsistent` - validation failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let config = Self::from_json(&contents)?;
        log::info!("[Config] Loaded calibration profile from {:?}", path);
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|err| ConfigError::Malformed {
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every threshold for domain and ordering problems
    pub fn validate(&self) -> Result<(), ConfigError> {
        let seg = &self.segmentation;
        require_positive("segmentation.smoothing_window_secs", seg.smoothing_window_secs)?;
        require_positive("segmentation.step_window_secs", seg.step_window_secs)?;
        require_positive("segmentation.local_window_secs", seg.local_window_secs)?;
        require_non_negative("segmentation.sensitivity_std", seg.sensitivity_std as f64)?;
        require_positive("segmentation.min_change_score", seg.min_change_score as f64)?;
        require_non_negative("segmentation.secondary_weight", seg.secondary_weight as f64)?;
        require_non_negative(
            "segmentation.hysteresis_fraction",
            seg.hysteresis_fraction as f64,
        )?;
        require_non_negative("segmentation.min_dynamic_range", seg.min_dynamic_range as f64)?;
        require_positive(
            "segmentation.min_segment_duration_secs",
            seg.min_segment_duration_secs,
        )?;
        require_positive(
            "segmentation.silence_brightness_hz",
            seg.silence_brightness_hz as f64,
        )?;
        if !(seg.max_gap_hops.is_finite() && seg.max_gap_hops >= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "segmentation.max_gap_hops".to_string(),
                reason: format!("must be at least 1 (got {})", seg.max_gap_hops),
            });
        }
        if seg.local_window_secs < 2.0 * seg.step_window_secs {
            return Err(ConfigError::Inconsistent {
                reason: format!(
                    "local_window_secs {} must cover both step windows ({} each)",
                    seg.local_window_secs, seg.step_window_secs
                ),
            });
        }

        let st = &self.structure;
        let climax = st.climax_percentile;
        if !(climax.is_finite() && climax > 50.0 && climax < 100.0) {
            return Err(ConfigError::InvalidValue {
                field: "structure.climax_percentile".to_string(),
                reason: format!("must lie strictly between 50 and 100 (got {})", climax),
            });
        }
        require_positive("structure.steep_rise", st.steep_rise as f64)?;
        require_non_negative("structure.flat_trend_band", st.flat_trend_band as f64)?;
        if st.flat_trend_band >= st.steep_rise {
            return Err(ConfigError::Inconsistent {
                reason: format!(
                    "flat_trend_band {} must be below steep_rise {}",
                    st.flat_trend_band, st.steep_rise
                ),
            });
        }
        require_ascending(&[
            ("structure.near_silent_energy", st.near_silent_energy),
            ("structure.low_energy", st.low_energy),
            ("structure.mid_energy_high", st.mid_energy_high),
        ])?;
        require_ascending(&[
            ("structure.moderate_brightness_hz", st.moderate_brightness_hz),
            ("structure.dominant_brightness_hz", st.dominant_brightness_hz),
            ("structure.very_high_brightness_hz", st.very_high_brightness_hz),
        ])?;
        require_ascending(&[
            ("structure.low_rhythm_density", st.low_rhythm_density),
            ("structure.rhythmic_density", st.rhythmic_density),
        ])?;

        let m = &self.moods;
        require_ascending(&[
            ("moods.very_low_energy", m.very_low_energy),
            ("moods.low_energy", m.low_energy),
            ("moods.high_energy", m.high_energy),
            ("moods.extreme_energy", m.extreme_energy),
        ])?;
        require_ascending(&[
            ("moods.low_brightness_hz", m.low_brightness_hz),
            ("moods.high_brightness_hz", m.high_brightness_hz),
            ("moods.very_high_brightness_hz", m.very_high_brightness_hz),
        ])?;
        require_positive("moods.high_bandwidth_hz", m.high_bandwidth_hz as f64)?;
        require_ascending(&[
            ("moods.very_low_rhythm_density", m.very_low_rhythm_density),
            ("moods.low_rhythm_density", m.low_rhythm_density),
            ("moods.high_rhythm_density", m.high_rhythm_density),
            ("moods.very_high_rhythm_density", m.very_high_rhythm_density),
        ])?;
        require_ascending(&[
            ("moods.low_roughness", m.low_roughness),
            ("moods.high_roughness", m.high_roughness),
        ])?;
        require_positive("moods.long_duration_secs", m.long_duration_secs)?;
        require_non_negative("moods.sustained_variation", m.sustained_variation as f64)?;
        require_percentile("moods.uplifting_percentile", m.uplifting_percentile)?;
        require_percentile("moods.aggressive_percentile", m.aggressive_percentile)?;

        let c = &self.character;
        require_non_negative("character.silence_energy", c.silence_energy as f64)?;
        require_ascending(&[
            ("character.narrow_bandwidth_hz", c.narrow_bandwidth_hz),
            ("character.wide_bandwidth_hz", c.wide_bandwidth_hz),
            ("character.noise_bandwidth_hz", c.noise_bandwidth_hz),
        ])?;
        require_ascending(&[
            ("character.low_roughness", c.low_roughness),
            ("character.high_roughness", c.high_roughness),
        ])?;
        require_ascending(&[
            ("character.narrow_harmonic_spread", c.narrow_harmonic_spread),
            ("character.wide_harmonic_spread", c.wide_harmonic_spread),
            ("character.noise_harmonic_spread", c.noise_harmonic_spread),
        ])?;
        require_ascending(&[
            ("character.warm_centroid_hz", c.warm_centroid_hz),
            ("character.bright_centroid_hz", c.bright_centroid_hz),
        ])?;
        require_positive("character.bright_rolloff_hz", c.bright_rolloff_hz as f64)?;
        require_positive("character.beat_density", c.beat_density as f64)?;

        Ok(())
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be positive (got {})", value),
        })
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be non-negative (got {})", value),
        })
    }
}

fn require_percentile(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must lie in [0, 100] (got {})", value),
        })
    }
}

/// Each threshold in a ladder must be finite, non-negative and strictly
/// below the next one.
fn require_ascending(ladder: &[(&str, f32)]) -> Result<(), ConfigError> {
    for &(field, value) in ladder {
        require_non_negative(field, value as f64)?;
    }
    for pair in ladder.windows(2) {
        let (lower_name, lower) = pair[0];
        let (upper_name, upper) = pair[1];
        if lower >= upper {
            return Err(ConfigError::Inconsistent {
                reason: format!(
                    "{} ({}) must be below {} ({})",
                    lower_name, lower, upper_name, upper
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.segmentation.min_segment_duration_secs, 5.0);
        assert_eq!(config.structure.climax_percentile, 75.0);
        assert_eq!(config.moods.long_duration_secs, 20.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let parsed =
            EngineConfig::from_json(r#"{"segmentation": {"min_segment_duration_secs": 2.0}}"#)
                .unwrap();
        assert_eq!(parsed.segmentation.min_segment_duration_secs, 2.0);
        assert_eq!(parsed.segmentation.smoothing_window_secs, 2.0);
        assert_eq!(parsed.moods, MoodThresholds::default());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_non_positive_min_segment_rejected() {
        let mut config = EngineConfig::default();
        config.segmentation.min_segment_duration_secs = 0.0;
        match config.validate().unwrap_err() {
            ConfigError::InvalidValue { field, .. } => {
                assert_eq!(field, "segmentation.min_segment_duration_secs");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_energy_ladder_rejected() {
        let mut config = EngineConfig::default();
        config.moods.high_energy = 0.01;
        match config.validate().unwrap_err() {
            ConfigError::Inconsistent { reason } => {
                assert!(reason.contains("moods.low_energy"));
                assert!(reason.contains("moods.high_energy"));
            }
            other => panic!("Expected Inconsistent, got {:?}", other),
        }
    }

    #[test]
    fn test_high_bandwidth_must_be_positive() {
        let mut config = EngineConfig::default();
        config.moods.high_bandwidth_hz = 0.0;
        match config.validate().unwrap_err() {
            ConfigError::InvalidValue { field, .. } => {
                assert_eq!(field, "moods.high_bandwidth_hz");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_change_score_rejected() {
        let mut config = EngineConfig::default();
        config.segmentation.min_change_score = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_climax_percentile_domain() {
        let mut config = EngineConfig::default();
        config.structure.climax_percentile = 40.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_local_window_shorter_than_step_windows_rejected() {
        let mut config = EngineConfig::default();
        config.segmentation.local_window_secs = 5.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = EngineConfig::load_from_file("/nonexistent/phase_engine.json").unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
