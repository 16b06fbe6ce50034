//! Phase - one labelled structural section of a track
//!
//! Phases are produced in time order by the analyzer and never reordered.
//! Their aggregate features are stored alongside the labels so that any tag
//! can be re-derived (and explained) from the numbers on the phase itself.

use serde::{Deserialize, Serialize};

use crate::analysis::moods::Mood;
use crate::analysis::structure::StructuralType;

/// Direction of the energy trend across a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyTrend {
    Rising,
    Flat,
    Falling,
}

impl EnergyTrend {
    /// Classify a relative rise against a symmetric flat band
    pub fn from_rise(rise: f32, flat_band: f32) -> Self {
        if rise > flat_band {
            EnergyTrend::Rising
        } else if rise < -flat_band {
            EnergyTrend::Falling
        } else {
            EnergyTrend::Flat
        }
    }
}

/// Aggregated features for one span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseFeatures {
    pub duration_secs: f64,
    pub frame_count: usize,
    pub mean_energy: f32,
    /// Mean of the defined centroids; the silence sentinel when none are
    pub mean_brightness_hz: f32,
    pub mean_bandwidth_hz: f32,
    pub mean_rolloff_hz: f32,
    pub mean_rhythm_density: f32,
    pub mean_roughness: f32,
    /// Least-squares energy slope per second
    pub energy_slope: f32,
    /// Energy change across the span relative to its mean level
    pub energy_rise: f32,
    pub energy_trend: EnergyTrend,
    /// Coefficient of variation of energy inside the span
    pub energy_variation: f32,
    /// Percentile rank of `mean_energy` within the whole track (0-100)
    pub energy_percentile: f32,
}

/// A labelled structural section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
    pub structural_type: StructuralType,
    /// Name of the structure rule that produced `structural_type`
    pub structure_rule: String,
    pub features: PhaseFeatures,
    /// Mood tags in vocabulary order
    pub moods: Vec<Mood>,
}

impl Phase {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Start truncated to whole seconds
    pub fn display_start(&self) -> u64 {
        self.start_secs.max(0.0) as u64
    }

    /// End truncated to whole seconds
    pub fn display_end(&self) -> u64 {
        self.end_secs.max(0.0) as u64
    }

    /// `mm:ss-mm:ss` range for reports
    pub fn display_range(&self) -> String {
        format!(
            "{}-{}",
            format_clock(self.display_start()),
            format_clock(self.display_end())
        )
    }

    pub fn has_mood(&self, mood: Mood) -> bool {
        self.moods.contains(&mood)
    }
}

fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
