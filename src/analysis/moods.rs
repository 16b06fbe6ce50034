// Moods - multi-label creative descriptors for a phase
//
// The 17 moods are evaluated independently; a phase may carry any subset of
// them. Every predicate is a conjunction of comparisons between one of the
// phase's aggregated features and a MoodThresholds field, so a tag can be
// re-derived (and explained) from the stored PhaseFeatures alone.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::phase::{EnergyTrend, PhaseFeatures};
use crate::config::MoodThresholds;

/// Mood vocabulary, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Spacey,
    Jazzy,
    Chaos,
    Oozy,
    Ethereal,
    Droning,
    Tense,
    Glitchy,
    Driving,
    Percussive,
    Synthetic,
    Hypnotic,
    Dreamy,
    Dark,
    Uplifting,
    Aggressive,
    Melancholic,
}

impl Mood {
    pub const ALL: [Mood; 17] = [
        Mood::Spacey,
        Mood::Jazzy,
        Mood::Chaos,
        Mood::Oozy,
        Mood::Ethereal,
        Mood::Droning,
        Mood::Tense,
        Mood::Glitchy,
        Mood::Driving,
        Mood::Percussive,
        Mood::Synthetic,
        Mood::Hypnotic,
        Mood::Dreamy,
        Mood::Dark,
        Mood::Uplifting,
        Mood::Aggressive,
        Mood::Melancholic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Mood::Spacey => "spacey",
            Mood::Jazzy => "jazzy",
            Mood::Chaos => "chaos",
            Mood::Oozy => "oozy",
            Mood::Ethereal => "ethereal",
            Mood::Droning => "droning",
            Mood::Tense => "tense",
            Mood::Glitchy => "glitchy",
            Mood::Driving => "driving",
            Mood::Percussive => "percussive",
            Mood::Synthetic => "synthetic",
            Mood::Hypnotic => "hypnotic",
            Mood::Dreamy => "dreamy",
            Mood::Dark => "dark",
            Mood::Uplifting => "uplifting",
            Mood::Aggressive => "aggressive",
            Mood::Melancholic => "melancholic",
        }
    }

    /// Position in the vocabulary (also the priority rank)
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A mood and the predicate that flags it
pub struct MoodRule {
    pub mood: Mood,
    pub predicate: fn(&PhaseFeatures, &MoodThresholds) -> bool,
}

impl MoodRule {
    pub fn matches(&self, features: &PhaseFeatures, thresholds: &MoodThresholds) -> bool {
        (self.predicate)(features, thresholds)
    }
}

impl fmt::Debug for MoodRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoodRule").field("mood", &self.mood).finish()
    }
}

/// Mood predicates in vocabulary order
pub static MOOD_RULES: &[MoodRule] = &[
    MoodRule {
        mood: Mood::Spacey,
        predicate: |f, t| {
            f.mean_energy < t.low_energy
                && f.mean_brightness_hz > t.high_brightness_hz
                && f.mean_rhythm_density < t.low_rhythm_density
        },
    },
    MoodRule {
        mood: Mood::Jazzy,
        predicate: |f, t| {
            (t.low_energy..t.high_energy).contains(&f.mean_energy)
                && (t.low_brightness_hz..=t.high_brightness_hz).contains(&f.mean_brightness_hz)
                && (t.low_rhythm_density..t.high_rhythm_density).contains(&f.mean_rhythm_density)
                && f.mean_roughness >= t.low_roughness
        },
    },
    MoodRule {
        mood: Mood::Chaos,
        predicate: |f, t| {
            f.mean_energy >= t.extreme_energy
                && f.mean_bandwidth_hz >= t.high_bandwidth_hz
                && f.mean_rhythm_density >= t.very_high_rhythm_density
        },
    },
    MoodRule {
        mood: Mood::Oozy,
        predicate: |f, t| {
            f.mean_energy < t.very_low_energy
                && f.mean_brightness_hz < t.low_brightness_hz
                && f.duration_secs >= t.long_duration_secs
        },
    },
    MoodRule {
        mood: Mood::Ethereal,
        predicate: |f, t| {
            f.mean_energy < t.low_energy
                && f.mean_brightness_hz >= t.very_high_brightness_hz
                && f.mean_rhythm_density < t.low_rhythm_density
        },
    },
    MoodRule {
        mood: Mood::Droning,
        // A pulse dense enough to fuse reads as a drone too
        predicate: |f, t| {
            f.duration_secs >= t.long_duration_secs
                && f.energy_variation <= t.sustained_variation
                && f.mean_energy >= t.very_low_energy
                && (f.mean_rhythm_density <= t.very_low_rhythm_density
                    || f.mean_rhythm_density >= t.saturated_rhythm_density)
        },
    },
    MoodRule {
        mood: Mood::Tense,
        predicate: |f, t| {
            f.mean_energy >= t.high_energy
                && f.mean_rhythm_density >= t.high_rhythm_density
                && f.mean_brightness_hz < t.high_brightness_hz
        },
    },
    MoodRule {
        mood: Mood::Glitchy,
        predicate: |f, t| {
            f.mean_rhythm_density >= t.very_high_rhythm_density
                && f.mean_brightness_hz >= t.low_brightness_hz
        },
    },
    MoodRule {
        mood: Mood::Driving,
        predicate: |f, t| {
            f.mean_energy >= t.high_energy
                && f.mean_rhythm_density >= t.high_rhythm_density
                && f.energy_trend != EnergyTrend::Falling
        },
    },
    MoodRule {
        mood: Mood::Percussive,
        predicate: |f, t| {
            f.mean_rhythm_density >= t.high_rhythm_density && f.mean_energy >= t.very_low_energy
        },
    },
    MoodRule {
        mood: Mood::Synthetic,
        predicate: |f, t| {
            f.mean_bandwidth_hz < t.high_bandwidth_hz
                && f.mean_roughness < t.low_roughness
                && f.mean_energy >= t.very_low_energy
        },
    },
    MoodRule {
        mood: Mood::Hypnotic,
        predicate: |f, t| {
            (t.low_rhythm_density..t.very_high_rhythm_density).contains(&f.mean_rhythm_density)
                && f.energy_variation <= t.sustained_variation
                && f.duration_secs >= t.long_duration_secs
        },
    },
    MoodRule {
        mood: Mood::Dreamy,
        predicate: |f, t| {
            (t.very_low_energy..t.high_energy).contains(&f.mean_energy)
                && (t.low_brightness_hz..t.very_high_brightness_hz).contains(&f.mean_brightness_hz)
                && f.mean_rhythm_density < t.low_rhythm_density
        },
    },
    MoodRule {
        mood: Mood::Dark,
        predicate: |f, t| f.mean_brightness_hz < t.low_brightness_hz && f.mean_energy >= t.low_energy,
    },
    MoodRule {
        mood: Mood::Uplifting,
        predicate: |f, t| {
            f.energy_trend == EnergyTrend::Rising
                && f.mean_brightness_hz >= t.low_brightness_hz
                && f.energy_percentile >= t.uplifting_percentile
        },
    },
    MoodRule {
        mood: Mood::Aggressive,
        predicate: |f, t| {
            f.mean_energy >= t.high_energy
                && f.mean_roughness >= t.high_roughness
                && f.energy_percentile >= t.aggressive_percentile
        },
    },
    MoodRule {
        mood: Mood::Melancholic,
        predicate: |f, t| {
            f.energy_trend == EnergyTrend::Falling
                && f.mean_energy < t.high_energy
                && f.mean_brightness_hz < t.high_brightness_hz
                && f.mean_rhythm_density < t.high_rhythm_density
        },
    },
];

/// Evaluates MOOD_RULES with a fixed threshold set
pub struct MoodClassifier<'a> {
    thresholds: &'a MoodThresholds,
}

impl<'a> MoodClassifier<'a> {
    pub fn new(thresholds: &'a MoodThresholds) -> Self {
        Self { thresholds }
    }

    /// All flagged moods, in vocabulary order
    pub fn classify(&self, features: &PhaseFeatures) -> Vec<Mood> {
        MOOD_RULES
            .iter()
            .filter(|rule| rule.matches(features, self.thresholds))
            .map(|rule| rule.mood)
            .collect()
    }
}

#[cfg(test)]
#[path = "moods_tests.rs"]
mod tests;
