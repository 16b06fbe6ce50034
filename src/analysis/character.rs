// Character - track-level timbre descriptors
//
// Characters describe the synthesis type and texture of the whole track, so
// they are computed once from a profile aggregated over every frame rather
// than per phase. Tags are not mutually exclusive. Each flagged tag carries
// a confidence in [0.5, 1.0]: 0.5 when the profile only just clears the
// predicate, rising towards 1.0 as every comparison clears its threshold by
// a full threshold's width.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::frames::{FeatureFrame, CHROMA_BINS};
use crate::analysis::stats::{mean, EPSILON};
use crate::config::CharacterThresholds;

/// Character vocabulary, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    AnalogSynth,
    DigitalSynth,
    AcousticInstrument,
    ElectronicBeats,
    RichTexture,
    MinimalTexture,
    BrightHarmonics,
    WarmHarmonics,
    NoiseBased,
}

impl Character {
    pub const ALL: [Character; 9] = [
        Character::AnalogSynth,
        Character::DigitalSynth,
        Character::AcousticInstrument,
        Character::ElectronicBeats,
        Character::RichTexture,
        Character::MinimalTexture,
        Character::BrightHarmonics,
        Character::WarmHarmonics,
        Character::NoiseBased,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Character::AnalogSynth => "analog_synth",
            Character::DigitalSynth => "digital_synth",
            Character::AcousticInstrument => "acoustic_instrument",
            Character::ElectronicBeats => "electronic_beats",
            Character::RichTexture => "rich_texture",
            Character::MinimalTexture => "minimal_texture",
            Character::BrightHarmonics => "bright_harmonics",
            Character::WarmHarmonics => "warm_harmonics",
            Character::NoiseBased => "noise_based",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whole-track timbre profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub mean_energy: f32,
    /// Mean of the defined centroids (the silence sentinel when none are)
    pub mean_brightness_hz: f32,
    pub mean_bandwidth_hz: f32,
    pub mean_rolloff_hz: f32,
    pub mean_rhythm_density: f32,
    pub mean_roughness: f32,
    /// Share of chroma bins holding at least half the strongest bin's weight
    pub harmonic_spread: f32,
}

impl CharacterProfile {
    pub fn from_frames(frames: &[FeatureFrame], silence_brightness_hz: f32) -> Self {
        let collect = |feature: fn(&FeatureFrame) -> f32| -> f32 {
            let values: Vec<f32> = frames.iter().map(feature).collect();
            mean(&values)
        };
        let brightness: Vec<f32> = frames.iter().filter_map(FeatureFrame::brightness).collect();
        let mean_brightness_hz = if brightness.is_empty() {
            silence_brightness_hz
        } else {
            mean(&brightness)
        };

        Self {
            mean_energy: collect(|f| f.energy),
            mean_brightness_hz,
            mean_bandwidth_hz: collect(|f| f.bandwidth_hz),
            mean_rolloff_hz: collect(|f| f.rolloff_hz),
            mean_rhythm_density: collect(|f| f.rhythm_density),
            mean_roughness: collect(|f| f.roughness),
            harmonic_spread: harmonic_spread(frames),
        }
    }
}

fn harmonic_spread(frames: &[FeatureFrame]) -> f32 {
    if frames.is_empty() {
        return 0.0;
    }
    let mut profile = [0.0f64; CHROMA_BINS];
    for frame in frames {
        for (acc, &bin) in profile.iter_mut().zip(frame.chroma.iter()) {
            *acc += bin as f64;
        }
    }
    let peak = profile.iter().cloned().fold(0.0, f64::max);
    if peak <= EPSILON as f64 {
        return 0.0;
    }
    let active = profile.iter().filter(|&&v| v >= 0.5 * peak).count();
    active as f32 / CHROMA_BINS as f32
}

/// Confidence contribution for `value >= threshold`
fn at_least(value: f32, threshold: f32) -> Option<f32> {
    (value >= threshold).then(|| clearance(value - threshold, threshold))
}

/// Confidence contribution for `value < threshold`
fn below(value: f32, threshold: f32) -> Option<f32> {
    (value < threshold).then(|| clearance(threshold - value, threshold))
}

/// Confidence contribution for `value > threshold`
fn above(value: f32, threshold: f32) -> Option<f32> {
    (value > threshold).then(|| clearance(value - threshold, threshold))
}

fn clearance(margin: f32, threshold: f32) -> f32 {
    0.5 + 0.5 * (margin / threshold.abs().max(EPSILON)).clamp(0.0, 1.0)
}

/// Average confidence when every comparison holds
fn all_of(parts: &[Option<f32>]) -> Option<f32> {
    let mut sum = 0.0;
    for part in parts {
        sum += (*part)?;
    }
    Some(sum / parts.len().max(1) as f32)
}

/// A character and its scoring predicate
pub struct CharacterRule {
    pub character: Character,
    /// Confidence when the predicate holds, None otherwise
    pub evaluate: fn(&CharacterProfile, &CharacterThresholds) -> Option<f32>,
}

impl fmt::Debug for CharacterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharacterRule")
            .field("character", &self.character)
            .finish()
    }
}

pub static CHARACTER_RULES: &[CharacterRule] = &[
    CharacterRule {
        character: Character::AnalogSynth,
        evaluate: |p, t| {
            all_of(&[
                at_least(p.mean_bandwidth_hz, t.narrow_bandwidth_hz),
                below(p.mean_bandwidth_hz, t.wide_bandwidth_hz),
                at_least(p.mean_roughness, t.low_roughness),
                below(p.mean_roughness, t.high_roughness),
                below(p.mean_brightness_hz, t.bright_centroid_hz),
            ])
        },
    },
    CharacterRule {
        character: Character::DigitalSynth,
        evaluate: |p, t| {
            all_of(&[
                below(p.mean_bandwidth_hz, t.narrow_bandwidth_hz),
                below(p.mean_roughness, t.low_roughness),
            ])
        },
    },
    CharacterRule {
        character: Character::AcousticInstrument,
        evaluate: |p, t| {
            all_of(&[
                at_least(p.harmonic_spread, t.wide_harmonic_spread),
                at_least(p.mean_roughness, t.high_roughness),
            ])
        },
    },
    CharacterRule {
        character: Character::ElectronicBeats,
        evaluate: |p, t| {
            all_of(&[
                at_least(p.mean_rhythm_density, t.beat_density),
                below(p.mean_roughness, t.high_roughness),
            ])
        },
    },
    CharacterRule {
        character: Character::RichTexture,
        evaluate: |p, t| {
            all_of(&[
                at_least(p.mean_bandwidth_hz, t.wide_bandwidth_hz),
                above(p.harmonic_spread, t.narrow_harmonic_spread),
            ])
        },
    },
    CharacterRule {
        character: Character::MinimalTexture,
        evaluate: |p, t| {
            let sparse = (p.harmonic_spread <= t.narrow_harmonic_spread)
                .then(|| clearance(t.narrow_harmonic_spread - p.harmonic_spread, t.narrow_harmonic_spread));
            all_of(&[below(p.mean_bandwidth_hz, t.narrow_bandwidth_hz), sparse])
        },
    },
    CharacterRule {
        character: Character::BrightHarmonics,
        evaluate: |p, t| {
            all_of(&[
                at_least(p.mean_brightness_hz, t.bright_centroid_hz),
                at_least(p.mean_rolloff_hz, t.bright_rolloff_hz),
            ])
        },
    },
    CharacterRule {
        character: Character::WarmHarmonics,
        evaluate: |p, t| {
            all_of(&[
                below(p.mean_brightness_hz, t.warm_centroid_hz),
                below(p.mean_roughness, t.high_roughness),
            ])
        },
    },
    CharacterRule {
        character: Character::NoiseBased,
        evaluate: |p, t| {
            all_of(&[
                at_least(p.mean_bandwidth_hz, t.noise_bandwidth_hz),
                at_least(p.harmonic_spread, t.noise_harmonic_spread),
            ])
        },
    },
];

/// A flagged character with its confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacterScore {
    pub character: Character,
    pub confidence: f32,
}

/// Evaluates CHARACTER_RULES with a fixed threshold set
pub struct CharacterClassifier<'a> {
    thresholds: &'a CharacterThresholds,
}

impl<'a> CharacterClassifier<'a> {
    pub fn new(thresholds: &'a CharacterThresholds) -> Self {
        Self { thresholds }
    }

    /// Flagged characters in vocabulary order; none for a silent track
    pub fn classify(&self, profile: &CharacterProfile) -> Vec<CharacterScore> {
        if profile.mean_energy <= self.thresholds.silence_energy {
            return Vec::new();
        }
        CHARACTER_RULES
            .iter()
            .filter_map(|rule| {
                (rule.evaluate)(profile, self.thresholds).map(|confidence| CharacterScore {
                    character: rule.character,
                    confidence,
                })
            })
            .collect()
    }
}
