// Aggregator - folds phase output into the track-level summary
//
// TrackDescriptors is the only value handed to reporting and clustering.
// Mood dominance is weighted by phase duration, so one long section
// outweighs any number of short blips carrying a different tag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::character::{Character, CharacterProfile, CharacterScore};
use crate::analysis::moods::Mood;
use crate::analysis::phase::Phase;
use crate::analysis::structure::StructuralType;

/// Length of `TrackDescriptors::feature_vector`
pub const FEATURE_VECTOR_LEN: usize = 3 + Mood::ALL.len() + Character::ALL.len();

/// Total duration carrying one mood
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodWeight {
    pub mood: Mood,
    pub weight_secs: f64,
    /// Fraction of the track duration (0-1)
    pub share: f64,
}

/// Track-level analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptors {
    pub duration_secs: f64,
    pub phases: Vec<Phase>,
    /// Mood with the greatest duration-weighted occurrence
    pub dominant_mood: Option<Mood>,
    /// Every mood that occurs, in vocabulary order
    pub mood_weights: Vec<MoodWeight>,
    /// Highest-confidence character (vocabulary order breaks ties)
    pub primary_character: Option<Character>,
    pub characters: Vec<CharacterScore>,
    pub character_profile: CharacterProfile,
}

impl TrackDescriptors {
    pub fn new(
        duration_secs: f64,
        phases: Vec<Phase>,
        character_profile: CharacterProfile,
        characters: Vec<CharacterScore>,
    ) -> Self {
        let mood_weights = mood_weights(&phases, duration_secs);
        let dominant_mood = dominant_mood(&mood_weights);
        let primary_character = primary_character(&characters);
        Self {
            duration_secs,
            phases,
            dominant_mood,
            mood_weights,
            primary_character,
            characters,
            character_profile,
        }
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Number of phases per structural label
    pub fn structure_counts(&self) -> BTreeMap<StructuralType, usize> {
        let mut counts = BTreeMap::new();
        for phase in &self.phases {
            *counts.entry(phase.structural_type).or_insert(0) += 1;
        }
        counts
    }

    /// Duration share of `mood` (0 when it never occurs)
    pub fn mood_share(&self, mood: Mood) -> f64 {
        self.mood_weights
            .iter()
            .find(|w| w.mood == mood)
            .map_or(0.0, |w| w.share)
    }

    pub fn has_character(&self, character: Character) -> bool {
        self.characters.iter().any(|c| c.character == character)
    }

    /// Fixed-order numeric summary for clustering
    ///
    /// Layout: duration-weighted mean energy, brightness and rhythm density,
    /// then one share per mood and one 0/1 flag per character, both in
    /// vocabulary order.
    pub fn feature_vector(&self) -> Vec<f32> {
        let mut vector = Vec::with_capacity(FEATURE_VECTOR_LEN);
        let total: f64 = self.phases.iter().map(Phase::duration_secs).sum();
        let weighted = |value: fn(&Phase) -> f32| -> f32 {
            if total <= 0.0 {
                return 0.0;
            }
            let sum: f64 = self
                .phases
                .iter()
                .map(|p| value(p) as f64 * p.duration_secs())
                .sum();
            (sum / total) as f32
        };
        vector.push(weighted(|p| p.features.mean_energy));
        vector.push(weighted(|p| p.features.mean_brightness_hz));
        vector.push(weighted(|p| p.features.mean_rhythm_density));
        vector.extend(Mood::ALL.iter().map(|&m| self.mood_share(m) as f32));
        vector.extend(
            Character::ALL
                .iter()
                .map(|&c| if self.has_character(c) { 1.0 } else { 0.0 }),
        );
        vector
    }
}

fn mood_weights(phases: &[Phase], duration_secs: f64) -> Vec<MoodWeight> {
    let mut totals = [0.0f64; Mood::ALL.len()];
    for phase in phases {
        for mood in &phase.moods {
            totals[mood.index()] += phase.duration_secs();
        }
    }
    Mood::ALL
        .iter()
        .zip(totals)
        .filter(|(_, weight)| *weight > 0.0)
        .map(|(&mood, weight_secs)| MoodWeight {
            mood,
            weight_secs,
            share: if duration_secs > 0.0 {
                weight_secs / duration_secs
            } else {
                0.0
            },
        })
        .collect()
}

fn dominant_mood(weights: &[MoodWeight]) -> Option<Mood> {
    let mut best: Option<&MoodWeight> = None;
    for weight in weights {
        if best.map_or(true, |b| weight.weight_secs > b.weight_secs) {
            best = Some(weight);
        }
    }
    best.map(|w| w.mood)
}

fn primary_character(scores: &[CharacterScore]) -> Option<Character> {
    let mut best: Option<&CharacterScore> = None;
    for score in scores {
        if best.map_or(true, |b| score.confidence > b.confidence) {
            best = Some(score);
        }
    }
    best.map(|s| s.character)
}
