// Structure - first-match structural labelling of spans
//
// Each span gets exactly one StructuralType. The rules live in a single
// ordered table and are evaluated top to bottom; the first predicate that
// holds decides the label. A span that satisfies several predicates (loud
// *and* rhythmic, say) is therefore always resolved by table position and
// never by comparing magnitudes across rules.
//
// Inputs per span: position in the track (first / last / interior and the
// midpoint as a fraction of the duration) plus the aggregated PhaseFeatures,
// whose energy percentile is already relative to the whole track.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::phase::{EnergyTrend, PhaseFeatures};
use crate::config::StructureThresholds;

/// Structural label for a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructuralType {
    #[serde(rename = "Introduction")]
    Introduction,
    #[serde(rename = "Development")]
    Development,
    #[serde(rename = "Build-up/Energetic")]
    BuildUp,
    #[serde(rename = "Rhythmic/Percussive")]
    Rhythmic,
    #[serde(rename = "Bright/Melodic")]
    BrightMelodic,
    #[serde(rename = "Climax/Peak")]
    Climax,
    #[serde(rename = "Conclusion")]
    Conclusion,
    #[serde(rename = "Outro/Fade")]
    OutroFade,
    #[serde(rename = "Intro/Ambient")]
    IntroAmbient,
    #[serde(rename = "Breakdown/Quiet")]
    Breakdown,
}

impl StructuralType {
    pub const ALL: [StructuralType; 10] = [
        StructuralType::Introduction,
        StructuralType::Development,
        StructuralType::BuildUp,
        StructuralType::Rhythmic,
        StructuralType::BrightMelodic,
        StructuralType::Climax,
        StructuralType::Conclusion,
        StructuralType::OutroFade,
        StructuralType::IntroAmbient,
        StructuralType::Breakdown,
    ];

    /// Human-readable label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            StructuralType::Introduction => "Introduction",
            StructuralType::Development => "Development",
            StructuralType::BuildUp => "Build-up/Energetic",
            StructuralType::Rhythmic => "Rhythmic/Percussive",
            StructuralType::BrightMelodic => "Bright/Melodic",
            StructuralType::Climax => "Climax/Peak",
            StructuralType::Conclusion => "Conclusion",
            StructuralType::OutroFade => "Outro/Fade",
            StructuralType::IntroAmbient => "Intro/Ambient",
            StructuralType::Breakdown => "Breakdown/Quiet",
        }
    }
}

impl fmt::Display for StructuralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a span sits in the track, plus its aggregated features
#[derive(Debug, Clone, Copy)]
pub struct SpanContext<'a> {
    pub features: &'a PhaseFeatures,
    pub is_first: bool,
    pub is_last: bool,
    /// Span midpoint as a fraction of the track duration (0-1)
    pub midpoint: f64,
}

impl<'a> SpanContext<'a> {
    pub fn new(
        features: &'a PhaseFeatures,
        start_secs: f64,
        end_secs: f64,
        duration_secs: f64,
        index: usize,
        span_count: usize,
    ) -> Self {
        let midpoint = if duration_secs > 0.0 {
            ((start_secs + end_secs) / 2.0 / duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            features,
            is_first: index == 0,
            is_last: index + 1 == span_count,
            midpoint,
        }
    }

    fn is_interior(&self) -> bool {
        !self.is_first && !self.is_last
    }
}

/// Spectral energy collapsed to the noise floor
pub fn is_fade_tail(features: &PhaseFeatures, t: &StructureThresholds) -> bool {
    features.mean_energy <= t.near_silent_energy
        && features.mean_brightness_hz >= t.very_high_brightness_hz
}

/// One entry of the priority table
pub struct StructureRule {
    pub name: &'static str,
    pub label: StructuralType,
    pub predicate: fn(&SpanContext<'_>, &StructureThresholds) -> bool,
}

impl StructureRule {
    pub fn matches(&self, ctx: &SpanContext<'_>, thresholds: &StructureThresholds) -> bool {
        (self.predicate)(ctx, thresholds)
    }
}

impl fmt::Debug for StructureRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureRule")
            .field("name", &self.name)
            .field("label", &self.label)
            .finish()
    }
}

/// Priority-ordered structure rules; the last entry always matches
pub static STRUCTURE_RULES: &[StructureRule] = &[
    StructureRule {
        name: "outro_fade",
        label: StructuralType::OutroFade,
        predicate: |c, t| c.is_last && is_fade_tail(c.features, t),
    },
    StructureRule {
        name: "intro_ambient",
        label: StructuralType::IntroAmbient,
        predicate: |c, t| {
            c.is_first
                && is_fade_tail(c.features, t)
                && c.features.mean_rhythm_density < t.low_rhythm_density
        },
    },
    StructureRule {
        name: "introduction",
        label: StructuralType::Introduction,
        predicate: |c, t| {
            c.is_first
                && c.features.mean_energy < t.low_energy
                && c.features.mean_rhythm_density < t.low_rhythm_density
        },
    },
    StructureRule {
        name: "build_up",
        label: StructuralType::BuildUp,
        // Once a span sits in the climax band it reads as the peak, rising or not
        predicate: |c, t| {
            c.features.energy_rise >= t.steep_rise
                && c.features.energy_percentile > 50.0
                && c.features.energy_percentile < t.climax_percentile
        },
    },
    StructureRule {
        name: "climax",
        label: StructuralType::Climax,
        predicate: |c, t| {
            c.features.energy_percentile >= t.climax_percentile
                && c.features.mean_energy > t.near_silent_energy
        },
    },
    StructureRule {
        name: "rhythmic",
        label: StructuralType::Rhythmic,
        predicate: |c, t| c.features.mean_rhythm_density > t.rhythmic_density,
    },
    StructureRule {
        name: "bright_melodic",
        label: StructuralType::BrightMelodic,
        predicate: |c, t| {
            c.features.mean_rhythm_density < t.low_rhythm_density
                && c.features.mean_brightness_hz >= t.dominant_brightness_hz
                && c.features.energy_trend != EnergyTrend::Rising
        },
    },
    StructureRule {
        name: "development",
        label: StructuralType::Development,
        predicate: |c, t| {
            c.is_interior()
                && c.features.mean_rhythm_density < t.low_rhythm_density
                && c.features.mean_brightness_hz >= t.moderate_brightness_hz
                && c.features.energy_trend != EnergyTrend::Rising
                && c.features.mean_energy >= t.low_energy
                && c.features.mean_energy <= t.mid_energy_high
        },
    },
    StructureRule {
        name: "conclusion",
        label: StructuralType::Conclusion,
        predicate: |c, _| c.features.energy_trend == EnergyTrend::Falling && c.midpoint >= 0.5,
    },
    StructureRule {
        name: "breakdown",
        label: StructuralType::Breakdown,
        predicate: |c, t| {
            !c.is_first
                && c.midpoint < 0.5
                && c.features.mean_rhythm_density < t.low_rhythm_density
                && c.features.mean_energy < t.low_energy
        },
    },
    StructureRule {
        name: "fallback",
        label: StructuralType::Rhythmic,
        predicate: |_, _| true,
    },
];

/// Applies STRUCTURE_RULES with a fixed threshold set
pub struct StructureClassifier<'a> {
    thresholds: &'a StructureThresholds,
}

impl<'a> StructureClassifier<'a> {
    pub fn new(thresholds: &'a StructureThresholds) -> Self {
        Self { thresholds }
    }

    /// First matching rule for the span
    pub fn classify(&self, ctx: &SpanContext<'_>) -> &'static StructureRule {
        let last = STRUCTURE_RULES.len() - 1;
        STRUCTURE_RULES
            .iter()
            .find(|rule| rule.matches(ctx, self.thresholds))
            .unwrap_or(&STRUCTURE_RULES[last])
    }
}

#[cfg(test)]
#[path = "structure_tests.rs"]
mod tests;
