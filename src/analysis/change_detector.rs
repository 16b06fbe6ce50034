// ChangeDetector - proposes structural boundaries from feature steps
//
// Algorithm:
// 1. Step measure: at every frame, the mean of a series over the next
//    `step_window_secs` minus its mean over the previous one, relative to
//    the series' track mean. Energy, brightness, bandwidth and rolloff are
//    measured independently. A linear ramp scores a constant, a section
//    change scores a peak.
// 2. Combine: score = hypot(energy, brightness) + w * mean(bandwidth, rolloff)
// 3. Baseline: median score over `local_window_secs` around each frame.
//    Prominence is the score minus its baseline.
// 4. Adaptive threshold: a frame is above threshold when its prominence
//    reaches `min_change_score` and `sensitivity_std` robust standard
//    deviations (1.4826 * MAD) of the track's prominence.
// 5. Peak pick: each run of above-threshold frames yields one candidate at
//    the centre of its maximum.
// 6. A track without any step is purely gradual; there, level crossings of
//    the smoothed energy through the track median and climax percentile
//    split long ramps instead.
// 7. Candidates closer than one smoothing window are merged (highest score
//    wins) and the track edges are never emitted.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::analysis::frames::FeatureFrame;
use crate::analysis::level_crossing::{LevelCrossingDetector, LevelCrossingEvent};
use crate::analysis::stats::{mean, median, moving_average, TrackStatistics, EPSILON};
use crate::config::SegmentationConfig;

/// Scales a median absolute deviation to a normal standard deviation
const MAD_TO_STD: f32 = 1.4826;

/// What produced a boundary candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Gradient,
    LevelCrossing(LevelCrossingEvent),
}

/// A proposed boundary between two phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCandidate {
    pub timestamp: f64,
    /// Step magnitude, as a fraction of the track means of the features
    pub score: f32,
    pub source: CandidateSource,
}

/// Step & change detection stage
pub struct ChangeDetector<'a> {
    config: &'a SegmentationConfig,
    climax_percentile: f32,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(config: &'a SegmentationConfig, climax_percentile: f32) -> Self {
        Self {
            config,
            climax_percentile,
        }
    }

    /// Smoothing window length in frames (always odd, at least 1)
    pub fn window_frames(&self, hop_secs: f64) -> usize {
        let frames = frames_for(self.config.smoothing_window_secs, hop_secs);
        if frames % 2 == 0 {
            frames + 1
        } else {
            frames
        }
    }

    /// Frames on each side of the step measure
    pub fn step_frames(&self, hop_secs: f64) -> usize {
        frames_for(self.config.step_window_secs, hop_secs)
    }

    /// Propose boundary candidates for a validated stream
    ///
    /// # Returns
    /// Candidates with strictly increasing timestamps inside (0, duration)
    pub fn detect(
        &self,
        frames: &[FeatureFrame],
        stats: &TrackStatistics,
    ) -> Vec<BoundaryCandidate> {
        if frames.len() < 3 {
            return Vec::new();
        }

        let step = self.step_frames(stats.hop_secs);
        let energy: Vec<f32> = frames.iter().map(|f| f.energy).collect();
        let brightness = fill_undefined_brightness(frames, self.config.silence_brightness_hz);
        let bandwidth: Vec<f32> = frames.iter().map(|f| f.bandwidth_hz).collect();
        let rolloff: Vec<f32> = frames.iter().map(|f| f.rolloff_hz).collect();

        let energy_step = relative_step(&energy, step);
        let brightness_step = relative_step(&brightness, step);
        let bandwidth_step = relative_step(&bandwidth, step);
        let rolloff_step = relative_step(&rolloff, step);

        let scores: Vec<f32> = (0..frames.len())
            .map(|i| {
                let primary = energy_step[i].hypot(brightness_step[i]);
                let secondary = (bandwidth_step[i] + rolloff_step[i]) / 2.0;
                primary + self.config.secondary_weight * secondary
            })
            .collect();

        let mut candidates = self.step_peaks(frames, &scores, step, stats.hop_secs);
        if candidates.is_empty() {
            let smoothed_energy = moving_average(&energy, self.window_frames(stats.hop_secs));
            candidates = self.level_crossings(frames, &smoothed_energy, &scores, stats);
        }
        self.finalize(candidates, stats.duration_secs)
    }

    fn step_peaks(
        &self,
        frames: &[FeatureFrame],
        scores: &[f32],
        step: usize,
        hop_secs: f64,
    ) -> Vec<BoundaryCandidate> {
        let n = scores.len();
        let defined = defined_range(n, step);
        if defined.is_empty() {
            return Vec::new();
        }
        let half = frames_for(self.config.local_window_secs / 2.0, hop_secs);

        let mut prominence = vec![0.0f32; n];
        for i in defined.clone() {
            let start = i.saturating_sub(half).max(defined.start);
            let end = (i + half + 1).min(defined.end);
            prominence[i] = scores[i] - median(&scores[start..end]);
        }

        let deviations: Vec<f32> = prominence[defined.clone()]
            .iter()
            .map(|p| p.abs())
            .collect();
        let noise = MAD_TO_STD * median(&deviations);
        let required = self
            .config
            .min_change_score
            .max(self.config.sensitivity_std * noise);
        tracing::debug!(
            "[ChangeDetector] step noise={:.4}, required prominence={:.3}",
            noise,
            required
        );

        let above: Vec<bool> = prominence
            .iter()
            .map(|&p| p > 0.0 && p >= required)
            .collect();

        let mut candidates = Vec::new();
        let mut i = 0;
        while i < n {
            if !above[i] {
                i += 1;
                continue;
            }
            let run_start = i;
            while i < n && above[i] {
                i += 1;
            }
            let run = run_start..i;
            let peak = prominence[run.clone()]
                .iter()
                .copied()
                .fold(f32::MIN, f32::max);
            let tolerance = peak.abs().max(EPSILON) * 1e-6;
            let ties: Vec<usize> = run
                .filter(|&j| prominence[j] >= peak - tolerance)
                .collect();
            let centre = ties[ties.len() / 2];
            candidates.push(BoundaryCandidate {
                timestamp: frames[centre].timestamp,
                score: scores[centre],
                source: CandidateSource::Gradient,
            });
        }
        candidates
    }

    fn level_crossings(
        &self,
        frames: &[FeatureFrame],
        smoothed_energy: &[f32],
        scores: &[f32],
        stats: &TrackStatistics,
    ) -> Vec<BoundaryCandidate> {
        if stats.dynamic_range() < self.config.min_dynamic_range {
            return Vec::new();
        }
        let hysteresis = self.config.hysteresis_fraction * stats.energy_spread();
        let levels = [
            stats.median_energy(),
            stats.energy_percentile(self.climax_percentile),
        ];

        let mut candidates = Vec::new();
        for level in levels {
            let mut detector = LevelCrossingDetector::new(level, hysteresis);
            for (i, &value) in smoothed_energy.iter().enumerate() {
                if let Some(event) = detector.process(value) {
                    tracing::debug!(
                        "[ChangeDetector] {:?} crossing of {:.4} at {:.2}s",
                        event,
                        level,
                        frames[i].timestamp
                    );
                    candidates.push(BoundaryCandidate {
                        timestamp: frames[i].timestamp,
                        score: scores[i],
                        source: CandidateSource::LevelCrossing(event),
                    });
                }
            }
        }
        candidates
    }

    fn finalize(
        &self,
        mut candidates: Vec<BoundaryCandidate>,
        duration_secs: f64,
    ) -> Vec<BoundaryCandidate> {
        candidates.retain(|c| c.timestamp > 0.0 && c.timestamp < duration_secs);
        candidates.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let merge_window = self.config.smoothing_window_secs;
        let mut merged: Vec<BoundaryCandidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match merged.last_mut() {
                Some(last) if candidate.timestamp - last.timestamp < merge_window => {
                    if candidate.score > last.score {
                        *last = candidate;
                    }
                }
                _ => merged.push(candidate),
            }
        }
        merged
    }
}

fn frames_for(secs: f64, hop_secs: f64) -> usize {
    let frames = if hop_secs > 0.0 {
        (secs / hop_secs).round() as usize
    } else {
        1
    };
    frames.max(1)
}

/// Frames where both step windows fit inside the track
fn defined_range(len: usize, step: usize) -> Range<usize> {
    if len < 2 * step {
        0..0
    } else {
        step..len - step + 1
    }
}

/// |mean(after) - mean(before)| over `step` frames on each side, divided by
/// the series mean; zero where a window would leave the track
fn relative_step(series: &[f32], step: usize) -> Vec<f32> {
    let mut steps = vec![0.0; series.len()];
    let scale = mean(series).abs();
    if scale <= EPSILON {
        return steps;
    }

    let mut prefix = vec![0.0f64; series.len() + 1];
    for (i, &value) in series.iter().enumerate() {
        prefix[i + 1] = prefix[i] + value as f64;
    }
    let width = step as f64;
    for i in defined_range(series.len(), step) {
        let before = (prefix[i] - prefix[i - step]) / width;
        let after = (prefix[i + step] - prefix[i]) / width;
        steps[i] = (after - before).abs() as f32 / scale;
    }
    steps
}

/// Brightness series with undefined centroids held from the nearest
/// defined neighbour (previous, or next for leading gaps)
fn fill_undefined_brightness(frames: &[FeatureFrame], fallback: f32) -> Vec<f32> {
    let mut last = match frames.iter().find_map(FeatureFrame::brightness) {
        Some(first) => first,
        None => return vec![fallback; frames.len()],
    };
    frames
        .iter()
        .map(|frame| {
            if let Some(b) = frame.brightness() {
                last = b;
            }
            last
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::frames::median_hop;
    use crate::fixtures::{SyntheticPattern, SyntheticTrack};

    fn frames_from(energy: impl Fn(f64) -> f32, duration: f64, hop: f64) -> Vec<FeatureFrame> {
        let count = (duration / hop).round() as usize;
        (0..count)
            .map(|i| {
                let t = i as f64 * hop;
                let mut frame = FeatureFrame::new(t, energy(t));
                frame.brightness_hz = Some(1500.0);
                frame.bandwidth_hz = 1400.0;
                frame.rolloff_hz = 3500.0;
                frame
            })
            .collect()
    }

    fn detect(frames: &[FeatureFrame], duration: f64) -> Vec<BoundaryCandidate> {
        let config = SegmentationConfig::default();
        let stats = TrackStatistics::compute(frames, duration, median_hop(frames, duration));
        ChangeDetector::new(&config, 75.0).detect(frames, &stats)
    }

    #[test]
    fn test_window_frames_is_odd() {
        let config = SegmentationConfig::default();
        let detector = ChangeDetector::new(&config, 75.0);
        assert_eq!(detector.window_frames(0.5), 5);
        assert_eq!(detector.window_frames(0.25), 9);
        assert_eq!(detector.window_frames(10.0), 1);
        assert_eq!(detector.step_frames(0.5), 6);
    }

    #[test]
    fn test_relative_step_of_ramp_is_constant() {
        let ramp: Vec<f32> = (0..20).map(|i| 1.0 + i as f32 * 0.1).collect();
        let steps = relative_step(&ramp, 4);
        assert_eq!(steps[3], 0.0);
        assert_eq!(steps[17], 0.0);
        let scale = mean(&ramp);
        for &s in &steps[4..=16] {
            assert!((s - 0.4 / scale).abs() < 1e-5, "step {}", s);
        }
    }

    #[test]
    fn test_flat_signal_yields_no_candidates() {
        let frames = frames_from(|_| 0.15, 60.0, 0.5);
        assert!(detect(&frames, 60.0).is_empty());
    }

    #[test]
    fn test_jittered_flat_signal_yields_no_candidates() {
        for seed in 1..=5 {
            let stream = SyntheticTrack::new(SyntheticPattern::SustainedGroove)
                .with_jitter(0.1, seed)
                .generate();
            let candidates = detect(&stream.frames, stream.duration_secs);
            assert!(
                candidates.is_empty(),
                "seed {} produced {:?}",
                seed,
                candidates
            );
        }
    }

    #[test]
    fn test_silence_yields_no_candidates() {
        let frames: Vec<FeatureFrame> = (0..20)
            .map(|i| FeatureFrame::new(i as f64 * 0.5, 0.0))
            .collect();
        assert!(detect(&frames, 10.0).is_empty());
    }

    #[test]
    fn test_step_yields_single_candidate_at_step() {
        let frames = frames_from(|t| if t < 10.0 { 0.05 } else { 0.2 }, 20.0, 0.5);
        let candidates = detect(&frames, 20.0);
        assert_eq!(candidates.len(), 1, "candidates: {:?}", candidates);
        assert_eq!(candidates[0].timestamp, 10.0);
        assert_eq!(candidates[0].source, CandidateSource::Gradient);
        assert!(candidates[0].score >= 0.5);
    }

    #[test]
    fn test_ramp_yields_level_crossings_only() {
        let frames = frames_from(|t| 0.02 + 0.28 * (t / 30.0) as f32, 30.0, 0.5);
        let candidates = detect(&frames, 30.0);
        assert_eq!(candidates.len(), 2, "candidates: {:?}", candidates);
        assert!(candidates
            .iter()
            .all(|c| c.source == CandidateSource::LevelCrossing(LevelCrossingEvent::Rising)));
        assert!((candidates[0].timestamp - 16.5).abs() < 1e-9);
        assert!((candidates[1].timestamp - 23.5).abs() < 1e-9);
    }

    #[test]
    fn test_jittered_ramp_keeps_its_crossings() {
        let stream = SyntheticTrack::new(SyntheticPattern::EnergyRamp)
            .with_jitter(0.05, 2)
            .generate();
        let candidates = detect(&stream.frames, stream.duration_secs);
        assert_eq!(candidates.len(), 2, "candidates: {:?}", candidates);
        assert!(candidates
            .iter()
            .all(|c| matches!(c.source, CandidateSource::LevelCrossing(_))));
        assert!((candidates[0].timestamp - 16.5).abs() <= 1.0);
        assert!((candidates[1].timestamp - 23.5).abs() <= 1.0);
    }

    #[test]
    fn test_arc_steps_found_at_section_changes() {
        let stream = SyntheticTrack::new(SyntheticPattern::Arc)
            .with_jitter(0.05, 11)
            .generate();
        let candidates = detect(&stream.frames, stream.duration_secs);
        let times: Vec<f64> = candidates.iter().map(|c| c.timestamp).collect();
        assert_eq!(times.len(), 4, "candidates: {:?}", candidates);
        for (found, expected) in times.iter().zip([20.0, 40.0, 56.0, 76.0]) {
            assert!((found - expected).abs() <= 1.0, "boundaries {:?}", times);
        }
        assert!(candidates
            .iter()
            .all(|c| c.source == CandidateSource::Gradient));
    }

    #[test]
    fn test_candidates_strictly_increasing_and_interior() {
        let frames = frames_from(
            |t| match t {
                t if t < 10.0 => 0.03,
                t if t < 20.0 => 0.25,
                t if t < 30.0 => 0.08,
                _ => 0.3,
            },
            40.0,
            0.5,
        );
        let candidates = detect(&frames, 40.0);
        assert!(!candidates.is_empty());
        for pair in candidates.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
        for c in &candidates {
            assert!(c.timestamp > 0.0 && c.timestamp < 40.0);
        }
    }

    #[test]
    fn test_fill_undefined_brightness_holds_neighbours() {
        let mut frames: Vec<FeatureFrame> =
            (0..5).map(|i| FeatureFrame::new(i as f64, 0.1)).collect();
        frames[1].brightness_hz = Some(1000.0);
        frames[3].brightness_hz = Some(2000.0);
        let filled = fill_undefined_brightness(&frames, 20_000.0);
        assert_eq!(filled, vec![1000.0, 1000.0, 1000.0, 2000.0, 2000.0]);

        let silent: Vec<FeatureFrame> = (0..3).map(|i| FeatureFrame::new(i as f64, 0.0)).collect();
        assert_eq!(
            fill_undefined_brightness(&silent, 20_000.0),
            vec![20_000.0; 3]
        );
    }
}
