// SegmentBuilder - turns boundary candidates into the final span partition
//
// Spans tile [0, duration] exactly. Consecutive short spans are first
// joined with each other, so a burst of close candidates becomes one span
// instead of being swallowed piece by piece by a long neighbour. Any span
// still shorter than the minimum duration is then merged into its longer
// neighbour (the preceding one on a tie) and the partition is re-scanned
// from the start, so the same candidates always yield the same spans. The
// only short span that survives is a trailing fade-to-silence tail, or the
// whole track when it is itself shorter than the minimum.

use crate::analysis::change_detector::BoundaryCandidate;
use crate::analysis::frames::FeatureFrame;
use crate::analysis::phase::{EnergyTrend, PhaseFeatures};
use crate::analysis::stats::{linear_slope, mean, std_dev, TrackStatistics};
use crate::analysis::structure::is_fade_tail;
use crate::config::EngineConfig;

/// A contiguous span with its aggregated features
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start_secs: f64,
    pub end_secs: f64,
    pub features: PhaseFeatures,
}

impl Span {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Segment building stage
pub struct SegmentBuilder<'a> {
    config: &'a EngineConfig,
}

impl<'a> SegmentBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Build the span partition for a validated stream
    pub fn build(
        &self,
        frames: &[FeatureFrame],
        stats: &TrackStatistics,
        candidates: &[BoundaryCandidate],
    ) -> Vec<Span> {
        let duration = stats.duration_secs;
        let min_duration = self.config.segmentation.min_segment_duration_secs;

        let mut bounds: Vec<f64> = Vec::with_capacity(candidates.len() + 2);
        bounds.push(0.0);
        if duration >= min_duration {
            bounds.extend(
                candidates
                    .iter()
                    .map(|c| c.timestamp)
                    .filter(|&t| t > 0.0 && t < duration),
            );
        }
        bounds.push(duration);

        self.coalesce_short_runs(frames, stats, &mut bounds);
        loop {
            let span_count = bounds.len() - 1;
            if span_count == 1 {
                break;
            }
            let short = (0..span_count).find(|&i| {
                bounds[i + 1] - bounds[i] < min_duration
                    && !(i == span_count - 1 && self.is_trailing_fade(frames, stats, &bounds))
            });
            let Some(i) = short else {
                break;
            };

            // Remove the boundary shared with the neighbour we merge into
            let boundary = if i == 0 {
                1
            } else if i == span_count - 1 {
                i
            } else {
                let preceding = bounds[i] - bounds[i - 1];
                let following = bounds[i + 2] - bounds[i + 1];
                if following > preceding {
                    i + 1
                } else {
                    i
                }
            };
            log::debug!(
                "[SegmentBuilder] Merging short span {:.2}s-{:.2}s across boundary {:.2}s",
                bounds[i],
                bounds[i + 1],
                bounds[boundary]
            );
            bounds.remove(boundary);
        }

        let last = bounds.len() - 2;
        bounds
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Span {
                start_secs: pair[0],
                end_secs: pair[1],
                features: self.summarize(frames, stats, pair[0], pair[1], i == last),
            })
            .collect()
    }

    /// Drop every boundary that separates two short spans
    fn coalesce_short_runs(
        &self,
        frames: &[FeatureFrame],
        stats: &TrackStatistics,
        bounds: &mut Vec<f64>,
    ) {
        let span_count = bounds.len() - 1;
        if span_count < 2 {
            return;
        }
        let min_duration = self.config.segmentation.min_segment_duration_secs;
        let exempt_tail = self.is_trailing_fade(frames, stats, bounds);
        let short: Vec<bool> = (0..span_count)
            .map(|i| {
                bounds[i + 1] - bounds[i] < min_duration && !(exempt_tail && i == span_count - 1)
            })
            .collect();

        let before = bounds.len();
        let mut index = 0;
        bounds.retain(|_| {
            let boundary = index;
            index += 1;
            boundary == 0 || boundary == span_count || !(short[boundary - 1] && short[boundary])
        });
        if bounds.len() < before {
            log::debug!(
                "[SegmentBuilder] Joined runs of short spans, {} boundaries dropped",
                before - bounds.len()
            );
        }
    }

    fn is_trailing_fade(
        &self,
        frames: &[FeatureFrame],
        stats: &TrackStatistics,
        bounds: &[f64],
    ) -> bool {
        let n = bounds.len();
        let features = self.summarize(frames, stats, bounds[n - 2], bounds[n - 1], true);
        is_fade_tail(&features, &self.config.structure)
    }

    /// Aggregate the frames starting in [start, end) (or [start, end] for the
    /// final span)
    pub fn summarize(
        &self,
        frames: &[FeatureFrame],
        stats: &TrackStatistics,
        start: f64,
        end: f64,
        is_final: bool,
    ) -> PhaseFeatures {
        let lo = frames.partition_point(|f| f.timestamp < start);
        let hi = if is_final {
            frames.len()
        } else {
            frames.partition_point(|f| f.timestamp < end)
        };
        let span = &frames[lo..hi.max(lo)];
        let duration_secs = end - start;
        let structure = &self.config.structure;

        let energy: Vec<f32> = span.iter().map(|f| f.energy).collect();
        let times: Vec<f64> = span.iter().map(|f| f.timestamp).collect();
        let brightness: Vec<f32> = span.iter().filter_map(FeatureFrame::brightness).collect();

        let mean_energy = mean(&energy);
        let audible = mean_energy > structure.near_silent_energy;
        let energy_slope = linear_slope(&times, &energy);
        let energy_rise = if audible {
            energy_slope * duration_secs as f32 / mean_energy
        } else {
            0.0
        };
        let energy_variation = if audible {
            std_dev(&energy) / mean_energy
        } else {
            0.0
        };
        let mean_brightness_hz = if brightness.is_empty() {
            self.config.segmentation.silence_brightness_hz
        } else {
            mean(&brightness)
        };

        let collect = |feature: fn(&FeatureFrame) -> f32| -> f32 {
            let values: Vec<f32> = span.iter().map(feature).collect();
            mean(&values)
        };

        PhaseFeatures {
            duration_secs,
            frame_count: span.len(),
            mean_energy,
            mean_brightness_hz,
            mean_bandwidth_hz: collect(|f| f.bandwidth_hz),
            mean_rolloff_hz: collect(|f| f.rolloff_hz),
            mean_rhythm_density: collect(|f| f.rhythm_density),
            mean_roughness: collect(|f| f.roughness),
            energy_slope,
            energy_rise,
            energy_trend: EnergyTrend::from_rise(energy_rise, structure.flat_trend_band),
            energy_variation,
            energy_percentile: stats.energy_rank(mean_energy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::change_detector::CandidateSource;
    use crate::analysis::frames::median_hop;

    fn frames(duration: f64, hop: f64, energy: impl Fn(f64) -> f32) -> Vec<FeatureFrame> {
        let count = (duration / hop).round() as usize;
        (0..count)
            .map(|i| {
                let t = i as f64 * hop;
                let e = energy(t);
                let mut frame = FeatureFrame::new(t, e);
                if e > 0.0 {
                    frame.brightness_hz = Some(2000.0);
                }
                frame.rhythm_density = 3.0;
                frame
            })
            .collect()
    }

    fn candidates(times: &[f64]) -> Vec<BoundaryCandidate> {
        times
            .iter()
            .map(|&timestamp| BoundaryCandidate {
                timestamp,
                score: 1.0,
                source: CandidateSource::Gradient,
            })
            .collect()
    }

    fn build(frames: &[FeatureFrame], duration: f64, times: &[f64]) -> Vec<Span> {
        let config = EngineConfig::default();
        let stats = TrackStatistics::compute(frames, duration, median_hop(frames, duration));
        SegmentBuilder::new(&config).build(frames, &stats, &candidates(times))
    }

    fn assert_tiles(spans: &[Span], duration: f64) {
        assert_eq!(spans.first().unwrap().start_secs, 0.0);
        assert_eq!(spans.last().unwrap().end_secs, duration);
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end_secs, pair[1].start_secs);
        }
        for span in spans {
            assert!(span.end_secs > span.start_secs);
        }
    }

    #[test]
    fn test_no_candidates_yields_whole_track() {
        let f = frames(30.0, 0.5, |_| 0.1);
        let spans = build(&f, 30.0, &[]);
        assert_eq!(spans.len(), 1);
        assert_tiles(&spans, 30.0);
        assert_eq!(spans[0].features.frame_count, 60);
    }

    #[test]
    fn test_short_middle_span_merges_into_longer_neighbour() {
        let f = frames(40.0, 0.5, |_| 0.1);
        // Spans: 10, 2, 28 -> the 2s span joins the 28s span
        let spans = build(&f, 40.0, &[10.0, 12.0]);
        assert_eq!(spans.len(), 2);
        assert_tiles(&spans, 40.0);
        assert_eq!(spans[0].end_secs, 10.0);
    }

    #[test]
    fn test_tie_merges_into_preceding() {
        let f = frames(22.0, 0.5, |_| 0.1);
        // Spans: 10, 2, 10 -> tie, merge backwards
        let spans = build(&f, 22.0, &[10.0, 12.0]);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].end_secs, 12.0);
    }

    #[test]
    fn test_short_first_span_merges_forward() {
        let f = frames(30.0, 0.5, |_| 0.1);
        let spans = build(&f, 30.0, &[2.0, 15.0]);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].start_secs, 0.0);
        assert_eq!(spans[0].end_secs, 15.0);
    }

    #[test]
    fn test_short_trailing_fade_survives() {
        let f = frames(21.0, 0.5, |t| if t < 20.0 { 0.2 } else { 0.0 });
        let spans = build(&f, 21.0, &[20.0]);
        assert_eq!(spans.len(), 2);
        assert_tiles(&spans, 21.0);
        assert!(spans[1].duration_secs() < 5.0);
        assert_eq!(spans[1].features.mean_energy, 0.0);
        assert_eq!(spans[1].features.mean_brightness_hz, 20_000.0);
    }

    #[test]
    fn test_short_trailing_audible_span_merges_back() {
        let f = frames(21.0, 0.5, |t| if t < 20.0 { 0.2 } else { 0.1 });
        let spans = build(&f, 21.0, &[20.0]);
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn test_run_of_short_spans_joins_before_merging() {
        let f = frames(30.0, 0.5, |_| 0.1);
        // Spans: 10, 2, 2, 2, 14 -> the 2s run becomes one 6s span
        let spans = build(&f, 30.0, &[10.0, 12.0, 14.0, 16.0]);
        let bounds: Vec<f64> = spans.iter().map(|s| s.end_secs).collect();
        assert_eq!(bounds, vec![10.0, 16.0, 30.0]);
        assert_tiles(&spans, 30.0);
    }

    #[test]
    fn test_dense_candidates_do_not_collapse_track() {
        let f = frames(30.0, 0.5, |t| 0.02 + 0.28 * (t / 30.0) as f32);
        let spans = build(&f, 30.0, &[12.0, 16.5, 21.0, 23.0, 25.0, 28.5]);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].end_secs, 12.0);
        assert_tiles(&spans, 30.0);
    }

    #[test]
    fn test_short_run_still_short_merges_into_neighbour() {
        let f = frames(30.0, 0.5, |_| 0.1);
        // Spans: 10, 1, 1, 18 -> the 2s run joins the 18s span
        let spans = build(&f, 30.0, &[10.0, 11.0, 12.0]);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].end_secs, 10.0);
    }

    #[test]
    fn test_track_shorter_than_minimum_is_single_span() {
        let f = frames(3.0, 0.5, |_| 0.1);
        let spans = build(&f, 3.0, &[1.0, 2.0]);
        assert_eq!(spans.len(), 1);
        assert_tiles(&spans, 3.0);
    }

    #[test]
    fn test_summary_trend_and_percentile() {
        let f = frames(30.0, 0.5, |t| 0.02 + 0.28 * (t / 30.0) as f32);
        let spans = build(&f, 30.0, &[15.0]);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].features.energy_trend, EnergyTrend::Rising);
        assert!(spans[0].features.energy_percentile < 50.0);
        assert!(spans[1].features.energy_percentile > 50.0);
        assert!((spans[0].features.energy_slope - 0.28 / 30.0).abs() < 1e-4);
    }
}
