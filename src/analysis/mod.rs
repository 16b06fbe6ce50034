// Analysis module - phase segmentation and descriptor pipeline
//
// This module orchestrates the complete analysis of one track's feature
// stream. Every stage consumes the full output of the one before it, so a
// track is processed in two passes: whole-track statistics first, labels
// second.
//
// Architecture:
// - PhaseAnalyzer: owns an immutable, validated EngineConfig
// - Pipeline: validate → TrackStatistics → ChangeDetector → SegmentBuilder
//   → StructureClassifier → MoodClassifier → CharacterClassifier
//   → TrackDescriptors
// - Batch: independent tracks run on the rayon thread pool

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::{log_config_error, log_input_error, AnalysisError, ConfigError};

pub mod aggregator;
pub mod change_detector;
pub mod character;
pub mod frames;
pub mod level_crossing;
pub mod moods;
pub mod phase;
pub mod segmenter;
pub mod stats;
pub mod structure;

use aggregator::TrackDescriptors;
use change_detector::ChangeDetector;
use character::{CharacterClassifier, CharacterProfile};
use frames::{validate_stream, FeatureFrame, FrameStream};
use moods::MoodClassifier;
use phase::Phase;
use segmenter::{SegmentBuilder, Span};
use stats::TrackStatistics;
use structure::{SpanContext, StructureClassifier};

/// Runs the full pipeline with one calibration profile
///
/// The analyzer holds no per-track state, so one instance can be shared
/// across threads and reused for any number of tracks.
#[derive(Debug, Clone)]
pub struct PhaseAnalyzer {
    config: EngineConfig,
}

impl PhaseAnalyzer {
    /// Create an analyzer, validating the configuration up front
    ///
    /// # Errors
    /// `ConfigError` when the profile is out of domain or inconsistent.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        if let Err(err) = config.validate() {
            log_config_error(&err, "PhaseAnalyzer::new");
            return Err(err);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze one track
    ///
    /// # Arguments
    /// * `frames` - Feature frames in time order at a fixed hop
    /// * `duration_secs` - Total track duration
    ///
    /// # Errors
    /// `AnalysisError::Input` when the stream breaks the frame contract.
    /// Flat or silent tracks are not errors; they yield a single phase.
    pub fn analyze(
        &self,
        frames: &[FeatureFrame],
        duration_secs: f64,
    ) -> Result<TrackDescriptors, AnalysisError> {
        let segmentation = &self.config.segmentation;
        let hop_secs = validate_stream(frames, duration_secs, segmentation.max_gap_hops)
            .inspect_err(|err| log_input_error(err, "PhaseAnalyzer::analyze"))?;

        // Pass 1: whole-track statistics
        let stats = TrackStatistics::compute(frames, duration_secs, hop_secs);
        tracing::debug!(
            "[PhaseAnalyzer] {} frames, hop={:.3}s, energy mean={:.4} std={:.4}, dynamic range={:.2}",
            frames.len(),
            hop_secs,
            stats.energy_mean,
            stats.energy_std,
            stats.dynamic_range()
        );

        // Pass 2: boundaries, spans and labels
        let candidates = ChangeDetector::new(segmentation, self.config.structure.climax_percentile)
            .detect(frames, &stats);
        tracing::debug!(
            "[PhaseAnalyzer] {} boundary candidates: {:?}",
            candidates.len(),
            candidates.iter().map(|c| c.timestamp).collect::<Vec<_>>()
        );

        let spans = SegmentBuilder::new(&self.config).build(frames, &stats, &candidates);
        let phases = self.label_spans(spans, duration_secs);

        let profile = CharacterProfile::from_frames(frames, segmentation.silence_brightness_hz);
        let characters = CharacterClassifier::new(&self.config.character).classify(&profile);

        let track = TrackDescriptors::new(duration_secs, phases, profile, characters);
        tracing::info!(
            "[PhaseAnalyzer] Analyzed {:.1}s track: {} phases, dominant mood {:?}, primary character {:?}",
            duration_secs,
            track.phase_count(),
            track.dominant_mood,
            track.primary_character
        );
        Ok(track)
    }

    /// Analyze a bundled stream
    pub fn analyze_stream(&self, stream: &FrameStream) -> Result<TrackDescriptors, AnalysisError> {
        self.analyze(&stream.frames, stream.duration_secs)
    }

    /// Analyze independent tracks in parallel
    ///
    /// Each track runs the whole pipeline on one rayon worker. Results come
    /// back in input order and an `Err` for one track leaves the others
    /// untouched; a panic inside any track propagates to the caller.
    pub fn analyze_batch(
        &self,
        streams: &[FrameStream],
    ) -> Vec<Result<TrackDescriptors, AnalysisError>> {
        tracing::info!(
            "[PhaseAnalyzer] Batch of {} tracks on {} workers",
            streams.len(),
            rayon::current_num_threads()
        );
        streams
            .par_iter()
            .map(|stream| self.analyze_stream(stream))
            .collect()
    }

    fn label_spans(&self, spans: Vec<Span>, duration_secs: f64) -> Vec<Phase> {
        let structure = StructureClassifier::new(&self.config.structure);
        let moods = MoodClassifier::new(&self.config.moods);
        let span_count = spans.len();

        spans
            .into_iter()
            .enumerate()
            .map(|(index, span)| {
                let ctx = SpanContext::new(
                    &span.features,
                    span.start_secs,
                    span.end_secs,
                    duration_secs,
                    index,
                    span_count,
                );
                let rule = structure.classify(&ctx);
                let tags = moods.classify(&span.features);
                tracing::debug!(
                    "[PhaseAnalyzer] Phase {} {:.2}s-{:.2}s: {} (rule {}), moods {:?}",
                    index,
                    span.start_secs,
                    span.end_secs,
                    rule.label,
                    rule.name,
                    tags
                );
                Phase {
                    index,
                    start_secs: span.start_secs,
                    end_secs: span.end_secs,
                    structural_type: rule.label,
                    structure_rule: rule.name.to_string(),
                    features: span.features,
                    moods: tags,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::structure::StructuralType;

    fn constant_frames(duration: f64, hop: f64, energy: f32) -> Vec<FeatureFrame> {
        let count = (duration / hop).round() as usize;
        (0..count)
            .map(|i| {
                let mut frame = FeatureFrame::new(i as f64 * hop, energy);
                frame.brightness_hz = Some(1800.0);
                frame.bandwidth_hz = 1500.0;
                frame.rolloff_hz = 3500.0;
                frame.rhythm_density = 3.0;
                frame.roughness = 0.35;
                frame
            })
            .collect()
    }

    #[test]
    fn test_invalid_config_is_rejected_before_analysis() {
        let mut config = EngineConfig::default();
        config.segmentation.min_segment_duration_secs = -1.0;
        assert!(PhaseAnalyzer::new(config).is_err());
    }

    #[test]
    fn test_flat_track_is_single_phase() {
        let analyzer = PhaseAnalyzer::new(EngineConfig::default()).unwrap();
        let frames = constant_frames(40.0, 0.5, 0.1);
        let track = analyzer.analyze(&frames, 40.0).unwrap();
        assert_eq!(track.phase_count(), 1);
        assert_eq!(track.phases[0].start_secs, 0.0);
        assert_eq!(track.phases[0].end_secs, 40.0);
        assert_eq!(track.phases[0].structural_type, StructuralType::Rhythmic);
    }

    #[test]
    fn test_empty_stream_is_input_error() {
        let analyzer = PhaseAnalyzer::new(EngineConfig::default()).unwrap();
        let err = analyzer.analyze(&[], 10.0).unwrap_err();
        assert!(matches!(err, AnalysisError::Input(_)));
    }

    #[test]
    fn test_batch_preserves_order() {
        let analyzer = PhaseAnalyzer::new(EngineConfig::default()).unwrap();
        let streams = vec![
            FrameStream {
                duration_secs: 20.0,
                frames: constant_frames(20.0, 0.5, 0.1),
            },
            FrameStream {
                duration_secs: 0.0,
                frames: constant_frames(5.0, 0.5, 0.1),
            },
            FrameStream {
                duration_secs: 30.0,
                frames: constant_frames(30.0, 0.5, 0.05),
            },
        ];
        let results = analyzer.analyze_batch(&streams);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().duration_secs, 20.0);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().duration_secs, 30.0);
        assert!(analyzer.analyze_batch(&[]).is_empty());
    }

    #[test]
    fn test_batch_failures_stay_per_track() {
        let analyzer = PhaseAnalyzer::new(EngineConfig::default()).unwrap();
        let streams: Vec<FrameStream> = (0..16)
            .map(|i| {
                let duration = 10.0 + i as f64;
                FrameStream {
                    // Every fourth track claims a duration its frames overrun
                    duration_secs: if i % 4 == 3 { 1.0 } else { duration },
                    frames: constant_frames(duration, 0.5, 0.1),
                }
            })
            .collect();

        let results = analyzer.analyze_batch(&streams);
        assert_eq!(results.len(), 16);
        for (i, result) in results.iter().enumerate() {
            if i % 4 == 3 {
                assert!(matches!(result, Err(AnalysisError::Input(_))));
            } else {
                assert_eq!(result.as_ref().unwrap().duration_secs, 10.0 + i as f64);
            }
        }
    }
}
