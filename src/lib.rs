// Phase Engine Core - structural segmentation and descriptor tagging
// Turns a per-frame acoustic feature stream into labelled phases and tags

// Module declarations
pub mod analysis;
pub mod config;
pub mod error;
pub mod fixtures;

// Re-exports for convenience
pub use analysis::aggregator::{MoodWeight, TrackDescriptors};
pub use analysis::character::{Character, CharacterProfile, CharacterScore};
pub use analysis::frames::{FeatureFrame, FrameStream};
pub use analysis::moods::Mood;
pub use analysis::phase::{EnergyTrend, Phase, PhaseFeatures};
pub use analysis::structure::StructuralType;
pub use analysis::PhaseAnalyzer;
pub use config::EngineConfig;
pub use error::{AnalysisError, ConfigError, ErrorCode, InputError};

/// One-shot analysis with a given calibration profile
///
/// Validates `config` and runs the full pipeline. Callers analyzing many
/// tracks should build a `PhaseAnalyzer` once instead.
pub fn analyze_track(
    frames: &[FeatureFrame],
    duration_secs: f64,
    config: &EngineConfig,
) -> Result<TrackDescriptors, AnalysisError> {
    let analyzer = PhaseAnalyzer::new(config.clone())?;
    analyzer.analyze(frames, duration_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_track_surfaces_config_errors() {
        let mut config = EngineConfig::default();
        config.structure.climax_percentile = 150.0;
        let frames = [FeatureFrame::new(0.0, 0.1)];
        let err = analyze_track(&frames, 1.0, &config).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn test_analyze_track_single_frame() {
        let frames = [FeatureFrame::new(0.0, 0.1)];
        let track = analyze_track(&frames, 1.0, &EngineConfig::default()).unwrap();
        assert_eq!(track.phase_count(), 1);
    }
}
