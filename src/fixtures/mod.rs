//! Deterministic feature-stream fixtures for tests and the diagnostics CLI.
//!
//! Synthetic tracks stand in for an upstream feature extractor: each
//! pattern produces a `FrameStream` with a known shape (silence, a steady
//! groove, an energy ramp, a full intro-to-fade arc). Optional jitter is
//! drawn from a seeded `StdRng`, so the same seed always yields the same
//! frames.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::analysis::frames::{FeatureFrame, FrameStream, CHROMA_BINS};

/// Seed used when the caller does not pick one
pub const DEFAULT_SEED: u64 = 0x5A5A_FFF0;

/// Default hop between synthetic frames
pub const DEFAULT_HOP_SECS: f64 = 0.5;

/// Major triad on the tonic, used as a stable chroma for tonal patterns
const TRIAD_CHROMA: [f32; CHROMA_BINS] = [1.0, 0.0, 0.0, 0.0, 0.6, 0.0, 0.0, 0.7, 0.0, 0.0, 0.0, 0.0];

/// Supported synthetic track shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPattern {
    /// All-zero energy with undefined brightness
    Silence,
    /// Constant loud, dense, dark-ish groove
    SustainedGroove,
    /// Energy rising linearly from 0.02 to 0.3
    EnergyRamp,
    /// Intro, build, climax, fall and a fade to silence
    Arc,
}

impl SyntheticPattern {
    pub fn default_duration_secs(&self) -> f64 {
        match self {
            SyntheticPattern::Silence => 10.0,
            SyntheticPattern::SustainedGroove => 60.0,
            SyntheticPattern::EnergyRamp => 30.0,
            SyntheticPattern::Arc => 82.0,
        }
    }
}

/// Parameters for one synthetic track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticTrack {
    pub pattern: SyntheticPattern,
    pub duration_secs: f64,
    pub hop_secs: f64,
    /// Relative amplitude of the random wobble added to energy and rhythm
    pub jitter: f32,
    pub seed: u64,
}

impl SyntheticTrack {
    pub fn new(pattern: SyntheticPattern) -> Self {
        Self {
            pattern,
            duration_secs: pattern.default_duration_secs(),
            hop_secs: DEFAULT_HOP_SECS,
            jitter: 0.0,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_hop(mut self, hop_secs: f64) -> Self {
        self.hop_secs = hop_secs;
        self
    }

    pub fn with_jitter(mut self, jitter: f32, seed: u64) -> Self {
        self.jitter = jitter;
        self.seed = seed;
        self
    }

    /// Generate the frame stream
    ///
    /// Frames start at 0 and advance by `hop_secs`; every timestamp is
    /// strictly below the duration.
    pub fn generate(&self) -> FrameStream {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let count = if self.hop_secs > 0.0 && self.duration_secs > 0.0 {
            (self.duration_secs / self.hop_secs - 1e-9).ceil().max(1.0) as usize
        } else {
            0
        };

        let frames = (0..count)
            .map(|i| {
                let t = i as f64 * self.hop_secs;
                let mut frame = self.shape(t);
                if self.jitter > 0.0 && frame.energy > 0.0 {
                    let wobble: f32 = rng.gen_range(-1.0..=1.0);
                    frame.energy = (frame.energy * (1.0 + self.jitter * wobble)).max(0.0);
                    let wobble: f32 = rng.gen_range(-1.0..=1.0);
                    frame.rhythm_density =
                        (frame.rhythm_density * (1.0 + self.jitter * wobble)).max(0.0);
                }
                frame
            })
            .collect();

        FrameStream {
            duration_secs: self.duration_secs,
            frames,
        }
    }

    fn shape(&self, t: f64) -> FeatureFrame {
        let progress = (t / self.duration_secs) as f32;
        match self.pattern {
            SyntheticPattern::Silence => FeatureFrame::new(t, 0.0),
            SyntheticPattern::SustainedGroove => tonal(t, 0.15, 1200.0, 1500.0, 3000.0, 8.0, 0.2),
            SyntheticPattern::EnergyRamp => {
                tonal(t, 0.02 + 0.28 * progress, 1500.0, 1400.0, 3500.0, 1.5, 0.35)
            }
            SyntheticPattern::Arc => arc_shape(t, self.duration_secs),
        }
    }
}

/// Arc layout on an 82 s timeline, stretched to the track duration:
/// intro 0-20, build 20-40, climax 40-56, fall 56-76, fade 76-82
const ARC_TIMELINE_SECS: f64 = 82.0;

fn arc_shape(t: f64, duration_secs: f64) -> FeatureFrame {
    let at = t * ARC_TIMELINE_SECS / duration_secs;
    let lerp = |from: f32, to: f32, start: f64, end: f64| {
        from + (to - from) * ((at - start) / (end - start)).clamp(0.0, 1.0) as f32
    };

    if at < 20.0 {
        tonal(t, 0.03, 1800.0, 1400.0, 3500.0, 1.0, 0.35)
    } else if at < 40.0 {
        let energy = lerp(0.1, 0.22, 20.0, 40.0);
        let rhythm = lerp(3.0, 6.0, 20.0, 40.0);
        tonal(t, energy, 2000.0, 1800.0, 4000.0, rhythm, 0.4)
    } else if at < 56.0 {
        tonal(t, 0.3, 2600.0, 2600.0, 6000.0, 7.0, 0.5)
    } else if at < 76.0 {
        let energy = lerp(0.2, 0.08, 56.0, 76.0);
        let rhythm = lerp(4.0, 2.0, 56.0, 76.0);
        tonal(t, energy, 1800.0, 1600.0, 3500.0, rhythm, 0.4)
    } else {
        FeatureFrame::new(t, 0.0)
    }
}

fn tonal(
    t: f64,
    energy: f32,
    brightness_hz: f32,
    bandwidth_hz: f32,
    rolloff_hz: f32,
    rhythm_density: f32,
    roughness: f32,
) -> FeatureFrame {
    FeatureFrame {
        timestamp: t,
        energy,
        brightness_hz: Some(brightness_hz),
        bandwidth_hz,
        rolloff_hz,
        rhythm_density,
        roughness,
        chroma: TRIAD_CHROMA,
    }
}

/// Load a `FrameStream` from a JSON file
pub fn load_frame_stream<P: AsRef<Path>>(path: P) -> Result<FrameStream> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading feature stream {}", path.display()))?;
    let stream: FrameStream = serde_json::from_str(&contents)
        .with_context(|| format!("parsing feature stream {}", path.display()))?;
    Ok(stream)
}

/// Write a `FrameStream` as pretty JSON
pub fn save_frame_stream<P: AsRef<Path>>(stream: &FrameStream, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(stream).context("serializing feature stream")?;
    fs::write(path, json).with_context(|| format!("writing feature stream {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_stay_inside_duration() {
        for pattern in [
            SyntheticPattern::Silence,
            SyntheticPattern::SustainedGroove,
            SyntheticPattern::EnergyRamp,
            SyntheticPattern::Arc,
        ] {
            let stream = SyntheticTrack::new(pattern).generate();
            let last = stream.frames.last().unwrap();
            assert!(last.timestamp < stream.duration_secs);
            assert_eq!(stream.frames[0].timestamp, 0.0);
        }
    }

    #[test]
    fn test_short_track_frame_count() {
        let stream = SyntheticTrack::new(SyntheticPattern::SustainedGroove)
            .with_duration(0.5)
            .with_hop(0.1)
            .generate();
        assert_eq!(stream.frames.len(), 5);
    }

    #[test]
    fn test_same_seed_same_frames() {
        let track = SyntheticTrack::new(SyntheticPattern::EnergyRamp).with_jitter(0.1, 7);
        assert_eq!(track.generate(), track.generate());

        let other = SyntheticTrack::new(SyntheticPattern::EnergyRamp).with_jitter(0.1, 8);
        assert_ne!(track.generate(), other.generate());
    }

    #[test]
    fn test_silence_has_undefined_brightness() {
        let stream = SyntheticTrack::new(SyntheticPattern::Silence)
            .with_jitter(0.2, 1)
            .generate();
        assert!(stream
            .frames
            .iter()
            .all(|f| f.energy == 0.0 && f.brightness_hz.is_none()));
    }

    #[test]
    fn test_arc_ends_in_silence() {
        let stream = SyntheticTrack::new(SyntheticPattern::Arc).generate();
        let last = stream.frames.last().unwrap();
        assert_eq!(last.energy, 0.0);
        let peak = stream.frames.iter().map(|f| f.energy).fold(0.0, f32::max);
        assert!((peak - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("phase_engine_fixture_{}.json", std::process::id()));
        let stream = SyntheticTrack::new(SyntheticPattern::SustainedGroove)
            .with_duration(5.0)
            .generate();
        save_frame_stream(&stream, &path).unwrap();
        let loaded = load_frame_stream(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, stream);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_frame_stream("/nonexistent/frames.json").unwrap_err();
        assert!(format!("{:#}", err).contains("reading feature stream"));
    }
}
