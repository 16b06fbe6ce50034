// Frames module - per-frame feature records delivered by the extractor
//
// The engine never sees audio. It consumes one `FeatureFrame` per hop, in
// time order, plus the track duration. This module defines those records and
// the validation that turns a malformed stream into an `InputError` before
// any analysis starts.

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Number of pitch classes in a chroma vector
pub const CHROMA_BINS: usize = 12;

/// Low-level features for one analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    /// Window start in seconds
    pub timestamp: f64,

    /// RMS-like energy (non-negative)
    pub energy: f32,

    /// Spectral centroid in Hz
    ///
    /// `None` (or a non-finite value) when the window is silent and the
    /// centroid is undefined.
    #[serde(default)]
    pub brightness_hz: Option<f32>,

    /// Spectral bandwidth in Hz
    #[serde(default)]
    pub bandwidth_hz: f32,

    /// Spectral rolloff in Hz
    #[serde(default)]
    pub rolloff_hz: f32,

    /// Local onset rate in events per second
    #[serde(default)]
    pub rhythm_density: f32,

    /// Roughness / harmonic complexity, typically 0.0 to 1.0
    #[serde(default)]
    pub roughness: f32,

    /// Pitch-class energy profile
    #[serde(default)]
    pub chroma: [f32; CHROMA_BINS],
}

impl FeatureFrame {
    /// Frame with the given energy and every other feature zeroed
    pub fn new(timestamp: f64, energy: f32) -> Self {
        Self {
            timestamp,
            energy,
            brightness_hz: None,
            bandwidth_hz: 0.0,
            rolloff_hz: 0.0,
            rhythm_density: 0.0,
            roughness: 0.0,
            chroma: [0.0; CHROMA_BINS],
        }
    }

    /// Centroid if it is defined for this window
    pub fn brightness(&self) -> Option<f32> {
        self.brightness_hz.filter(|b| b.is_finite())
    }
}

/// A complete feature stream for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStream {
    pub duration_secs: f64,
    pub frames: Vec<FeatureFrame>,
}

/// Median spacing between consecutive frames
///
/// A single-frame stream uses the whole duration as its hop.
pub fn median_hop(frames: &[FeatureFrame], duration_secs: f64) -> f64 {
    if frames.len() < 2 {
        return duration_secs;
    }
    let mut deltas: Vec<f64> = frames
        .windows(2)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .collect();
    deltas.sort_by(|a, b| a.total_cmp(b));
    let mid = deltas.len() / 2;
    if deltas.len() % 2 == 0 {
        (deltas[mid - 1] + deltas[mid]) / 2.0
    } else {
        deltas[mid]
    }
}

/// Validate a stream against the extractor contract
///
/// # Arguments
/// * `frames` - Frames in time order
/// * `duration_secs` - Total track duration
/// * `max_gap_hops` - Largest tolerated spacing in multiples of the median hop
///
/// # Returns
/// The median hop in seconds
pub fn validate_stream(
    frames: &[FeatureFrame],
    duration_secs: f64,
    max_gap_hops: f64,
) -> Result<f64, InputError> {
    if !(duration_secs.is_finite() && duration_secs > 0.0) {
        return Err(InputError::NonPositiveDuration {
            duration: duration_secs,
        });
    }
    if frames.is_empty() {
        return Err(InputError::EmptyStream);
    }

    for (index, frame) in frames.iter().enumerate() {
        if !(frame.timestamp.is_finite() && frame.timestamp >= 0.0) {
            return Err(InputError::InvalidFrame {
                index,
                reason: format!("timestamp {} is not a non-negative number", frame.timestamp),
            });
        }
        if index > 0 && frame.timestamp <= frames[index - 1].timestamp {
            return Err(InputError::NonMonotonicTimestamp {
                index,
                timestamp: frame.timestamp,
            });
        }
        if frame.timestamp >= duration_secs {
            return Err(InputError::FrameOutOfRange {
                index,
                timestamp: frame.timestamp,
                duration: duration_secs,
            });
        }
        check_feature(index, "energy", frame.energy)?;
        check_feature(index, "bandwidth", frame.bandwidth_hz)?;
        check_feature(index, "rolloff", frame.rolloff_hz)?;
        check_feature(index, "rhythm density", frame.rhythm_density)?;
        check_feature(index, "roughness", frame.roughness)?;
        for &bin in &frame.chroma {
            check_feature(index, "chroma", bin)?;
        }
    }

    let hop = median_hop(frames, duration_secs);
    let max_gap = hop * max_gap_hops;
    for (offset, pair) in frames.windows(2).enumerate() {
        let gap = pair[1].timestamp - pair[0].timestamp;
        if gap > max_gap {
            return Err(InputError::GapInStream {
                index: offset + 1,
                gap_secs: gap,
            });
        }
    }

    Ok(hop)
}

fn check_feature(index: usize, name: &str, value: f32) -> Result<(), InputError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InputError::InvalidFrame {
            index,
            reason: format!("{} {} is negative or not finite", name, value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_at(timestamps: &[f64]) -> Vec<FeatureFrame> {
        timestamps
            .iter()
            .map(|&t| FeatureFrame::new(t, 0.1))
            .collect()
    }

    #[test]
    fn test_valid_stream_returns_hop() {
        let frames = frames_at(&[0.0, 0.5, 1.0, 1.5]);
        let hop = validate_stream(&frames, 2.0, 4.0).unwrap();
        assert!((hop - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_stream_rejected() {
        assert_eq!(
            validate_stream(&[], 10.0, 4.0),
            Err(InputError::EmptyStream)
        );
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let frames = frames_at(&[0.0]);
        assert!(matches!(
            validate_stream(&frames, 0.0, 4.0),
            Err(InputError::NonPositiveDuration { .. })
        ));
        assert!(matches!(
            validate_stream(&frames, f64::NAN, 4.0),
            Err(InputError::NonPositiveDuration { .. })
        ));
    }

    #[test]
    fn test_non_monotonic_timestamps_rejected() {
        let frames = frames_at(&[0.0, 0.5, 0.5]);
        assert_eq!(
            validate_stream(&frames, 2.0, 4.0),
            Err(InputError::NonMonotonicTimestamp {
                index: 2,
                timestamp: 0.5
            })
        );
    }

    #[test]
    fn test_frame_beyond_duration_rejected() {
        let frames = frames_at(&[0.0, 0.5, 1.0]);
        assert!(matches!(
            validate_stream(&frames, 1.0, 4.0),
            Err(InputError::FrameOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn test_gap_rejected() {
        let frames = frames_at(&[0.0, 0.5, 1.0, 1.5, 6.0]);
        assert!(matches!(
            validate_stream(&frames, 7.0, 4.0),
            Err(InputError::GapInStream { index: 4, .. })
        ));
    }

    #[test]
    fn test_negative_energy_rejected() {
        let mut frames = frames_at(&[0.0, 0.5]);
        frames[1].energy = -0.2;
        match validate_stream(&frames, 1.0, 4.0).unwrap_err() {
            InputError::InvalidFrame { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("energy"));
            }
            other => panic!("Expected InvalidFrame, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_brightness_is_undefined_not_invalid() {
        let mut frames = frames_at(&[0.0, 0.5]);
        frames[0].brightness_hz = Some(f32::NAN);
        assert!(validate_stream(&frames, 1.0, 4.0).is_ok());
        assert_eq!(frames[0].brightness(), None);
    }

    #[test]
    fn test_single_frame_hop_is_duration() {
        let frames = frames_at(&[0.0]);
        assert_eq!(median_hop(&frames, 0.5), 0.5);
    }
}
