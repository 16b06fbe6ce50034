// Input error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Input error code constants
///
/// Error code range: 1001-1006
pub struct InputErrorCodes {}

impl InputErrorCodes {
    /// Feature stream contained no frames
    pub const EMPTY_STREAM: i32 = 1001;

    /// Track duration was zero, negative or not finite
    pub const NON_POSITIVE_DURATION: i32 = 1002;

    /// Frame timestamps were not strictly increasing
    pub const NON_MONOTONIC_TIMESTAMP: i32 = 1003;

    /// A frame started at or after the track end
    pub const FRAME_OUT_OF_RANGE: i32 = 1004;

    /// Consecutive frames were further apart than the hop allows
    pub const GAP_IN_STREAM: i32 = 1005;

    /// A frame carried a negative or non-finite feature value
    pub const INVALID_FRAME: i32 = 1006;
}

/// Log an input error with structured context
pub fn log_input_error(err: &InputError, context: &str) {
    error!(
        "Input error in {}: code={}, component=FrameStream, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised when the feature stream handed to the engine is unusable
///
/// Error code range: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// No frames were supplied
    EmptyStream,

    /// Duration must be strictly positive
    NonPositiveDuration { duration: f64 },

    /// Frame `index` does not start after frame `index - 1`
    NonMonotonicTimestamp { index: usize, timestamp: f64 },

    /// Frame `index` starts at or beyond the track duration
    FrameOutOfRange {
        index: usize,
        timestamp: f64,
        duration: f64,
    },

    /// Frame `index` follows its predecessor after a gap
    GapInStream { index: usize, gap_secs: f64 },

    /// Frame `index` carries an unusable feature value
    InvalidFrame { index: usize, reason: String },
}

impl ErrorCode for InputError {
    fn code(&self) -> i32 {
        match self {
            InputError::EmptyStream => InputErrorCodes::EMPTY_STREAM,
            InputError::NonPositiveDuration { .. } => InputErrorCodes::NON_POSITIVE_DURATION,
            InputError::NonMonotonicTimestamp { .. } => InputErrorCodes::NON_MONOTONIC_TIMESTAMP,
            InputError::FrameOutOfRange { .. } => InputErrorCodes::FRAME_OUT_OF_RANGE,
            InputError::GapInStream { .. } => InputErrorCodes::GAP_IN_STREAM,
            InputError::InvalidFrame { .. } => InputErrorCodes::INVALID_FRAME,
        }
    }

    fn message(&self) -> String {
        match self {
            InputError::EmptyStream => "feature stream is empty".to_string(),
            InputError::NonPositiveDuration { duration } => {
                format!("duration must be positive (got {})", duration)
            }
            InputError::NonMonotonicTimestamp { index, timestamp } => format!(
                "frame {} timestamp {}s does not follow the previous frame",
                index, timestamp
            ),
            InputError::FrameOutOfRange {
                index,
                timestamp,
                duration,
            } => format!(
                "frame {} starts at {}s, outside track duration {}s",
                index, timestamp, duration
            ),
            InputError::GapInStream { index, gap_secs } => {
                format!("gap of {:.3}s before frame {}", gap_secs, index)
            }
            InputError::InvalidFrame { index, reason } => {
                format!("frame {} is invalid: {}", index, reason)
            }
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for InputError {}
