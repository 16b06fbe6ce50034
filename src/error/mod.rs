// Error types for the phase segmentation engine
//
// This module defines the error taxonomy surfaced by the engine. Input and
// configuration failures are fatal and carry numeric codes so reporting layers
// can branch on them without parsing messages. Degenerate signals (flat or
// silent tracks) are not errors and never reach this module.

mod config;
mod input;

pub use config::{log_config_error, ConfigError, ConfigErrorCodes};
pub use input::{log_input_error, InputError, InputErrorCodes};

use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from the engine's error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Any failure returned by a full analysis run
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The feature stream or duration was rejected
    Input(InputError),
    /// The threshold set was rejected
    Config(ConfigError),
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::Input(err) => err.code(),
            AnalysisError::Config(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::Input(err) => err.message(),
            AnalysisError::Config(err) => err.message(),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Input(err) => err.fmt(f),
            AnalysisError::Config(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Input(err) => Some(err),
            AnalysisError::Config(err) => Some(err),
        }
    }
}

impl From<InputError> for AnalysisError {
    fn from(err: InputError) -> Self {
        AnalysisError::Input(err)
    }
}

impl From<ConfigError> for AnalysisError {
    fn from(err: ConfigError) -> Self {
        AnalysisError::Config(err)
    }
}
