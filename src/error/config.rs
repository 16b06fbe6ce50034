// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 2001-2004
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Config file could not be read
    pub const UNREADABLE: i32 = 2001;

    /// Config file was not valid JSON for the schema
    pub const MALFORMED: i32 = 2002;

    /// A single threshold was out of its valid domain
    pub const INVALID_VALUE: i32 = 2003;

    /// Thresholds contradict each other
    pub const INCONSISTENT: i32 = 2004;
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=EngineConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors detected while loading or validating an `EngineConfig`
///
/// Error code range: 2001-2004
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Reading the config file failed
    Unreadable { path: String, reason: String },

    /// Parsing the config file failed
    Malformed { reason: String },

    /// A field holds a value outside its domain
    InvalidValue { field: String, reason: String },

    /// Two or more fields are mutually inconsistent
    Inconsistent { reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::Unreadable { .. } => ConfigErrorCodes::UNREADABLE,
            ConfigError::Malformed { .. } => ConfigErrorCodes::MALFORMED,
            ConfigError::InvalidValue { .. } => ConfigErrorCodes::INVALID_VALUE,
            ConfigError::Inconsistent { .. } => ConfigErrorCodes::INCONSISTENT,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::Unreadable { path, reason } => {
                format!("cannot read config {}: {}", path, reason)
            }
            ConfigError::Malformed { reason } => format!("malformed config: {}", reason),
            ConfigError::InvalidValue { field, reason } => format!("{} {}", field, reason),
            ConfigError::Inconsistent { reason } => {
                format!("inconsistent thresholds: {}", reason)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for ConfigError {}
