// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Log level definitions for guest and host logging.

use std::{fmt, str::FromStr};

/// Log levels for messages emitted by guests and the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// Trace-level messages (detailed debugging information)
    Trace,
    /// Debug-level messages (useful for developers)
    Debug,
    /// Informational messages (general runtime information)
    #[default]
    Info,
    /// Warning messages (potential issues)
    Warn,
    /// Error messages (recoverable errors)
    Error,
    /// Critical error messages (severe issues)
    Critical,
}

/// Error returned when a log level name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLogLevelError {
    /// The text that failed to parse
    pub invalid_level: String,
}

impl fmt::Display for ParseLogLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid log level: {}", self.invalid_level)
    }
}

impl std::error::Error for ParseLogLevelError {}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "err" => Ok(Self::Error),
            "critical" | "fatal" => Ok(Self::Critical),
            _ => Err(ParseLogLevelError { invalid_level: s.to_string() }),
        }
    }
}

impl LogLevel {
    /// Map the numeric level a guest passes to `log`
    ///
    /// `0` is trace and `5` is critical; values outside that range clamp.
    #[must_use]
    pub const fn from_guest(level: i32) -> Self {
        match level {
            i32::MIN..=0 => Self::Trace,
            1 => Self::Debug,
            2 => Self::Info,
            3 => Self::Warn,
            4 => Self::Error,
            _ => Self::Critical,
        }
    }

    /// Convert `LogLevel` to a string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// The closest `tracing` level
    #[must_use]
    pub const fn to_tracing(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error | Self::Critical => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("critical".parse::<LogLevel>().unwrap(), LogLevel::Critical);

        // Test case insensitivity
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("Warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);

        assert!("".parse::<LogLevel>().is_err());
        let err = "invalid".parse::<LogLevel>().unwrap_err();
        assert_eq!(err.invalid_level, "invalid");
    }

    #[test]
    fn test_from_guest_clamps() {
        assert_eq!(LogLevel::from_guest(-3), LogLevel::Trace);
        assert_eq!(LogLevel::from_guest(0), LogLevel::Trace);
        assert_eq!(LogLevel::from_guest(2), LogLevel::Info);
        assert_eq!(LogLevel::from_guest(4), LogLevel::Error);
        assert_eq!(LogLevel::from_guest(99), LogLevel::Critical);
    }

    #[test]
    fn test_critical_maps_to_error() {
        assert_eq!(LogLevel::Critical.to_tracing(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }
}
