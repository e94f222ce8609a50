// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! A single log message and where it came from.

use crate::level::LogLevel;

/// Log operation from a guest instance or the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOperation {
    /// Log level
    pub level:   LogLevel,
    /// Log message
    pub message: String,
    /// Label of the emitting instance, if any
    pub source:  Option<String>,
}

impl LogOperation {
    /// Create a new log operation
    #[must_use]
    pub const fn new(level: LogLevel, message: String) -> Self {
        Self { level, message, source: None }
    }

    /// Create a new log operation tagged with its source
    pub fn with_source<S1: Into<String>, S2: Into<String>>(
        level: LogLevel,
        message: S1,
        source: S2,
    ) -> Self {
        Self { level, message: message.into(), source: Some(source.into()) }
    }
}
