// wasmboot - wasmboot-error
// Module: Error Types
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The unified error type shared by every wasmboot crate.

use std::borrow::Cow;
use std::fmt;

use crate::codes;

/// `Error` categories for loader operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// Retrieving the module resource failed
    Fetch         = 1,
    /// The bytes are not a decodable module
    Parse         = 2,
    /// The module decodes but is not valid
    Validation    = 3,
    /// The binding set does not satisfy the module's imports
    Link          = 4,
    /// Execution of guest code failed
    Runtime       = 5,
    /// Configuration is invalid or unreadable
    Configuration = 6,
    /// Local I/O failed
    Io            = 7,
    /// A lifecycle rule was broken
    InvalidState  = 8,
}

impl ErrorCategory {
    /// Short lowercase name used when rendering errors
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Validation => "validation",
            Self::Link => "link",
            Self::Runtime => "runtime",
            Self::Configuration => "config",
            Self::Io => "io",
            Self::InvalidState => "state",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// wasmboot `Error` type
///
/// Errors carry a category, a numeric code from [`codes`] and a message.
/// Messages are usually static; dynamic context (an import name, an HTTP
/// status) goes through [`Error::with_message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{category}:{code}] {message}")]
pub struct Error {
    /// `Error` category
    pub category: ErrorCategory,
    /// `Error` code
    pub code:     u16,
    /// `Error` message
    pub message:  Cow<'static, str>,
}

impl Error {
    /// The module resource does not exist
    pub const RESOURCE_NOT_FOUND: Self = Self::new(
        ErrorCategory::Fetch,
        codes::RESOURCE_NOT_FOUND,
        "Module resource not found",
    );
    /// The bytes do not start with the wasm magic
    pub const INVALID_MAGIC: Self = Self::new(
        ErrorCategory::Parse,
        codes::INVALID_MAGIC,
        "Not a WebAssembly binary: bad magic number",
    );
    /// The input ended before a full module was read
    pub const TRUNCATED_MODULE: Self = Self::new(
        ErrorCategory::Parse,
        codes::TRUNCATED_MODULE,
        "Unexpected end of module bytes",
    );
    /// The guest requested exit through the bridge
    pub const EXIT_REQUESTED: Self = Self::new(
        ErrorCategory::Runtime,
        codes::EXIT_REQUESTED,
        "Guest requested exit",
    );

    /// Create a new error with a static message
    #[must_use]
    pub const fn new(category: ErrorCategory, code: u16, message: &'static str) -> Self {
        Self { category, code, message: Cow::Borrowed(message) }
    }

    /// Create a new error with an owned message
    #[must_use]
    pub fn with_message(category: ErrorCategory, code: u16, message: impl Into<String>) -> Self {
        Self { category, code, message: Cow::Owned(message.into()) }
    }

    /// Prefix the message with additional context, keeping category and code
    #[must_use]
    pub fn context(self, context: impl fmt::Display) -> Self {
        Self::with_message(self.category, self.code, format!("{context}: {}", self.message))
    }

    /// Create a fetch error
    #[must_use]
    pub fn fetch_error(code: u16, message: impl Into<String>) -> Self {
        Self::with_message(ErrorCategory::Fetch, code, message)
    }

    /// Create a validation error
    #[must_use]
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCategory::Validation, codes::VALIDATION_FAILED, message)
    }

    /// Create a link error
    #[must_use]
    pub fn link_error(code: u16, message: impl Into<String>) -> Self {
        Self::with_message(ErrorCategory::Link, code, message)
    }

    /// Create a runtime error
    #[must_use]
    pub fn runtime_error(code: u16, message: impl Into<String>) -> Self {
        Self::with_message(ErrorCategory::Runtime, code, message)
    }

    /// Create a configuration error
    #[must_use]
    pub fn config_error(code: u16, message: impl Into<String>) -> Self {
        Self::with_message(ErrorCategory::Configuration, code, message)
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCategory::InvalidState, codes::INVALID_TRANSITION, message)
    }

    /// Check if this is a fetch error
    #[must_use]
    pub fn is_fetch_error(&self) -> bool {
        self.category == ErrorCategory::Fetch
    }

    /// Check if this is a parse or validation error
    #[must_use]
    pub fn is_module_error(&self) -> bool {
        matches!(self.category, ErrorCategory::Parse | ErrorCategory::Validation)
    }

    /// Check if this is a link error
    #[must_use]
    pub fn is_link_error(&self) -> bool {
        self.category == ErrorCategory::Link
    }

    /// Check if this is a runtime error
    #[must_use]
    pub fn is_runtime_error(&self) -> bool {
        self.category == ErrorCategory::Runtime
    }

    /// Check if this is a configuration error
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        self.category == ErrorCategory::Configuration
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::with_message(
                ErrorCategory::Fetch,
                codes::RESOURCE_NOT_FOUND,
                format!("Module resource not found: {error}"),
            ),
            _ => Self::with_message(ErrorCategory::Io, codes::IO_ERROR, error.to_string()),
        }
    }
}
