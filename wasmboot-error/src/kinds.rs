// wasmboot - wasmboot-error
// Module: Error Kinds
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Specific error kinds and helpers for the common failure patterns.

use crate::{codes, Error, ErrorCategory};

/// Resource retrieval failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError(pub String);

/// The module bytes could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

/// The module failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

/// Linking against the binding set failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkError(pub String);

/// Guest execution failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError(pub String);

/// Configuration is invalid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl From<FetchError> for Error {
    fn from(e: FetchError) -> Self {
        Self::with_message(ErrorCategory::Fetch, codes::FETCH_FAILED, e.0)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::with_message(ErrorCategory::Parse, codes::MALFORMED_MODULE, e.0)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::with_message(ErrorCategory::Validation, codes::VALIDATION_FAILED, e.0)
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::with_message(ErrorCategory::Link, codes::INSTANTIATION_FAILED, e.0)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Self {
        Self::with_message(ErrorCategory::Runtime, codes::CALL_FAILED, e.0)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::with_message(ErrorCategory::Configuration, codes::INVALID_CONFIG, e.0)
    }
}

/// An import `module.name` has no binding
#[must_use]
pub fn missing_import(module: &str, name: &str) -> Error {
    Error::link_error(codes::MISSING_IMPORT, format!("missing import `{module}.{name}`"))
}

/// An import `module.name` is bound with an incompatible signature
#[must_use]
pub fn import_type_mismatch(module: &str, name: &str, expected: &str, found: &str) -> Error {
    Error::link_error(
        codes::IMPORT_TYPE_MISMATCH,
        format!("import `{module}.{name}` expects {expected} but the binding provides {found}"),
    )
}

/// A binding was registered twice
#[must_use]
pub fn duplicate_binding(module: &str, name: &str) -> Error {
    Error::link_error(codes::DUPLICATE_BINDING, format!("binding `{module}.{name}` registered twice"))
}

/// An export is not present on the instance
#[must_use]
pub fn export_not_found(name: &str) -> Error {
    Error::runtime_error(codes::EXPORT_NOT_FOUND, format!("export `{name}` not found"))
}

/// Guest memory could not be accessed from a host function
#[must_use]
pub fn guest_memory_error(message: impl Into<String>) -> Error {
    Error::runtime_error(codes::GUEST_MEMORY_ACCESS, message)
}
