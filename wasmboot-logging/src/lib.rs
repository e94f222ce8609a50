//! # wasmboot logging
//!
//! Logging for the wasmboot module loader.
//!
//! This crate lets loaded modules log messages to the host through a `log`
//! import, and routes both guest and host messages either to a registered
//! handler or to `tracing`. It extends the wasmboot-host crate with
//! logging-specific capabilities.

// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use wasmboot_error::{Error, Result};
pub use wasmboot_host::CallbackRegistry;

/// Logging handlers for processing log messages.
///
/// This module contains the trait and implementations for log handlers,
/// which process log messages from guest instances.
pub mod handler;

/// Log level definitions for categorizing message severity.
pub mod level;

/// Log operation data structures.
pub mod operation;

/// The guest-facing `log` import.
pub mod guest;

pub use guest::{GuestLoggingExt, LOG_FUNCTION};
pub use handler::{emit_tracing, LogHandler, LoggingExt};
pub use level::{LogLevel, ParseLogLevelError};
pub use operation::LogOperation;
