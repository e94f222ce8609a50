// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Log handler for guest and host log messages.

use wasmboot_host::{CallbackRegistry, CallbackType};

use crate::{level::LogLevel, operation::LogOperation};

/// Function type for handling log operations
pub type LogHandler = Box<dyn Fn(LogOperation) + Send + Sync>;

/// Extension trait for `CallbackRegistry` to add logging-specific methods
pub trait LoggingExt {
    /// Register a log handler
    fn register_log_handler<F>(&mut self, handler: F)
    where
        F: Fn(LogOperation) + Send + Sync + 'static;

    /// Handle a log operation
    ///
    /// Without a registered handler the message goes to `tracing`.
    fn handle_log(&self, operation: LogOperation);

    /// Check if a log handler is registered
    fn has_log_handler(&self) -> bool;
}

impl LoggingExt for CallbackRegistry {
    fn register_log_handler<F>(&mut self, handler: F)
    where
        F: Fn(LogOperation) + Send + Sync + 'static,
    {
        self.register_callback(CallbackType::Logging, Box::new(handler) as LogHandler);
    }

    fn handle_log(&self, operation: LogOperation) {
        if let Some(handler) = self.get_callback::<LogHandler>(&CallbackType::Logging) {
            handler(operation);
        } else {
            emit_tracing(&operation);
        }
    }

    fn has_log_handler(&self) -> bool {
        self.get_callback::<LogHandler>(&CallbackType::Logging).is_some()
    }
}

/// Forward a log operation to the `tracing` subscriber
pub fn emit_tracing(operation: &LogOperation) {
    let source = operation.source.as_deref().unwrap_or("host");
    let message = operation.message.as_str();
    match operation.level {
        LogLevel::Trace => tracing::trace!(target: "wasmboot::guest", source, "{message}"),
        LogLevel::Debug => tracing::debug!(target: "wasmboot::guest", source, "{message}"),
        LogLevel::Info => tracing::info!(target: "wasmboot::guest", source, "{message}"),
        LogLevel::Warn => tracing::warn!(target: "wasmboot::guest", source, "{message}"),
        LogLevel::Error => tracing::error!(target: "wasmboot::guest", source, "{message}"),
        LogLevel::Critical => {
            tracing::error!(target: "wasmboot::guest", source, critical = true, "{message}");
        }
    }
}
