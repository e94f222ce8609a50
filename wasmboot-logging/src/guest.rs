// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The `log` import that lets a guest write to the host log.

use wasmboot_error::{codes, Error};
use wasmboot_host::{FuncSignature, HostBuilder, Value, ValueType};

use crate::{handler::LoggingExt, level::LogLevel, operation::LogOperation};

/// Import field name of the guest logging function
pub const LOG_FUNCTION: &str = "log";

/// Extension trait for `HostBuilder` to install guest logging
pub trait GuestLoggingExt {
    /// Install `module_name.log(level: i32, ptr: i32, len: i32)`
    ///
    /// The message is read from the caller's exported memory as UTF-8 and
    /// dispatched through [`LoggingExt::handle_log`], tagged with the label of
    /// the calling instance.
    #[must_use]
    fn with_guest_logging(self, module_name: &str) -> Self;
}

impl GuestLoggingExt for HostBuilder {
    fn with_guest_logging(self, module_name: &str) -> Self {
        self.with_function(
            module_name,
            LOG_FUNCTION,
            FuncSignature::new([ValueType::I32; 3], []),
            |ctx, args| {
                let [Value::I32(level), Value::I32(ptr), Value::I32(len)] = args else {
                    return Err(Error::runtime_error(
                        codes::ARGUMENT_MISMATCH,
                        "log expects (level, ptr, len)",
                    ));
                };
                let message = ctx.read_string(*ptr as u32, *len as u32)?;
                let operation =
                    LogOperation::with_source(LogLevel::from_guest(*level), message, ctx.label());
                ctx.callbacks().handle_log(operation);
                Ok(Vec::new())
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use wasmboot_host::{CallbackRegistry, DetachedGuest, HostContext};

    use super::*;

    #[test]
    fn test_guest_log_reads_memory() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let mut registry_with_handler = CallbackRegistry::new();
        {
            let received = received.clone();
            registry_with_handler.register_log_handler(move |op| {
                received.lock().unwrap().push(op);
            });
        }

        let bindings = HostBuilder::new().with_guest_logging("env").build().unwrap();
        let log = bindings.registry().host_function("env", LOG_FUNCTION).unwrap().clone();

        let mut guest = DetachedGuest::with_registry("instance-1", Arc::new(registry_with_handler))
            .with_memory(b"..hello".to_vec());
        let mut ctx = HostContext::new(&mut guest);
        log.handler.call(&mut ctx, &[Value::I32(3), Value::I32(2), Value::I32(5)]).unwrap();

        let received = received.lock().unwrap();
        assert_eq!(*received, vec![LogOperation::with_source(LogLevel::Warn, "hello", "instance-1")]);
    }

    #[test]
    fn test_guest_log_out_of_bounds() {
        let bindings = HostBuilder::new().with_guest_logging("env").build().unwrap();
        let log = bindings.registry().host_function("env", LOG_FUNCTION).unwrap().clone();

        let mut guest = DetachedGuest::new("instance-1").with_memory(vec![0; 4]);
        let mut ctx = HostContext::new(&mut guest);
        let err = log.handler.call(&mut ctx, &[Value::I32(2), Value::I32(2), Value::I32(8)]).unwrap_err();
        assert_eq!(err.code, codes::GUEST_MEMORY_ACCESS);
    }

    #[test]
    fn test_guest_log_negative_length() {
        let bindings = HostBuilder::new().with_guest_logging("env").build().unwrap();
        let log = bindings.registry().host_function("env", LOG_FUNCTION).unwrap().clone();

        let mut guest = DetachedGuest::new("instance-1").with_memory(vec![0; 64]);
        let mut ctx = HostContext::new(&mut guest);
        let args = [Value::I32(2), Value::I32(0), Value::I32(-1)];
        let err = log.handler.call(&mut ctx, &args).unwrap_err();
        assert_eq!(err.code, codes::GUEST_MEMORY_ACCESS);
    }
}
