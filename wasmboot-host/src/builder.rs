// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Builder for host binding sets.
//!
//! This module provides a builder pattern for assembling the host functions a
//! loaded module may import. Registration errors are held until
//! [`HostBuilder::build`] so the builder can be chained.

use crate::prelude::*;

/// Default name of the bridge the bindings belong to, used in logs
pub const DEFAULT_BRIDGE_NAME: &str = "wasmboot";

/// Builder for a [`HostBindings`] set
#[derive(Debug)]
pub struct HostBuilder {
    /// Registry being assembled
    registry:      CallbackRegistry,
    /// Bridge name used in logs
    bridge_name:   String,
    /// First registration error, reported by `build`
    pending_error: Option<Error>,
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBuilder {
    /// Create a new, empty host builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry:      CallbackRegistry::new(),
            bridge_name:   DEFAULT_BRIDGE_NAME.to_string(),
            pending_error: None,
        }
    }

    /// Register a host function
    ///
    /// # Arguments
    ///
    /// * `module_name` - The import module name
    /// * `function_name` - The import field name
    /// * `signature` - The signature the import must declare
    /// * `handler` - The handler run when the guest calls the import
    #[must_use]
    pub fn with_host_function(
        mut self,
        module_name: &str,
        function_name: &str,
        signature: FuncSignature,
        handler: HostFunctionHandler,
    ) -> Self {
        let function = HostFunction::new(signature, handler);
        if let Err(err) = self.registry.register_host_function(module_name, function_name, function)
        {
            self.pending_error.get_or_insert(err);
        }
        self
    }

    /// Register a memory or global the module imports as `module_name.name`
    #[must_use]
    pub fn with_value(mut self, module_name: &str, name: &str, value: HostValue) -> Self {
        if let Err(err) = self.registry.register_host_value(module_name, name, value) {
            self.pending_error.get_or_insert(err);
        }
        self
    }

    /// Register a host function from a closure
    #[must_use]
    pub fn with_function<F>(
        self,
        module_name: &str,
        function_name: &str,
        signature: FuncSignature,
        f: F,
    ) -> Self
    where
        F: Fn(&mut HostContext<'_>, &[Value]) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.with_host_function(module_name, function_name, signature, HostFunctionHandler::new(f))
    }

    /// Register the `exit(code: i32)` import
    ///
    /// Calling it records the exit code on the instance, notifies the
    /// [`CallbackType::Exit`] observer and stops guest execution.
    #[must_use]
    pub fn with_exit_function(self, module_name: &str, function_name: &str) -> Self {
        self.with_function(
            module_name,
            function_name,
            FuncSignature::new([ValueType::I32], []),
            |ctx, args| {
                let code = args.first().and_then(Value::as_i32).unwrap_or_default();
                ctx.request_exit(code);
                ctx.callbacks().handle_exit(ctx.label(), code);
                Err(Error::EXIT_REQUESTED.context(format!("exit({code})")))
            },
        )
    }

    /// Observe guest exit requests
    #[must_use]
    pub fn with_exit_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, i32) + Send + Sync + 'static,
    {
        self.registry.register_exit_handler(handler);
        self
    }

    /// Run `hook` with the instance label on setup or cleanup
    #[must_use]
    pub fn with_lifecycle_hook<F>(mut self, callback_type: CallbackType, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.registry.register_lifecycle_hook(callback_type, hook);
        self
    }

    /// Set the bridge name
    #[must_use]
    pub fn with_bridge_name(mut self, name: &str) -> Self {
        self.bridge_name = name.to_string();
        self
    }

    /// Direct access to the registry under construction
    ///
    /// Used by extension traits that install their own bindings.
    pub fn registry_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.registry
    }

    /// Build the binding set
    ///
    /// # Errors
    ///
    /// Returns the first registration error, e.g. a duplicate binding
    pub fn build(self) -> Result<HostBindings> {
        if let Some(err) = self.pending_error {
            return Err(err);
        }
        tracing::debug!(
            bridge = %self.bridge_name,
            functions = self.registry.function_count(),
            values = self.registry.value_count(),
            "Built host bindings"
        );
        Ok(HostBindings::new(self.bridge_name, self.registry))
    }
}
