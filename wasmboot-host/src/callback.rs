// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Callback registry for host functions.
//!
//! This module provides a registry for the host functions a module's imports
//! resolve against, and for typed callbacks (logging, exit) that those host
//! functions dispatch to.

// Use the prelude for consistent imports
use crate::prelude::*;

/// Types of callbacks that can be registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CallbackType {
    /// Callback for setup before an instance is created
    Setup,
    /// Callback for cleanup after an instance is retired
    Cleanup,
    /// Callback for guest log messages
    Logging,
    /// Callback for guest exit requests
    Exit,
}

/// Function type for observing guest exit requests
pub type ExitHandler = Box<dyn Fn(&str, i32) + Send + Sync>;

/// Function type for instance setup and cleanup hooks, given the instance
/// label
pub type LifecycleHook = Box<dyn Fn(&str) + Send + Sync>;

/// A callback registry for the host side of a binding set
#[derive(Default)]
pub struct CallbackRegistry {
    /// Generic callback storage for different types of callbacks
    callbacks: HashMap<CallbackType, Box<dyn Any + Send + Sync>>,

    /// Host functions registry (module name -> function name -> function)
    host_functions: BTreeMap<String, BTreeMap<String, HostFunction>>,

    /// Memories and globals (module name -> field name -> definition)
    host_values: BTreeMap<String, BTreeMap<String, HostValue>>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("registered_callbacks", &self.callbacks.keys())
            .field("registered_modules", &self.host_functions.keys())
            .field("value_count", &self.value_count())
            .finish()
    }
}

impl CallbackRegistry {
    /// Create a new callback registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            callbacks:      HashMap::new(),
            host_functions: BTreeMap::new(),
            host_values:    BTreeMap::new(),
        }
    }

    /// Register a callback, replacing any previous one of the same type
    pub fn register_callback<T: 'static + Send + Sync>(
        &mut self,
        callback_type: CallbackType,
        callback: T,
    ) {
        self.callbacks.insert(callback_type, Box::new(callback));
    }

    /// Get a callback
    #[must_use]
    pub fn get_callback<T: 'static + Send + Sync>(
        &self,
        callback_type: &CallbackType,
    ) -> Option<&T> {
        self.callbacks.get(callback_type).and_then(|cb| cb.downcast_ref())
    }

    /// Register an exit observer
    pub fn register_exit_handler<F>(&mut self, handler: F)
    where
        F: Fn(&str, i32) + Send + Sync + 'static,
    {
        self.register_callback(CallbackType::Exit, Box::new(handler) as ExitHandler);
    }

    /// Notify the exit observer, if one is registered
    pub fn handle_exit(&self, label: &str, code: i32) {
        if let Some(handler) = self.get_callback::<ExitHandler>(&CallbackType::Exit) {
            handler(label, code);
        }
    }

    /// Register a setup or cleanup hook
    pub fn register_lifecycle_hook<F>(&mut self, callback_type: CallbackType, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.register_callback(callback_type, Box::new(hook) as LifecycleHook);
    }

    /// Run the setup or cleanup hook for an instance, if one is registered
    pub fn notify_lifecycle(&self, callback_type: CallbackType, label: &str) {
        if let Some(hook) = self.get_callback::<LifecycleHook>(&callback_type) {
            hook(label);
        }
    }

    /// Register a host function
    ///
    /// # Errors
    ///
    /// Returns a link error if `module_name.function_name` is already bound
    pub fn register_host_function(
        &mut self,
        module_name: &str,
        function_name: &str,
        function: HostFunction,
    ) -> Result<()> {
        if self.is_bound(module_name, function_name) {
            return Err(kinds::duplicate_binding(module_name, function_name));
        }
        self.host_functions
            .entry(module_name.to_string())
            .or_default()
            .insert(function_name.to_string(), function);
        Ok(())
    }

    /// Register a memory or global
    ///
    /// # Errors
    ///
    /// Returns a link error if `module_name.name` is already bound
    pub fn register_host_value(
        &mut self,
        module_name: &str,
        name: &str,
        value: HostValue,
    ) -> Result<()> {
        if self.is_bound(module_name, name) {
            return Err(kinds::duplicate_binding(module_name, name));
        }
        self.host_values
            .entry(module_name.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Look up a memory or global
    #[must_use]
    pub fn host_value(&self, module_name: &str, name: &str) -> Option<&HostValue> {
        self.host_values.get(module_name).and_then(|values| values.get(name))
    }

    /// Iterate all memories and globals as `(module, name, value)` in sorted
    /// order
    pub fn host_values(&self) -> impl Iterator<Item = (&str, &str, &HostValue)> + '_ {
        self.host_values.iter().flat_map(|(module, values)| {
            values.iter().map(move |(name, value)| (module.as_str(), name.as_str(), value))
        })
    }

    /// Number of registered memories and globals
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.host_values.values().map(BTreeMap::len).sum()
    }

    fn is_bound(&self, module_name: &str, name: &str) -> bool {
        self.has_host_function(module_name, name) || self.host_value(module_name, name).is_some()
    }

    /// Check if a host function is registered
    #[must_use]
    pub fn has_host_function(&self, module_name: &str, function_name: &str) -> bool {
        self.host_function(module_name, function_name).is_some()
    }

    /// Look up a host function
    #[must_use]
    pub fn host_function(&self, module_name: &str, function_name: &str) -> Option<&HostFunction> {
        self.host_functions.get(module_name).and_then(|funcs| funcs.get(function_name))
    }

    /// Iterate all host functions as `(module, name, function)` in sorted
    /// order
    pub fn host_functions(&self) -> impl Iterator<Item = (&str, &str, &HostFunction)> + '_ {
        self.host_functions.iter().flat_map(|(module, funcs)| {
            funcs.iter().map(move |(name, function)| (module.as_str(), name.as_str(), function))
        })
    }

    /// Number of registered host functions
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.host_functions.values().map(BTreeMap::len).sum()
    }

    /// Call a host function directly, outside of guest execution
    ///
    /// # Errors
    ///
    /// Returns an error if the host function is not found, the arguments do
    /// not match its signature, or it fails during execution
    pub fn call_host_function(
        &self,
        ctx: &mut HostContext<'_>,
        module_name: &str,
        function_name: &str,
        args: &[Value],
    ) -> Result<Vec<Value>> {
        let Some(function) = self.host_function(module_name, function_name) else {
            return Err(Error::runtime_error(
                codes::HOST_FUNCTION_NOT_FOUND,
                format!("Host function {} not found", function_key(module_name, function_name)),
            ));
        };
        function.signature.check_args(args)?;
        function.handler.call(ctx, args)
    }
}

/// Generate a unique function key from module and function names
///
/// The key has the form `module_name.function_name`, matching how import
/// names are rendered in errors.
#[must_use]
pub fn function_key(module_name: &str, function_name: &str) -> String {
    format!("{module_name}.{function_name}")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn constant(value: i32) -> HostFunction {
        HostFunction::new(
            FuncSignature::new([], [ValueType::I32]),
            HostFunctionHandler::new(move |_, _| Ok(vec![Value::I32(value)])),
        )
    }

    #[test]
    fn test_callback_registry() {
        let mut registry = CallbackRegistry::new();

        registry.register_host_function("test_module", "test_function", constant(42)).unwrap();

        assert!(registry.has_host_function("test_module", "test_function"));
        assert!(!registry.has_host_function("nonexistent", "function"));

        let mut guest = DetachedGuest::new("test");
        let mut ctx = HostContext::new(&mut guest);
        let values =
            registry.call_host_function(&mut ctx, "test_module", "test_function", &[]).unwrap();
        assert_eq!(values, vec![Value::I32(42)]);

        let err =
            registry.call_host_function(&mut ctx, "nonexistent", "function", &[]).unwrap_err();
        assert_eq!(err.code, codes::HOST_FUNCTION_NOT_FOUND);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = CallbackRegistry::new();
        registry.register_host_function("env", "f", constant(1)).unwrap();

        let err = registry.register_host_function("env", "f", constant(2)).unwrap_err();
        assert_eq!(err.code, codes::DUPLICATE_BINDING);
        assert_eq!(registry.function_count(), 1);
    }

    #[test]
    fn test_arguments_checked_against_signature() {
        let mut registry = CallbackRegistry::new();
        registry.register_host_function("env", "f", constant(1)).unwrap();

        let mut guest = DetachedGuest::new("test");
        let mut ctx = HostContext::new(&mut guest);
        let err = registry.call_host_function(&mut ctx, "env", "f", &[Value::I32(0)]).unwrap_err();
        assert_eq!(err.code, codes::ARGUMENT_MISMATCH);
    }

    #[test]
    fn test_callback_registry_callback() {
        let mut registry = CallbackRegistry::new();

        registry.register_callback(CallbackType::Setup, 42);

        let callback = registry.get_callback::<i32>(&CallbackType::Setup);
        assert_eq!(callback.copied(), Some(42));

        registry.register_callback(CallbackType::Setup, 24);
        assert_eq!(registry.get_callback::<i32>(&CallbackType::Setup).copied(), Some(24));

        // Wrong type yields nothing
        assert!(registry.get_callback::<u64>(&CallbackType::Setup).is_none());
    }

    #[test]
    fn test_exit_handler() {
        let mut registry = CallbackRegistry::new();
        registry.handle_exit("instance-1", 0);

        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            registry.register_exit_handler(move |label, code| {
                seen.lock().unwrap().push((label.to_string(), code));
            });
        }
        registry.handle_exit("instance-1", 7);
        assert_eq!(*seen.lock().unwrap(), vec![("instance-1".to_string(), 7)]);
    }

    #[test]
    fn test_lifecycle_hooks() {
        let mut registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for callback_type in [CallbackType::Setup, CallbackType::Cleanup] {
            let seen = seen.clone();
            registry.register_lifecycle_hook(callback_type, move |label| {
                seen.lock().unwrap().push((callback_type, label.to_string()));
            });
        }

        registry.notify_lifecycle(CallbackType::Setup, "instance-1");
        registry.notify_lifecycle(CallbackType::Cleanup, "instance-1");
        // Not a lifecycle hook type, nothing registered
        registry.notify_lifecycle(CallbackType::Logging, "instance-1");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (CallbackType::Setup, "instance-1".to_string()),
                (CallbackType::Cleanup, "instance-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_values_share_the_name_space() {
        let mut registry = CallbackRegistry::new();
        registry.register_host_value("env", "memory", HostValue::memory(1, None)).unwrap();
        registry.register_host_function("env", "f", constant(1)).unwrap();

        let err = registry.register_host_function("env", "memory", constant(2)).unwrap_err();
        assert_eq!(err.code, codes::DUPLICATE_BINDING);
        let err = registry
            .register_host_value("env", "f", HostValue::global(Value::I32(0)))
            .unwrap_err();
        assert_eq!(err.code, codes::DUPLICATE_BINDING);

        assert_eq!(registry.host_value("env", "memory"), Some(&HostValue::memory(1, None)));
        assert_eq!(registry.value_count(), 1);
        assert_eq!(registry.function_count(), 1);
    }

    #[test]
    fn test_listing_is_sorted() {
        let mut registry = CallbackRegistry::new();
        registry.register_host_function("env", "b", constant(1)).unwrap();
        registry.register_host_function("env", "a", constant(2)).unwrap();
        registry.register_host_function("aux", "z", constant(3)).unwrap();

        let keys: Vec<_> =
            registry.host_functions().map(|(m, n, _)| function_key(m, n)).collect();
        assert_eq!(keys, vec!["aux.z", "env.a", "env.b"]);
    }
}
