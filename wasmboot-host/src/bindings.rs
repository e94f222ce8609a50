// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! A built, immutable binding set.
//!
//! [`HostBindings`] is what the loader instantiates against. It is shared by
//! every instance created from the same compiled module, and produces a fresh
//! [`HostState`] per instance so that no host-side state leaks between them.

use wasmtime::{Engine, ExternType, Linker, Module, Store};

use crate::{definition::describe_import, prelude::*};

/// Host bindings a module's imports are resolved against
#[derive(Debug, Clone)]
pub struct HostBindings {
    bridge_name: String,
    registry:    Arc<CallbackRegistry>,
}

impl Default for HostBindings {
    fn default() -> Self {
        Self::empty()
    }
}

impl HostBindings {
    pub(crate) fn new(bridge_name: String, registry: CallbackRegistry) -> Self {
        Self { bridge_name, registry: Arc::new(registry) }
    }

    /// A binding set with no host functions
    #[must_use]
    pub fn empty() -> Self {
        Self::new(crate::builder::DEFAULT_BRIDGE_NAME.to_string(), CallbackRegistry::new())
    }

    /// Name of the bridge these bindings belong to
    #[must_use]
    pub fn bridge_name(&self) -> &str {
        &self.bridge_name
    }

    /// The underlying registry
    #[must_use]
    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    /// Shared handle to the underlying registry
    #[must_use]
    pub fn registry_arc(&self) -> Arc<CallbackRegistry> {
        Arc::clone(&self.registry)
    }

    /// Fresh per-instance host state
    pub fn new_state(&self, label: impl Into<String>) -> HostState {
        HostState::new(label, self.registry_arc())
    }

    /// Check every import of `module` against the binding set
    ///
    /// Imports are checked in declaration order and the first unresolved one
    /// is reported.
    ///
    /// # Errors
    ///
    /// Returns a link error for an import with no binding, a binding of the
    /// wrong kind or type, or a table import
    pub fn check_imports(&self, module: &Module) -> Result<()> {
        for import in module.imports() {
            let (module_name, name) = (import.module(), import.name());
            let ty = import.ty();
            let function = self.registry.host_function(module_name, name);
            let value = self.registry.host_value(module_name, name);
            let provided = match (&ty, function, value) {
                (ExternType::Table(_), ..) => {
                    return Err(Error::link_error(
                        codes::UNSUPPORTED_IMPORT_KIND,
                        format!("import `{module_name}.{name}` is a table"),
                    ));
                }
                (_, None, None) => return Err(kinds::missing_import(module_name, name)),
                (ExternType::Func(func_type), Some(function), _) => {
                    let signature = FuncSignature::from_func_type(func_type);
                    if signature.as_ref() == Some(&function.signature) {
                        continue;
                    }
                    function.signature.to_string()
                }
                (_, Some(function), _) => format!("func {}", function.signature),
                (_, None, Some(value)) => {
                    if value.satisfies(&ty) {
                        continue;
                    }
                    value.to_string()
                }
            };
            return Err(kinds::import_type_mismatch(
                module_name,
                name,
                &describe_import(&ty),
                &provided,
            ));
        }
        Ok(())
    }

    /// Create every memory and global in `store` and define it on `linker`
    ///
    /// Called once per store, so instances never share these values.
    ///
    /// # Errors
    ///
    /// Returns a link error if a value cannot be created or defined
    pub fn define_values(
        &self,
        linker: &mut Linker<HostState>,
        store: &mut Store<HostState>,
    ) -> Result<()> {
        for (module_name, name, value) in self.registry.host_values() {
            let item = value.create(&mut *store)?;
            linker.define(&*store, module_name, name, item).map_err(|e| {
                Error::link_error(
                    codes::INSTANTIATION_FAILED,
                    format!("cannot define `{module_name}.{name}`: {e}"),
                )
            })?;
        }
        Ok(())
    }

    /// Build an engine linker with every host function defined
    ///
    /// # Errors
    ///
    /// Returns a link error if the engine rejects a definition
    pub fn linker(&self, engine: &Engine) -> Result<Linker<HostState>> {
        let mut linker = Linker::new(engine);
        for (module_name, name, function) in self.registry.host_functions() {
            let handler = function.handler.clone();
            let result_types = function.signature.results.clone();
            linker
                .func_new(
                    module_name,
                    name,
                    function.signature.to_func_type(engine),
                    move |mut caller, params, results| {
                        let args = params.iter().map(Value::from_val).collect::<Option<Vec<_>>>();
                        let args = args.ok_or_else(|| {
                            Error::runtime_error(
                                codes::ARGUMENT_MISMATCH,
                                "non-numeric argument passed to host function",
                            )
                        })?;

                        let mut ctx = HostContext::new(&mut caller);
                        let values = handler.call(&mut ctx, &args)?;

                        let types_match = values.len() == result_types.len()
                            && values.iter().zip(&result_types).all(|(v, ty)| v.ty() == *ty);
                        if !types_match {
                            return Err(Error::runtime_error(
                                codes::CALL_FAILED,
                                "host function returned values not matching its signature",
                            )
                            .into());
                        }
                        for (slot, value) in results.iter_mut().zip(values) {
                            *slot = value.to_val();
                        }
                        Ok(())
                    },
                )
                .map_err(|e| {
                    Error::link_error(
                        codes::INSTANTIATION_FAILED,
                        format!("cannot define `{module_name}.{name}`: {e}"),
                    )
                })?;
        }
        Ok(linker)
    }
}
