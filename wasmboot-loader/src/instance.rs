// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! A live instance and the store that owns its state.

use std::fmt;

use wasmboot_error::{codes, kinds, Error, Result};
use wasmboot_host::{CallbackType, FuncSignature, HostState, Value, MEMORY_EXPORT};
use wasmtime::{Instance, Store};

use crate::module::ExportInfo;

/// A live, linked instance of a compiled module
///
/// Each instance owns its own store, so linear memory, tables and host state
/// are never shared between two instances of the same module.
pub struct LiveInstance {
    ordinal:  u32,
    store:    Store<HostState>,
    instance: Instance,
    exports:  Vec<ExportInfo>,
}

impl fmt::Debug for LiveInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveInstance")
            .field("ordinal", &self.ordinal)
            .field("label", &self.label())
            .field("exit_code", &self.exit_code())
            .finish_non_exhaustive()
    }
}

/// Store label of the instance with the given ordinal
#[must_use]
pub fn instance_label(ordinal: u32) -> String {
    format!("instance-{ordinal}")
}

impl LiveInstance {
    pub(crate) fn new(
        ordinal: u32,
        store: Store<HostState>,
        instance: Instance,
        exports: Vec<ExportInfo>,
    ) -> Self {
        Self { ordinal, store, instance, exports }
    }

    /// 1 for the instance that runs the entry point, 2 for the one kept
    /// afterwards
    #[must_use]
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Label used in logs and passed to host functions
    #[must_use]
    pub fn label(&self) -> &str {
        self.store.data().label()
    }

    /// Exports of the instance
    #[must_use]
    pub fn exports(&self) -> &[ExportInfo] {
        &self.exports
    }

    /// Whether the instance exports a function called `name`
    #[must_use]
    pub fn has_export(&self, name: &str) -> bool {
        self.exports.iter().any(|export| export.name == name)
    }

    /// Exit code requested by the guest through the bridge, if any
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.store.data().exit_code()
    }

    /// Current size in bytes of the exported memory, if there is one
    pub fn memory_size(&mut self) -> Option<usize> {
        self.instance
            .get_memory(&mut self.store, MEMORY_EXPORT)
            .map(|memory| memory.data_size(&self.store))
    }

    /// Call an exported function
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the export is missing, is not a numeric
    /// function, the arguments do not match, or the call traps. A trap raised
    /// by a host function carries that host function's error.
    pub async fn call(&mut self, name: &str, args: &[Value]) -> Result<Vec<Value>> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| kinds::export_not_found(name))?;
        let signature = FuncSignature::from_func_type(&func.ty(&self.store)).ok_or_else(|| {
            Error::runtime_error(
                codes::ARGUMENT_MISMATCH,
                format!("export `{name}` uses types that cannot cross the host boundary"),
            )
        })?;
        signature.check_args(args)?;

        let params: Vec<_> = args.iter().map(|arg| arg.to_val()).collect();
        let mut results: Vec<_> =
            signature.results.iter().map(|ty| Value::zero(*ty).to_val()).collect();
        func.call_async(&mut self.store, &params, &mut results)
            .await
            .map_err(|e| trap_error(name, &e))?;

        results
            .iter()
            .map(|val| {
                Value::from_val(val).ok_or_else(|| {
                    Error::runtime_error(codes::CALL_FAILED, "non-numeric result value")
                })
            })
            .collect()
    }

    /// Run the cleanup hook and drop the instance
    pub fn retire(self) {
        let state = self.store.data();
        tracing::debug!(instance = state.label(), "Retiring instance");
        state.registry().notify_lifecycle(CallbackType::Cleanup, state.label());
    }
}

fn trap_error(name: &str, e: &wasmtime::Error) -> Error {
    if let Some(host_error) = e.downcast_ref::<Error>() {
        return host_error.clone().context(format!("call to `{name}`"));
    }
    Error::runtime_error(codes::CALL_FAILED, format!("call to `{name}` trapped: {e:#}"))
}
