// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Engine management: compiling bytes and instantiating compiled modules.

use std::time::Instant;

use sha2::{Digest, Sha256};
use wasmboot_error::{codes, Error, Result};
use wasmboot_host::{CallbackType, HostBindings};
use wasmtime::{Config, Engine, Module, Store};

use crate::{
    instance::{instance_label, LiveInstance},
    module::CompiledModule,
    streaming::require_header,
};

/// Wraps the engine every module and instance of a loader shares
#[derive(Clone)]
pub struct Runtime {
    engine: Engine,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Runtime {
    /// Create a runtime with an async-capable engine
    pub fn new() -> Result<Self> {
        let mut config = Config::new();
        config.async_support(true);
        let engine = Engine::new(&config).map_err(|e| {
            Error::runtime_error(codes::ENGINE_CREATION, format!("engine creation failed: {e:#}"))
        })?;
        Ok(Self { engine })
    }

    /// The engine
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Validate and compile module bytes
    ///
    /// # Errors
    ///
    /// Returns a parse error for a bad or truncated header and a validation
    /// error for anything the engine rejects
    pub fn compile(&self, bytes: &[u8]) -> Result<CompiledModule> {
        require_header(bytes)?;
        let start = Instant::now();
        let module = Module::new(&self.engine, bytes)
            .map_err(|e| Error::validation_error(format!("{e:#}")))?;
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        let compiled = CompiledModule::new(module, digest, bytes.len());

        tracing::debug!(
            size = bytes.len(),
            digest = %compiled.digest_hex(),
            elapsed_ms = start.elapsed().as_millis(),
            "Compiled module"
        );
        Ok(compiled)
    }

    /// Link a compiled module against `bindings` and instantiate it
    ///
    /// Imports are checked before the engine is involved, so a missing
    /// binding is reported by name.
    ///
    /// # Errors
    ///
    /// Returns a link error for unsatisfied imports or a failed
    /// instantiation
    pub async fn instantiate(
        &self,
        module: &CompiledModule,
        bindings: &HostBindings,
        ordinal: u32,
    ) -> Result<LiveInstance> {
        bindings.check_imports(module.module())?;
        let mut linker = bindings.linker(&self.engine)?;

        let label = instance_label(ordinal);
        bindings.registry().notify_lifecycle(CallbackType::Setup, &label);
        let mut store = Store::new(&self.engine, bindings.new_state(label));
        bindings.define_values(&mut linker, &mut store)?;
        let instance =
            linker.instantiate_async(&mut store, module.module()).await.map_err(|e| {
                Error::link_error(
                    codes::INSTANTIATION_FAILED,
                    format!("instantiation of instance {ordinal} failed: {e:#}"),
                )
            })?;

        tracing::debug!(
            instance = store.data().label(),
            bridge = bindings.bridge_name(),
            "Instantiated module"
        );
        Ok(LiveInstance::new(ordinal, store, instance, module.exports()))
    }
}
