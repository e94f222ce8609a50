// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The owned result of a successful load.

use std::time::Duration;

use wasmboot_error::Result;
use wasmboot_host::Value;

use crate::{
    bridge::RunOutcome, instance::LiveInstance, module::CompiledModule, module::ExportInfo,
    state::LoaderState,
};

/// How long each phase of a load took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadTimings {
    /// Fetch, compile and first instantiation
    pub compile_and_instantiate: Duration,
    /// Entry point run on instance 1
    pub run:                     Duration,
    /// Creation of instance 2
    pub reinstantiate:           Duration,
}

impl LoadTimings {
    /// Sum of all phases
    #[must_use]
    pub fn total(&self) -> Duration {
        self.compile_and_instantiate + self.run + self.reinstantiate
    }
}

/// A loaded module and the instance kept alive after its program ran
///
/// Owning a `Session` keeps instance 2 and its exports reachable; dropping
/// it releases both.
#[derive(Debug)]
pub struct Session {
    module:   CompiledModule,
    instance: LiveInstance,
    outcome:  RunOutcome,
    history:  Vec<LoaderState>,
    timings:  LoadTimings,
}

impl Session {
    pub(crate) fn new(
        module: CompiledModule,
        instance: LiveInstance,
        outcome: RunOutcome,
        history: Vec<LoaderState>,
        timings: LoadTimings,
    ) -> Self {
        Self { module, instance, outcome, history, timings }
    }

    /// The compiled module both instances were created from
    #[must_use]
    pub fn module(&self) -> &CompiledModule {
        &self.module
    }

    /// The live instance, always ordinal 2
    #[must_use]
    pub fn instance(&self) -> &LiveInstance {
        &self.instance
    }

    /// Mutable access to the live instance
    pub fn instance_mut(&mut self) -> &mut LiveInstance {
        &mut self.instance
    }

    /// How the entry point run ended
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    /// Every state the load went through
    #[must_use]
    pub fn history(&self) -> &[LoaderState] {
        &self.history
    }

    /// Phase timings
    #[must_use]
    pub fn timings(&self) -> &LoadTimings {
        &self.timings
    }

    /// Exports of the live instance
    #[must_use]
    pub fn exports(&self) -> &[ExportInfo] {
        self.instance.exports()
    }

    /// Call an export of the live instance
    pub async fn call(&mut self, name: &str, args: &[Value]) -> Result<Vec<Value>> {
        self.instance.call(name, args).await
    }
}
