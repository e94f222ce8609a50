// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The bootstrap sequence: fetch, compile, instantiate, run, re-instantiate.

use std::{sync::Arc, time::Instant};

use wasmboot_error::Result;

use crate::{
    bridge::RuntimeBridge,
    config::LoaderConfig,
    module::CompiledModule,
    runtime::Runtime,
    session::{LoadTimings, Session},
    source::{open_source, ByteSource, ResourceLocation},
    state::{LoaderState, StateTracker},
    strategy::{select_strategy, Instantiated, StrategyPreference},
};

/// Loads modules through a bridge
///
/// A loader can be reused; every load fetches its source once and yields an
/// independent [`Session`].
pub struct Loader {
    runtime:    Runtime,
    config:     LoaderConfig,
    bridge:     Arc<dyn RuntimeBridge>,
    preference: StrategyPreference,
    client:     reqwest::Client,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("config", &self.config)
            .field("bridge", &self.bridge.name())
            .field("preference", &self.preference)
            .finish_non_exhaustive()
    }
}

impl Loader {
    /// Create a loader
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings and a runtime
    /// error if the engine cannot be created
    pub fn new(config: LoaderConfig, bridge: impl RuntimeBridge + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            runtime: Runtime::new()?,
            preference: config.strategy,
            config,
            bridge: Arc::new(bridge),
            client: reqwest::Client::new(),
        })
    }

    /// Override the configured strategy preference
    #[must_use]
    pub fn with_strategy_preference(mut self, preference: StrategyPreference) -> Self {
        self.preference = preference;
        self
    }

    /// The loader configuration
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The engine wrapper
    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Resolve `resource` against the configured base and build its source
    pub fn open(&self, resource: &str) -> Result<Box<dyn ByteSource>> {
        let location = ResourceLocation::resolve(resource, self.config.base.as_deref())?;
        open_source(&location, &self.client, self.config.chunk_size)
    }

    /// Load the configured resource
    pub async fn load_default(&self) -> Result<Session> {
        let resource = self.config.resource.clone();
        self.load_resource(&resource).await
    }

    /// Resolve, fetch and load `resource`
    pub async fn load_resource(&self, resource: &str) -> Result<Session> {
        let source = self.open(resource)?;
        self.load(source.as_ref()).await
    }

    /// Run the full sequence on `source`
    ///
    /// # Errors
    ///
    /// Fetch, parse, validation, link and entry point errors are returned
    /// unchanged; nothing is retried
    pub async fn load(&self, source: &dyn ByteSource) -> Result<Session> {
        let mut tracker = StateTracker::new();
        self.load_tracked(source, &mut tracker).await
    }

    /// Like [`Loader::load`], recording states in a caller-owned tracker
    ///
    /// On failure the tracker ends in [`LoaderState::Failed`].
    pub async fn load_tracked(
        &self,
        source: &dyn ByteSource,
        tracker: &mut StateTracker,
    ) -> Result<Session> {
        let result = self.run_sequence(source, tracker).await;
        if let Err(err) = &result {
            let failed_in = tracker.state();
            tracker.fail();
            tracing::error!(
                source = %source.describe(),
                state = %failed_in,
                error = %err,
                "Load failed"
            );
        }
        result
    }

    /// Fetch and compile only
    pub async fn inspect(&self, source: &dyn ByteSource) -> Result<CompiledModule> {
        let mut tracker = StateTracker::new();
        tracker.transition(LoaderState::Fetching)?;
        let strategy = select_strategy(self.preference, source)?;
        strategy.compile(&self.runtime, source, &mut tracker).await
    }

    /// Resolve `resource` and fetch and compile it
    pub async fn inspect_resource(&self, resource: &str) -> Result<CompiledModule> {
        let source = self.open(resource)?;
        self.inspect(source.as_ref()).await
    }

    async fn run_sequence(
        &self,
        source: &dyn ByteSource,
        tracker: &mut StateTracker,
    ) -> Result<Session> {
        let bindings = self.bridge.bindings();

        tracker.transition(LoaderState::Fetching)?;
        let strategy = select_strategy(self.preference, source)?;
        tracing::info!(
            source = %source.describe(),
            strategy = strategy.name(),
            bridge = self.bridge.name(),
            "Loading module"
        );

        let start = Instant::now();
        let Instantiated { module, mut instance } =
            strategy.compile_and_instantiate(&self.runtime, source, bindings, tracker).await?;
        let compile_and_instantiate = start.elapsed();

        tracker.transition(LoaderState::Running)?;
        let start = Instant::now();
        let outcome = match self.bridge.run(&mut instance).await {
            Ok(outcome) => outcome,
            Err(err) => {
                instance.retire();
                return Err(err);
            }
        };
        let run = start.elapsed();
        tracker.transition(LoaderState::Completed)?;
        tracing::info!(instance = instance.label(), %outcome, "Entry point completed");
        instance.retire();

        let start = Instant::now();
        let instance = self.runtime.instantiate(&module, bindings, 2).await?;
        let reinstantiate = start.elapsed();
        tracker.transition(LoaderState::Instantiated2)?;

        let timings = LoadTimings { compile_and_instantiate, run, reinstantiate };
        tracing::info!(
            digest = %module.digest_hex(),
            instance = instance.label(),
            total_ms = timings.total().as_millis(),
            "Module loaded"
        );
        Ok(Session::new(module, instance, outcome, tracker.history().to_vec(), timings))
    }
}
