// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Compile-and-instantiate strategies.
//!
//! Streaming validates bytes while they arrive. Buffered reads the whole
//! resource first. Both compile the identical byte buffer, so they produce
//! identical modules.

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wasmboot_error::{codes, Error, Result};
use wasmboot_host::HostBindings;

use crate::{
    instance::LiveInstance,
    module::CompiledModule,
    runtime::Runtime,
    source::ByteSource,
    state::{LoaderState, StateTracker},
    streaming::StreamingValidator,
};

/// A compiled module together with its first instance
#[derive(Debug)]
pub struct Instantiated {
    /// The compiled module
    pub module:   CompiledModule,
    /// Instance with ordinal 1
    pub instance: LiveInstance,
}

/// One way of turning a byte source into a compiled, instantiated module
#[async_trait]
pub trait CompileAndInstantiate: Send + Sync + fmt::Debug {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Fetch and compile, moving the tracker from `Fetching` to `Compiling`
    async fn compile(
        &self,
        runtime: &Runtime,
        source: &dyn ByteSource,
        tracker: &mut StateTracker,
    ) -> Result<CompiledModule>;

    /// Fetch, compile and create instance 1, ending in `Instantiated#1`
    async fn compile_and_instantiate(
        &self,
        runtime: &Runtime,
        source: &dyn ByteSource,
        bindings: &HostBindings,
        tracker: &mut StateTracker,
    ) -> Result<Instantiated> {
        let module = self.compile(runtime, source, tracker).await?;
        let instance = runtime.instantiate(&module, bindings, 1).await?;
        tracker.transition(LoaderState::Instantiated1)?;
        Ok(Instantiated { module, instance })
    }
}

/// Validates chunks as they arrive and compiles once the stream ends
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingInstantiate;

#[async_trait]
impl CompileAndInstantiate for StreamingInstantiate {
    fn name(&self) -> &'static str {
        "streaming"
    }

    async fn compile(
        &self,
        runtime: &Runtime,
        source: &dyn ByteSource,
        tracker: &mut StateTracker,
    ) -> Result<CompiledModule> {
        let mut stream = source.open().await?;
        let mut validator = StreamingValidator::with_capacity(stream.size_hint().unwrap_or(0));
        while let Some(chunk) = stream.next_chunk().await? {
            if tracker.state() == LoaderState::Fetching {
                tracker.transition(LoaderState::Compiling)?;
            }
            validator.feed(&chunk)?;
        }
        if tracker.state() == LoaderState::Fetching {
            tracker.transition(LoaderState::Compiling)?;
        }
        tracing::debug!(
            source = %source.describe(),
            bytes = validator.buffered(),
            functions = validator.functions_validated(),
            "Stream validated"
        );
        let bytes = validator.finish()?;
        runtime.compile(&bytes)
    }
}

/// Buffers the whole resource, then compiles it
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedInstantiate;

#[async_trait]
impl CompileAndInstantiate for BufferedInstantiate {
    fn name(&self) -> &'static str {
        "buffered"
    }

    async fn compile(
        &self,
        runtime: &Runtime,
        source: &dyn ByteSource,
        tracker: &mut StateTracker,
    ) -> Result<CompiledModule> {
        let bytes = source.open().await?.read_to_end().await?;
        tracker.transition(LoaderState::Compiling)?;
        tracing::debug!(source = %source.describe(), bytes = bytes.len(), "Resource buffered");
        runtime.compile(&bytes)
    }
}

/// Which strategy a loader should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreference {
    /// Stream when the source allows it, otherwise buffer
    #[default]
    Auto,
    /// Always stream
    Streaming,
    /// Always buffer
    Buffered,
}

impl StrategyPreference {
    /// Configuration name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Streaming => "streaming",
            Self::Buffered => "buffered",
        }
    }
}

impl fmt::Display for StrategyPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "streaming" | "stream" => Ok(Self::Streaming),
            "buffered" | "buffer" => Ok(Self::Buffered),
            other => Err(Error::config_error(
                codes::INVALID_CONFIG,
                format!("unknown strategy `{other}`, expected auto, streaming or buffered"),
            )),
        }
    }
}

/// Pick the strategy for a source
///
/// # Errors
///
/// Returns a configuration error if streaming is forced on a source that
/// cannot stream
pub fn select_strategy(
    preference: StrategyPreference,
    source: &dyn ByteSource,
) -> Result<Box<dyn CompileAndInstantiate>> {
    let streams = source.supports_streaming();
    match preference {
        StrategyPreference::Auto if streams => Ok(Box::new(StreamingInstantiate)),
        StrategyPreference::Auto | StrategyPreference::Buffered => Ok(Box::new(BufferedInstantiate)),
        StrategyPreference::Streaming if streams => Ok(Box::new(StreamingInstantiate)),
        StrategyPreference::Streaming => Err(Error::config_error(
            codes::STRATEGY_UNAVAILABLE,
            format!("{} cannot be streamed", source.describe()),
        )),
    }
}
