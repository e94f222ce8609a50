// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Bootstrap loader for WebAssembly modules.
//!
//! The loader fetches a binary module, compiles it and links it against a
//! bridge's host bindings, runs the entry point on a first instance, and then
//! creates a second instance from the same compiled module so its exports stay
//! callable. The result is an owned [`Session`].
//!
//! ```rust,no_run
//! # async fn example() -> wasmboot_error::Result<()> {
//! use wasmboot_loader::{BindingsConfig, EntryPointBridge, Loader, LoaderConfig};
//!
//! let config = LoaderConfig::default();
//! let bridge = EntryPointBridge::from_config(&BindingsConfig::default())?;
//! let loader = Loader::new(config, bridge)?;
//!
//! let mut session = loader.load_resource("main.wasm").await?;
//! println!("program {}", session.outcome());
//! let values = session.call("version", &[]).await?;
//! # let _ = values;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod instance;
pub mod loader;
pub mod module;
pub mod runtime;
pub mod session;
pub mod source;
pub mod state;
pub mod strategy;
pub mod streaming;

pub use bridge::{default_bindings, EntryPointBridge, RunOutcome, RuntimeBridge};
pub use config::{BindingsConfig, DaemonConfig, LogFormat, LoaderConfig, LoggingConfig};
pub use instance::LiveInstance;
pub use loader::Loader;
pub use module::{CompiledModule, ExportInfo, ExternKind, ImportInfo};
pub use runtime::Runtime;
pub use session::{LoadTimings, Session};
pub use source::{
    open_source, ByteSource, FileSource, HttpSource, MemorySource, ResourceLocation,
    ResourceStream,
};
pub use state::{LoaderState, StateTracker};
pub use strategy::{
    select_strategy, BufferedInstantiate, CompileAndInstantiate, Instantiated, StrategyPreference,
    StreamingInstantiate,
};
