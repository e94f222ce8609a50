// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The bridge between a loaded module and the managed runtime inside it.
//!
//! A bridge supplies the host bindings a module is linked against and knows
//! how to drive the module's entry point until the program signals
//! completion.

use std::fmt;

use async_trait::async_trait;
use wasmboot_error::{codes, Error, Result};
use wasmboot_host::{HostBindings, HostBuilder};
use wasmboot_logging::GuestLoggingExt;

use crate::{config::BindingsConfig, instance::LiveInstance};

/// Import field name of the built-in exit function
pub const EXIT_FUNCTION: &str = "exit";

/// How a run of the entry point ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The entry point returned normally
    Returned,
    /// The program called the exit binding with this code
    Exited(i32),
}

impl RunOutcome {
    /// Process-style exit code, 0 for a normal return
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Returned => 0,
            Self::Exited(code) => *code,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Returned => f.write_str("returned"),
            Self::Exited(code) => write!(f, "exited with code {code}"),
        }
    }
}

/// Supplies bindings and runs a module's entry point
#[async_trait]
pub trait RuntimeBridge: Send + Sync {
    /// Bridge name used in logs
    fn name(&self) -> &str;

    /// Bindings every instance is linked against
    fn bindings(&self) -> &HostBindings;

    /// Run the program on `instance` until it signals completion
    async fn run(&self, instance: &mut LiveInstance) -> Result<RunOutcome>;
}

/// Build the built-in bindings described by `config`
pub fn default_bindings(config: &BindingsConfig) -> Result<HostBindings> {
    let mut builder = HostBuilder::new();
    if config.guest_logging {
        builder = builder.with_guest_logging(&config.module);
    }
    if config.exit {
        builder = builder.with_exit_function(&config.module, EXIT_FUNCTION);
    }
    builder.build()
}

/// Runs a zero-argument entry point export
#[derive(Debug, Clone)]
pub struct EntryPointBridge {
    bindings:    HostBindings,
    entry_point: String,
}

impl EntryPointBridge {
    /// Create a bridge running `entry_point` with the given bindings
    pub fn new(bindings: HostBindings, entry_point: impl Into<String>) -> Self {
        Self { bindings, entry_point: entry_point.into() }
    }

    /// Create a bridge with the built-in bindings and entry point from
    /// `config`
    pub fn from_config(config: &BindingsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(default_bindings(config)?, config.entry_point.clone()))
    }

    /// The export run on the first instance
    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

#[async_trait]
impl RuntimeBridge for EntryPointBridge {
    fn name(&self) -> &str {
        self.bindings.bridge_name()
    }

    fn bindings(&self) -> &HostBindings {
        &self.bindings
    }

    async fn run(&self, instance: &mut LiveInstance) -> Result<RunOutcome> {
        let entry = self.entry_point.as_str();
        if !instance.has_export(entry) {
            return Err(Error::runtime_error(
                codes::ENTRY_POINT_NOT_FOUND,
                format!("entry point `{entry}` is not exported"),
            ));
        }

        match instance.call(entry, &[]).await {
            Ok(_) => Ok(RunOutcome::Returned),
            Err(err) => match instance.exit_code() {
                Some(code) => Ok(RunOutcome::Exited(code)),
                // Errors raised by a host function keep their own code
                None if err.code != codes::CALL_FAILED => {
                    Err(err.context(format!("entry point `{entry}`")))
                }
                None => Err(Error::runtime_error(
                    codes::ENTRY_POINT_TRAPPED,
                    format!("entry point `{entry}` failed: {}", err.message),
                )),
            },
        }
    }
}
