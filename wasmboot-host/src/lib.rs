// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

//! Host binding sets for the wasmboot module loader.
//!
//! This crate provides the infrastructure for registering the host functions
//! and values a loaded WebAssembly module imports, checking a module's imports
//! against them, and defining them on an engine linker.
//!
//! ## Features
//!
//! - Host function registration and callback management
//! - Memory and global definitions, created fresh for every instance
//! - Import checking with precise missing and mismatched import errors
//! - Fresh per-instance host state, so re-instantiation starts clean
//! - A built-in `exit(code)` binding that stops guest execution
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use wasmboot_host::prelude::*;
//! let bindings = HostBuilder::new()
//!     .with_function("env", "answer", FuncSignature::new([], [ValueType::I32]), |_, _| {
//!         Ok(vec![Value::I32(42)])
//!     })
//!     .with_exit_function("env", "exit")
//!     .with_bridge_name("my_bridge")
//!     .build()
//!     .expect("Failed to build host bindings");
//! ```

#![warn(missing_docs)]

pub mod bindings;
pub mod builder;
pub mod callback;
pub mod context;
pub mod definition;
pub mod function;
pub mod prelude;
pub mod value;

pub use bindings::HostBindings;
pub use builder::HostBuilder;
pub use callback::{function_key, CallbackRegistry, CallbackType, ExitHandler, LifecycleHook};
pub use context::{DetachedGuest, GuestAccess, HostContext, HostState, MEMORY_EXPORT};
pub use definition::{describe_import, HostValue};
pub use function::{CloneableFn, HostFunction, HostFunctionHandler};
pub use value::{FuncSignature, Value, ValueType};
