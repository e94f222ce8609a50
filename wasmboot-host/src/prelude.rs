// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Prelude module for wasmboot-host
//!
//! Re-exports the types most host-function authors need so a single
//! `use wasmboot_host::prelude::*;` is enough to write and register bindings.

pub use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

pub use wasmboot_error::{codes, kinds, Error, ErrorCategory, Result};

pub use crate::{
    bindings::HostBindings,
    builder::HostBuilder,
    callback::{CallbackRegistry, CallbackType},
    context::{DetachedGuest, GuestAccess, HostContext, HostState},
    definition::HostValue,
    function::{HostFunction, HostFunctionHandler},
    value::{FuncSignature, Value, ValueType},
};
