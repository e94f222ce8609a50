// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Host function implementation for the module loader.
//!
//! This module provides types for representing host functions that imports
//! of a loaded module resolve against.

use std::fmt;
use std::sync::Arc;

use wasmboot_error::Result;

use crate::{
    context::HostContext,
    value::{FuncSignature, Value},
};

type HostFn = dyn Fn(&mut HostContext<'_>, &[Value]) -> Result<Vec<Value>> + Send + Sync;

/// A cheaply cloneable wrapper around a host closure.
///
/// The same handler is shared by every instance linked against a binding
/// set, so it is reference counted rather than boxed per registration.
#[derive(Clone)]
pub struct CloneableFn(Arc<HostFn>);

impl CloneableFn {
    /// Creates a new `CloneableFn` from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut HostContext<'_>, &[Value]) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Calls the wrapped function.
    pub fn call(&self, ctx: &mut HostContext<'_>, args: &[Value]) -> Result<Vec<Value>> {
        (self.0)(ctx, args)
    }
}

impl fmt::Debug for CloneableFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CloneableFn(..)")
    }
}

/// Host function handler type for implementing WebAssembly imports
pub type HostFunctionHandler = CloneableFn;

/// A registered host function: its declared signature and its handler
#[derive(Debug, Clone)]
pub struct HostFunction {
    /// Signature the import must declare
    pub signature: FuncSignature,
    /// Code run when the guest calls the import
    pub handler:   HostFunctionHandler,
}

impl HostFunction {
    /// Create a host function
    pub fn new(signature: FuncSignature, handler: HostFunctionHandler) -> Self {
        Self { signature, handler }
    }
}
