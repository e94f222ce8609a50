// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Host-provided values: memories and globals a module may import.
//!
//! Unlike host functions these live in a store, so every instance gets its
//! own copy created from the same definition.

use std::fmt;

use wasmboot_error::{codes, Error, Result};
use wasmtime::{
    AsContextMut, Extern, ExternType, Global, GlobalType, Memory, MemoryType, Mutability,
};

use crate::value::{FuncSignature, Value, ValueType};

/// A memory or global definition in a binding set
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostValue {
    /// A linear memory, sized in 64 KiB pages
    Memory {
        /// Initial size
        minimum: u32,
        /// Size limit, if any
        maximum: Option<u32>,
    },
    /// A global initialized to `value`
    Global {
        /// Initial value, which also fixes the type
        value:   Value,
        /// Whether the guest may write it
        mutable: bool,
    },
}

impl HostValue {
    /// A memory of `minimum` pages growing up to `maximum`
    #[must_use]
    pub const fn memory(minimum: u32, maximum: Option<u32>) -> Self {
        Self::Memory { minimum, maximum }
    }

    /// An immutable global
    #[must_use]
    pub const fn global(value: Value) -> Self {
        Self::Global { value, mutable: false }
    }

    /// A mutable global
    #[must_use]
    pub const fn mutable_global(value: Value) -> Self {
        Self::Global { value, mutable: true }
    }

    /// Whether an import of type `ty` can be bound to this value
    ///
    /// A memory satisfies an import whose limits it fits within. A global
    /// must match in value type and mutability.
    #[must_use]
    pub fn satisfies(&self, ty: &ExternType) -> bool {
        match (self, ty) {
            (Self::Memory { minimum, maximum }, ExternType::Memory(memory)) => {
                let max_fits = match memory.maximum() {
                    None => true,
                    Some(limit) => maximum.is_some_and(|max| u64::from(max) <= limit),
                };
                !memory.is_64()
                    && !memory.is_shared()
                    && u64::from(*minimum) >= memory.minimum()
                    && max_fits
            }
            (Self::Global { value, mutable }, ExternType::Global(global)) => {
                ValueType::from_val_type(global.content()) == Some(value.ty())
                    && (global.mutability() == Mutability::Var) == *mutable
            }
            _ => false,
        }
    }

    /// Create a fresh instance of this value in `store`
    pub fn create(&self, mut store: impl AsContextMut) -> Result<Extern> {
        let created = match self {
            Self::Memory { minimum, maximum } => {
                Memory::new(&mut store, MemoryType::new(*minimum, *maximum)).map(Extern::from)
            }
            Self::Global { value, mutable } => {
                let mutability = if *mutable { Mutability::Var } else { Mutability::Const };
                let ty = GlobalType::new(value.ty().to_val_type(), mutability);
                Global::new(&mut store, ty, value.to_val()).map(Extern::from)
            }
        };
        created.map_err(|e| {
            Error::link_error(codes::INSTANTIATION_FAILED, format!("cannot create {self}: {e}"))
        })
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory { minimum, maximum: Some(max) } => write!(f, "memory {minimum}..{max}"),
            Self::Memory { minimum, maximum: None } => write!(f, "memory {minimum}.."),
            Self::Global { value, mutable: true } => write!(f, "global mut {}", value.ty()),
            Self::Global { value, mutable: false } => write!(f, "global {}", value.ty()),
        }
    }
}

/// Render an import type the way [`HostValue`] and signatures are rendered
#[must_use]
pub fn describe_import(ty: &ExternType) -> String {
    match ty {
        ExternType::Func(func) => FuncSignature::from_func_type(func)
            .map_or_else(|| format!("{func:?}"), |sig| sig.to_string()),
        ExternType::Memory(memory) => match memory.maximum() {
            Some(max) => format!("memory {}..{max}", memory.minimum()),
            None => format!("memory {}..", memory.minimum()),
        },
        ExternType::Global(global) => {
            let content = ValueType::from_val_type(global.content())
                .map_or_else(|| format!("{:?}", global.content()), |ty| ty.to_string());
            match global.mutability() {
                Mutability::Var => format!("global mut {content}"),
                Mutability::Const => format!("global {content}"),
            }
        }
        ExternType::Table(_) => "table".to_string(),
    }
}
