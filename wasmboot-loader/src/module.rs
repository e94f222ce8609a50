// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Compiled modules and their import and export listings.

use std::fmt;

use wasmboot_host::FuncSignature;
use wasmtime::{ExternType, Module};

/// Kind of an import or export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternKind {
    /// A function
    Func,
    /// A linear memory
    Memory,
    /// A table
    Table,
    /// A global
    Global,
}

impl ExternKind {
    fn of(ty: &ExternType) -> Self {
        match ty {
            ExternType::Func(_) => Self::Func,
            ExternType::Memory(_) => Self::Memory,
            ExternType::Table(_) => Self::Table,
            ExternType::Global(_) => Self::Global,
        }
    }

    /// Text format keyword
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Func => "func",
            Self::Memory => "memory",
            Self::Table => "table",
            Self::Global => "global",
        }
    }
}

fn signature_of(ty: &ExternType) -> Option<FuncSignature> {
    match ty {
        ExternType::Func(func) => FuncSignature::from_func_type(func),
        _ => None,
    }
}

/// One import of a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    /// Import module name
    pub module:    String,
    /// Import field name
    pub name:      String,
    /// What is imported
    pub kind:      ExternKind,
    /// Signature, for numeric function imports
    pub signature: Option<FuncSignature>,
}

impl fmt::Display for ImportInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.module, self.name, self.kind.as_str())?;
        if let Some(signature) = &self.signature {
            write!(f, " {signature}")?;
        }
        Ok(())
    }
}

/// One export of a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInfo {
    /// Export name
    pub name:      String,
    /// What is exported
    pub kind:      ExternKind,
    /// Signature, for numeric function exports
    pub signature: Option<FuncSignature>,
}

impl fmt::Display for ExportInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.kind.as_str())?;
        if let Some(signature) = &self.signature {
            write!(f, " {signature}")?;
        }
        Ok(())
    }
}

/// An immutable compiled module, instantiable any number of times
///
/// Cloning is cheap; clones share the compiled code.
#[derive(Clone)]
pub struct CompiledModule {
    module: Module,
    digest: [u8; 32],
    size:   usize,
}

impl fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModule")
            .field("digest", &self.digest_hex())
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl CompiledModule {
    pub(crate) fn new(module: Module, digest: [u8; 32], size: usize) -> Self {
        Self { module, digest, size }
    }

    /// The engine module
    #[must_use]
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// SHA-256 of the bytes the module was compiled from
    #[must_use]
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Hex rendering of [`CompiledModule::digest`]
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Size of the source bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Imports in declaration order
    #[must_use]
    pub fn imports(&self) -> Vec<ImportInfo> {
        self.module
            .imports()
            .map(|import| {
                let ty = import.ty();
                ImportInfo {
                    module:    import.module().to_string(),
                    name:      import.name().to_string(),
                    kind:      ExternKind::of(&ty),
                    signature: signature_of(&ty),
                }
            })
            .collect()
    }

    /// Exports in declaration order
    #[must_use]
    pub fn exports(&self) -> Vec<ExportInfo> {
        self.module
            .exports()
            .map(|export| {
                let ty = export.ty();
                ExportInfo {
                    name:      export.name().to_string(),
                    kind:      ExternKind::of(&ty),
                    signature: signature_of(&ty),
                }
            })
            .collect()
    }
}
