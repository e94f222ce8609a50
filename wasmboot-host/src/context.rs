// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Per-instance host state and the context handed to host functions.
//!
//! Host functions never see the engine directly. They get a [`HostContext`]
//! that can reach the calling instance's exported `memory`, its
//! [`HostState`] and the shared [`CallbackRegistry`]. The same context type
//! wraps a live engine caller or a [`DetachedGuest`] with a plain byte buffer,
//! which is what direct registry calls and unit tests use.

use std::sync::Arc;

use wasmboot_error::{kinds, Result};
use wasmtime::{Caller, Extern, Memory};

use crate::callback::CallbackRegistry;

/// Name of the export host functions read and write guest memory through
pub const MEMORY_EXPORT: &str = "memory";

/// Data stored alongside every live instance
#[derive(Debug)]
pub struct HostState {
    label:     String,
    registry:  Arc<CallbackRegistry>,
    exit_code: Option<i32>,
}

impl HostState {
    /// Create host state for an instance
    pub fn new(label: impl Into<String>, registry: Arc<CallbackRegistry>) -> Self {
        Self { label: label.into(), registry, exit_code: None }
    }

    /// Label identifying the instance in logs
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The callback registry of the binding set
    #[must_use]
    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    /// Exit code requested by the guest, if any
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Record an exit request. The first request wins.
    pub fn request_exit(&mut self, code: i32) {
        if self.exit_code.is_none() {
            self.exit_code = Some(code);
        }
    }
}

/// Access to the calling guest from inside a host function
pub trait GuestAccess {
    /// Read `buf.len()` bytes of guest memory starting at `offset`
    fn read_memory(&mut self, offset: usize, buf: &mut [u8]) -> Result<()>;

    /// Write `data` into guest memory starting at `offset`
    fn write_memory(&mut self, offset: usize, data: &[u8]) -> Result<()>;

    /// Current size of guest memory in bytes
    fn memory_size(&mut self) -> Result<usize>;

    /// Host state of the calling instance
    fn state(&self) -> &HostState;

    /// Mutable host state of the calling instance
    fn state_mut(&mut self) -> &mut HostState;
}

fn exported_memory(caller: &mut Caller<'_, HostState>) -> Result<Memory> {
    caller.get_export(MEMORY_EXPORT).and_then(Extern::into_memory).ok_or_else(|| {
        kinds::guest_memory_error(format!("instance does not export `{MEMORY_EXPORT}`"))
    })
}

impl GuestAccess for Caller<'_, HostState> {
    fn read_memory(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let memory = exported_memory(self)?;
        memory.read(&*self, offset, buf).map_err(|e| {
            kinds::guest_memory_error(format!("read of {} bytes at {offset}: {e}", buf.len()))
        })
    }

    fn write_memory(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let memory = exported_memory(self)?;
        memory.write(&mut *self, offset, data).map_err(|e| {
            kinds::guest_memory_error(format!("write of {} bytes at {offset}: {e}", data.len()))
        })
    }

    fn memory_size(&mut self) -> Result<usize> {
        let memory = exported_memory(self)?;
        Ok(memory.data_size(&*self))
    }

    fn state(&self) -> &HostState {
        self.data()
    }

    fn state_mut(&mut self) -> &mut HostState {
        self.data_mut()
    }
}

/// A guest stand-in backed by a plain byte buffer
#[derive(Debug)]
pub struct DetachedGuest {
    state:  HostState,
    memory: Vec<u8>,
}

impl DetachedGuest {
    /// Create a detached guest with an empty registry and no memory
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_registry(label, Arc::new(CallbackRegistry::new()))
    }

    /// Create a detached guest sharing an existing registry
    pub fn with_registry(label: impl Into<String>, registry: Arc<CallbackRegistry>) -> Self {
        Self { state: HostState::new(label, registry), memory: Vec::new() }
    }

    /// Replace the guest memory contents
    #[must_use]
    pub fn with_memory(mut self, memory: Vec<u8>) -> Self {
        self.memory = memory;
        self
    }

    /// Current guest memory contents
    #[must_use]
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn range(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        offset
            .checked_add(len)
            .filter(|end| *end <= self.memory.len())
            .map(|end| offset..end)
            .ok_or_else(|| {
                kinds::guest_memory_error(format!(
                    "access of {len} bytes at {offset} exceeds {} bytes of memory",
                    self.memory.len()
                ))
            })
    }
}

impl GuestAccess for DetachedGuest {
    fn read_memory(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.memory[range]);
        Ok(())
    }

    fn write_memory(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let range = self.range(offset, data.len())?;
        self.memory[range].copy_from_slice(data);
        Ok(())
    }

    fn memory_size(&mut self) -> Result<usize> {
        Ok(self.memory.len())
    }

    fn state(&self) -> &HostState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut HostState {
        &mut self.state
    }
}

/// The view a host function gets of its caller
pub struct HostContext<'a> {
    guest: &'a mut dyn GuestAccess,
}

impl<'a> HostContext<'a> {
    /// Wrap a guest
    pub fn new(guest: &'a mut dyn GuestAccess) -> Self {
        Self { guest }
    }

    /// Label of the calling instance
    #[must_use]
    pub fn label(&self) -> &str {
        self.guest.state().label()
    }

    /// The binding set's callback registry
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        self.guest.state().registry()
    }

    /// Read `len` bytes of guest memory at `ptr`
    ///
    /// The range is checked against the current memory size before anything
    /// is allocated.
    pub fn read_bytes(&mut self, ptr: u32, len: u32) -> Result<Vec<u8>> {
        let (offset, len) = (ptr as usize, len as usize);
        let size = self.guest.memory_size()?;
        if offset.checked_add(len).is_none_or(|end| end > size) {
            return Err(kinds::guest_memory_error(format!(
                "read of {len} bytes at {offset} exceeds {size} bytes of memory"
            )));
        }
        let mut buf = vec![0; len];
        self.guest.read_memory(offset, &mut buf)?;
        Ok(buf)
    }

    /// Read a UTF-8 string of `len` bytes at `ptr`
    pub fn read_string(&mut self, ptr: u32, len: u32) -> Result<String> {
        let bytes = self.read_bytes(ptr, len)?;
        String::from_utf8(bytes)
            .map_err(|e| kinds::guest_memory_error(format!("string at {ptr} is not UTF-8: {e}")))
    }

    /// Write bytes into guest memory at `ptr`
    pub fn write_bytes(&mut self, ptr: u32, data: &[u8]) -> Result<()> {
        self.guest.write_memory(ptr as usize, data)
    }

    /// Record that the guest asked to exit with `code`
    pub fn request_exit(&mut self, code: i32) {
        self.guest.state_mut().request_exit(code);
    }

    /// Exit code requested so far
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.guest.state().exit_code()
    }
}
