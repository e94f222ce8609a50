// wasmboot - wasmboot-error
// Module: Error Codes
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Error codes for wasmboot
//!
//! Each [`ErrorCategory`](crate::ErrorCategory) owns a range of one thousand
//! codes so that a bare code is enough to tell where a failure came from.

// Fetch error codes (1000-1999)
/// The module resource does not exist
pub const RESOURCE_NOT_FOUND: u16 = 1000;
/// The transport failed before a response was received
pub const FETCH_FAILED: u16 = 1001;
/// The server answered with a non-success status
pub const FETCH_STATUS: u16 = 1002;
/// The resource location could not be parsed or resolved
pub const INVALID_RESOURCE_LOCATION: u16 = 1003;
/// The body stream broke off while reading
pub const FETCH_INTERRUPTED: u16 = 1004;

// Parse and validation error codes (2000-2999)
/// The bytes do not start with the `\0asm` magic
pub const INVALID_MAGIC: u16 = 2000;
/// The binary version is not a supported core module version
pub const UNSUPPORTED_VERSION: u16 = 2001;
/// The input ended in the middle of the module
pub const TRUNCATED_MODULE: u16 = 2002;
/// The binary is structurally malformed
pub const MALFORMED_MODULE: u16 = 2003;
/// The module is well-formed but fails validation
pub const VALIDATION_FAILED: u16 = 2004;
/// The binary is a component rather than a core module
pub const UNSUPPORTED_ENCODING: u16 = 2005;

// Link error codes (3000-3999)
/// An import required by the module has no binding
pub const MISSING_IMPORT: u16 = 3000;
/// A binding exists but its signature differs from the import
pub const IMPORT_TYPE_MISMATCH: u16 = 3001;
/// The engine refused to instantiate the module
pub const INSTANTIATION_FAILED: u16 = 3002;
/// A binding was registered twice under the same name
pub const DUPLICATE_BINDING: u16 = 3003;
/// The import kind (memory, table, global) cannot be bound by the host
pub const UNSUPPORTED_IMPORT_KIND: u16 = 3004;

// Runtime error codes (4000-4999)
/// The designated entry point is not exported
pub const ENTRY_POINT_NOT_FOUND: u16 = 4000;
/// The entry point trapped
pub const ENTRY_POINT_TRAPPED: u16 = 4001;
/// A requested export does not exist or is not a function
pub const EXPORT_NOT_FOUND: u16 = 4002;
/// An exported function call failed
pub const CALL_FAILED: u16 = 4003;
/// A host function could not access guest memory
pub const GUEST_MEMORY_ACCESS: u16 = 4004;
/// The guest asked the host to stop executing
pub const EXIT_REQUESTED: u16 = 4005;
/// Arguments passed to a call do not match its signature
pub const ARGUMENT_MISMATCH: u16 = 4006;
/// The engine could not be created
pub const ENGINE_CREATION: u16 = 4007;
/// A host function was called that is not registered
pub const HOST_FUNCTION_NOT_FOUND: u16 = 4008;

// Configuration error codes (5000-5999)
/// A configuration value is invalid
pub const INVALID_CONFIG: u16 = 5000;
/// A configuration file could not be parsed
pub const CONFIG_PARSE: u16 = 5001;
/// The requested strategy is not available for the source
pub const STRATEGY_UNAVAILABLE: u16 = 5002;

// I/O error codes (6000-6999)
/// Generic I/O failure
pub const IO_ERROR: u16 = 6000;

// State error codes (7000-7999)
/// A loader state transition that the lifecycle does not allow
pub const INVALID_TRANSITION: u16 = 7000;
