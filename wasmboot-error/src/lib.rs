// wasmboot - wasmboot-error
// Module: Error Handling
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! wasmboot error handling library
//!
//! One error type for the whole loader. Every failure the loader can hit is
//! classified into a category with its own range of codes:
//!
//! ## Fetch Errors (1000-1999)
//! - Resource not found, transport failures, bad HTTP status
//!
//! ## Parse and Validation Errors (2000-2999)
//! - Bad magic, truncated input, malformed or invalid modules
//!
//! ## Link Errors (3000-3999)
//! - Missing imports, signature mismatches, instantiation failures
//!
//! ## Runtime Errors (4000-4999)
//! - Missing entry point, traps, failed export calls
//!
//! ## Configuration, I/O and State Errors (5000-7999)
//!
//! # Usage
//!
//! ```
//! use wasmboot_error::{codes, kinds, Error, ErrorCategory};
//!
//! let error = Error::new(ErrorCategory::Fetch, codes::FETCH_FAILED, "connection refused");
//! assert!(error.is_fetch_error());
//!
//! let link = kinds::missing_import("env", "log");
//! assert_eq!(link.code, codes::MISSING_IMPORT);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Error codes for wasmboot
pub mod codes;
/// Error and error handling types
pub mod errors;
/// Error kind definitions
pub mod kinds;

pub use errors::{Error, ErrorCategory};

/// A specialized `Result` type for loader operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error conversion trait for converting to specific error categories
pub trait ToErrorCategory {
    /// Convert the error to a specific category
    fn to_category(&self) -> ErrorCategory;
}

impl ToErrorCategory for Error {
    fn to_category(&self) -> ErrorCategory {
        self.category
    }
}
