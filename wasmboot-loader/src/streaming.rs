// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Header checks and incremental validation of module bytes as they arrive.

use wasmboot_error::{codes, Error, ErrorCategory, Result};
use wasmparser::{
    BinaryReaderError, Chunk, FuncValidatorAllocations, Parser, ValidPayload, Validator,
};

/// The four magic bytes every binary module starts with
pub const WASM_MAGIC: [u8; 4] = *b"\0asm";

/// The only supported core module version
pub const MODULE_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Length of magic plus version
pub const HEADER_LEN: usize = 8;

/// Layer field marking the component encoding
const COMPONENT_LAYER: [u8; 2] = [0x01, 0x00];

/// Check as much of the header as `prefix` covers
///
/// A prefix shorter than the header passes if it agrees with the magic so
/// far. This lets a stream be rejected on its first bytes.
pub fn check_header(prefix: &[u8]) -> Result<()> {
    let magic_len = prefix.len().min(WASM_MAGIC.len());
    if prefix[..magic_len] != WASM_MAGIC[..magic_len] {
        return Err(Error::INVALID_MAGIC);
    }
    if prefix.len() < HEADER_LEN {
        return Ok(());
    }
    let version = &prefix[4..HEADER_LEN];
    if version == MODULE_VERSION {
        Ok(())
    } else if version[2..] == COMPONENT_LAYER {
        Err(Error::with_message(
            ErrorCategory::Parse,
            codes::UNSUPPORTED_ENCODING,
            "component binaries are not supported, expected a core module",
        ))
    } else {
        Err(Error::with_message(
            ErrorCategory::Parse,
            codes::UNSUPPORTED_VERSION,
            format!("unsupported module version {version:02x?}"),
        ))
    }
}

/// Check the header of a complete byte buffer
pub fn require_header(bytes: &[u8]) -> Result<()> {
    check_header(bytes)?;
    if bytes.len() < HEADER_LEN {
        return Err(Error::TRUNCATED_MODULE.context(format!("{} bytes", bytes.len())));
    }
    Ok(())
}

fn validation_error(e: &BinaryReaderError) -> Error {
    Error::validation_error(format!("{} (at offset {:#x})", e.message(), e.offset()))
}

/// Validates a module incrementally while its bytes are still arriving
///
/// Bytes are accumulated in an internal buffer which is handed back by
/// [`StreamingValidator::finish`] for compilation.
pub struct StreamingValidator {
    buffer:    Vec<u8>,
    consumed:  usize,
    parser:    Parser,
    validator: Validator,
    functions: usize,
    finished:  bool,
}

impl Default for StreamingValidator {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl StreamingValidator {
    /// Create a validator expecting roughly `capacity` bytes
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer:    Vec::with_capacity(capacity),
            consumed:  0,
            parser:    Parser::new(0),
            validator: Validator::new(),
            functions: 0,
            finished:  false,
        }
    }

    /// Append a chunk and validate everything that is now complete
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(chunk);
        check_header(&self.buffer)?;
        self.advance(false)
    }

    /// Validate the remainder at end of input and return all bytes
    pub fn finish(mut self) -> Result<Vec<u8>> {
        require_header(&self.buffer)?;
        self.advance(true)?;
        if !self.finished {
            return Err(Error::TRUNCATED_MODULE);
        }
        Ok(self.buffer)
    }

    /// Bytes received so far
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Function bodies validated so far
    #[must_use]
    pub fn functions_validated(&self) -> usize {
        self.functions
    }

    fn advance(&mut self, eof: bool) -> Result<()> {
        while !self.finished {
            let data = &self.buffer[self.consumed..];
            let (consumed, payload) =
                match self.parser.parse(data, eof).map_err(|e| validation_error(&e))? {
                    Chunk::NeedMoreData(_) => return Ok(()),
                    Chunk::Parsed { consumed, payload } => (consumed, payload),
                };
            match self.validator.payload(&payload).map_err(|e| validation_error(&e))? {
                ValidPayload::Ok => {}
                ValidPayload::Parser(parser) => self.parser = parser,
                ValidPayload::Func(func, body) => {
                    let mut validator = func.into_validator(FuncValidatorAllocations::default());
                    validator.validate(&body).map_err(|e| validation_error(&e))?;
                    self.functions += 1;
                }
                ValidPayload::End(_) => self.finished = true,
            }
            self.consumed += consumed;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_bytes() -> Vec<u8> {
        wat::parse_str(
            r#"(module
                (func $double (param i32) (result i32)
                    local.get 0
                    i32.const 2
                    i32.mul)
                (func (export "_start")
                    i32.const 21
                    call $double
                    drop))"#,
        )
        .unwrap()
    }

    #[test]
    fn test_header_prefixes() {
        assert!(check_header(b"").is_ok());
        assert!(check_header(b"\0as").is_ok());
        assert_eq!(check_header(b"\0x").unwrap_err().code, codes::INVALID_MAGIC);
        assert_eq!(
            check_header(b"\0asm\x02\0\0\0").unwrap_err().code,
            codes::UNSUPPORTED_VERSION
        );
        assert_eq!(
            check_header(b"\0asm\x0d\0\x01\0").unwrap_err().code,
            codes::UNSUPPORTED_ENCODING
        );
        assert_eq!(require_header(b"\0asm\x01").unwrap_err().code, codes::TRUNCATED_MODULE);
    }

    #[test]
    fn test_byte_at_a_time_validation() {
        let bytes = module_bytes();
        let mut validator = StreamingValidator::default();
        for byte in &bytes {
            validator.feed(std::slice::from_ref(byte)).unwrap();
        }
        assert_eq!(validator.functions_validated(), 2);
        assert_eq!(validator.finish().unwrap(), bytes);
    }

    #[test]
    fn test_truncated_stream_fails_at_finish() {
        let bytes = module_bytes();
        let mut validator = StreamingValidator::default();
        validator.feed(&bytes[..bytes.len() - 3]).unwrap();
        assert!(validator.finish().unwrap_err().is_module_error());
    }

    #[test]
    fn test_invalid_body_fails_while_streaming() {
        // i32.add with an empty stack
        let bytes = wat::parse_str("(module (func i32.add drop))").unwrap();
        let mut validator = StreamingValidator::default();
        let err = validator.feed(&bytes).unwrap_err();
        assert_eq!(err.category, ErrorCategory::Validation);
    }

    #[test]
    fn test_bad_magic_fails_on_first_chunk() {
        let mut validator = StreamingValidator::default();
        let err = validator.feed(b"\x7fELF").unwrap_err();
        assert_eq!(err.code, codes::INVALID_MAGIC);
    }
}
