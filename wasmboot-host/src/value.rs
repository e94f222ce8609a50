// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Value and signature types exchanged across the host boundary.
//!
//! Only the four numeric core types cross the boundary; reference and vector
//! types have no host-side representation here.

use std::fmt;

use wasmboot_error::{codes, Error, Result};
use wasmtime::{Engine, FuncType, Val, ValType};

/// Numeric value types a host function can accept or return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
}

impl ValueType {
    /// Map an engine value type, if it has a host representation
    #[must_use]
    pub fn from_val_type(ty: &ValType) -> Option<Self> {
        match ty {
            ValType::I32 => Some(Self::I32),
            ValType::I64 => Some(Self::I64),
            ValType::F32 => Some(Self::F32),
            ValType::F64 => Some(Self::F64),
            _ => None,
        }
    }

    /// Convert to the engine value type
    #[must_use]
    pub fn to_val_type(self) -> ValType {
        match self {
            Self::I32 => ValType::I32,
            Self::I64 => ValType::I64,
            Self::F32 => ValType::F32,
            Self::F64 => ValType::F64,
        }
    }

    /// Text format name of the type
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric value passed to or returned from guest code
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 32-bit integer
    I32(i32),
    /// 64-bit integer
    I64(i64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
}

impl Value {
    /// The type of this value
    #[must_use]
    pub const fn ty(&self) -> ValueType {
        match self {
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
        }
    }

    /// Zero value for a type, used to size result buffers
    #[must_use]
    pub const fn zero(ty: ValueType) -> Self {
        match ty {
            ValueType::I32 => Self::I32(0),
            ValueType::I64 => Self::I64(0),
            ValueType::F32 => Self::F32(0.0),
            ValueType::F64 => Self::F64(0.0),
        }
    }

    /// The value as an `i32`, if it is one
    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as an `i64`, if it is one
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert from an engine value
    #[must_use]
    pub fn from_val(val: &Val) -> Option<Self> {
        match val {
            Val::I32(v) => Some(Self::I32(*v)),
            Val::I64(v) => Some(Self::I64(*v)),
            Val::F32(bits) => Some(Self::F32(f32::from_bits(*bits))),
            Val::F64(bits) => Some(Self::F64(f64::from_bits(*bits))),
            _ => None,
        }
    }

    /// Convert to an engine value
    #[must_use]
    pub fn to_val(self) -> Val {
        match self {
            Self::I32(v) => Val::I32(v),
            Self::I64(v) => Val::I64(v),
            Self::F32(v) => Val::F32(v.to_bits()),
            Self::F64(v) => Val::F64(v.to_bits()),
        }
    }

    /// Parse a value of the given type from its text form
    pub fn parse(ty: ValueType, text: &str) -> Result<Self> {
        let text = text.trim();
        let parsed = match ty {
            ValueType::I32 => text.parse().map(Self::I32).ok(),
            ValueType::I64 => text.parse().map(Self::I64).ok(),
            ValueType::F32 => text.parse().map(Self::F32).ok(),
            ValueType::F64 => text.parse().map(Self::F64).ok(),
        };
        parsed.ok_or_else(|| {
            Error::runtime_error(codes::ARGUMENT_MISMATCH, format!("`{text}` is not a valid {ty}"))
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{v}:i32"),
            Self::I64(v) => write!(f, "{v}:i64"),
            Self::F32(v) => write!(f, "{v}:f32"),
            Self::F64(v) => write!(f, "{v}:f64"),
        }
    }
}

/// Parameter and result types of a function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncSignature {
    /// Parameter types
    pub params:  Vec<ValueType>,
    /// Result types
    pub results: Vec<ValueType>,
}

impl FuncSignature {
    /// Create a new signature
    pub fn new(params: impl Into<Vec<ValueType>>, results: impl Into<Vec<ValueType>>) -> Self {
        Self { params: params.into(), results: results.into() }
    }

    /// Map an engine function type; `None` if any type lacks a host
    /// representation
    #[must_use]
    pub fn from_func_type(ty: &FuncType) -> Option<Self> {
        let params =
            ty.params().map(|p| ValueType::from_val_type(&p)).collect::<Option<Vec<_>>>()?;
        let results =
            ty.results().map(|r| ValueType::from_val_type(&r)).collect::<Option<Vec<_>>>()?;
        Some(Self { params, results })
    }

    /// Build the engine function type for this signature
    #[must_use]
    pub fn to_func_type(&self, engine: &Engine) -> FuncType {
        FuncType::new(
            engine,
            self.params.iter().map(|p| p.to_val_type()),
            self.results.iter().map(|r| r.to_val_type()),
        )
    }

    /// Check that arguments match the parameter list
    pub fn check_args(&self, args: &[Value]) -> Result<()> {
        let matches = args.len() == self.params.len()
            && args.iter().zip(&self.params).all(|(arg, ty)| arg.ty() == *ty);
        if matches {
            Ok(())
        } else {
            let found = args.iter().map(|a| a.ty().as_str()).collect::<Vec<_>>().join(", ");
            Err(Error::runtime_error(
                codes::ARGUMENT_MISMATCH,
                format!("expected arguments {self} but got ({found})"),
            ))
        }
    }
}

impl fmt::Display for FuncSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |types: &[ValueType]| {
            types.iter().map(ValueType::as_str).collect::<Vec<_>>().join(", ")
        };
        write!(f, "({}) -> ({})", join(&self.params), join(&self.results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_round_trips_through_engine_values() {
        let value = Value::F32(1.5);
        assert_eq!(Value::from_val(&value.to_val()), Some(value));
        assert_eq!(Value::I64(-7).ty(), ValueType::I64);
    }

    #[test]
    fn test_signature_display() {
        let sig = FuncSignature::new([ValueType::I32, ValueType::I32], [ValueType::I64]);
        assert_eq!(sig.to_string(), "(i32, i32) -> (i64)");
        assert_eq!(FuncSignature::default().to_string(), "() -> ()");
    }

    #[test]
    fn test_check_args() {
        let sig = FuncSignature::new([ValueType::I32], []);
        assert!(sig.check_args(&[Value::I32(1)]).is_ok());

        let err = sig.check_args(&[Value::I64(1)]).unwrap_err();
        assert_eq!(err.code, codes::ARGUMENT_MISMATCH);
        assert!(sig.check_args(&[]).is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(Value::parse(ValueType::I32, " 42 ").unwrap(), Value::I32(42));
        assert!(Value::parse(ValueType::I64, "forty").is_err());
    }
}
