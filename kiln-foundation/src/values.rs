// Kiln - kiln-foundation
// Module: WebAssembly Values
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly runtime values.
//!
//! [`Value`] is the embedder-facing representation. Inside the interpreter
//! values live in untyped 64-bit cells; [`Value::to_raw`] and
//! [`Value::from_raw`] convert between the two.

use core::fmt;

use kiln_math::{FloatBits32, FloatBits64};

use crate::types::{RefType, ValueType};

/// Address of a function in a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncAddr(pub u32);

/// Opaque host reference carried by `externref` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternAddr(pub u32);

/// A WebAssembly value
///
/// Floats are held as bit patterns so that NaN payloads survive a round trip
/// through the host and so that `Value` can be compared and hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// 32-bit integer
    I32(i32),
    /// 64-bit integer
    I64(i64),
    /// 32-bit float
    F32(FloatBits32),
    /// 64-bit float
    F64(FloatBits64),
    /// Function reference, `None` is `ref.null func`
    FuncRef(Option<FuncAddr>),
    /// Host reference, `None` is `ref.null extern`
    ExternRef(Option<ExternAddr>),
}

impl Value {
    /// The zero value of a type, used for locals and table slots.
    #[must_use]
    pub const fn default_for(ty: ValueType) -> Self {
        match ty {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(FloatBits32(0)),
            ValueType::F64 => Value::F64(FloatBits64(0)),
            ValueType::FuncRef => Value::FuncRef(None),
            ValueType::ExternRef => Value::ExternRef(None),
        }
    }

    /// The null reference of a reference type.
    #[must_use]
    pub const fn null(ty: RefType) -> Self {
        match ty {
            RefType::FuncRef => Value::FuncRef(None),
            RefType::ExternRef => Value::ExternRef(None),
        }
    }

    /// The type of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::FuncRef(_) => ValueType::FuncRef,
            Value::ExternRef(_) => ValueType::ExternRef,
        }
    }

    /// Whether this value has type `ty`.
    #[must_use]
    pub fn matches_type(&self, ty: ValueType) -> bool {
        self.value_type() == ty
    }

    /// Whether this is a null reference.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::FuncRef(None) | Value::ExternRef(None))
    }

    /// The value as an `i32`, if it is one.
    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as an `i64`, if it is one.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as an `f32`, if it is one.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(v.value()),
            _ => None,
        }
    }

    /// The value as an `f64`, if it is one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(v.value()),
            _ => None,
        }
    }

    /// The function reference, if this is a `funcref`.
    #[must_use]
    pub const fn as_funcref(&self) -> Option<Option<FuncAddr>> {
        match self {
            Value::FuncRef(r) => Some(*r),
            _ => None,
        }
    }

    /// The host reference, if this is an `externref`.
    #[must_use]
    pub const fn as_externref(&self) -> Option<Option<ExternAddr>> {
        match self {
            Value::ExternRef(r) => Some(*r),
            _ => None,
        }
    }

    /// Encode as an untyped 64-bit stack cell.
    ///
    /// References encode as `addr + 1`, with 0 standing for null.
    #[must_use]
    pub const fn to_raw(&self) -> u64 {
        match self {
            Value::I32(v) => *v as u32 as u64,
            Value::I64(v) => *v as u64,
            Value::F32(v) => v.0 as u64,
            Value::F64(v) => v.0,
            Value::FuncRef(r) => match r {
                Some(FuncAddr(a)) => *a as u64 + 1,
                None => 0,
            },
            Value::ExternRef(r) => match r {
                Some(ExternAddr(a)) => *a as u64 + 1,
                None => 0,
            },
        }
    }

    /// Decode an untyped 64-bit stack cell holding a value of type `ty`.
    #[must_use]
    pub const fn from_raw(ty: ValueType, raw: u64) -> Self {
        match ty {
            ValueType::I32 => Value::I32(raw as u32 as i32),
            ValueType::I64 => Value::I64(raw as i64),
            ValueType::F32 => Value::F32(FloatBits32(raw as u32)),
            ValueType::F64 => Value::F64(FloatBits64(raw)),
            ValueType::FuncRef => Value::FuncRef(if raw == 0 {
                None
            } else {
                Some(FuncAddr((raw - 1) as u32))
            }),
            ValueType::ExternRef => Value::ExternRef(if raw == 0 {
                None
            } else {
                Some(ExternAddr((raw - 1) as u32))
            }),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(FloatBits32::from_float(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(FloatBits64::from_float(v))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{}", v.value()),
            Value::F64(v) => write!(f, "{}", v.value()),
            Value::FuncRef(Some(FuncAddr(a))) => write!(f, "funcref({a})"),
            Value::ExternRef(Some(ExternAddr(a))) => write!(f, "externref({a})"),
            Value::FuncRef(None) => f.write_str("null funcref"),
            Value::ExternRef(None) => f.write_str("null externref"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_cells_preserve_bits() {
        let values = [
            Value::I32(-1),
            Value::I64(i64::MIN),
            Value::F32(FloatBits32::from_bits(0x7fa0_0001)),
            Value::F64(FloatBits64::from_float(-0.0)),
            Value::FuncRef(None),
            Value::FuncRef(Some(FuncAddr(0))),
            Value::ExternRef(Some(ExternAddr(41))),
        ];
        for value in values {
            assert_eq!(Value::from_raw(value.value_type(), value.to_raw()), value);
        }
        assert_eq!(Value::I32(-1).to_raw(), 0xffff_ffff);
    }

    #[test]
    fn test_defaults_and_nulls() {
        assert_eq!(Value::default_for(ValueType::F64), Value::from(0.0f64));
        assert!(Value::default_for(ValueType::FuncRef).is_null());
        assert_eq!(Value::null(RefType::ExternRef).value_type(), ValueType::ExternRef);
        assert!(!Value::I32(0).is_null());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::I32(5).as_i32(), Some(5));
        assert_eq!(Value::I32(5).as_i64(), None);
        assert_eq!(Value::from(1.5f32).as_f32(), Some(1.5));
        assert_eq!(Value::FuncRef(None).as_funcref(), Some(None));
        assert!(Value::I64(3).matches_type(ValueType::I64));
        assert_eq!(Value::from(2.5f64).to_string(), "2.5");
    }
}
