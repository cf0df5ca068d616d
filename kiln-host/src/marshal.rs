// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Conversion between native Rust types and WebAssembly values.
//!
//! [`WasmTy`] maps a single Rust type onto a value type. [`WasmTyList`]
//! covers parameter and result lists: `()`, a single [`WasmTy`], or tuples
//! of up to six of them. [`HostReturn`] additionally accepts
//! `Result<_, Error>` so that typed host functions can fail.

use kiln_error::{codes, Error, ErrorCategory, Result};
use kiln_foundation::{ExternAddr, FloatBits32, FloatBits64, FuncAddr, Value, ValueType};

/// A Rust type with a WebAssembly value representation
pub trait WasmTy: Sized + Send + 'static {
    /// The WebAssembly type this Rust type maps to.
    const VALUE_TYPE: ValueType;

    /// Convert into a [`Value`].
    fn into_value(self) -> Value;

    /// Convert from a [`Value`], `None` if it has a different type.
    fn from_value(value: Value) -> Option<Self>;
}

impl WasmTy for i32 {
    const VALUE_TYPE: ValueType = ValueType::I32;

    fn into_value(self) -> Value {
        Value::I32(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_i32()
    }
}

impl WasmTy for u32 {
    const VALUE_TYPE: ValueType = ValueType::I32;

    fn into_value(self) -> Value {
        Value::I32(self as i32)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_i32().map(|v| v as u32)
    }
}

impl WasmTy for i64 {
    const VALUE_TYPE: ValueType = ValueType::I64;

    fn into_value(self) -> Value {
        Value::I64(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_i64()
    }
}

impl WasmTy for u64 {
    const VALUE_TYPE: ValueType = ValueType::I64;

    fn into_value(self) -> Value {
        Value::I64(self as i64)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_i64().map(|v| v as u64)
    }
}

impl WasmTy for f32 {
    const VALUE_TYPE: ValueType = ValueType::F32;

    fn into_value(self) -> Value {
        Value::F32(FloatBits32::from_float(self))
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_f32()
    }
}

impl WasmTy for f64 {
    const VALUE_TYPE: ValueType = ValueType::F64;

    fn into_value(self) -> Value {
        Value::F64(FloatBits64::from_float(self))
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_f64()
    }
}

impl WasmTy for Option<FuncAddr> {
    const VALUE_TYPE: ValueType = ValueType::FuncRef;

    fn into_value(self) -> Value {
        Value::FuncRef(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_funcref()
    }
}

impl WasmTy for Option<ExternAddr> {
    const VALUE_TYPE: ValueType = ValueType::ExternRef;

    fn into_value(self) -> Value {
        Value::ExternRef(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_externref()
    }
}

/// A list of [`WasmTy`] values, used for parameters and results
pub trait WasmTyList: Sized + Send + 'static {
    /// Types of the list's elements, in order.
    fn value_types() -> Vec<ValueType>;

    /// Convert into values.
    fn into_values(self) -> Vec<Value>;

    /// Convert from values, checking count and types.
    fn from_values(values: &[Value]) -> Result<Self>;
}

fn count_mismatch(given: usize, expected: usize) -> Error {
    Error::new(
        ErrorCategory::Type,
        codes::ARGUMENT_COUNT_MISMATCH,
        format!("wrong number of values (given {given}, expected {expected})"),
    )
}

fn take<T: WasmTy>(values: &mut impl Iterator<Item = Value>) -> Result<T> {
    let value = values.next().ok_or_else(|| count_mismatch(0, 1))?;
    T::from_value(value).ok_or_else(|| {
        Error::new(
            ErrorCategory::Type,
            codes::ARGUMENT_TYPE_MISMATCH,
            format!("type mismatch: expected {}, found {}", T::VALUE_TYPE, value.value_type()),
        )
    })
}

impl WasmTyList for () {
    fn value_types() -> Vec<ValueType> {
        Vec::new()
    }

    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        if !values.is_empty() {
            return Err(count_mismatch(values.len(), 0));
        }
        Ok(())
    }
}

impl<T: WasmTy> WasmTyList for T {
    fn value_types() -> Vec<ValueType> {
        vec![T::VALUE_TYPE]
    }

    fn into_values(self) -> Vec<Value> {
        vec![self.into_value()]
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        if values.len() != 1 {
            return Err(count_mismatch(values.len(), 1));
        }
        take(&mut values.iter().copied())
    }
}

macro_rules! impl_wasm_ty_list {
    ($n:literal: $($t:ident),+) => {
        impl<$($t: WasmTy),+> WasmTyList for ($($t,)+) {
            fn value_types() -> Vec<ValueType> {
                vec![$($t::VALUE_TYPE),+]
            }

            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($t,)+) = self;
                vec![$($t.into_value()),+]
            }

            fn from_values(values: &[Value]) -> Result<Self> {
                if values.len() != $n {
                    return Err(count_mismatch(values.len(), $n));
                }
                let mut iter = values.iter().copied();
                Ok(($(take::<$t>(&mut iter)?,)+))
            }
        }
    };
}

impl_wasm_ty_list!(1: A1);
impl_wasm_ty_list!(2: A1, A2);
impl_wasm_ty_list!(3: A1, A2, A3);
impl_wasm_ty_list!(4: A1, A2, A3, A4);
impl_wasm_ty_list!(5: A1, A2, A3, A4, A5);
impl_wasm_ty_list!(6: A1, A2, A3, A4, A5, A6);

/// Return type of a typed host function
pub trait HostReturn: Send + 'static {
    /// The values produced on success
    type Results: WasmTyList;

    /// Separate the results from a host failure.
    fn into_result(self) -> Result<Self::Results>;
}

impl<T: WasmTyList> HostReturn for T {
    type Results = T;

    fn into_result(self) -> Result<T> {
        Ok(self)
    }
}

impl<T: WasmTyList> HostReturn for core::result::Result<T, Error> {
    type Results = T;

    fn into_result(self) -> Result<T> {
        self
    }
}

/// Check embedder-supplied arguments against a parameter list.
pub fn check_arguments(args: &[Value], params: &[ValueType]) -> Result<()> {
    if args.len() != params.len() {
        return Err(count_mismatch(args.len(), params.len()));
    }
    for (i, (arg, ty)) in args.iter().zip(params).enumerate() {
        if !arg.matches_type(*ty) {
            return Err(Error::new(
                ErrorCategory::Type,
                codes::ARGUMENT_TYPE_MISMATCH,
                format!("argument {i} type mismatch: expected {ty}, found {}", arg.value_type()),
            ));
        }
    }
    Ok(())
}

/// Check values returned by a host function against its result types.
pub fn check_results(results: &[Value], expected: &[ValueType]) -> Result<()> {
    if results.len() != expected.len() {
        return Err(Error::new(
            ErrorCategory::Type,
            codes::RESULT_COUNT_MISMATCH,
            format!(
                "wrong number of results (given {}, expected {})",
                results.len(),
                expected.len()
            ),
        ));
    }
    for (i, (value, ty)) in results.iter().zip(expected).enumerate() {
        if !value.matches_type(*ty) {
            return Err(Error::new(
                ErrorCategory::Type,
                codes::RESULT_TYPE_MISMATCH,
                format!("result {i} type mismatch: expected {ty}, found {}", value.value_type()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_types_and_values() {
        assert_eq!(
            <(i32, u64, f32)>::value_types(),
            vec![ValueType::I32, ValueType::I64, ValueType::F32]
        );
        let values = (7i32, u64::MAX, 1.5f32).into_values();
        assert_eq!(values[1], Value::I64(-1));
        let (a, b, c) = <(i32, u64, f32)>::from_values(&values).unwrap();
        assert_eq!((a, b, c), (7, u64::MAX, 1.5));
    }

    #[test]
    fn test_from_values_rejects_wrong_shape() {
        let err = <(i32, i32)>::from_values(&[Value::I32(1)]).unwrap_err();
        assert_eq!(err.code, codes::ARGUMENT_COUNT_MISMATCH);
        let err = i64::from_values(&[Value::I32(1)]).unwrap_err();
        assert_eq!(err.code, codes::ARGUMENT_TYPE_MISMATCH);
        assert!(<()>::from_values(&[]).is_ok());
    }

    #[test]
    fn test_unsigned_reinterprets_bits() {
        assert_eq!(u32::MAX.into_value(), Value::I32(-1));
        assert_eq!(u32::from_value(Value::I32(-2)), Some(u32::MAX - 1));
    }

    #[test]
    fn test_result_checks() {
        let err = check_results(&[], &[ValueType::I32]).unwrap_err();
        assert_eq!(err.message(), "wrong number of results (given 0, expected 1)");
        let err = check_results(&[Value::I64(0)], &[ValueType::I32]).unwrap_err();
        assert_eq!(err.code, codes::RESULT_TYPE_MISMATCH);
        assert!(check_arguments(&[Value::FuncRef(None)], &[ValueType::FuncRef]).is_ok());
        assert!(check_arguments(&[Value::I32(0)], &[ValueType::F32]).is_err());
    }

    #[test]
    fn test_fallible_host_return() {
        let ok: core::result::Result<(i32, i64), Error> = Ok((3, 4));
        assert_eq!(ok.into_result().unwrap(), (3, 4));
        let failed: core::result::Result<i32, Error> = Err(Error::host("denied"));
        assert_eq!(failed.into_result().unwrap_err().message(), "denied");
        assert_eq!(5u32.into_result().unwrap(), 5);
    }
}
