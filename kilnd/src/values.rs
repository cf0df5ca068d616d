// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Command-line arguments to WebAssembly values.

use anyhow::{anyhow, bail, Result};
use kiln::{FuncType, Value, ValueType};

/// Parse `text` as a value of type `ty`.
///
/// Integers accept signed and unsigned decimal as well as `0x` hex; floats
/// accept anything `f32`/`f64` parse, `inf` and `nan` included. References
/// can only be passed as `null`.
pub fn parse_value(text: &str, ty: ValueType) -> Result<Value> {
    let invalid = || anyhow!("invalid {ty} argument `{text}`");
    Ok(match ty {
        ValueType::I32 => Value::I32(parse_int(text).and_then(narrow_i32).ok_or_else(invalid)?),
        ValueType::I64 => Value::I64(parse_int(text).ok_or_else(invalid)?),
        ValueType::F32 => Value::from(text.parse::<f32>().map_err(|_| invalid())?),
        ValueType::F64 => Value::from(text.parse::<f64>().map_err(|_| invalid())?),
        ValueType::FuncRef if text == "null" => Value::FuncRef(None),
        ValueType::ExternRef if text == "null" => Value::ExternRef(None),
        ValueType::FuncRef | ValueType::ExternRef => return Err(invalid()),
    })
}

/// Parse the arguments of a call to a function of type `ty`.
pub fn parse_args(args: &[String], ty: &FuncType) -> Result<Vec<Value>> {
    if args.len() != ty.params().len() {
        bail!("function {ty} expects {} arguments, got {}", ty.params().len(), args.len());
    }
    args.iter().zip(ty.params()).map(|(arg, param)| parse_value(arg, *param)).collect()
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u64>().ok()?,
    };
    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        Some(magnitude as i64)
    }
}

fn narrow_i32(value: i64) -> Option<i32> {
    i32::try_from(value).ok().or_else(|| u32::try_from(value).ok().map(|v| v as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(parse_value("-5", ValueType::I32).unwrap(), Value::I32(-5));
        assert_eq!(parse_value("4294967295", ValueType::I32).unwrap(), Value::I32(-1));
        assert_eq!(parse_value("0xff", ValueType::I64).unwrap(), Value::I64(255));
        assert_eq!(parse_value("18446744073709551615", ValueType::I64).unwrap(), Value::I64(-1));
        assert!(parse_value("4294967296", ValueType::I32).is_err());
        assert!(parse_value("five", ValueType::I64).is_err());
    }

    #[test]
    fn test_floats_and_refs() {
        assert_eq!(parse_value("1.5", ValueType::F64).unwrap(), Value::from(1.5f64));
        assert!(parse_value("inf", ValueType::F32).is_ok());
        assert_eq!(parse_value("null", ValueType::ExternRef).unwrap(), Value::ExternRef(None));
        assert!(parse_value("3", ValueType::FuncRef).is_err());
    }

    #[test]
    fn test_argument_count() {
        let ty = FuncType::new([ValueType::I32, ValueType::I64], []);
        let args = vec!["1".to_string(), "2".to_string()];
        assert_eq!(parse_args(&args, &ty).unwrap(), vec![Value::I32(1), Value::I64(2)]);
        assert!(parse_args(&args[..1], &ty).is_err());
    }
}
