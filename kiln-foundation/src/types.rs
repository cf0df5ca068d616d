// Kiln - kiln-foundation
// Module: WebAssembly Type Definitions
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly type definitions.
//!
//! Value types, function signatures, limits and the types of the four kinds
//! of externally visible entities (functions, tables, memories, globals).

use core::fmt;

use kiln_error::{codes, Error, ErrorCategory, Result};

/// Size of a WebAssembly page in bytes (64 KiB)
pub const PAGE_SIZE: usize = 65536;

/// Maximum number of pages a 32-bit linear memory can address
pub const MAX_MEMORY_PAGES: u32 = 65536;

/// Maximum number of elements a table may declare
pub const MAX_TABLE_SIZE: u32 = u32::MAX;

/// WebAssembly value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 32-bit IEEE-754 float
    F32,
    /// 64-bit IEEE-754 float
    F64,
    /// Nullable reference to a function
    FuncRef,
    /// Nullable opaque host reference
    ExternRef,
}

impl ValueType {
    /// Decode a value type from its binary encoding.
    pub fn from_binary(byte: u8) -> Result<Self> {
        match byte {
            0x7F => Ok(ValueType::I32),
            0x7E => Ok(ValueType::I64),
            0x7D => Ok(ValueType::F32),
            0x7C => Ok(ValueType::F64),
            0x70 => Ok(ValueType::FuncRef),
            0x6F => Ok(ValueType::ExternRef),
            other => Err(Error::new(
                ErrorCategory::Parse,
                codes::INVALID_VALUE_TYPE,
                format!("invalid value type 0x{other:02x}"),
            )),
        }
    }

    /// The binary encoding of this value type.
    #[must_use]
    pub const fn to_binary(self) -> u8 {
        match self {
            ValueType::I32 => 0x7F,
            ValueType::I64 => 0x7E,
            ValueType::F32 => 0x7D,
            ValueType::F64 => 0x7C,
            ValueType::FuncRef => 0x70,
            ValueType::ExternRef => 0x6F,
        }
    }

    /// Whether this is a numeric type.
    #[must_use]
    pub const fn is_num(self) -> bool {
        matches!(self, ValueType::I32 | ValueType::I64 | ValueType::F32 | ValueType::F64)
    }

    /// Whether this is a reference type.
    #[must_use]
    pub const fn is_ref(self) -> bool {
        !self.is_num()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::FuncRef => "funcref",
            ValueType::ExternRef => "externref",
        })
    }
}

/// Reference types, the element types of tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    /// `funcref`
    FuncRef,
    /// `externref`
    ExternRef,
}

impl RefType {
    /// Decode a reference type from its binary encoding.
    pub fn from_binary(byte: u8) -> Result<Self> {
        match byte {
            0x70 => Ok(RefType::FuncRef),
            0x6F => Ok(RefType::ExternRef),
            other => Err(Error::new(
                ErrorCategory::Parse,
                codes::INVALID_VALUE_TYPE,
                format!("invalid reference type 0x{other:02x}"),
            )),
        }
    }
}

impl From<RefType> for ValueType {
    fn from(ty: RefType) -> Self {
        match ty {
            RefType::FuncRef => ValueType::FuncRef,
            RefType::ExternRef => ValueType::ExternRef,
        }
    }
}

impl TryFrom<ValueType> for RefType {
    type Error = Error;

    fn try_from(ty: ValueType) -> Result<Self> {
        match ty {
            ValueType::FuncRef => Ok(RefType::FuncRef),
            ValueType::ExternRef => Ok(RefType::ExternRef),
            other => Err(Error::new(
                ErrorCategory::Validation,
                codes::TYPE_MISMATCH,
                format!("{other} is not a reference type"),
            )),
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ValueType::from(*self).fmt(f)
    }
}

/// A function signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncType {
    params:  Box<[ValueType]>,
    results: Box<[ValueType]>,
}

impl FuncType {
    /// Create a function type from parameter and result types.
    pub fn new(
        params: impl IntoIterator<Item = ValueType>,
        results: impl IntoIterator<Item = ValueType>,
    ) -> Self {
        Self {
            params:  params.into_iter().collect(),
            results: results.into_iter().collect(),
        }
    }

    /// Parameter types
    #[must_use]
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Result types
    #[must_use]
    pub fn results(&self) -> &[ValueType] {
        &self.results
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, types: &[ValueType]) -> fmt::Result {
            f.write_str("[")?;
            for (i, ty) in types.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{ty}")?;
            }
            f.write_str("]")
        }
        list(f, &self.params)?;
        f.write_str(" -> ")?;
        list(f, &self.results)
    }
}

/// Size limits of a memory (in pages) or a table (in elements)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Limits {
    /// Initial size
    pub min: u32,
    /// Optional maximum size
    pub max: Option<u32>,
}

impl Limits {
    /// Create new limits.
    #[must_use]
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Import subtyping: `self` (the provided entity) can satisfy `required`.
    ///
    /// The provided minimum must be at least the required one, and if a
    /// maximum is required the provided maximum must exist and not exceed it.
    #[must_use]
    pub fn is_subset_of(&self, required: &Limits) -> bool {
        if self.min < required.min {
            return false;
        }
        match (self.max, required.max) {
            (_, None) => true,
            (Some(actual), Some(bound)) => actual <= bound,
            (None, Some(_)) => false,
        }
    }

    /// Check `min <= max` and that both stay within `bound`.
    pub fn check(&self, bound: u32, what: &str) -> Result<()> {
        if self.min > bound || self.max.is_some_and(|max| max > bound) {
            return Err(Error::new(
                ErrorCategory::Validation,
                codes::INVALID_LIMITS,
                format!("{what} size must be at most {bound}"),
            ));
        }
        if self.max.is_some_and(|max| max < self.min) {
            return Err(Error::new(
                ErrorCategory::Validation,
                codes::INVALID_LIMITS,
                "size minimum must not be greater than maximum",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{} {}", self.min, max),
            None => write!(f, "{}", self.min),
        }
    }
}

/// Type of a linear memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryType {
    /// Size limits in pages
    pub limits: Limits,
}

impl MemoryType {
    /// Create a memory type with the given page limits.
    #[must_use]
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { limits: Limits::new(min, max) }
    }
}

/// Type of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableType {
    /// Element reference type
    pub element: RefType,
    /// Size limits in elements
    pub limits:  Limits,
}

impl TableType {
    /// Create a table type.
    #[must_use]
    pub const fn new(element: RefType, min: u32, max: Option<u32>) -> Self {
        Self { element, limits: Limits::new(min, max) }
    }
}

/// Type of a global variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalType {
    /// Type of the stored value
    pub value_type: ValueType,
    /// Whether `global.set` is allowed
    pub mutable:    bool,
}

impl GlobalType {
    /// Create a global type.
    #[must_use]
    pub const fn new(value_type: ValueType, mutable: bool) -> Self {
        Self { value_type, mutable }
    }
}

/// Kind tag of an import or export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternKind {
    /// Function
    Func,
    /// Table
    Table,
    /// Linear memory
    Memory,
    /// Global variable
    Global,
}

impl fmt::Display for ExternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExternKind::Func => "function",
            ExternKind::Table => "table",
            ExternKind::Memory => "memory",
            ExternKind::Global => "global",
        })
    }
}

/// The type of an import or export
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExternType {
    /// Function with its signature
    Func(FuncType),
    /// Table
    Table(TableType),
    /// Linear memory
    Memory(MemoryType),
    /// Global variable
    Global(GlobalType),
}

impl ExternType {
    /// The kind tag of this type.
    #[must_use]
    pub const fn kind(&self) -> ExternKind {
        match self {
            ExternType::Func(_) => ExternKind::Func,
            ExternType::Table(_) => ExternKind::Table,
            ExternType::Memory(_) => ExternKind::Memory,
            ExternType::Global(_) => ExternKind::Global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_binary_round_trip() {
        for ty in [
            ValueType::I32,
            ValueType::I64,
            ValueType::F32,
            ValueType::F64,
            ValueType::FuncRef,
            ValueType::ExternRef,
        ] {
            assert_eq!(ValueType::from_binary(ty.to_binary()).ok(), Some(ty));
        }
        let err = ValueType::from_binary(0x7B).unwrap_err();
        assert_eq!(err.code, codes::INVALID_VALUE_TYPE);
    }

    #[test]
    fn test_limits_subset() {
        let provided = Limits::new(2, Some(4));
        assert!(provided.is_subset_of(&Limits::new(1, None)));
        assert!(provided.is_subset_of(&Limits::new(2, Some(4))));
        assert!(!provided.is_subset_of(&Limits::new(3, None)));
        assert!(!provided.is_subset_of(&Limits::new(1, Some(3))));
        assert!(!Limits::new(1, None).is_subset_of(&Limits::new(1, Some(10))));
    }

    #[test]
    fn test_limits_check() {
        assert!(Limits::new(1, Some(2)).check(MAX_MEMORY_PAGES, "memory").is_ok());
        assert!(Limits::new(3, Some(2)).check(MAX_MEMORY_PAGES, "memory").is_err());
        assert!(Limits::new(65537, None).check(MAX_MEMORY_PAGES, "memory").is_err());
    }

    #[test]
    fn test_func_type_display() {
        let ty = FuncType::new([ValueType::I32, ValueType::I64], [ValueType::F32]);
        assert_eq!(ty.to_string(), "[i32 i64] -> [f32]");
        assert_eq!(FuncType::default().to_string(), "[] -> []");
    }
}
