// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Memory access instruction shapes.

use kiln_foundation::ValueType;

/// Immediate of a load or store: alignment hint (log2) and static offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemArg {
    /// Alignment exponent, the alignment in bytes is `1 << align`
    pub align:  u32,
    /// Offset added to the dynamic address
    pub offset: u32,
}

/// Load instruction variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKind {
    /// `i32.load`
    I32,
    /// `i64.load`
    I64,
    /// `f32.load`
    F32,
    /// `f64.load`
    F64,
    /// `i32.load8_s`
    I32Load8S,
    /// `i32.load8_u`
    I32Load8U,
    /// `i32.load16_s`
    I32Load16S,
    /// `i32.load16_u`
    I32Load16U,
    /// `i64.load8_s`
    I64Load8S,
    /// `i64.load8_u`
    I64Load8U,
    /// `i64.load16_s`
    I64Load16S,
    /// `i64.load16_u`
    I64Load16U,
    /// `i64.load32_s`
    I64Load32S,
    /// `i64.load32_u`
    I64Load32U,
}

impl LoadKind {
    /// Number of bytes read from memory.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            LoadKind::I32Load8S | LoadKind::I32Load8U | LoadKind::I64Load8S | LoadKind::I64Load8U => 1,
            LoadKind::I32Load16S
            | LoadKind::I32Load16U
            | LoadKind::I64Load16S
            | LoadKind::I64Load16U => 2,
            LoadKind::I32 | LoadKind::F32 | LoadKind::I64Load32S | LoadKind::I64Load32U => 4,
            LoadKind::I64 | LoadKind::F64 => 8,
        }
    }

    /// Type of the value pushed onto the stack.
    #[must_use]
    pub const fn value_type(self) -> ValueType {
        match self {
            LoadKind::I32
            | LoadKind::I32Load8S
            | LoadKind::I32Load8U
            | LoadKind::I32Load16S
            | LoadKind::I32Load16U => ValueType::I32,
            LoadKind::F32 => ValueType::F32,
            LoadKind::F64 => ValueType::F64,
            _ => ValueType::I64,
        }
    }

    /// Largest valid alignment exponent.
    #[must_use]
    pub const fn natural_alignment(self) -> u32 {
        self.width().trailing_zeros()
    }

    /// Widen the little-endian bytes that were read into a stack cell.
    #[must_use]
    pub fn extend(self, raw: u64) -> u64 {
        match self {
            LoadKind::I32Load8S => raw as u8 as i8 as i32 as u32 as u64,
            LoadKind::I32Load16S => raw as u16 as i16 as i32 as u32 as u64,
            LoadKind::I64Load8S => raw as u8 as i8 as i64 as u64,
            LoadKind::I64Load16S => raw as u16 as i16 as i64 as u64,
            LoadKind::I64Load32S => raw as u32 as i32 as i64 as u64,
            _ => raw,
        }
    }
}

/// Store instruction variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// `i32.store`
    I32,
    /// `i64.store`
    I64,
    /// `f32.store`
    F32,
    /// `f64.store`
    F64,
    /// `i32.store8`
    I32Store8,
    /// `i32.store16`
    I32Store16,
    /// `i64.store8`
    I64Store8,
    /// `i64.store16`
    I64Store16,
    /// `i64.store32`
    I64Store32,
}

impl StoreKind {
    /// Number of bytes written to memory.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            StoreKind::I32Store8 | StoreKind::I64Store8 => 1,
            StoreKind::I32Store16 | StoreKind::I64Store16 => 2,
            StoreKind::I32 | StoreKind::F32 | StoreKind::I64Store32 => 4,
            StoreKind::I64 | StoreKind::F64 => 8,
        }
    }

    /// Type of the value popped from the stack.
    #[must_use]
    pub const fn value_type(self) -> ValueType {
        match self {
            StoreKind::I32 | StoreKind::I32Store8 | StoreKind::I32Store16 => ValueType::I32,
            StoreKind::F32 => ValueType::F32,
            StoreKind::F64 => ValueType::F64,
            StoreKind::I64 | StoreKind::I64Store8 | StoreKind::I64Store16 | StoreKind::I64Store32 => {
                ValueType::I64
            },
        }
    }

    /// Largest valid alignment exponent.
    #[must_use]
    pub const fn natural_alignment(self) -> u32 {
        self.width().trailing_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_alignment() {
        assert_eq!(LoadKind::I64.natural_alignment(), 3);
        assert_eq!(LoadKind::I32Load16U.natural_alignment(), 1);
        assert_eq!(StoreKind::I32Store8.natural_alignment(), 0);
        assert_eq!(StoreKind::F32.natural_alignment(), 2);
    }

    #[test]
    fn test_sign_extension_of_narrow_loads() {
        assert_eq!(LoadKind::I32Load8S.extend(0x80), 0xffff_ff80);
        assert_eq!(LoadKind::I32Load8U.extend(0x80), 0x80);
        assert_eq!(LoadKind::I64Load32S.extend(0x8000_0000), 0xffff_ffff_8000_0000);
        assert_eq!(LoadKind::I64Load16S.value_type(), ValueType::I64);
    }
}
