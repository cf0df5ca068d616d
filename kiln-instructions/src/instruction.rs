// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Decoded instruction form.

use kiln_foundation::{FloatBits32, FloatBits64, RefType, ValueType};

use crate::{memory::MemArg, LoadKind, NumericOp, StoreKind};

/// Signature of a structured control instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockType {
    /// `[] -> []`
    #[default]
    Empty,
    /// `[] -> [t]`
    Value(ValueType),
    /// Index into the type section (multi-value)
    FuncType(u32),
}

/// A decoded WebAssembly instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Control
    /// `unreachable`
    Unreachable,
    /// `nop`
    Nop,
    /// `block`
    Block(BlockType),
    /// `loop`
    Loop(BlockType),
    /// `if`
    If(BlockType),
    /// `else`
    Else,
    /// `end`
    End,
    /// `br`
    Br(u32),
    /// `br_if`
    BrIf(u32),
    /// `br_table`
    BrTable {
        /// Label indices selected by the operand
        targets: Box<[u32]>,
        /// Label taken when the operand is out of range
        default: u32,
    },
    /// `return`
    Return,
    /// `call`
    Call(u32),
    /// `call_indirect`
    CallIndirect {
        /// Expected signature
        type_index:  u32,
        /// Table holding the callee
        table_index: u32,
    },

    // Parametric
    /// `drop`
    Drop,
    /// `select` without type annotation
    Select,
    /// `select t`
    SelectTyped(ValueType),

    // Variables
    /// `local.get`
    LocalGet(u32),
    /// `local.set`
    LocalSet(u32),
    /// `local.tee`
    LocalTee(u32),
    /// `global.get`
    GlobalGet(u32),
    /// `global.set`
    GlobalSet(u32),

    // Tables
    /// `table.get`
    TableGet(u32),
    /// `table.set`
    TableSet(u32),
    /// `table.init elem table`
    TableInit {
        /// Element segment
        elem:  u32,
        /// Destination table
        table: u32,
    },
    /// `elem.drop`
    ElemDrop(u32),
    /// `table.copy dst src`
    TableCopy {
        /// Destination table
        dst: u32,
        /// Source table
        src: u32,
    },
    /// `table.grow`
    TableGrow(u32),
    /// `table.size`
    TableSize(u32),
    /// `table.fill`
    TableFill(u32),

    // Memory
    /// Any load instruction
    Load(LoadKind, MemArg),
    /// Any store instruction
    Store(StoreKind, MemArg),
    /// `memory.size`
    MemorySize,
    /// `memory.grow`
    MemoryGrow,
    /// `memory.init`
    MemoryInit(u32),
    /// `data.drop`
    DataDrop(u32),
    /// `memory.copy`
    MemoryCopy,
    /// `memory.fill`
    MemoryFill,

    // Constants
    /// `i32.const`
    I32Const(i32),
    /// `i64.const`
    I64Const(i64),
    /// `f32.const`
    F32Const(FloatBits32),
    /// `f64.const`
    F64Const(FloatBits64),

    // References
    /// `ref.null`
    RefNull(RefType),
    /// `ref.is_null`
    RefIsNull,
    /// `ref.func`
    RefFunc(u32),

    /// Comparison, arithmetic or conversion
    Numeric(NumericOp),
}

impl Instruction {
    /// Whether this instruction opens a new control frame.
    #[must_use]
    pub const fn is_block_start(&self) -> bool {
        matches!(self, Instruction::Block(_) | Instruction::Loop(_) | Instruction::If(_))
    }
}
