// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Lowered direct-dispatch form.
//!
//! The validator rewrites each function body into a flat array of [`Op`]s.
//! `block`, `loop` and `end` disappear, `if` and `else` become jumps, and
//! every branch records where it lands and how the operand stack has to be
//! reshaped when it is taken.

use kiln_foundation::ValueType;

use crate::{LoadKind, NumericOp, StoreKind};

/// Resolved destination of a branch
///
/// When taken, the top `keep` cells are preserved, the `drop` cells below
/// them are discarded and execution continues at `pc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BranchTarget {
    /// Index of the next op to execute
    pub pc:   u32,
    /// Number of values carried to the target
    pub keep: u32,
    /// Number of values discarded beneath the carried ones
    pub drop: u32,
}

/// A lowered instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Trap with `Unreachable`
    Unreachable,
    /// Unconditional branch
    Br(BranchTarget),
    /// Branch if the popped i32 is non-zero
    BrIf(BranchTarget),
    /// Jump to `pc` if the popped i32 is zero (`if` without a taken branch)
    BrUnless(u32),
    /// Jump to `pc` without touching the stack (end of a `then` arm)
    Jump(u32),
    /// Indexed branch; the last entry is the default target
    BrTable(Box<[BranchTarget]>),
    /// Return from the current function
    Return,
    /// Direct call by function index
    Call(u32),
    /// Call through a table with a runtime signature check
    CallIndirect {
        /// Expected signature
        type_index:  u32,
        /// Table holding the callee
        table_index: u32,
    },
    /// Discard the top cell
    Drop,
    /// Pick one of two cells
    Select,
    /// Push a local
    LocalGet(u32),
    /// Pop into a local
    LocalSet(u32),
    /// Copy the top cell into a local
    LocalTee(u32),
    /// Push a global
    GlobalGet(u32),
    /// Pop into a global
    GlobalSet(u32),
    /// `table.get`
    TableGet(u32),
    /// `table.set`
    TableSet(u32),
    /// `table.size`
    TableSize(u32),
    /// `table.grow`
    TableGrow(u32),
    /// `table.fill`
    TableFill(u32),
    /// `table.copy`
    TableCopy {
        /// Destination table
        dst: u32,
        /// Source table
        src: u32,
    },
    /// `table.init`
    TableInit {
        /// Destination table
        table: u32,
        /// Element segment
        elem:  u32,
    },
    /// `elem.drop`
    ElemDrop(u32),
    /// Load with static offset
    Load(LoadKind, u32),
    /// Store with static offset
    Store(StoreKind, u32),
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
    /// Push a raw cell (any `*.const` and `ref.null`)
    Const(u64),
    /// `ref.is_null`
    RefIsNull,
    /// `ref.func`
    RefFunc(u32),
    /// Stack-only numeric instruction
    Numeric(NumericOp),
}

/// A validated and lowered function body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledBody {
    /// Types of the declared locals, parameters excluded
    pub locals:           Box<[ValueType]>,
    /// Lowered instructions; the last one is always [`Op::Return`]
    pub ops:              Box<[Op]>,
    /// Module byte offset of the instruction each op was lowered from
    pub offsets:          Box<[u32]>,
    /// Largest operand stack height reached, locals excluded
    pub max_stack_height: u32,
}

impl CompiledBody {
    /// Byte offset of the op at `pc`, used for trap traces.
    #[must_use]
    pub fn offset_of(&self, pc: usize) -> usize {
        self.offsets.get(pc).copied().unwrap_or_default() as usize
    }
}
