// Kiln - kiln-instructions
// Module: WebAssembly Instruction Set
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

//! WebAssembly instruction set for the Kiln engine.
//!
//! Instructions exist in two forms:
//!
//! - [`Instruction`]: the decoded form, one variant per binary instruction,
//!   produced by the decoder and consumed by the validator.
//! - [`Op`]: the lowered direct-dispatch form, produced by the validator.
//!   Structured control flow is resolved into jumps whose [`BranchTarget`]
//!   carries the target position and the stack adjustment, so the
//!   interpreter needs no label stack.
//!
//! Stack-only numeric instructions are shared by both forms as
//! [`NumericOp`], which also implements their pure semantics over untyped
//! 64-bit stack cells.

#![warn(missing_docs)]

pub mod instruction;
pub mod memory;
pub mod numeric;
pub mod op;
pub mod opcodes;

pub use instruction::{BlockType, Instruction};
pub use kiln_error::{Error, Result};
pub use memory::{LoadKind, MemArg, StoreKind};
pub use numeric::NumericOp;
pub use op::{BranchTarget, CompiledBody, Op};
