// Kiln - kiln-foundation
// Module: Core Types
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Core type definitions and values for the Kiln WebAssembly engine.
//!
//! This crate provides the data structures shared by the decoder, the
//! validator and the runtime: value types, function and extern types, limits,
//! the embedder-facing [`Value`] and the WebAssembly feature flags.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod features;
pub mod types;
pub mod values;

pub use features::Features;
// Re-export error related types for convenience
pub use kiln_error::{codes, kinds, Error, ErrorCategory, Result};
pub use kiln_math::{FloatBits32, FloatBits64};
pub use types::{
    ExternKind, ExternType, FuncType, GlobalType, Limits, MemoryType, RefType, TableType,
    ValueType, MAX_MEMORY_PAGES, MAX_TABLE_SIZE, PAGE_SIZE,
};
pub use values::{ExternAddr, FuncAddr, Value};
