// Copyright (c) 2025 Ralf Anton Beier
// SPDX-License-Identifier: MIT
// Project: Kiln
// Module: kiln-math

//! Mathematical operations and types for Kiln.
//! Provides implementations for WebAssembly numeric instructions.
//!
//! Integer arithmetic wraps in two's complement. Operations that the
//! WebAssembly semantics define as trapping return `Err(TrapCode)` instead
//! of panicking or producing a sentinel. Float arithmetic follows IEEE-754;
//! every NaN produced by an arithmetic operation is the canonical NaN so that
//! repeated runs are bit-for-bit deterministic.

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::float_arithmetic, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

// Modules
pub mod float_bits;
pub mod ops;

// Re-export key types
pub use float_bits::{FloatBits32, FloatBits64};
pub use ops::*;

/// Result type for operations that may trap.
pub type TrapResult<T> = core::result::Result<T, kiln_error::TrapCode>;
