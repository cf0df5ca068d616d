// Kiln - kiln-host
// Module: Host Function Bridge
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Host function infrastructure for the Kiln WebAssembly engine.
//!
//! This crate defines how embedder code is called from WebAssembly:
//!
//! - [`HostFunc`], a store-independent host function object with a
//!   signature and a callback,
//! - [`HostContext`], the interface the runtime hands to a callback for
//!   reaching store data and the caller's memory,
//! - the marshaling traits [`WasmTy`], [`WasmTyList`] and [`HostReturn`]
//!   used by typed closures and typed calls.
//!
//! A host function that returns an error makes the runtime raise a
//! `HostError` trap carrying that error.

pub mod context;
pub mod function;
pub mod marshal;

pub use context::HostContext;
pub use function::{HostCallback, HostFunc, IntoHostFunc};
pub use marshal::{check_arguments, check_results, HostReturn, WasmTy, WasmTyList};
