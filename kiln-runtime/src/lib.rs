// Kiln - kiln-runtime
// Module: WebAssembly Runtime
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

//! Runtime of the Kiln WebAssembly engine.
//!
//! An [`Engine`] compiles modules under a [`Config`]. A [`Store`] holds all
//! runtime state created from one engine: instances and the functions,
//! memories, tables and globals they own. The embedder refers to that state
//! through small `Copy` handles ([`Func`], [`Memory`], [`Table`],
//! [`Global`], [`Instance`]) that are always used together with their store.
//!
//! Imports are resolved by name with a [`Linker`]; host functions receive a
//! [`Caller`] for access to store data and the calling instance's exports.
//!
//! ```
//! use kiln_runtime::{Engine, Linker, Store, Value};
//!
//! let engine = Engine::default();
//! let wasm = wat::parse_str(r#"
//!     (module
//!       (func (export "add") (param i32 i32) (result i32)
//!         local.get 0
//!         local.get 1
//!         i32.add))
//! "#).unwrap();
//! let module = engine.compile(&wasm).unwrap();
//!
//! let mut store = Store::new(&engine, ());
//! let instance = Linker::new().instantiate(&mut store, &module).unwrap();
//! let add = instance.get_func(&store, "add").unwrap();
//! assert_eq!(add.call(&mut store, &[Value::I32(2), Value::I32(3)]).unwrap(), vec![Value::I32(5)]);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod engine;
mod execution;
pub mod func;
pub mod global;
pub mod instance;
pub mod interrupt;
pub mod linker;
pub mod memory;
mod stack;
pub mod stats;
pub mod store;
pub mod table;

pub use config::{Config, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_VALUE_STACK};
pub use engine::Engine;
pub use func::{Caller, Func, TypedFunc};
pub use global::{Global, GlobalInstance};
pub use instance::{Extern, Instance};
pub use interrupt::InterruptHandle;
pub use kiln_decoder::{DecodeLimits, Module};
pub use kiln_error::{Error, ErrorCategory, FrameInfo, Result, Trap, TrapCode};
pub use kiln_foundation::{
    ExternAddr, ExternKind, ExternType, Features, FuncAddr, FuncType, GlobalType, Limits, MemoryType,
    RefType, TableType, Value, ValueType, PAGE_SIZE,
};
pub use kiln_host::{HostContext, HostFunc, WasmTy, WasmTyList};
pub use linker::{Definition, Linker};
pub use memory::{LinearMemory, Memory};
pub use stats::ExecutionStats;
pub use store::{Store, StoreId};
pub use table::{Table, TableInstance, MAX_TABLE_ELEMENTS};

/// Result of an operation that can only fail with a trap
pub type TrapResult<T> = core::result::Result<T, TrapCode>;
