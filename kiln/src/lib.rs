// Kiln - kiln
// Module: Embedding API
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Kiln, a pure Rust WebAssembly execution engine.
//!
//! Kiln decodes and validates WebAssembly binary modules, links them against
//! host functions and other instances, and runs them on a sandboxed
//! interpreter. Every fault inside WebAssembly code surfaces as a typed
//! [`Trap`] carrying its cause and a stack trace; nothing escapes the
//! sandbox as a panic.
//!
//! ## Features
//!
//! - WebAssembly core with multi-value, bulk memory, reference types,
//!   sign extension and saturating conversions
//! - Explicit resource limits: call depth, operand stack, memory pages, fuel
//! - Cooperative interruption from any thread through [`InterruptHandle`]
//! - Typed host functions with access to the caller through [`Caller`]
//! - `logging`: the `env.log` guest import (enabled by default)
//!
//! ```
//! let wasm = wat::parse_str(r#"
//!     (module
//!       (func (export "add") (param i32 i32) (result i32)
//!         local.get 0
//!         local.get 1
//!         i32.add))
//! "#).unwrap();
//!
//! let module = kiln::compile(&wasm).unwrap();
//! let mut store = kiln::Store::new(&kiln::Engine::default(), ());
//! let instance = kiln::instantiate(&mut store, &module, &kiln::Linker::new()).unwrap();
//!
//! let add = instance.get_typed_func::<(i32, i32), i32>(&store, "add").unwrap();
//! assert_eq!(add.call(&mut store, (2, 3)).unwrap(), 5);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod prelude;

pub use kiln_error::{codes, kinds, Error, ErrorCategory, FrameInfo, Result, Trap, TrapCode};
pub use kiln_foundation::{
    ExternAddr, ExternKind, ExternType, Features, FuncAddr, FuncType, GlobalType, Limits, MemoryType,
    RefType, TableType, Value, ValueType, MAX_MEMORY_PAGES, PAGE_SIZE,
};
pub use kiln_host::{HostContext, HostFunc, HostReturn, IntoHostFunc, WasmTy, WasmTyList};
#[cfg(feature = "logging")]
pub use kiln_logging as logging;
pub use kiln_runtime::{
    Caller, Config, DecodeLimits, Definition, Engine, ExecutionStats, Extern, Func, Global, Instance,
    InterruptHandle, Linker, Memory, Module, Store, StoreId, Table, TypedFunc, DEFAULT_MAX_CALL_DEPTH,
    DEFAULT_MAX_VALUE_STACK,
};

/// Version of the WebAssembly core specification implemented
pub const CORE_VERSION: &str = "2.0";

/// Decode and validate `bytes` under the default [`Config`].
///
/// Malformed input fails with [`ErrorCategory::Parse`], ill-typed code with
/// [`ErrorCategory::Validation`].
pub fn compile(bytes: &[u8]) -> Result<Module> {
    Engine::default().compile(bytes)
}

/// Instantiate `module` in `store`, resolving its imports through `linker`.
///
/// Either returns a fully initialized instance whose start function has run,
/// or fails with a link error or trap and leaves no usable instance behind.
pub fn instantiate(store: &mut Store, module: &Module, linker: &Linker) -> Result<Instance> {
    linker.instantiate(store, module)
}
