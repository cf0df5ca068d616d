// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Commonly used types for embedding Kiln.
//!
//! ```
//! use kiln::prelude::*;
//!
//! let mut store = Store::new(&Engine::default(), ());
//! let double = Func::wrap(&mut store, |x: i32| x * 2);
//! assert_eq!(double.call(&mut store, &[Value::I32(21)]).unwrap(), vec![Value::I32(42)]);
//! ```

#[cfg(feature = "logging")]
pub use kiln_logging::{LogLevel, LoggingExt};

pub use crate::{
    Caller, Config, Engine, Error, ErrorCategory, Extern, Func, FuncType, Global, Instance, Linker, Memory,
    Module, Result, Store, Table, Trap, TrapCode, TypedFunc, Value, ValueType,
};
