// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The `env.log` import and the handlers it forwards to.
//!
//! The import has the signature `(param i32 i32 i32)`: a [`LogLevel`] as
//! integer, then offset and length of a UTF-8 message in the caller's
//! memory 0. An unknown level or invalid UTF-8 fails the call, which the
//! runtime raises as a `HostError` trap. A message outside of memory traps
//! with `OutOfBoundsMemoryAccess`.

use std::sync::Arc;

use kiln_error::{kinds, Result};
use kiln_foundation::{FuncType, Value, ValueType};
use kiln_host::HostContext;
use kiln_runtime::{Caller, Linker};

use crate::{level::LogLevel, operation::LogOperation};

/// Module name of the logging import
pub const LOG_MODULE: &str = "env";

/// Field name of the logging import
pub const LOG_NAME: &str = "log";

/// `log` target used by [`forward_to_log`]
pub const GUEST_TARGET: &str = "kiln::guest";

/// Function handling log operations
pub type LogHandler = Arc<dyn Fn(&LogOperation) + Send + Sync>;

/// Signature of `env.log`.
#[must_use]
pub fn log_func_type() -> FuncType {
    FuncType::new([ValueType::I32; 3], [])
}

/// Handler emitting each operation as a `log` record under [`GUEST_TARGET`].
#[must_use]
pub fn forward_to_log() -> LogHandler {
    Arc::new(|op: &LogOperation| {
        let module = op.module.as_deref().unwrap_or("wasm");
        log::log!(target: GUEST_TARGET, op.level.to_log_level(), "[{module}] {}", op.message);
    })
}

/// Decode the arguments of an `env.log` call.
pub fn read_operation(caller: &Caller<'_>, params: &[Value]) -> Result<LogOperation> {
    let [level, ptr, len] = params else {
        return Err(kinds::type_error("env.log expects three arguments"));
    };
    let raw = level.as_i32().unwrap_or(-1);
    let level = LogLevel::from_raw(raw).ok_or_else(|| kinds::runtime_error(format!("unknown log level {raw}")))?;
    let ptr = ptr.as_i32().unwrap_or_default() as u32 as usize;
    let len = len.as_i32().unwrap_or_default() as u32 as usize;

    let ctx: &dyn HostContext = caller;
    let message = ctx.read_str(ptr, len)?;
    Ok(LogOperation { level, message, module: caller.module().and_then(|module| module.name()).map(str::to_owned) })
}

/// Extension trait for [`Linker`] to provide the logging import
pub trait LoggingExt {
    /// Define `env.log`, passing every operation to `handler`.
    fn define_log_handler(&mut self, handler: LogHandler) -> Result<&mut Self>;

    /// Define `env.log` forwarding to the `log` facade.
    fn define_logging(&mut self) -> Result<&mut Self> {
        self.define_log_handler(forward_to_log())
    }
}

impl LoggingExt for Linker {
    fn define_log_handler(&mut self, handler: LogHandler) -> Result<&mut Self> {
        self.func_new(LOG_MODULE, LOG_NAME, log_func_type(), move |caller: &mut Caller<'_>, params: &[Value]| {
            let op = read_operation(caller, params)?;
            handler(&op);
            Ok(Vec::new())
        })
    }
}
