// Kiln - kiln-logging
// Module: Guest Logging
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Logging import for WebAssembly guests.
//!
//! Guests import `env.log(level, ptr, len)` to emit a message stored in
//! their memory. [`LoggingExt`] defines that import on a
//! [`Linker`](kiln_runtime::Linker), either with a custom [`LogHandler`] or
//! forwarding to the `log` facade.

pub mod handler;
pub mod level;
pub mod operation;

pub use handler::{forward_to_log, log_func_type, LogHandler, LoggingExt, GUEST_TARGET, LOG_MODULE, LOG_NAME};
pub use kiln_error::{Error, Result};
pub use level::LogLevel;
pub use operation::LogOperation;
