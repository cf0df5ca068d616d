// Kiln - kiln-error
// Module: Error Handling
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Kiln error handling library
//!
//! A single [`Error`] type is shared by every crate in the workspace. Errors
//! are organized into categories, each with its own range of error codes:
//!
//! ## Decode errors (1000-1099)
//! - Bad magic number or version
//! - Truncated input and invalid LEB128 integers
//! - Out-of-order, duplicated or mis-sized sections
//!
//! ## Validation errors (2000-2099)
//! - Operand stack type mismatches
//! - Unknown indices and invalid branch targets
//! - Limits, constant expressions and export names
//!
//! ## Link errors (3000-3099)
//! - Missing imports, kind and type mismatches
//!
//! ## Traps (4000-4099)
//! - Runtime faults raised while executing WebAssembly code, see
//!   [`TrapCode`]
//!
//! ## Embedder errors (5000-5099)
//! - Argument mismatches, grow failures, missing exports
//!
//! # Usage
//!
//! ```
//! use kiln_error::{codes, kinds, Error, ErrorCategory, TrapCode};
//!
//! let error = Error::new(
//!     ErrorCategory::Validation,
//!     codes::TYPE_MISMATCH,
//!     "expected i32 but found f64",
//! )
//! .with_func_index(3)
//! .with_offset(0x42);
//! assert!(error.is_validation());
//!
//! let link = kinds::link_error("unknown import env.print");
//! assert_eq!(link.category, ErrorCategory::Link);
//!
//! let trap: Error = TrapCode::IntegerDivideByZero.into();
//! assert_eq!(trap.trap_code(), Some(TrapCode::IntegerDivideByZero));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Error codes for kiln
pub mod codes;
/// Error and error handling types
pub mod errors;
/// Error kind definitions
pub mod kinds;
/// Trap causes and WebAssembly stack traces
pub mod trap;

// Re-export key types
pub use errors::{Error, ErrorCategory};
pub use kinds::{
    link_error, not_found_error, parse_error, resource_error, runtime_error, type_error,
    validation_error, LinkError, NotFoundError, ParseError, ResourceError, TypeError,
    ValidationError,
};
pub use trap::{FrameInfo, Trap, TrapCode};

/// A specialized `Result` type for kiln operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error conversion trait for converting to specific error categories
pub trait ToErrorCategory {
    /// Convert the error to a specific category
    fn to_category(&self) -> ErrorCategory;
}
