// Kiln - kiln-error
// Module: Error Types
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The workspace-wide [`Error`] type.

use std::{borrow::Cow, fmt};

use crate::{codes, trap::{FrameInfo, Trap}, ToErrorCategory, TrapCode};

/// `Error` categories for kiln operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// Malformed binary input (decode error)
    Parse      = 1,
    /// Type-system violation found by the validator
    Validation = 2,
    /// Unsatisfiable imports during instantiation
    Link       = 3,
    /// WebAssembly trap raised during execution
    RuntimeTrap = 4,
    /// Embedder passed values of the wrong type or count
    Type       = 5,
    /// Resource exhaustion or limit (memory growth, table growth)
    Resource   = 6,
    /// Lookup of a missing export or definition
    NotFound   = 7,
    /// Other runtime failures outside of WebAssembly execution
    Runtime    = 8,
}

impl ErrorCategory {
    /// Short name used in diagnostics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "decode",
            Self::Validation => "validation",
            Self::Link => "link",
            Self::RuntimeTrap => "trap",
            Self::Type => "type",
            Self::Resource => "resource",
            Self::NotFound => "not-found",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kiln `Error` type
///
/// Carries a category, a numeric code from [`codes`], a message and, where
/// it applies, the location the error was detected at: a byte offset into
/// the module binary and the index of the function being validated. Traps
/// additionally carry the full [`Trap`] with its stack trace.
#[derive(Debug, Clone)]
pub struct Error {
    /// `Error` category
    pub category: ErrorCategory,
    /// `Error` code
    pub code:     u16,
    message:      Cow<'static, str>,
    offset:       Option<usize>,
    func_index:   Option<u32>,
    trap:         Option<Box<Trap>>,
}

impl Error {
    /// Create a new error.
    #[must_use]
    pub fn new(
        category: ErrorCategory,
        code: u16,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
            offset: None,
            func_index: None,
            trap: None,
        }
    }

    /// Create an error raised by a host function.
    ///
    /// When returned from a host function it becomes the source of a
    /// [`TrapCode::HostError`] trap.
    #[must_use]
    pub fn host(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCategory::Runtime, codes::RUNTIME_ERROR, message)
    }

    /// Attach the byte offset at which the error was detected.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Attach the byte offset unless one is already recorded.
    #[must_use]
    pub fn or_offset(mut self, offset: usize) -> Self {
        if self.offset.is_none() {
            self.offset = Some(offset);
        }
        self
    }

    /// Attach the index of the function the error belongs to.
    #[must_use]
    pub fn with_func_index(mut self, func_index: u32) -> Self {
        self.func_index = Some(func_index);
        self
    }

    /// Human readable message, without location context.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset into the module binary, if known.
    #[must_use]
    pub const fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Function index the error was reported for, if any.
    #[must_use]
    pub const fn func_index(&self) -> Option<u32> {
        self.func_index
    }

    /// The trap carried by this error, if it is a trap.
    #[must_use]
    pub fn trap(&self) -> Option<&Trap> {
        self.trap.as_deref()
    }

    /// Consume the error, returning its trap if it is one.
    #[must_use]
    pub fn into_trap(self) -> Option<Trap> {
        self.trap.map(|trap| *trap)
    }

    /// Append the frames returned by `trace` to the stack trace of a trap.
    ///
    /// A trap raised by a nested call already holds its inner frames; the
    /// new ones come after them. Other errors are returned unchanged and
    /// `trace` is not called.
    #[must_use]
    pub fn with_trap_trace(mut self, trace: impl FnOnce() -> Vec<FrameInfo>) -> Self {
        if let Some(trap) = self.trap.as_mut() {
            trap.extend_trace(trace());
        }
        self
    }

    /// The trap cause, if this error is a trap.
    #[must_use]
    pub fn trap_code(&self) -> Option<TrapCode> {
        self.trap.as_ref().map(|trap| trap.code())
    }

    /// Returns true for malformed-binary errors.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        self.category == ErrorCategory::Parse
    }

    /// Returns true for validation errors.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.category == ErrorCategory::Validation
    }

    /// Returns true for link errors.
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.category == ErrorCategory::Link
    }

    /// Returns true for traps.
    #[must_use]
    pub fn is_trap(&self) -> bool {
        self.category == ErrorCategory::RuntimeTrap
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(trap) = &self.trap {
            return write!(f, "[{}][E{:04}] {}", self.category, self.code, trap);
        }
        write!(f, "[{}][E{:04}] {}", self.category, self.code, self.message)?;
        if let Some(func_index) = self.func_index {
            write!(f, " (in function {func_index})")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " (at offset {offset:#x})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.trap
            .as_ref()
            .and_then(|trap| trap.host_error())
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl From<Trap> for Error {
    fn from(trap: Trap) -> Self {
        let code = trap.code();
        Self {
            category: ErrorCategory::RuntimeTrap,
            code: code.error_code(),
            message: Cow::Borrowed(code.message()),
            offset: None,
            func_index: None,
            trap: Some(Box::new(trap)),
        }
    }
}

impl From<TrapCode> for Error {
    fn from(code: TrapCode) -> Self {
        Trap::new(code).into()
    }
}

impl ToErrorCategory for Error {
    fn to_category(&self) -> ErrorCategory {
        self.category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_location() {
        let err = Error::new(ErrorCategory::Validation, codes::TYPE_MISMATCH, "type mismatch")
            .with_func_index(2)
            .with_offset(0x1f);
        let text = err.to_string();
        assert!(text.contains("validation"));
        assert!(text.contains("in function 2"));
        assert!(text.contains("0x1f"));
    }

    #[test]
    fn test_or_offset_keeps_first() {
        let err = Error::new(ErrorCategory::Parse, codes::PARSE_ERROR, "bad")
            .with_offset(4)
            .or_offset(9);
        assert_eq!(err.offset(), Some(4));
    }

    #[test]
    fn test_trap_conversion() {
        let err: Error = TrapCode::Unreachable.into();
        assert!(err.is_trap());
        assert_eq!(err.code, codes::TRAP_UNREACHABLE);
        assert_eq!(err.trap_code(), Some(TrapCode::Unreachable));
        assert!(err.into_trap().is_some());
    }

    #[test]
    fn test_host_error_is_source() {
        use std::error::Error as _;

        let trap = Trap::host(Error::host("boom"));
        let err: Error = trap.into();
        let source = err.source().expect("host error source");
        assert!(source.to_string().contains("boom"));
    }
}
