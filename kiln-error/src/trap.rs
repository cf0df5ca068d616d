// Kiln - kiln-error
// Module: Traps
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Trap causes and WebAssembly-level stack traces.
//!
//! A trap aborts the current call and unwinds every WebAssembly frame up to
//! the embedder. It never corrupts the host process, and it does not roll
//! back memory or global writes committed before it was raised.

use std::fmt;

use crate::{codes, Error, ErrorCategory, ToErrorCategory};

/// The cause of a trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrapCode {
    /// The `unreachable` instruction was executed
    Unreachable,
    /// A load, store or bulk memory operation accessed memory out of bounds
    OutOfBoundsMemoryAccess,
    /// A table access or bulk table operation was out of bounds
    OutOfBoundsTableAccess,
    /// An indirect call index was past the end of the table
    UndefinedElement,
    /// An indirect call went through a null table entry
    UninitializedElement,
    /// An indirect call's callee does not have the expected signature
    IndirectCallTypeMismatch,
    /// Integer division or remainder by zero
    IntegerDivideByZero,
    /// Integer overflow (`MIN / -1`, out-of-range float truncation)
    IntegerOverflow,
    /// Float to integer conversion of NaN
    InvalidConversionToInteger,
    /// Call depth or operand stack limit exhausted
    StackOverflow,
    /// The embedder requested interruption
    Interrupted,
    /// Fuel metering ran out
    OutOfFuel,
    /// A host function returned an error
    HostError,
}

impl TrapCode {
    /// Description of the trap cause.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable executed",
            Self::OutOfBoundsMemoryAccess => "out of bounds memory access",
            Self::OutOfBoundsTableAccess => "out of bounds table access",
            Self::UndefinedElement => "undefined element",
            Self::UninitializedElement => "uninitialized element",
            Self::IndirectCallTypeMismatch => "indirect call type mismatch",
            Self::IntegerDivideByZero => "integer divide by zero",
            Self::IntegerOverflow => "integer overflow",
            Self::InvalidConversionToInteger => "invalid conversion to integer",
            Self::StackOverflow => "call stack exhausted",
            Self::Interrupted => "interrupted",
            Self::OutOfFuel => "all fuel consumed",
            Self::HostError => "host function error",
        }
    }

    /// Error code in the trap range of [`codes`].
    #[must_use]
    pub const fn error_code(self) -> u16 {
        match self {
            Self::Unreachable => codes::TRAP_UNREACHABLE,
            Self::OutOfBoundsMemoryAccess => codes::TRAP_MEMORY_OUT_OF_BOUNDS,
            Self::OutOfBoundsTableAccess => codes::TRAP_TABLE_OUT_OF_BOUNDS,
            Self::UndefinedElement => codes::TRAP_UNDEFINED_ELEMENT,
            Self::UninitializedElement => codes::TRAP_UNINITIALIZED_ELEMENT,
            Self::IndirectCallTypeMismatch => codes::TRAP_INDIRECT_CALL_TYPE_MISMATCH,
            Self::IntegerDivideByZero => codes::TRAP_INTEGER_DIVIDE_BY_ZERO,
            Self::IntegerOverflow => codes::TRAP_INTEGER_OVERFLOW,
            Self::InvalidConversionToInteger => codes::TRAP_INVALID_CONVERSION,
            Self::StackOverflow => codes::TRAP_STACK_OVERFLOW,
            Self::Interrupted => codes::TRAP_INTERRUPTED,
            Self::OutOfFuel => codes::TRAP_OUT_OF_FUEL,
            Self::HostError => codes::TRAP_HOST_ERROR,
        }
    }
}

impl fmt::Display for TrapCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl ToErrorCategory for TrapCode {
    fn to_category(&self) -> ErrorCategory {
        ErrorCategory::RuntimeTrap
    }
}

/// One WebAssembly frame of a trap's stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Index of the function in its module's function index space
    pub func_index:   u32,
    /// Function name from the `name` custom section, if present
    pub func_name:    Option<String>,
    /// Byte offset of the executing instruction within the module binary
    pub instr_offset: usize,
}

impl fmt::Display for FrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.func_name {
            Some(name) => write!(f, "func[{}] <{}>", self.func_index, name)?,
            None => write!(f, "func[{}]", self.func_index)?,
        }
        write!(f, " @ {:#x}", self.instr_offset)
    }
}

/// A WebAssembly trap.
#[derive(Debug, Clone)]
pub struct Trap {
    code:       TrapCode,
    trace:      Vec<FrameInfo>,
    host_error: Option<Box<Error>>,
}

impl Trap {
    /// Create a trap without trace information.
    #[must_use]
    pub fn new(code: TrapCode) -> Self {
        Self {
            code,
            trace: Vec::new(),
            host_error: None,
        }
    }

    /// Create a [`TrapCode::HostError`] trap wrapping the host's error.
    #[must_use]
    pub fn host(error: Error) -> Self {
        Self {
            code: TrapCode::HostError,
            trace: Vec::new(),
            host_error: Some(Box::new(error)),
        }
    }

    /// The cause of the trap.
    #[must_use]
    pub const fn code(&self) -> TrapCode {
        self.code
    }

    /// WebAssembly frames active when the trap was raised, innermost first.
    #[must_use]
    pub fn trace(&self) -> &[FrameInfo] {
        &self.trace
    }

    /// The error returned by the host function, for host traps.
    #[must_use]
    pub fn host_error(&self) -> Option<&Error> {
        self.host_error.as_deref()
    }

    /// Replace the recorded trace.
    #[must_use]
    pub fn with_trace(mut self, trace: Vec<FrameInfo>) -> Self {
        self.trace = trace;
        self
    }

    /// Append frames that are further out than the recorded ones.
    pub fn extend_trace(&mut self, outer: impl IntoIterator<Item = FrameInfo>) {
        self.trace.extend(outer);
    }
}

impl From<TrapCode> for Trap {
    fn from(code: TrapCode) -> Self {
        Self::new(code)
    }
}

impl PartialEq<TrapCode> for Trap {
    fn eq(&self, other: &TrapCode) -> bool {
        self.code == *other
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wasm trap: {}", self.code)?;
        if let Some(host) = &self.host_error {
            write!(f, ": {}", host.message())?;
        }
        if !self.trace.is_empty() {
            f.write_str("\nwasm backtrace:")?;
            for (i, frame) in self.trace.iter().enumerate() {
                write!(f, "\n  {i:>3}: {frame}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trap_display_lists_frames() {
        let trap = Trap::new(TrapCode::IntegerDivideByZero).with_trace(vec![
            FrameInfo {
                func_index:   1,
                func_name:    Some("div".into()),
                instr_offset: 0x30,
            },
            FrameInfo {
                func_index:   0,
                func_name:    None,
                instr_offset: 0x22,
            },
        ]);
        let text = trap.to_string();
        assert!(text.starts_with("wasm trap: integer divide by zero"));
        assert!(text.contains("func[1] <div> @ 0x30"));
        assert!(text.contains("func[0] @ 0x22"));
    }

    #[test]
    fn test_extend_trace_keeps_inner_frames_first() {
        let frame = |func_index| FrameInfo {
            func_index,
            func_name: None,
            instr_offset: 0,
        };
        let mut trap = Trap::new(TrapCode::Unreachable).with_trace(vec![frame(3)]);
        trap.extend_trace([frame(2), frame(1)]);
        let order: Vec<_> = trap.trace().iter().map(|frame| frame.func_index).collect();
        assert_eq!(order, [3, 2, 1]);
    }

    #[test]
    fn test_every_code_maps_to_trap_range() {
        let all = [
            TrapCode::Unreachable,
            TrapCode::OutOfBoundsMemoryAccess,
            TrapCode::OutOfBoundsTableAccess,
            TrapCode::UndefinedElement,
            TrapCode::UninitializedElement,
            TrapCode::IndirectCallTypeMismatch,
            TrapCode::IntegerDivideByZero,
            TrapCode::IntegerOverflow,
            TrapCode::InvalidConversionToInteger,
            TrapCode::StackOverflow,
            TrapCode::Interrupted,
            TrapCode::OutOfFuel,
            TrapCode::HostError,
        ];
        for code in all {
            assert!((4000..4100).contains(&code.error_code()));
            assert_eq!(code.to_category(), ErrorCategory::RuntimeTrap);
        }
    }
}
