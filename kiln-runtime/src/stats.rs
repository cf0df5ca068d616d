// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Execution statistics.

use std::fmt;

/// Counters collected while a store executes code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Lowered instructions executed
    pub ops_executed:       u64,
    /// WebAssembly function calls, entry calls included
    pub function_calls:     u64,
    /// Calls into host functions
    pub host_calls:         u64,
    /// Largest operand stack reached, in cells
    pub peak_operand_stack: usize,
    /// Deepest call nesting reached
    pub peak_call_depth:    usize,
}

impl ExecutionStats {
    pub(crate) fn record_depth(&mut self, depth: usize, stack_cells: usize) {
        self.peak_call_depth = self.peak_call_depth.max(depth);
        self.peak_operand_stack = self.peak_operand_stack.max(stack_cells);
    }
}

impl fmt::Display for ExecutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ops executed:       {}", self.ops_executed)?;
        writeln!(f, "function calls:     {}", self.function_calls)?;
        writeln!(f, "host calls:         {}", self.host_calls)?;
        writeln!(f, "peak operand stack: {} cells", self.peak_operand_stack)?;
        write!(f, "peak call depth:    {}", self.peak_call_depth)
    }
}
