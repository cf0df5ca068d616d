// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Operand stack of the interpreter.
//!
//! Cells are untyped `u64`s. Each frame's locals sit at its base, followed
//! by the operands. The validator guarantees that well-typed code never pops
//! an empty stack, so popping an empty stack yields zero instead of failing.

/// Untyped value stack shared by all frames of one invocation
#[derive(Debug, Default)]
pub(crate) struct ValueStack {
    cells: Vec<u64>,
}

impl ValueStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub(crate) fn push(&mut self, cell: u64) {
        self.cells.push(cell);
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> u64 {
        self.cells.pop().unwrap_or_default()
    }

    #[inline]
    pub(crate) fn pop_u32(&mut self) -> u32 {
        self.pop() as u32
    }

    #[inline]
    pub(crate) fn peek(&self) -> u64 {
        self.cells.last().copied().unwrap_or_default()
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> u64 {
        self.cells.get(index).copied().unwrap_or_default()
    }

    #[inline]
    pub(crate) fn set(&mut self, index: usize, cell: u64) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = cell;
        }
    }

    /// Push `count` zeroed cells (declared locals).
    pub(crate) fn push_zeros(&mut self, count: usize) {
        self.cells.resize(self.cells.len() + count, 0);
    }

    /// Keep the top `keep` cells and discard the `drop` cells beneath them.
    #[inline]
    pub(crate) fn drop_keep(&mut self, drop: usize, keep: usize) {
        if drop == 0 {
            return;
        }
        let len = self.cells.len();
        let Some(start) = len.checked_sub(keep) else { return };
        let Some(dest) = start.checked_sub(drop) else { return };
        self.cells.copy_within(start..len, dest);
        self.cells.truncate(len - drop);
    }

    /// Remove and return everything from `start` upwards.
    pub(crate) fn split_off(&mut self, start: usize) -> Vec<u64> {
        self.cells.split_off(start.min(self.cells.len()))
    }

    pub(crate) fn as_slice(&self) -> &[u64] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_keep_moves_carried_values() {
        let mut stack = ValueStack::new();
        for cell in 1..=5 {
            stack.push(cell);
        }
        stack.drop_keep(2, 1);
        assert_eq!(stack.as_slice(), &[1, 2, 5]);
        stack.drop_keep(0, 3);
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_locals_and_split() {
        let mut stack = ValueStack::new();
        stack.push(7);
        stack.push_zeros(2);
        stack.set(2, 9);
        assert_eq!(stack.get(2), 9);
        assert_eq!(stack.split_off(1), vec![0, 9]);
        assert_eq!(stack.peek(), 7);
        assert_eq!(stack.pop(), 7);
        assert_eq!(stack.pop(), 0);
    }
}
