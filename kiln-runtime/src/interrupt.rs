// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Asynchronous interruption of running code.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Requests that a store stop executing WebAssembly
///
/// The flag is checked at every loop back-edge and every call. When it is
/// found set, execution traps with `Interrupted` and the flag is cleared.
/// Handles are cheap to clone and may be used from any thread.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Create a handle with the flag cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running code to stop.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether an interruption is pending.
    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clear a pending request without trapping.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Consume a pending request.
    pub(crate) fn take(&self) -> bool {
        self.flag.load(Ordering::Relaxed) && self.flag.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_flag() {
        let handle = InterruptHandle::new();
        let remote = handle.clone();
        assert!(!handle.take());
        remote.interrupt();
        assert!(handle.is_interrupted());
        assert!(handle.take());
        assert!(!handle.take());
    }

    #[test]
    fn test_handle_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InterruptHandle>();
    }
}
