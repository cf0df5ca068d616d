// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The view a host function has of its caller.

use std::any::Any;

use kiln_error::{codes, Error, ErrorCategory, Result};

/// Access to the store and calling instance during a host call
///
/// The runtime implements this for its `Caller`. Memory accessors operate on
/// the calling instance's linear memory and fail if it has none.
pub trait HostContext {
    /// The store's user data.
    fn data(&self) -> &dyn Any;

    /// The store's user data, mutably.
    fn data_mut(&mut self) -> &mut dyn Any;

    /// Size in bytes of the caller's memory, `None` without a memory.
    fn memory_size(&self) -> Option<usize>;

    /// Copy bytes out of the caller's memory.
    fn read_memory(&self, offset: usize, buf: &mut [u8]) -> Result<()>;

    /// Copy bytes into the caller's memory.
    fn write_memory(&mut self, offset: usize, data: &[u8]) -> Result<()>;
}

impl dyn HostContext + '_ {
    /// Downcast the store's user data.
    pub fn data_ref<T: 'static>(&self) -> Option<&T> {
        self.data().downcast_ref()
    }

    /// Downcast the store's user data mutably.
    pub fn data_mut_ref<T: 'static>(&mut self) -> Option<&mut T> {
        self.data_mut().downcast_mut()
    }

    /// Read `len` bytes at `offset`.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_memory(offset, &mut buf)?;
        Ok(buf)
    }

    /// Read a UTF-8 string of `len` bytes at `offset`.
    pub fn read_str(&self, offset: usize, len: usize) -> Result<String> {
        String::from_utf8(self.read_bytes(offset, len)?).map_err(|_| {
            Error::new(
                ErrorCategory::Runtime,
                codes::RUNTIME_ERROR,
                format!("string at {offset:#x} is not valid UTF-8"),
            )
        })
    }
}
