// Kiln - kiln-runtime
// Module: Linear Memory
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly linear memory.
//!
//! [`LinearMemory`] is the byte arena itself. Every access is checked
//! against the current size, with `offset + length` computed in 64 bits so
//! it cannot wrap, and a failed check touches nothing. Growth either
//! succeeds completely or leaves the memory unchanged. Memory never shrinks.
//!
//! [`Memory`] is the embedder's handle to a memory living in a [`Store`].
//!
//! ```
//! use kiln_foundation::MemoryType;
//! use kiln_runtime::LinearMemory;
//!
//! let mut memory = LinearMemory::allocate(MemoryType::new(1, Some(2)), 65536).unwrap();
//! memory.write(0, &[1, 2, 3, 4]).unwrap();
//!
//! let mut buffer = [0; 4];
//! memory.read(0, &mut buffer).unwrap();
//! assert_eq!(buffer, [1, 2, 3, 4]);
//!
//! assert_eq!(memory.grow(1).unwrap(), 1);
//! assert!(memory.grow(1).is_err());
//! ```

use std::ops::Range;

use kiln_error::{codes, Error, ErrorCategory, Result, TrapCode};
use kiln_foundation::{MemoryType, PAGE_SIZE};
use log::debug;

use crate::{
    store::{Store, StoreId},
    TrapResult,
};

fn grow_failed(message: String) -> Error {
    Error::new(ErrorCategory::Resource, codes::MEMORY_GROW_FAILED, message)
}

/// A contiguous, bounds-checked byte arena measured in 64 KiB pages
#[derive(Debug)]
pub struct LinearMemory {
    ty:   MemoryType,
    data: Vec<u8>,
    cap:  u32,
    peak: u32,
}

impl LinearMemory {
    /// Allocate `ty.limits.min` zeroed pages.
    ///
    /// The memory can grow up to its declared maximum, or `page_cap` pages
    /// if that is lower or no maximum was declared.
    pub fn allocate(ty: MemoryType, page_cap: u32) -> Result<Self> {
        let cap = ty.limits.max.map_or(page_cap, |max| max.min(page_cap));
        let initial = ty.limits.min;
        if initial > cap {
            return Err(Error::new(
                ErrorCategory::Resource,
                codes::RESOURCE_LIMIT,
                format!("memory of {initial} pages exceeds the limit of {cap} pages"),
            ));
        }
        let mut data = Vec::new();
        data.try_reserve_exact(initial as usize * PAGE_SIZE)
            .map_err(|_| grow_failed(format!("failed to allocate {initial} pages")))?;
        data.resize(initial as usize * PAGE_SIZE, 0);
        Ok(Self { ty, data, cap, peak: initial })
    }

    /// Current size in pages.
    pub fn size(&self) -> u32 {
        (self.data.len() / PAGE_SIZE) as u32
    }

    /// Current size in bytes.
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Largest size reached, in pages.
    pub fn peak_pages(&self) -> u32 {
        self.peak
    }

    /// The memory's type with the current size as minimum.
    pub fn ty(&self) -> MemoryType {
        MemoryType::new(self.size(), self.ty.limits.max)
    }

    /// The whole arena.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// The whole arena, mutably.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Grow by `delta` pages, returning the previous size in pages.
    pub fn grow(&mut self, delta: u32) -> Result<u32> {
        let old = self.size();
        let new = old
            .checked_add(delta)
            .filter(|&pages| pages <= self.cap)
            .ok_or_else(|| {
                grow_failed(format!(
                    "cannot grow memory by {delta} pages: size {old}, maximum {}",
                    self.cap
                ))
            })?;
        if delta == 0 {
            return Ok(old);
        }
        let additional = delta as usize * PAGE_SIZE;
        self.data
            .try_reserve_exact(additional)
            .map_err(|_| grow_failed(format!("failed to allocate {delta} pages")))?;
        self.data.resize(new as usize * PAGE_SIZE, 0);
        self.peak = self.peak.max(new);
        debug!("memory grew from {old} to {new} pages");
        Ok(old)
    }

    fn range(&self, offset: u64, len: u64) -> TrapResult<Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() as u64 => Ok(offset as usize..end as usize),
            _ => Err(TrapCode::OutOfBoundsMemoryAccess),
        }
    }

    /// Copy `buf.len()` bytes starting at `offset` into `buf`.
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> TrapResult<()> {
        let range = self.range(offset, buf.len() as u64)?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    /// Copy `bytes` into memory starting at `offset`.
    pub fn write(&mut self, offset: u64, bytes: &[u8]) -> TrapResult<()> {
        let range = self.range(offset, bytes.len() as u64)?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Little-endian load of `width` bytes, zero-extended.
    pub fn load(&self, addr: u64, width: u32) -> TrapResult<u64> {
        let range = self.range(addr, u64::from(width))?;
        let mut bytes = [0u8; 8];
        bytes[..width as usize].copy_from_slice(&self.data[range]);
        Ok(u64::from_le_bytes(bytes))
    }

    /// Little-endian store of the low `width` bytes of `value`.
    pub fn store(&mut self, addr: u64, width: u32, value: u64) -> TrapResult<()> {
        let range = self.range(addr, u64::from(width))?;
        self.data[range].copy_from_slice(&value.to_le_bytes()[..width as usize]);
        Ok(())
    }

    /// `memory.fill`
    pub fn fill(&mut self, dst: u64, value: u8, len: u64) -> TrapResult<()> {
        let range = self.range(dst, len)?;
        self.data[range].fill(value);
        Ok(())
    }

    /// `memory.copy`; the regions may overlap.
    pub fn copy(&mut self, dst: u64, src: u64, len: u64) -> TrapResult<()> {
        let src = self.range(src, len)?;
        let dst = self.range(dst, len)?;
        self.data.copy_within(src, dst.start);
        Ok(())
    }

    /// `memory.init` from a data segment.
    pub fn init(&mut self, dst: u64, segment: &[u8], src: u64, len: u64) -> TrapResult<()> {
        let src = match src.checked_add(len) {
            Some(end) if end <= segment.len() as u64 => src as usize..end as usize,
            _ => return Err(TrapCode::OutOfBoundsMemoryAccess),
        };
        let dst = self.range(dst, len)?;
        self.data[dst].copy_from_slice(&segment[src]);
        Ok(())
    }
}

/// Handle to a linear memory owned by a [`Store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory {
    pub(crate) store: StoreId,
    pub(crate) index: u32,
}

impl Memory {
    /// Create a host-defined memory, for example to be imported by a module.
    pub fn new(store: &mut Store, ty: MemoryType) -> Result<Memory> {
        let memory = LinearMemory::allocate(ty, store.config().max_memory_pages)?;
        Ok(store.push_memory(memory))
    }

    /// Type of the memory, with its current size as minimum.
    pub fn ty(&self, store: &Store) -> Result<MemoryType> {
        Ok(store.memory(*self)?.ty())
    }

    /// Current size in pages.
    pub fn size(&self, store: &Store) -> Result<u32> {
        Ok(store.memory(*self)?.size())
    }

    /// Current size in bytes.
    pub fn data_size(&self, store: &Store) -> Result<usize> {
        Ok(store.memory(*self)?.data_size())
    }

    /// Grow by `delta` pages and return the previous size.
    pub fn grow(&self, store: &mut Store, delta: u32) -> Result<u32> {
        store.memory_mut(*self)?.grow(delta)
    }

    /// Read `buf.len()` bytes at `offset`.
    pub fn read(&self, store: &Store, offset: usize, buf: &mut [u8]) -> Result<()> {
        Ok(store.memory(*self)?.read(offset as u64, buf)?)
    }

    /// Write `data` at `offset`.
    pub fn write(&self, store: &mut Store, offset: usize, data: &[u8]) -> Result<()> {
        Ok(store.memory_mut(*self)?.write(offset as u64, data)?)
    }

    /// The memory's bytes.
    pub fn data<'a>(&self, store: &'a Store) -> Result<&'a [u8]> {
        Ok(store.memory(*self)?.bytes())
    }

    /// The memory's bytes, mutably.
    pub fn data_mut<'a>(&self, store: &'a mut Store) -> Result<&'a mut [u8]> {
        Ok(store.memory_mut(*self)?.bytes_mut())
    }
}

#[cfg(test)]
mod tests {
    use kiln_foundation::MAX_MEMORY_PAGES;

    use super::*;

    fn one_page() -> LinearMemory {
        LinearMemory::allocate(MemoryType::new(1, None), MAX_MEMORY_PAGES).unwrap()
    }

    #[test]
    fn test_last_byte_is_readable_first_past_end_is_not() {
        let memory = one_page();
        let mut byte = [0u8; 1];
        assert!(memory.read(65535, &mut byte).is_ok());
        assert_eq!(memory.read(65536, &mut byte), Err(TrapCode::OutOfBoundsMemoryAccess));
    }

    #[test]
    fn test_grow_makes_new_pages_accessible() {
        let mut memory = one_page();
        assert!(memory.load(65536, 1).is_err());
        assert_eq!(memory.grow(1).unwrap(), 1);
        assert_eq!(memory.load(65536, 1), Ok(0));
        assert_eq!(memory.size(), 2);
        assert_eq!(memory.peak_pages(), 2);
    }

    #[test]
    fn test_grow_respects_maximum_and_cap() {
        let mut memory = LinearMemory::allocate(MemoryType::new(1, Some(3)), 2).unwrap();
        let err = memory.grow(2).unwrap_err();
        assert_eq!(err.code, codes::MEMORY_GROW_FAILED);
        assert_eq!(memory.size(), 1);
        assert_eq!(memory.grow(0).unwrap(), 1);
        assert!(LinearMemory::allocate(MemoryType::new(3, None), 2).is_err());
    }

    #[test]
    fn test_failed_store_leaves_memory_untouched() {
        let mut memory = one_page();
        memory.fill(65528, 0xAA, 8).unwrap();
        assert!(memory.store(65532, 8, u64::MAX).is_err());
        assert_eq!(memory.load(65528, 8), Ok(0xAAAA_AAAA_AAAA_AAAA));
    }

    #[test]
    fn test_offset_overflow_is_out_of_bounds() {
        let memory = one_page();
        assert!(memory.load(u64::MAX, 4).is_err());
        assert!(memory.load(u64::from(u32::MAX) + 4, 4).is_err());
    }

    #[test]
    fn test_load_store_little_endian() {
        let mut memory = one_page();
        memory.store(8, 4, 0x1122_3344).unwrap();
        assert_eq!(memory.bytes()[8..12], [0x44, 0x33, 0x22, 0x11]);
        assert_eq!(memory.load(8, 2), Ok(0x3344));
    }

    #[test]
    fn test_copy_handles_overlap() {
        let mut memory = one_page();
        memory.write(0, &[1, 2, 3, 4, 5]).unwrap();
        memory.copy(1, 0, 4).unwrap();
        assert_eq!(&memory.bytes()[..5], &[1, 1, 2, 3, 4]);
        memory.copy(0, 1, 4).unwrap();
        assert_eq!(&memory.bytes()[..5], &[1, 2, 3, 4, 4]);
        assert!(memory.copy(65535, 0, 2).is_err());
    }

    #[test]
    fn test_init_checks_segment_bounds() {
        let mut memory = one_page();
        memory.init(4, b"hello", 1, 3).unwrap();
        assert_eq!(&memory.bytes()[4..7], b"ell");
        assert!(memory.init(0, b"hello", 3, 3).is_err());
        assert!(memory.init(0, b"", 0, 0).is_ok());
        assert!(memory.init(65537, b"", 0, 0).is_err());
    }
}
