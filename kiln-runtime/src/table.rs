// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly tables.
//!
//! Elements are stored as raw reference cells (`0` for null, `addr + 1`
//! otherwise), the same encoding the interpreter uses on its stack.

use kiln_error::{codes, Error, ErrorCategory, Result, TrapCode};
use kiln_foundation::{TableType, Value};
use log::debug;

use crate::{
    store::{Store, StoreId},
    TrapResult,
};

/// Upper bound on the number of elements of any table
pub const MAX_TABLE_ELEMENTS: u32 = 10_000_000;

/// A resizable array of references
#[derive(Debug, Clone)]
pub struct TableInstance {
    ty:       TableType,
    elements: Vec<u64>,
}

impl TableInstance {
    /// Allocate `ty.limits.min` elements set to `init`.
    pub fn allocate(ty: TableType, init: u64) -> Result<Self> {
        if ty.limits.min > MAX_TABLE_ELEMENTS {
            return Err(Error::new(
                ErrorCategory::Resource,
                codes::RESOURCE_LIMIT,
                format!("table of {} elements exceeds the limit of {MAX_TABLE_ELEMENTS}", ty.limits.min),
            ));
        }
        Ok(Self { ty, elements: vec![init; ty.limits.min as usize] })
    }

    /// Number of elements.
    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    /// The table's type with the current size as minimum.
    pub fn ty(&self) -> TableType {
        TableType::new(self.ty.element, self.size(), self.ty.limits.max)
    }

    /// Element at `index`.
    pub fn get(&self, index: u32) -> TrapResult<u64> {
        self.elements.get(index as usize).copied().ok_or(TrapCode::OutOfBoundsTableAccess)
    }

    /// Replace the element at `index`.
    pub fn set(&mut self, index: u32, value: u64) -> TrapResult<()> {
        let slot = self.elements.get_mut(index as usize).ok_or(TrapCode::OutOfBoundsTableAccess)?;
        *slot = value;
        Ok(())
    }

    /// Grow by `delta` elements set to `init`, returning the old size.
    ///
    /// Returns `None` and leaves the table unchanged if the new size exceeds
    /// the maximum.
    pub fn grow(&mut self, delta: u32, init: u64) -> Option<u32> {
        let old = self.size();
        let max = self.ty.limits.max.unwrap_or(u32::MAX).min(MAX_TABLE_ELEMENTS);
        let new = old.checked_add(delta).filter(|&n| n <= max)?;
        self.elements.resize(new as usize, init);
        if delta > 0 {
            debug!("table grew from {old} to {new} elements");
        }
        Some(old)
    }

    fn range(&self, start: u32, len: u32) -> TrapResult<std::ops::Range<usize>> {
        match start.checked_add(len) {
            Some(end) if end as usize <= self.elements.len() => Ok(start as usize..end as usize),
            _ => Err(TrapCode::OutOfBoundsTableAccess),
        }
    }

    /// `table.fill`
    pub fn fill(&mut self, dst: u32, value: u64, len: u32) -> TrapResult<()> {
        let range = self.range(dst, len)?;
        self.elements[range].fill(value);
        Ok(())
    }

    /// `table.copy` within this table; the regions may overlap.
    pub fn copy_within(&mut self, dst: u32, src: u32, len: u32) -> TrapResult<()> {
        let src = self.range(src, len)?;
        let dst = self.range(dst, len)?;
        self.elements.copy_within(src, dst.start);
        Ok(())
    }

    /// Elements `src..src + len`, for copying into another table.
    pub fn slice(&self, src: u32, len: u32) -> TrapResult<&[u64]> {
        let range = self.range(src, len)?;
        Ok(&self.elements[range])
    }

    /// `table.init`, and `table.copy` from another table.
    pub fn init(&mut self, dst: u32, items: &[u64], src: u32, len: u32) -> TrapResult<()> {
        let src = match src.checked_add(len) {
            Some(end) if end as usize <= items.len() => src as usize..end as usize,
            _ => return Err(TrapCode::OutOfBoundsTableAccess),
        };
        let dst = self.range(dst, len)?;
        self.elements[dst].copy_from_slice(&items[src]);
        Ok(())
    }
}

/// Handle to a table owned by a [`Store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Table {
    pub(crate) store: StoreId,
    pub(crate) index: u32,
}

impl Table {
    /// Create a host-defined table filled with `init`.
    pub fn new(store: &mut Store, ty: TableType, init: Value) -> Result<Table> {
        let raw = store.ref_to_raw(init, ty.element.into())?;
        let table = TableInstance::allocate(ty, raw)?;
        Ok(store.push_table(table))
    }

    /// Type of the table with its current size as minimum.
    pub fn ty(&self, store: &Store) -> Result<TableType> {
        Ok(store.table(*self)?.ty())
    }

    /// Number of elements.
    pub fn size(&self, store: &Store) -> Result<u32> {
        Ok(store.table(*self)?.size())
    }

    /// Element at `index`, `None` if out of bounds.
    pub fn get(&self, store: &Store, index: u32) -> Result<Option<Value>> {
        let table = store.table(*self)?;
        Ok(table.get(index).ok().map(|raw| Value::from_raw(table.ty.element.into(), raw)))
    }

    /// Replace the element at `index`.
    pub fn set(&self, store: &mut Store, index: u32, value: Value) -> Result<()> {
        let ty = store.table(*self)?.ty.element;
        let raw = store.ref_to_raw(value, ty.into())?;
        Ok(store.table_mut(*self)?.set(index, raw)?)
    }

    /// Grow by `delta` elements set to `init`, returning the old size.
    pub fn grow(&self, store: &mut Store, delta: u32, init: Value) -> Result<u32> {
        let ty = store.table(*self)?.ty.element;
        let raw = store.ref_to_raw(init, ty.into())?;
        store.table_mut(*self)?.grow(delta, raw).ok_or_else(|| {
            Error::new(
                ErrorCategory::Resource,
                codes::TABLE_GROW_FAILED,
                format!("cannot grow table by {delta} elements"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use kiln_foundation::RefType;

    use super::*;

    fn table(min: u32, max: Option<u32>) -> TableInstance {
        TableInstance::allocate(TableType::new(RefType::FuncRef, min, max), 0).unwrap()
    }

    #[test]
    fn test_get_set_bounds() {
        let mut t = table(2, None);
        t.set(1, 7).unwrap();
        assert_eq!(t.get(1), Ok(7));
        assert_eq!(t.get(2), Err(TrapCode::OutOfBoundsTableAccess));
        assert_eq!(t.set(2, 1), Err(TrapCode::OutOfBoundsTableAccess));
    }

    #[test]
    fn test_grow_respects_maximum() {
        let mut t = table(1, Some(3));
        assert_eq!(t.grow(2, 5), Some(1));
        assert_eq!(t.get(2), Ok(5));
        assert_eq!(t.grow(1, 0), None);
        assert_eq!(t.size(), 3);
    }

    #[test]
    fn test_bulk_operations_check_whole_range() {
        let mut t = table(4, None);
        t.init(0, &[1, 2, 3], 0, 3).unwrap();
        t.copy_within(1, 0, 3).unwrap();
        assert_eq!(t.slice(0, 4).unwrap(), &[1, 1, 2, 3]);
        assert!(t.fill(3, 9, 2).is_err());
        assert_eq!(t.get(3), Ok(3));
        assert!(t.init(0, &[1], 0, 2).is_err());
    }
}
