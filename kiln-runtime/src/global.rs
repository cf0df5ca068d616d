// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly globals.

use kiln_error::{codes, Error, ErrorCategory, Result};
use kiln_foundation::{GlobalType, Value};

use crate::store::{Store, StoreId};

/// A typed cell holding its value as a raw stack cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalInstance {
    pub(crate) ty:    GlobalType,
    pub(crate) value: u64,
}

impl GlobalInstance {
    /// Create a global from a raw cell of the right type.
    pub fn new(ty: GlobalType, value: u64) -> Self {
        Self { ty, value }
    }

    /// The global's type.
    pub fn ty(&self) -> GlobalType {
        self.ty
    }

    /// The current value.
    pub fn get(&self) -> Value {
        Value::from_raw(self.ty.value_type, self.value)
    }
}

/// Handle to a global owned by a [`Store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Global {
    pub(crate) store: StoreId,
    pub(crate) index: u32,
}

impl Global {
    /// Create a host-defined global.
    pub fn new(store: &mut Store, ty: GlobalType, value: Value) -> Result<Global> {
        let raw = store.value_to_raw(value, ty.value_type)?;
        Ok(store.push_global(GlobalInstance::new(ty, raw)))
    }

    /// The global's type.
    pub fn ty(&self, store: &Store) -> Result<GlobalType> {
        Ok(store.global(*self)?.ty)
    }

    /// The current value.
    pub fn get(&self, store: &Store) -> Result<Value> {
        Ok(store.global(*self)?.get())
    }

    /// Replace the value of a mutable global.
    pub fn set(&self, store: &mut Store, value: Value) -> Result<()> {
        let ty = store.global(*self)?.ty;
        if !ty.mutable {
            return Err(Error::new(
                ErrorCategory::Type,
                codes::IMMUTABLE_GLOBAL_SET,
                "cannot set an immutable global",
            ));
        }
        let raw = store.value_to_raw(value, ty.value_type)?;
        store.global_mut(*self)?.value = raw;
        Ok(())
    }
}
