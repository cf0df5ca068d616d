// Kiln - kiln-runtime
// Module: Store
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The store: owner of all runtime state.
//!
//! Functions, memories, tables, globals and instances live in flat vectors
//! inside a [`Store`] and are addressed by index. The embedder holds small
//! `Copy` handles carrying the store's id, so a handle used with the wrong
//! store is detected instead of aliasing someone else's state. Everything is
//! released when the store is dropped.

use std::{
    any::Any,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use kiln_decoder::Module;
use kiln_error::{codes, kinds, Error, ErrorCategory, Result};
use kiln_foundation::{ExternAddr, FuncAddr, FuncType, Value, ValueType};

use crate::{
    config::Config,
    engine::Engine,
    func::{Func, HostFuncEntity},
    global::{Global, GlobalInstance},
    instance::Extern,
    interrupt::InterruptHandle,
    memory::{LinearMemory, Memory},
    stats::ExecutionStats,
    table::{Table, TableInstance},
};

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identity of a [`Store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A function defined by a module instance
#[derive(Debug, Clone)]
pub(crate) struct WasmFunc {
    pub(crate) ty:       FuncType,
    pub(crate) instance: u32,
    pub(crate) module:   Module,
    /// Index into the module's function index space
    pub(crate) index:    u32,
}

#[derive(Debug, Clone)]
pub(crate) enum FuncEntity {
    Wasm(WasmFunc),
    Host(HostFuncEntity),
}

impl FuncEntity {
    pub(crate) fn ty(&self) -> &FuncType {
        match self {
            FuncEntity::Wasm(func) => &func.ty,
            FuncEntity::Host(func) => &func.ty,
        }
    }
}

#[derive(Debug)]
pub(crate) struct MemorySlot {
    pub(crate) memory: LinearMemory,
    /// Instance that defined or imported the memory
    pub(crate) owner:  Option<u32>,
}

/// Runtime state of one module instance
#[derive(Debug)]
pub(crate) struct InstanceData {
    pub(crate) module:   Module,
    pub(crate) funcs:    Vec<u32>,
    pub(crate) tables:   Vec<u32>,
    pub(crate) memories: Vec<u32>,
    pub(crate) globals:  Vec<u32>,
    /// Element segments as raw references, emptied by `elem.drop`
    pub(crate) elements: Vec<Arc<[u64]>>,
    /// Data segments, emptied by `data.drop`
    pub(crate) data:     Vec<Arc<[u8]>>,
    pub(crate) exports:  Vec<(String, Extern)>,
}

/// Container for all instances and the state they own
///
/// A store carries one value of embedder data, reachable from host
/// functions, and the configuration of the [`Engine`] it was created from.
/// It is `Send`, so it can move to another thread between calls.
pub struct Store {
    id:                   StoreId,
    engine:               Engine,
    data:                 Box<dyn Any + Send>,
    pub(crate) funcs:     Vec<FuncEntity>,
    pub(crate) memories:  Vec<MemorySlot>,
    pub(crate) tables:    Vec<TableInstance>,
    pub(crate) globals:   Vec<GlobalInstance>,
    pub(crate) instances: Vec<InstanceData>,
    externs:              Vec<Box<dyn Any + Send>>,
    interrupt:            InterruptHandle,
    pub(crate) fuel:      Option<u64>,
    pub(crate) stats:     ExecutionStats,
    /// WebAssembly frames active in enclosing invocations
    pub(crate) depth:     usize,
}

impl Store {
    /// Create an empty store holding `data`.
    pub fn new(engine: &Engine, data: impl Any + Send) -> Self {
        Self {
            id:        StoreId::next(),
            engine:    engine.clone(),
            data:      Box::new(data),
            funcs:     Vec::new(),
            memories:  Vec::new(),
            tables:    Vec::new(),
            globals:   Vec::new(),
            instances: Vec::new(),
            externs:   Vec::new(),
            interrupt: InterruptHandle::new(),
            fuel:      engine.config().consume_fuel.then_some(0),
            stats:     ExecutionStats::default(),
            depth:     0,
        }
    }

    /// The store's identity.
    pub fn id(&self) -> StoreId {
        self.id
    }

    /// The engine this store was created from.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The engine configuration.
    pub fn config(&self) -> &Config {
        self.engine.config()
    }

    /// The embedder data, if it has type `T`.
    pub fn data<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }

    /// The embedder data, mutably, if it has type `T`.
    pub fn data_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.data.downcast_mut()
    }

    pub(crate) fn data_any(&self) -> &dyn Any {
        &*self.data
    }

    pub(crate) fn data_any_mut(&mut self) -> &mut dyn Any {
        &mut *self.data
    }

    /// A handle for interrupting code running in this store.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub(crate) fn interrupt(&self) -> &InterruptHandle {
        &self.interrupt
    }

    /// Remaining fuel, `None` if fuel metering is disabled.
    pub fn fuel_remaining(&self) -> Option<u64> {
        self.fuel
    }

    /// Set the remaining fuel.
    pub fn set_fuel(&mut self, fuel: u64) -> Result<()> {
        let slot = self.fuel.as_mut().ok_or_else(fuel_disabled)?;
        *slot = fuel;
        Ok(())
    }

    /// Add fuel, saturating at `u64::MAX`.
    pub fn add_fuel(&mut self, fuel: u64) -> Result<()> {
        let slot = self.fuel.as_mut().ok_or_else(fuel_disabled)?;
        *slot = slot.saturating_add(fuel);
        Ok(())
    }

    /// Counters collected so far.
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Reset all counters.
    pub fn reset_stats(&mut self) {
        self.stats = ExecutionStats::default();
    }

    /// Peak size in pages of every memory in the store.
    pub fn memory_peaks(&self) -> Vec<u32> {
        self.memories.iter().map(|slot| slot.memory.peak_pages()).collect()
    }

    /// Wrap host data in a new `externref` value.
    pub fn new_externref(&mut self, data: impl Any + Send) -> Value {
        let addr = ExternAddr(self.externs.len() as u32);
        self.externs.push(Box::new(data));
        Value::ExternRef(Some(addr))
    }

    /// The host data behind an `externref`.
    pub fn externref_data(&self, addr: ExternAddr) -> Option<&(dyn Any + Send)> {
        self.externs.get(addr.0 as usize).map(|data| &**data)
    }

    pub(crate) fn check(&self, id: StoreId) -> Result<()> {
        if id != self.id {
            return Err(Error::new(
                ErrorCategory::Link,
                codes::STORE_MISMATCH,
                "object used with a store it does not belong to",
            ));
        }
        Ok(())
    }

    /// Encode a value for storage, checking its type and that references
    /// point into this store.
    pub(crate) fn value_to_raw(&self, value: Value, ty: ValueType) -> Result<u64> {
        if !value.matches_type(ty) {
            return Err(kinds::type_error(format!(
                "type mismatch: expected {ty}, found {}",
                value.value_type()
            )));
        }
        let valid = match value {
            Value::FuncRef(Some(FuncAddr(addr))) => (addr as usize) < self.funcs.len(),
            Value::ExternRef(Some(ExternAddr(addr))) => (addr as usize) < self.externs.len(),
            _ => true,
        };
        if !valid {
            return Err(kinds::type_error("reference does not belong to this store"));
        }
        Ok(value.to_raw())
    }

    pub(crate) fn ref_to_raw(&self, value: Value, ty: ValueType) -> Result<u64> {
        self.value_to_raw(value, ty)
    }

    pub(crate) fn push_func(&mut self, func: FuncEntity) -> Func {
        let index = self.funcs.len() as u32;
        self.funcs.push(func);
        Func { store: self.id, index }
    }

    pub(crate) fn func(&self, handle: Func) -> Result<&FuncEntity> {
        self.check(handle.store)?;
        self.funcs.get(handle.index as usize).ok_or_else(invalid_handle)
    }

    pub(crate) fn push_memory(&mut self, memory: LinearMemory) -> Memory {
        let index = self.memories.len() as u32;
        self.memories.push(MemorySlot { memory, owner: None });
        Memory { store: self.id, index }
    }

    pub(crate) fn memory(&self, handle: Memory) -> Result<&LinearMemory> {
        self.check(handle.store)?;
        self.memories.get(handle.index as usize).map(|slot| &slot.memory).ok_or_else(invalid_handle)
    }

    pub(crate) fn memory_mut(&mut self, handle: Memory) -> Result<&mut LinearMemory> {
        self.check(handle.store)?;
        self.memories
            .get_mut(handle.index as usize)
            .map(|slot| &mut slot.memory)
            .ok_or_else(invalid_handle)
    }

    pub(crate) fn push_table(&mut self, table: TableInstance) -> Table {
        let index = self.tables.len() as u32;
        self.tables.push(table);
        Table { store: self.id, index }
    }

    pub(crate) fn table(&self, handle: Table) -> Result<&TableInstance> {
        self.check(handle.store)?;
        self.tables.get(handle.index as usize).ok_or_else(invalid_handle)
    }

    pub(crate) fn table_mut(&mut self, handle: Table) -> Result<&mut TableInstance> {
        self.check(handle.store)?;
        self.tables.get_mut(handle.index as usize).ok_or_else(invalid_handle)
    }

    pub(crate) fn push_global(&mut self, global: GlobalInstance) -> Global {
        let index = self.globals.len() as u32;
        self.globals.push(global);
        Global { store: self.id, index }
    }

    pub(crate) fn global(&self, handle: Global) -> Result<&GlobalInstance> {
        self.check(handle.store)?;
        self.globals.get(handle.index as usize).ok_or_else(invalid_handle)
    }

    pub(crate) fn global_mut(&mut self, handle: Global) -> Result<&mut GlobalInstance> {
        self.check(handle.store)?;
        self.globals.get_mut(handle.index as usize).ok_or_else(invalid_handle)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("funcs", &self.funcs.len())
            .field("memories", &self.memories.len())
            .field("tables", &self.tables.len())
            .field("globals", &self.globals.len())
            .field("instances", &self.instances.len())
            .field("fuel", &self.fuel)
            .finish_non_exhaustive()
    }
}

fn fuel_disabled() -> Error {
    kinds::runtime_error("fuel consumption is not enabled in the engine configuration")
}

fn invalid_handle() -> Error {
    Error::new(ErrorCategory::NotFound, codes::INVALID_HANDLE, "handle does not refer to a live object")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Store>();
    }

    #[test]
    fn test_user_data_downcast() {
        let mut store = Store::new(&Engine::default(), 41u32);
        *store.data_mut::<u32>().unwrap() += 1;
        assert_eq!(store.data::<u32>(), Some(&42));
        assert!(store.data::<String>().is_none());
    }

    #[test]
    fn test_fuel_requires_configuration() {
        let mut store = Store::new(&Engine::default(), ());
        assert_eq!(store.fuel_remaining(), None);
        assert!(store.add_fuel(10).is_err());

        let engine = Engine::new(Config::default().with_consume_fuel(true));
        let mut store = Store::new(&engine, ());
        assert_eq!(store.fuel_remaining(), Some(0));
        store.add_fuel(10).unwrap();
        store.add_fuel(u64::MAX).unwrap();
        assert_eq!(store.fuel_remaining(), Some(u64::MAX));
    }

    #[test]
    fn test_handles_are_bound_to_their_store() {
        let engine = Engine::default();
        let mut a = Store::new(&engine, ());
        let b = Store::new(&engine, ());
        let memory = Memory::new(&mut a, kiln_foundation::MemoryType::new(1, None)).unwrap();
        assert_eq!(memory.size(&a).unwrap(), 1);
        assert_eq!(memory.size(&b).unwrap_err().code, codes::STORE_MISMATCH);
    }

    #[test]
    fn test_externref_round_trip() {
        let mut store = Store::new(&Engine::default(), ());
        let value = store.new_externref(String::from("handle"));
        let addr = value.as_externref().flatten().unwrap();
        let data = store.externref_data(addr).unwrap();
        assert_eq!(data.downcast_ref::<String>().map(String::as_str), Some("handle"));
        assert!(store.value_to_raw(Value::ExternRef(Some(ExternAddr(9))), ValueType::ExternRef).is_err());
    }
}
