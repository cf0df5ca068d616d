// Kiln - kiln-runtime
// Module: Module Instances
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Module instantiation and instance exports.
//!
//! Instantiation runs in a fixed order: imports are checked, functions,
//! tables, memories and globals are allocated, active element segments and
//! then active data segments are applied, and finally the start function
//! runs. If any step fails the [`Instance`] is never handed out and the
//! memories it claimed become available to other instances again.

use std::sync::Arc;

use kiln_decoder::{ConstExpr, DataMode, ElementMode, Import, Module};
use kiln_error::{codes, kinds, Error, ErrorCategory, Result};
use kiln_foundation::{ExternKind, ExternType, Limits};
use kiln_host::WasmTyList;
use log::debug;

use crate::{
    execution,
    func::{Func, TypedFunc},
    global::{Global, GlobalInstance},
    memory::{LinearMemory, Memory},
    store::{FuncEntity, InstanceData, Store, StoreId, WasmFunc},
    table::{Table, TableInstance},
};

/// Any entity that can be imported or exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extern {
    /// A function
    Func(Func),
    /// A table
    Table(Table),
    /// A linear memory
    Memory(Memory),
    /// A global
    Global(Global),
}

impl Extern {
    /// Kind tag.
    pub fn kind(&self) -> ExternKind {
        match self {
            Extern::Func(_) => ExternKind::Func,
            Extern::Table(_) => ExternKind::Table,
            Extern::Memory(_) => ExternKind::Memory,
            Extern::Global(_) => ExternKind::Global,
        }
    }

    /// Current type, with the current size as minimum for tables and
    /// memories.
    pub fn ty(&self, store: &Store) -> Result<ExternType> {
        Ok(match self {
            Extern::Func(func) => ExternType::Func(func.ty(store)?),
            Extern::Table(table) => ExternType::Table(table.ty(store)?),
            Extern::Memory(memory) => ExternType::Memory(memory.ty(store)?),
            Extern::Global(global) => ExternType::Global(global.ty(store)?),
        })
    }

    /// The function, if this is one.
    pub fn into_func(self) -> Option<Func> {
        match self {
            Extern::Func(func) => Some(func),
            _ => None,
        }
    }

    /// The table, if this is one.
    pub fn into_table(self) -> Option<Table> {
        match self {
            Extern::Table(table) => Some(table),
            _ => None,
        }
    }

    /// The memory, if this is one.
    pub fn into_memory(self) -> Option<Memory> {
        match self {
            Extern::Memory(memory) => Some(memory),
            _ => None,
        }
    }

    /// The global, if this is one.
    pub fn into_global(self) -> Option<Global> {
        match self {
            Extern::Global(global) => Some(global),
            _ => None,
        }
    }

    fn store_id(&self) -> StoreId {
        match self {
            Extern::Func(func) => func.store,
            Extern::Table(table) => table.store,
            Extern::Memory(memory) => memory.store,
            Extern::Global(global) => global.store,
        }
    }
}

impl From<Func> for Extern {
    fn from(func: Func) -> Self {
        Extern::Func(func)
    }
}

impl From<Table> for Extern {
    fn from(table: Table) -> Self {
        Extern::Table(table)
    }
}

impl From<Memory> for Extern {
    fn from(memory: Memory) -> Self {
        Extern::Memory(memory)
    }
}

impl From<Global> for Extern {
    fn from(global: Global) -> Self {
        Extern::Global(global)
    }
}

/// Handle to an instantiated module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instance {
    pub(crate) store: StoreId,
    pub(crate) index: u32,
}

impl Instance {
    /// Instantiate `module` with imports given in declaration order.
    ///
    /// Most embedders resolve imports by name through a
    /// [`Linker`](crate::Linker) instead.
    pub fn new(store: &mut Store, module: &Module, imports: &[Extern]) -> Result<Instance> {
        instantiate(store, module, imports)
    }

    fn data<'a>(&self, store: &'a Store) -> Option<&'a InstanceData> {
        if store.id() != self.store {
            return None;
        }
        store.instances.get(self.index as usize)
    }

    /// Look up an export by name.
    pub fn get_export(&self, store: &Store, name: &str) -> Option<Extern> {
        self.data(store)?
            .exports
            .iter()
            .find(|(export, _)| export == name)
            .map(|(_, ext)| *ext)
    }

    /// Look up an export by name, failing with a not-found error.
    pub fn export(&self, store: &Store, name: &str) -> Result<Extern> {
        self.get_export(store, name).ok_or_else(|| {
            Error::new(ErrorCategory::NotFound, codes::EXPORT_NOT_FOUND, format!("unknown export `{name}`"))
        })
    }

    /// An exported function.
    pub fn get_func(&self, store: &Store, name: &str) -> Option<Func> {
        self.get_export(store, name)?.into_func()
    }

    /// An exported memory.
    pub fn get_memory(&self, store: &Store, name: &str) -> Option<Memory> {
        self.get_export(store, name)?.into_memory()
    }

    /// An exported table.
    pub fn get_table(&self, store: &Store, name: &str) -> Option<Table> {
        self.get_export(store, name)?.into_table()
    }

    /// An exported global.
    pub fn get_global(&self, store: &Store, name: &str) -> Option<Global> {
        self.get_export(store, name)?.into_global()
    }

    /// An exported function with a statically checked signature.
    pub fn get_typed_func<Params: WasmTyList, Results: WasmTyList>(
        &self,
        store: &Store,
        name: &str,
    ) -> Result<TypedFunc<Params, Results>> {
        let func = self.export(store, name)?.into_func().ok_or_else(|| {
            Error::new(
                ErrorCategory::NotFound,
                codes::EXPORT_NOT_FOUND,
                format!("export `{name}` is not a function"),
            )
        })?;
        func.typed(store)
    }

    /// All exports in declaration order.
    pub fn exports<'a>(self, store: &'a Store) -> impl Iterator<Item = (&'a str, Extern)> + 'a {
        self.data(store)
            .into_iter()
            .flat_map(|data| data.exports.iter().map(|(name, ext)| (name.as_str(), *ext)))
    }

    /// The module this instance was created from.
    pub fn module<'a>(&self, store: &'a Store) -> Option<&'a Module> {
        self.data(store).map(|data| &data.module)
    }
}

fn import_name(import: &Import) -> String {
    format!("{}::{}", import.module, import.name)
}

fn type_mismatch(import: &Import, detail: String) -> Error {
    Error::new(
        ErrorCategory::Link,
        codes::IMPORT_TYPE_MISMATCH,
        format!("incompatible import type for `{}`: {detail}", import_name(import)),
    )
}

/// Check that `ext` can satisfy `import`.
pub(crate) fn check_import(store: &Store, module: &Module, import: &Import, ext: &Extern) -> Result<()> {
    store.check(ext.store_id())?;
    let expected = module.import_type(import).ok_or_else(|| type_mismatch(import, "unknown type".into()))?;
    let actual = ext.ty(store)?;
    if expected.kind() != actual.kind() {
        return Err(Error::new(
            ErrorCategory::Link,
            codes::IMPORT_KIND_MISMATCH,
            format!(
                "incompatible import kind for `{}`: expected {}, found {}",
                import_name(import),
                expected.kind(),
                actual.kind()
            ),
        ));
    }
    let limits = |actual: &Limits, required: &Limits| {
        if actual.is_subset_of(required) {
            Ok(())
        } else {
            Err(type_mismatch(import, format!("limits {actual} do not satisfy {required}")))
        }
    };
    match (&expected, &actual) {
        (ExternType::Func(expected), ExternType::Func(actual)) if expected != actual => {
            Err(type_mismatch(import, format!("expected {expected}, found {actual}")))
        },
        (ExternType::Table(expected), ExternType::Table(actual)) => {
            if expected.element != actual.element {
                return Err(type_mismatch(
                    import,
                    format!("expected {} table, found {}", expected.element, actual.element),
                ));
            }
            limits(&actual.limits, &expected.limits)
        },
        (ExternType::Memory(expected), ExternType::Memory(actual)) => limits(&actual.limits, &expected.limits),
        (ExternType::Global(expected), ExternType::Global(actual)) if expected != actual => Err(type_mismatch(
            import,
            format!(
                "expected {}{}, found {}{}",
                if expected.mutable { "mut " } else { "" },
                expected.value_type,
                if actual.mutable { "mut " } else { "" },
                actual.value_type
            ),
        )),
        _ => Ok(()),
    }
}

/// Instantiate `module` with resolved imports in declaration order.
pub(crate) fn instantiate(store: &mut Store, module: &Module, imports: &[Extern]) -> Result<Instance> {
    if imports.len() != module.imports().len() {
        return Err(Error::new(
            ErrorCategory::Link,
            codes::LINK_ERROR,
            format!("expected {} imports, found {}", module.imports().len(), imports.len()),
        ));
    }
    for (import, ext) in module.imports().iter().zip(imports) {
        check_import(store, module, import, ext)?;
    }

    let index = store.instances.len() as u32;
    match build(store, module, imports, index) {
        Ok(instance) => {
            debug!(
                "instantiated module{} as instance {index}",
                module.name().map(|name| format!(" {name}")).unwrap_or_default()
            );
            Ok(instance)
        },
        Err(err) => {
            for slot in &mut store.memories {
                if slot.owner == Some(index) {
                    slot.owner = None;
                }
            }
            debug!("instantiation failed: {err}");
            Err(err)
        },
    }
}

fn build(store: &mut Store, module: &Module, imports: &[Extern], index: u32) -> Result<Instance> {
    let mut funcs = Vec::new();
    let mut tables = Vec::new();
    let mut memories = Vec::new();
    let mut globals = Vec::new();
    for ext in imports {
        match ext {
            Extern::Func(func) => funcs.push(func.index),
            Extern::Table(table) => tables.push(table.index),
            Extern::Memory(memory) => memories.push(memory.index),
            Extern::Global(global) => globals.push(global.index),
        }
    }

    for &memory in &memories {
        let slot = store.memories.get_mut(memory as usize).ok_or_else(dangling)?;
        if let Some(owner) = slot.owner {
            return Err(Error::new(
                ErrorCategory::Link,
                codes::MEMORY_ALREADY_OWNED,
                format!("memory is already owned by instance {owner}"),
            ));
        }
        slot.owner = Some(index);
    }

    let imported_funcs = module.num_imported_funcs();
    for defined in 0..module.bodies().len() as u32 {
        let func_index = imported_funcs + defined;
        let ty = module.func_type(func_index).cloned().ok_or_else(dangling)?;
        let func = store.push_func(FuncEntity::Wasm(WasmFunc {
            ty,
            instance: index,
            module: module.clone(),
            index: func_index,
        }));
        funcs.push(func.index);
    }
    for ty in module.tables() {
        let table = store.push_table(TableInstance::allocate(*ty, 0)?);
        tables.push(table.index);
    }
    let page_cap = store.config().max_memory_pages;
    for ty in module.memories() {
        let memory = store.push_memory(LinearMemory::allocate(*ty, page_cap)?);
        if let Some(slot) = store.memories.get_mut(memory.index as usize) {
            slot.owner = Some(index);
        }
        memories.push(memory.index);
    }
    for def in module.globals() {
        let value = eval_const(store, &funcs, &globals, &def.init)?;
        let global = store.push_global(GlobalInstance::new(def.ty, value));
        globals.push(global.index);
    }

    let mut elements = Vec::with_capacity(module.elements().len());
    for segment in module.elements() {
        let items = segment
            .items
            .iter()
            .map(|item| eval_const(store, &funcs, &globals, item))
            .collect::<Result<Vec<_>>>()?;
        elements.push(Arc::<[u64]>::from(items));
    }
    let data = module.data().iter().map(|segment| segment.bytes.clone()).collect();

    let id = store.id();
    let exports = module
        .exports()
        .iter()
        .map(|export| {
            let lookup = |addrs: &[u32]| addrs.get(export.index as usize).copied().ok_or_else(dangling);
            let ext = match export.kind {
                ExternKind::Func => Extern::Func(Func { store: id, index: lookup(&funcs)? }),
                ExternKind::Table => Extern::Table(Table { store: id, index: lookup(&tables)? }),
                ExternKind::Memory => Extern::Memory(Memory { store: id, index: lookup(&memories)? }),
                ExternKind::Global => Extern::Global(Global { store: id, index: lookup(&globals)? }),
            };
            Ok((export.name.clone(), ext))
        })
        .collect::<Result<Vec<_>>>()?;

    store.instances.push(InstanceData {
        module: module.clone(),
        funcs,
        tables,
        memories,
        globals,
        elements,
        data,
        exports,
    });

    initialize_tables(store, module, index)?;
    initialize_memories(store, module, index)?;

    if let Some(start) = module.start() {
        let addr = instance_data(store, index)?.funcs.get(start as usize).copied().ok_or_else(dangling)?;
        debug!("running start function {start}");
        execution::invoke(store, addr, &[])?;
    }

    Ok(Instance { store: id, index })
}

fn initialize_tables(store: &mut Store, module: &Module, index: u32) -> Result<()> {
    for (i, segment) in module.elements().iter().enumerate() {
        match &segment.mode {
            ElementMode::Active { table, offset } => {
                let instance = instance_data(store, index)?;
                let addr = instance.tables.get(*table as usize).copied().ok_or_else(dangling)?;
                let items = instance.elements.get(i).cloned().ok_or_else(dangling)?;
                let offset = eval_const(store, &instance.funcs, &instance.globals, offset)? as u32;
                let table = store.tables.get_mut(addr as usize).ok_or_else(dangling)?;
                table.init(offset, &items, 0, items.len() as u32)?;
                drop_element(store, index, i);
            },
            ElementMode::Declarative => drop_element(store, index, i),
            ElementMode::Passive => {},
        }
    }
    Ok(())
}

fn initialize_memories(store: &mut Store, module: &Module, index: u32) -> Result<()> {
    for (i, segment) in module.data().iter().enumerate() {
        if let DataMode::Active { memory, offset } = &segment.mode {
            let instance = instance_data(store, index)?;
            let addr = instance.memories.get(*memory as usize).copied().ok_or_else(dangling)?;
            let offset = eval_const(store, &instance.funcs, &instance.globals, offset)? as u32;
            let bytes = &segment.bytes;
            let slot = store.memories.get_mut(addr as usize).ok_or_else(dangling)?;
            slot.memory.init(u64::from(offset), bytes, 0, bytes.len() as u64)?;
            if let Some(data) = store.instances.get_mut(index as usize).and_then(|data| data.data.get_mut(i)) {
                *data = Arc::from([]);
            }
        }
    }
    Ok(())
}

fn drop_element(store: &mut Store, index: u32, segment: usize) {
    if let Some(items) = store.instances.get_mut(index as usize).and_then(|data| data.elements.get_mut(segment)) {
        *items = Arc::from([]);
    }
}

fn instance_data(store: &Store, index: u32) -> Result<&InstanceData> {
    store.instances.get(index as usize).ok_or_else(dangling)
}

/// Evaluate a constant expression to a raw cell.
fn eval_const(store: &Store, funcs: &[u32], globals: &[u32], expr: &ConstExpr) -> Result<u64> {
    match *expr {
        ConstExpr::RefFunc(index) => {
            let addr = funcs.get(index as usize).ok_or_else(dangling)?;
            Ok(u64::from(*addr) + 1)
        },
        ConstExpr::GlobalGet(index) => {
            let addr = globals.get(index as usize).ok_or_else(dangling)?;
            store.globals.get(*addr as usize).map(|global| global.value).ok_or_else(dangling)
        },
        _ => expr.literal().map(|value| value.to_raw()).ok_or_else(dangling),
    }
}

fn dangling() -> Error {
    kinds::runtime_error("index outside of the instance's index space")
}
