// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Module representations.
//!
//! [`DecodedModule`] is the structural result of decoding: every section has
//! been parsed but nothing has been checked against the type system.
//! [`Module`] is only produced by [`crate::validation::validate`] and holds
//! lowered function bodies ready for execution. It is immutable and cheap to
//! clone, so one compiled module can back any number of instances on any
//! number of threads.

use std::{collections::HashMap, sync::Arc};

use kiln_foundation::{
    ExternKind, ExternType, FloatBits32, FloatBits64, FuncType, GlobalType, MemoryType, RefType,
    TableType, Value,
};
use kiln_instructions::{CompiledBody, Instruction};

/// What an import expects from the embedder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDesc {
    /// Function with the signature at this type index
    Func(u32),
    /// Table
    Table(TableType),
    /// Linear memory
    Memory(MemoryType),
    /// Global variable
    Global(GlobalType),
}

impl ImportDesc {
    /// Kind tag of the import.
    #[must_use]
    pub const fn kind(&self) -> ExternKind {
        match self {
            ImportDesc::Func(_) => ExternKind::Func,
            ImportDesc::Table(_) => ExternKind::Table,
            ImportDesc::Memory(_) => ExternKind::Memory,
            ImportDesc::Global(_) => ExternKind::Global,
        }
    }
}

/// An import declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Module namespace
    pub module: String,
    /// Field name
    pub name:   String,
    /// Expected entity
    pub desc:   ImportDesc,
}

/// An export declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Exported name, unique within the module
    pub name:  String,
    /// Kind of the exported entity
    pub kind:  ExternKind,
    /// Index into the corresponding index space
    pub index: u32,
}

/// A constant initializer expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstExpr {
    /// `i32.const`
    I32(i32),
    /// `i64.const`
    I64(i64),
    /// `f32.const`
    F32(FloatBits32),
    /// `f64.const`
    F64(FloatBits64),
    /// `ref.null`
    RefNull(RefType),
    /// `ref.func`
    RefFunc(u32),
    /// `global.get` of an imported global
    GlobalGet(u32),
}

impl ConstExpr {
    /// The value of an expression that does not depend on instance state.
    #[must_use]
    pub fn literal(&self) -> Option<Value> {
        match *self {
            ConstExpr::I32(v) => Some(Value::I32(v)),
            ConstExpr::I64(v) => Some(Value::I64(v)),
            ConstExpr::F32(v) => Some(Value::F32(v)),
            ConstExpr::F64(v) => Some(Value::F64(v)),
            ConstExpr::RefNull(ty) => Some(Value::null(ty)),
            ConstExpr::RefFunc(_) | ConstExpr::GlobalGet(_) => None,
        }
    }
}

/// A module-defined global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalDef {
    /// Type of the global
    pub ty:   GlobalType,
    /// Initial value
    pub init: ConstExpr,
}

/// How an element segment is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementMode {
    /// Copied into a table at instantiation
    Active {
        /// Destination table
        table:  u32,
        /// Start index in the table
        offset: ConstExpr,
    },
    /// Available to `table.init`
    Passive,
    /// Only forward-declares `ref.func` targets
    Declarative,
}

/// An element segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSegment {
    /// Type of the references
    pub ty:    RefType,
    /// Reference initializers
    pub items: Vec<ConstExpr>,
    /// Placement
    pub mode:  ElementMode,
}

/// How a data segment is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataMode {
    /// Copied into memory at instantiation
    Active {
        /// Destination memory
        memory: u32,
        /// Start address
        offset: ConstExpr,
    },
    /// Available to `memory.init`
    Passive,
}

/// A data segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    /// Placement
    pub mode:  DataMode,
    /// Payload
    pub bytes: Arc<[u8]>,
}

/// A custom section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSection {
    /// Section name
    pub name:   String,
    /// Offset of the section payload in the module
    pub offset: usize,
    /// Payload following the name
    pub data:   Vec<u8>,
}

/// A decoded function body
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    /// Declared locals, one entry per local
    pub locals:       Vec<kiln_foundation::ValueType>,
    /// Instructions up to and including the final `end`
    pub instructions: Vec<Instruction>,
    /// Module byte offset of each instruction
    pub offsets:      Vec<u32>,
    /// Module byte offset of the body
    pub offset:       usize,
}

/// Debug names from the `name` custom section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Names {
    /// Module name
    pub module:    Option<String>,
    /// Function names by function index
    pub functions: HashMap<u32, String>,
}

/// A decoded, not yet validated module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedModule {
    /// Type section
    pub types:           Vec<FuncType>,
    /// Import section, in declaration order
    pub imports:         Vec<Import>,
    /// Type indices of the module-defined functions
    pub functions:       Vec<u32>,
    /// Module-defined tables
    pub tables:          Vec<TableType>,
    /// Module-defined memories
    pub memories:        Vec<MemoryType>,
    /// Module-defined globals
    pub globals:         Vec<GlobalDef>,
    /// Export section, in declaration order
    pub exports:         Vec<Export>,
    /// Start function
    pub start:           Option<u32>,
    /// Element section
    pub elements:        Vec<ElementSegment>,
    /// Data count section
    pub data_count:      Option<u32>,
    /// Code section
    pub bodies:          Vec<FunctionBody>,
    /// Data section
    pub data:            Vec<DataSegment>,
    /// Custom sections, in order of appearance
    pub custom_sections: Vec<CustomSection>,
    /// Parsed `name` section
    pub names:           Names,
}

impl DecodedModule {
    /// Number of imports of the given kind.
    #[must_use]
    pub fn imported_count(&self, kind: ExternKind) -> usize {
        self.imports.iter().filter(|import| import.desc.kind() == kind).count()
    }
}

#[derive(Debug)]
pub(crate) struct ModuleInner {
    pub(crate) types:                Vec<FuncType>,
    pub(crate) imports:              Vec<Import>,
    pub(crate) func_types:           Vec<u32>,
    pub(crate) bodies:               Vec<CompiledBody>,
    pub(crate) tables:               Vec<TableType>,
    pub(crate) memories:             Vec<MemoryType>,
    pub(crate) globals:              Vec<GlobalDef>,
    pub(crate) exports:              Vec<Export>,
    pub(crate) start:                Option<u32>,
    pub(crate) elements:             Vec<ElementSegment>,
    pub(crate) data:                 Vec<DataSegment>,
    pub(crate) custom_sections:      Vec<CustomSection>,
    pub(crate) names:                Names,
    pub(crate) num_imported_funcs:   u32,
    pub(crate) num_imported_tables:  u32,
    pub(crate) num_imported_mems:    u32,
    pub(crate) num_imported_globals: u32,
}

/// A validated module ready for instantiation
///
/// Index spaces follow the WebAssembly convention: imported entities come
/// first, followed by the module-defined ones.
#[derive(Debug, Clone)]
pub struct Module {
    pub(crate) inner: Arc<ModuleInner>,
}

impl Module {
    /// All function signatures of the type section.
    #[must_use]
    pub fn types(&self) -> &[FuncType] {
        &self.inner.types
    }

    /// Imports in declaration order.
    #[must_use]
    pub fn imports(&self) -> &[Import] {
        &self.inner.imports
    }

    /// Exports in declaration order.
    #[must_use]
    pub fn exports(&self) -> &[Export] {
        &self.inner.exports
    }

    /// Type index of any function in the function index space.
    #[must_use]
    pub fn func_type_index(&self, func_index: u32) -> Option<u32> {
        let imported = self.inner.num_imported_funcs;
        if func_index < imported {
            self.inner
                .imports
                .iter()
                .filter_map(|import| match import.desc {
                    ImportDesc::Func(ty) => Some(ty),
                    _ => None,
                })
                .nth(func_index as usize)
        } else {
            self.inner.func_types.get((func_index - imported) as usize).copied()
        }
    }

    /// Signature of any function in the function index space.
    #[must_use]
    pub fn func_type(&self, func_index: u32) -> Option<&FuncType> {
        self.func_type_index(func_index).and_then(|ty| self.inner.types.get(ty as usize))
    }

    /// Type indices of the module-defined functions.
    #[must_use]
    pub fn defined_func_types(&self) -> &[u32] {
        &self.inner.func_types
    }

    /// Lowered bodies of the module-defined functions.
    #[must_use]
    pub fn bodies(&self) -> &[CompiledBody] {
        &self.inner.bodies
    }

    /// Module-defined tables.
    #[must_use]
    pub fn tables(&self) -> &[TableType] {
        &self.inner.tables
    }

    /// Module-defined memories.
    #[must_use]
    pub fn memories(&self) -> &[MemoryType] {
        &self.inner.memories
    }

    /// Module-defined globals.
    #[must_use]
    pub fn globals(&self) -> &[GlobalDef] {
        &self.inner.globals
    }

    /// Start function index.
    #[must_use]
    pub fn start(&self) -> Option<u32> {
        self.inner.start
    }

    /// Element segments.
    #[must_use]
    pub fn elements(&self) -> &[ElementSegment] {
        &self.inner.elements
    }

    /// Data segments.
    #[must_use]
    pub fn data(&self) -> &[DataSegment] {
        &self.inner.data
    }

    /// Custom sections in order of appearance.
    #[must_use]
    pub fn custom_sections(&self) -> &[CustomSection] {
        &self.inner.custom_sections
    }

    /// Module name from the `name` section.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.names.module.as_deref()
    }

    /// Debug name of a function from the `name` section.
    #[must_use]
    pub fn func_name(&self, func_index: u32) -> Option<&str> {
        self.inner.names.functions.get(&func_index).map(String::as_str)
    }

    /// Number of imported functions.
    #[must_use]
    pub fn num_imported_funcs(&self) -> u32 {
        self.inner.num_imported_funcs
    }

    /// Number of imported tables.
    #[must_use]
    pub fn num_imported_tables(&self) -> u32 {
        self.inner.num_imported_tables
    }

    /// Number of imported memories.
    #[must_use]
    pub fn num_imported_memories(&self) -> u32 {
        self.inner.num_imported_mems
    }

    /// Number of imported globals.
    #[must_use]
    pub fn num_imported_globals(&self) -> u32 {
        self.inner.num_imported_globals
    }

    /// Type of an import.
    #[must_use]
    pub fn import_type(&self, import: &Import) -> Option<ExternType> {
        Some(match &import.desc {
            ImportDesc::Func(ty) => ExternType::Func(self.inner.types.get(*ty as usize)?.clone()),
            ImportDesc::Table(ty) => ExternType::Table(*ty),
            ImportDesc::Memory(ty) => ExternType::Memory(*ty),
            ImportDesc::Global(ty) => ExternType::Global(*ty),
        })
    }

    /// Type of an export.
    #[must_use]
    pub fn export_type(&self, export: &Export) -> Option<ExternType> {
        let index = export.index;
        Some(match export.kind {
            ExternKind::Func => ExternType::Func(self.func_type(index)?.clone()),
            ExternKind::Table => ExternType::Table(self.table_type(index)?),
            ExternKind::Memory => ExternType::Memory(self.memory_type(index)?),
            ExternKind::Global => ExternType::Global(self.global_type(index)?),
        })
    }

    /// Type of any table in the table index space.
    #[must_use]
    pub fn table_type(&self, index: u32) -> Option<TableType> {
        let mut imported = self.inner.imports.iter().filter_map(|import| match import.desc {
            ImportDesc::Table(ty) => Some(ty),
            _ => None,
        });
        if index < self.inner.num_imported_tables {
            imported.nth(index as usize)
        } else {
            self.inner.tables.get((index - self.inner.num_imported_tables) as usize).copied()
        }
    }

    /// Type of any memory in the memory index space.
    #[must_use]
    pub fn memory_type(&self, index: u32) -> Option<MemoryType> {
        let mut imported = self.inner.imports.iter().filter_map(|import| match import.desc {
            ImportDesc::Memory(ty) => Some(ty),
            _ => None,
        });
        if index < self.inner.num_imported_mems {
            imported.nth(index as usize)
        } else {
            self.inner.memories.get((index - self.inner.num_imported_mems) as usize).copied()
        }
    }

    /// Type of any global in the global index space.
    #[must_use]
    pub fn global_type(&self, index: u32) -> Option<GlobalType> {
        let mut imported = self.inner.imports.iter().filter_map(|import| match import.desc {
            ImportDesc::Global(ty) => Some(ty),
            _ => None,
        });
        if index < self.inner.num_imported_globals {
            imported.nth(index as usize)
        } else {
            self.inner
                .globals
                .get((index - self.inner.num_imported_globals) as usize)
                .map(|global| global.ty)
        }
    }
}
