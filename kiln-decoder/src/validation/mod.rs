// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Module validation.
//!
//! [`validate`] checks every index, type, limit and constant expression of a
//! [`DecodedModule`] and then type-checks each function body, lowering it to
//! the direct-dispatch form as it goes. The result is the only way to obtain
//! a [`Module`].

mod func;

use std::{
    borrow::Cow,
    collections::HashSet,
    sync::Arc,
};

use kiln_error::{codes, Error, ErrorCategory, Result};
use kiln_foundation::{
    ExternKind, Features, FuncType, GlobalType, MemoryType, RefType, TableType, ValueType,
    MAX_MEMORY_PAGES, MAX_TABLE_SIZE,
};
use log::debug;

pub use self::func::validate_function;
use crate::module::{
    ConstExpr, DataMode, DecodedModule, ElementMode, ImportDesc, Module, ModuleInner,
};

fn invalid(code: u16, message: impl Into<Cow<'static, str>>) -> Error {
    Error::new(ErrorCategory::Validation, code, message)
}

/// Index spaces and declarations visible to function bodies
#[derive(Debug)]
pub struct ModuleContext<'a> {
    /// Type section
    pub types:            &'a [FuncType],
    /// Type index of every function, imports first
    pub funcs:            Vec<u32>,
    /// Every table, imports first
    pub tables:           Vec<TableType>,
    /// Every memory, imports first
    pub memories:         Vec<MemoryType>,
    /// Every global, imports first
    pub globals:          Vec<GlobalType>,
    /// Number of imported globals
    pub imported_globals: usize,
    /// Reference type of every element segment
    pub elements:         Vec<RefType>,
    /// Value of the data count section
    pub data_count:       Option<u32>,
    /// Functions that `ref.func` may name
    pub declared_funcs:   HashSet<u32>,
    /// Enabled proposals
    pub features:         Features,
}

impl ModuleContext<'_> {
    /// Signature of a function in the function index space.
    pub fn func_type(&self, index: u32) -> Result<&FuncType> {
        let ty = self.funcs.get(index as usize).ok_or_else(|| {
            invalid(codes::UNKNOWN_FUNCTION, format!("unknown function {index}"))
        })?;
        self.type_at(*ty)
    }

    /// Signature at a type index.
    pub fn type_at(&self, index: u32) -> Result<&FuncType> {
        self.types
            .get(index as usize)
            .ok_or_else(|| invalid(codes::UNKNOWN_TYPE, format!("unknown type {index}")))
    }

    /// Type of a table.
    pub fn table(&self, index: u32) -> Result<&TableType> {
        self.tables
            .get(index as usize)
            .ok_or_else(|| invalid(codes::UNKNOWN_TABLE, format!("unknown table {index}")))
    }

    /// Type of a memory.
    pub fn memory(&self, index: u32) -> Result<&MemoryType> {
        self.memories
            .get(index as usize)
            .ok_or_else(|| invalid(codes::UNKNOWN_MEMORY, format!("unknown memory {index}")))
    }

    /// Type of a global.
    pub fn global(&self, index: u32) -> Result<&GlobalType> {
        self.globals
            .get(index as usize)
            .ok_or_else(|| invalid(codes::UNKNOWN_GLOBAL, format!("unknown global {index}")))
    }

    /// Type of an element segment.
    pub fn element(&self, index: u32) -> Result<RefType> {
        self.elements.get(index as usize).copied().ok_or_else(|| {
            invalid(codes::UNKNOWN_ELEM, format!("unknown elem segment {index}"))
        })
    }

    /// Check a data segment index used by `memory.init` or `data.drop`.
    pub fn data(&self, index: u32) -> Result<()> {
        let count = self.data_count.ok_or_else(|| {
            invalid(codes::DATA_COUNT_REQUIRED, "data count section required")
        })?;
        if index >= count {
            return Err(invalid(codes::UNKNOWN_DATA, format!("unknown data segment {index}")));
        }
        Ok(())
    }

    /// Type of a constant expression, checking the indices it uses.
    fn const_expr_type(&self, expr: &ConstExpr) -> Result<ValueType> {
        Ok(match *expr {
            ConstExpr::I32(_) => ValueType::I32,
            ConstExpr::I64(_) => ValueType::I64,
            ConstExpr::F32(_) => ValueType::F32,
            ConstExpr::F64(_) => ValueType::F64,
            ConstExpr::RefNull(ty) => ty.into(),
            ConstExpr::RefFunc(index) => {
                self.func_type(index)?;
                ValueType::FuncRef
            },
            ConstExpr::GlobalGet(index) => {
                if index as usize >= self.imported_globals {
                    return Err(invalid(
                        codes::CONSTANT_EXPR,
                        format!("unknown global {index}: constant expressions may only read imported globals"),
                    ));
                }
                let global = self.global(index)?;
                if global.mutable {
                    return Err(invalid(
                        codes::CONSTANT_EXPR,
                        "constant expression required: global is mutable",
                    ));
                }
                global.value_type
            },
        })
    }

    fn expect_const(&self, expr: &ConstExpr, expected: ValueType) -> Result<()> {
        let actual = self.const_expr_type(expr)?;
        if actual != expected {
            return Err(invalid(
                codes::TYPE_MISMATCH,
                format!("type mismatch: constant expression has type {actual}, expected {expected}"),
            ));
        }
        Ok(())
    }
}

/// Validate a decoded module and lower its function bodies.
pub fn validate(decoded: DecodedModule, features: &Features) -> Result<Module> {
    let mut ctx = ModuleContext {
        types:            &decoded.types,
        funcs:            Vec::new(),
        tables:           Vec::new(),
        memories:         Vec::new(),
        globals:          Vec::new(),
        imported_globals: 0,
        elements:         decoded.elements.iter().map(|segment| segment.ty).collect(),
        data_count:       decoded.data_count,
        declared_funcs:   HashSet::new(),
        features:         *features,
    };

    if !features.multi_value {
        if let Some(ty) = decoded.types.iter().find(|ty| ty.results().len() > 1) {
            return Err(invalid(
                codes::FEATURE_DISABLED,
                format!("invalid result arity: {ty} requires multi-value"),
            ));
        }
    }

    for import in &decoded.imports {
        match &import.desc {
            ImportDesc::Func(ty) => {
                ctx.type_at(*ty)?;
                ctx.funcs.push(*ty);
            },
            ImportDesc::Table(ty) => {
                ty.limits.check(MAX_TABLE_SIZE, "table")?;
                ctx.tables.push(*ty);
            },
            ImportDesc::Memory(ty) => {
                ty.limits.check(MAX_MEMORY_PAGES, "memory")?;
                ctx.memories.push(*ty);
            },
            ImportDesc::Global(ty) => {
                ctx.globals.push(*ty);
                ctx.imported_globals += 1;
            },
        }
    }
    let num_imported_funcs = ctx.funcs.len() as u32;
    let num_imported_tables = ctx.tables.len() as u32;
    let num_imported_mems = ctx.memories.len() as u32;
    let num_imported_globals = ctx.globals.len() as u32;

    for ty in &decoded.functions {
        ctx.type_at(*ty)?;
        ctx.funcs.push(*ty);
    }

    for table in &decoded.tables {
        table.limits.check(MAX_TABLE_SIZE, "table")?;
        ctx.tables.push(*table);
    }
    if ctx.tables.len() > 1 && !features.reference_types {
        return Err(invalid(codes::VALIDATION_ERROR, "multiple tables"));
    }

    for memory in &decoded.memories {
        memory.limits.check(MAX_MEMORY_PAGES, "memory")?;
        ctx.memories.push(*memory);
    }
    if ctx.memories.len() > 1 {
        return Err(invalid(codes::MULTIPLE_MEMORIES, "multiple memories"));
    }

    // Function references in globals, elements and exports declare their
    // targets for `ref.func` in code.
    for global in &decoded.globals {
        ctx.expect_const(&global.init, global.ty.value_type)?;
        if let ConstExpr::RefFunc(index) = global.init {
            ctx.declared_funcs.insert(index);
        }
        ctx.globals.push(global.ty);
    }

    let mut export_names = HashSet::new();
    for export in &decoded.exports {
        if !export_names.insert(export.name.as_str()) {
            return Err(invalid(
                codes::DUPLICATE_EXPORT,
                format!("duplicate export name {:?}", export.name),
            ));
        }
        match export.kind {
            ExternKind::Func => {
                ctx.func_type(export.index)?;
                ctx.declared_funcs.insert(export.index);
            },
            ExternKind::Table => {
                ctx.table(export.index)?;
            },
            ExternKind::Memory => {
                ctx.memory(export.index)?;
            },
            ExternKind::Global => {
                ctx.global(export.index)?;
            },
        }
    }

    if let Some(start) = decoded.start {
        let ty = ctx.func_type(start)?;
        if !ty.params().is_empty() || !ty.results().is_empty() {
            return Err(invalid(
                codes::INVALID_START,
                format!("start function must have type [] -> [], found {ty}"),
            ));
        }
    }

    for segment in &decoded.elements {
        for item in &segment.items {
            ctx.expect_const(item, segment.ty.into())?;
            if let ConstExpr::RefFunc(index) = item {
                ctx.declared_funcs.insert(*index);
            }
        }
        if let ElementMode::Active { table, offset } = &segment.mode {
            let table_ty = ctx.table(*table)?;
            if table_ty.element != segment.ty {
                return Err(invalid(
                    codes::TYPE_MISMATCH,
                    format!(
                        "type mismatch: element segment of {} for table of {}",
                        segment.ty, table_ty.element
                    ),
                ));
            }
            ctx.expect_const(offset, ValueType::I32)?;
        }
    }

    for segment in &decoded.data {
        if let DataMode::Active { memory, offset } = &segment.mode {
            ctx.memory(*memory)?;
            ctx.expect_const(offset, ValueType::I32)?;
        }
    }

    let mut bodies = Vec::with_capacity(decoded.bodies.len());
    for (i, body) in decoded.bodies.iter().enumerate() {
        let func_index = num_imported_funcs + i as u32;
        bodies.push(validate_function(&ctx, func_index, body)?);
    }

    debug!(
        "validated module: {} functions ({} imported), {} globals, {} element and {} data segments",
        ctx.funcs.len(),
        num_imported_funcs,
        ctx.globals.len(),
        decoded.elements.len(),
        decoded.data.len()
    );
    drop(ctx);

    let DecodedModule {
        types,
        imports,
        functions,
        tables,
        memories,
        globals,
        exports,
        start,
        elements,
        data,
        custom_sections,
        names,
        ..
    } = decoded;

    Ok(Module {
        inner: Arc::new(ModuleInner {
            types,
            imports,
            func_types: functions,
            bodies,
            tables,
            memories,
            globals,
            exports,
            start,
            elements,
            data,
            custom_sections,
            names,
            num_imported_funcs,
            num_imported_tables,
            num_imported_mems,
            num_imported_globals,
        }),
    })
}
