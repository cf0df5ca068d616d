// Kiln - kiln-runtime
// Module: Linker
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Name-based import resolution.
//!
//! A [`Linker`] maps `(module, name)` pairs to definitions. Host functions
//! defined through [`Linker::func_new`], [`Linker::func_wrap`] or
//! [`Linker::define_host_func`] are not bound to any store; they are added
//! to the target store each time a module importing them is instantiated.
//! Everything else is an [`Extern`] of one particular store.
//!
//! ```
//! use kiln_runtime::{Engine, Linker, Store, Value};
//!
//! let engine = Engine::default();
//! let module = engine.compile(&wat::parse_str(r#"
//!     (module
//!       (import "host" "double" (func $double (param i32) (result i32)))
//!       (func (export "quad") (param i32) (result i32)
//!         local.get 0
//!         call $double
//!         call $double))
//! "#).unwrap()).unwrap();
//!
//! let mut linker = Linker::new();
//! linker.func_wrap("host", "double", |x: i32| x * 2).unwrap();
//!
//! let mut store = Store::new(&engine, ());
//! let instance = linker.instantiate(&mut store, &module).unwrap();
//! let quad = instance.get_func(&store, "quad").unwrap();
//! assert_eq!(quad.call(&mut store, &[Value::I32(3)]).unwrap(), vec![Value::I32(12)]);
//! ```

use std::collections::BTreeMap;

use kiln_decoder::Module;
use kiln_error::{codes, Error, ErrorCategory, Result};
use kiln_foundation::{ExternKind, ExternType, FuncType, Value};
use kiln_host::{HostFunc, IntoHostFunc};
use log::debug;

use crate::{
    func::{Caller, HostFuncEntity},
    instance::{self, Extern, Instance},
    store::{FuncEntity, Store},
};

/// A definition held by a [`Linker`]
#[derive(Debug, Clone)]
pub enum Definition {
    /// An entity living in a store
    Extern(Extern),
    /// A host function, bound to a store on instantiation
    HostFunc(FuncType),
}

#[derive(Debug, Clone)]
enum Entry {
    Extern(Extern),
    Host(HostFuncEntity),
}

impl Entry {
    fn definition(&self) -> Definition {
        match self {
            Entry::Extern(ext) => Definition::Extern(*ext),
            Entry::Host(func) => Definition::HostFunc(func.ty.clone()),
        }
    }
}

/// Resolves imports by module and field name
#[derive(Debug, Clone, Default)]
pub struct Linker {
    definitions:     BTreeMap<(String, String), Entry>,
    allow_shadowing: bool,
}

impl Linker {
    /// Create an empty linker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow later definitions to replace earlier ones with the same name.
    pub fn allow_shadowing(&mut self, allow: bool) -> &mut Self {
        self.allow_shadowing = allow;
        self
    }

    fn insert(&mut self, module: &str, name: &str, entry: Entry) -> Result<&mut Self> {
        let key = (module.to_owned(), name.to_owned());
        if !self.allow_shadowing && self.definitions.contains_key(&key) {
            return Err(Error::new(
                ErrorCategory::Link,
                codes::DUPLICATE_DEFINITION,
                format!("import `{module}::{name}` is already defined"),
            ));
        }
        self.definitions.insert(key, entry);
        Ok(self)
    }

    /// Define an entity of a store.
    pub fn define(&mut self, module: &str, name: &str, ext: impl Into<Extern>) -> Result<&mut Self> {
        self.insert(module, name, Entry::Extern(ext.into()))
    }

    /// Define a host function from an untyped closure.
    pub fn func_new<F>(&mut self, module: &str, name: &str, ty: FuncType, func: F) -> Result<&mut Self>
    where
        F: Fn(&mut Caller<'_>, &[Value]) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.insert(module, name, Entry::Host(HostFuncEntity::new(ty, func)))
    }

    /// Define a host function from a typed closure.
    pub fn func_wrap<Params, Results>(
        &mut self,
        module: &str,
        name: &str,
        func: impl IntoHostFunc<Params, Results>,
    ) -> Result<&mut Self> {
        self.define_host_func(module, name, HostFunc::wrap(func))
    }

    /// Define a prebuilt [`HostFunc`].
    pub fn define_host_func(&mut self, module: &str, name: &str, func: HostFunc) -> Result<&mut Self> {
        self.insert(module, name, Entry::Host(HostFuncEntity::from_host(func)))
    }

    /// Define every export of `instance` under the module name `module`.
    pub fn instance(&mut self, store: &Store, module: &str, instance: &Instance) -> Result<&mut Self> {
        store.check(instance.store)?;
        let exports: Vec<_> = instance.exports(store).map(|(name, ext)| (name.to_owned(), ext)).collect();
        for (name, ext) in exports {
            self.define(module, &name, ext)?;
        }
        Ok(self)
    }

    /// Look up a definition.
    pub fn get(&self, module: &str, name: &str) -> Option<Definition> {
        self.definitions.get(&(module.to_owned(), name.to_owned())).map(Entry::definition)
    }

    /// All definitions, ordered by module and name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Definition)> {
        self.definitions
            .iter()
            .map(|((module, name), entry)| (module.as_str(), name.as_str(), entry.definition()))
    }

    /// Resolve the imports of `module` and instantiate it.
    ///
    /// Every import is resolved and type checked before anything is
    /// allocated, so a link error leaves the store untouched.
    pub fn instantiate(&self, store: &mut Store, module: &Module) -> Result<Instance> {
        let mut resolved = Vec::with_capacity(module.imports().len());
        for import in module.imports() {
            let entry = self.definitions.get(&(import.module.clone(), import.name.clone())).ok_or_else(|| {
                Error::new(
                    ErrorCategory::Link,
                    codes::MISSING_IMPORT,
                    format!("unknown import: `{}::{}` has not been defined", import.module, import.name),
                )
            })?;
            match entry {
                Entry::Extern(ext) => instance::check_import(store, module, import, ext)?,
                Entry::Host(func) => {
                    let expected = module.import_type(import);
                    let matches = matches!(&expected, Some(ExternType::Func(ty)) if *ty == func.ty);
                    if !matches {
                        return Err(Error::new(
                            ErrorCategory::Link,
                            if expected.as_ref().is_some_and(|ty| ty.kind() != ExternKind::Func) {
                                codes::IMPORT_KIND_MISMATCH
                            } else {
                                codes::IMPORT_TYPE_MISMATCH
                            },
                            format!(
                                "incompatible import type for `{}::{}`: host function is {}",
                                import.module, import.name, func.ty
                            ),
                        ));
                    }
                },
            }
            resolved.push(entry);
        }

        let imports: Vec<Extern> = resolved
            .into_iter()
            .map(|entry| match entry {
                Entry::Extern(ext) => *ext,
                Entry::Host(func) => Extern::Func(store.push_func(FuncEntity::Host(func.clone()))),
            })
            .collect();
        debug!("resolved {} imports", imports.len());
        instance::instantiate(store, module, &imports)
    }
}

#[cfg(test)]
mod tests {
    use kiln_foundation::ValueType;

    use super::*;

    #[test]
    fn test_duplicate_definitions_need_shadowing() {
        let mut linker = Linker::new();
        linker.func_wrap("env", "f", || {}).unwrap();
        let err = linker.func_wrap("env", "f", || {}).unwrap_err();
        assert_eq!(err.code, codes::DUPLICATE_DEFINITION);

        linker.allow_shadowing(true);
        linker.func_wrap("env", "f", |x: i32| x).unwrap();
        assert!(matches!(
            linker.get("env", "f"),
            Some(Definition::HostFunc(ty)) if ty.params() == [ValueType::I32]
        ));
    }

    #[test]
    fn test_iteration_is_ordered() {
        let mut linker = Linker::new();
        linker.func_wrap("b", "x", || {}).unwrap();
        linker.func_wrap("a", "y", || {}).unwrap();
        let names: Vec<_> = linker.iter().map(|(module, name, _)| format!("{module}.{name}")).collect();
        assert_eq!(names, ["a.y", "b.x"]);
    }
}
