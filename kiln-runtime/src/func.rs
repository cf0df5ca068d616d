// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Functions, the host call context and typed calls.

use std::{any::Any, fmt, marker::PhantomData, sync::Arc};

use kiln_decoder::Module;
use kiln_error::{codes, kinds, Error, ErrorCategory, Result};
use kiln_foundation::{FuncAddr, FuncType, Value};
use kiln_host::{check_arguments, check_results, HostContext, HostFunc, IntoHostFunc, WasmTyList};

use crate::{
    execution,
    instance::{Extern, Instance},
    memory::Memory,
    store::{FuncEntity, Store, StoreId},
};

/// Callback of a host function as stored in a [`Store`]
pub(crate) type CallerCallback =
    dyn Fn(&mut Caller<'_>, &[Value]) -> Result<Vec<Value>> + Send + Sync;

/// A host function bound into a store
#[derive(Clone)]
pub(crate) struct HostFuncEntity {
    pub(crate) ty:       FuncType,
    pub(crate) callback: Arc<CallerCallback>,
}

impl HostFuncEntity {
    pub(crate) fn new<F>(ty: FuncType, callback: F) -> Self
    where
        F: Fn(&mut Caller<'_>, &[Value]) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        let results = ty.results().to_vec();
        Self {
            ty,
            callback: Arc::new(move |caller: &mut Caller<'_>, params: &[Value]| {
                let values = callback(caller, params)?;
                check_results(&values, &results)?;
                Ok(values)
            }),
        }
    }

    pub(crate) fn from_host(func: HostFunc) -> Self {
        let ty = func.ty().clone();
        Self { ty, callback: Arc::new(move |caller: &mut Caller<'_>, params: &[Value]| func.call(caller, params)) }
    }
}

impl fmt::Debug for HostFuncEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFuncEntity").field("ty", &self.ty).finish_non_exhaustive()
    }
}

/// Context handed to host functions
///
/// Gives access to the store's user data and to the exports of the
/// instance whose code made the call. Memory accessors of
/// [`HostContext`] operate on that instance's memory 0.
pub struct Caller<'a> {
    pub(crate) store:    &'a mut Store,
    pub(crate) instance: Option<u32>,
}

impl<'a> Caller<'a> {
    pub(crate) fn new(store: &'a mut Store, instance: Option<u32>) -> Self {
        Self { store, instance }
    }

    /// The store's user data, if it has type `T`.
    pub fn data<T: 'static>(&self) -> Option<&T> {
        self.store.data()
    }

    /// The store's user data, mutably, if it has type `T`.
    pub fn data_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.store.data_mut()
    }

    /// The calling instance, `None` when called directly by the embedder.
    pub fn instance(&self) -> Option<Instance> {
        self.instance.map(|index| Instance { store: self.store.id(), index })
    }

    /// An export of the calling instance.
    pub fn get_export(&self, name: &str) -> Option<Extern> {
        self.instance()?.get_export(&*self.store, name)
    }

    /// Module of the calling instance.
    pub fn module(&self) -> Option<&Module> {
        self.instance()?.module(&*self.store)
    }

    /// The memory exported by the calling instance under `name`.
    pub fn memory(&self, name: &str) -> Option<Memory> {
        self.get_export(name)?.into_memory()
    }

    /// The underlying store.
    pub fn store(&mut self) -> &mut Store {
        &mut *self.store
    }

    fn default_memory(&self) -> Result<u32> {
        self.instance
            .and_then(|index| self.store.instances.get(index as usize))
            .and_then(|instance| instance.memories.first().copied())
            .ok_or_else(|| {
                Error::new(ErrorCategory::NotFound, codes::EXPORT_NOT_FOUND, "caller has no memory")
            })
    }
}

impl HostContext for Caller<'_> {
    fn data(&self) -> &dyn Any {
        self.store.data_any()
    }

    fn data_mut(&mut self) -> &mut dyn Any {
        self.store.data_any_mut()
    }

    fn memory_size(&self) -> Option<usize> {
        let index = self.default_memory().ok()?;
        self.store.memories.get(index as usize).map(|slot| slot.memory.data_size())
    }

    fn read_memory(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let index = self.default_memory()?;
        let slot = self
            .store
            .memories
            .get(index as usize)
            .ok_or_else(|| kinds::runtime_error("dangling memory"))?;
        Ok(slot.memory.read(offset as u64, buf)?)
    }

    fn write_memory(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let index = self.default_memory()?;
        let slot = self
            .store
            .memories
            .get_mut(index as usize)
            .ok_or_else(|| kinds::runtime_error("dangling memory"))?;
        Ok(slot.memory.write(offset as u64, data)?)
    }
}

/// Handle to a function owned by a [`Store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Func {
    pub(crate) store: StoreId,
    pub(crate) index: u32,
}

impl Func {
    /// Create a host function from an untyped closure.
    ///
    /// Arguments are checked against `ty` before the closure runs and its
    /// results are checked afterwards.
    pub fn new<F>(store: &mut Store, ty: FuncType, func: F) -> Func
    where
        F: Fn(&mut Caller<'_>, &[Value]) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        store.push_func(FuncEntity::Host(HostFuncEntity::new(ty, func)))
    }

    /// Create a host function from a typed closure.
    pub fn wrap<Params, Results>(store: &mut Store, func: impl IntoHostFunc<Params, Results>) -> Func {
        Self::from_host(store, HostFunc::wrap(func))
    }

    /// Bind an existing [`HostFunc`] into the store.
    pub fn from_host(store: &mut Store, func: HostFunc) -> Func {
        store.push_func(FuncEntity::Host(HostFuncEntity::from_host(func)))
    }

    /// The function's signature.
    pub fn ty(&self, store: &Store) -> Result<FuncType> {
        Ok(store.func(*self)?.ty().clone())
    }

    /// Call the function.
    ///
    /// Arguments are checked for count and type first; a mismatch is a
    /// [`ErrorCategory::Type`] error and nothing runs. A trap is returned as
    /// an error whose [`Error::trap`] is set.
    pub fn call(&self, store: &mut Store, args: &[Value]) -> Result<Vec<Value>> {
        let ty = store.func(*self)?.ty().clone();
        check_arguments(args, ty.params())?;
        for (arg, param) in args.iter().zip(ty.params()) {
            store.value_to_raw(*arg, *param)?;
        }
        execution::invoke(store, self.index, args)
    }

    /// A statically typed view of the function.
    ///
    /// Fails with a type error if `Params` and `Results` do not match the
    /// signature exactly.
    pub fn typed<Params: WasmTyList, Results: WasmTyList>(
        &self,
        store: &Store,
    ) -> Result<TypedFunc<Params, Results>> {
        let ty = store.func(*self)?.ty();
        if ty.params() != Params::value_types().as_slice() || ty.results() != Results::value_types().as_slice() {
            let expected = FuncType::new(Params::value_types(), Results::value_types());
            return Err(kinds::type_error(format!("type mismatch: function is {ty}, requested {expected}")));
        }
        Ok(TypedFunc { func: *self, _marker: PhantomData })
    }

    /// The function as a `funcref` value.
    pub fn to_value(&self) -> Value {
        Value::FuncRef(Some(FuncAddr(self.index)))
    }

    /// The function behind a non-null `funcref` of this store.
    pub fn from_value(store: &Store, value: Value) -> Option<Func> {
        match value {
            Value::FuncRef(Some(FuncAddr(index))) if (index as usize) < store.funcs.len() => {
                Some(Func { store: store.id(), index })
            },
            _ => None,
        }
    }
}

/// A [`Func`] with a signature known at compile time
pub struct TypedFunc<Params, Results> {
    func:    Func,
    _marker: PhantomData<fn(Params) -> Results>,
}

impl<Params, Results> Clone for TypedFunc<Params, Results> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Params, Results> Copy for TypedFunc<Params, Results> {}

impl<Params, Results> fmt::Debug for TypedFunc<Params, Results> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedFunc").field(&self.func).finish()
    }
}

impl<Params: WasmTyList, Results: WasmTyList> TypedFunc<Params, Results> {
    /// Call with native arguments.
    pub fn call(&self, store: &mut Store, params: Params) -> Result<Results> {
        let results = self.func.call(store, &params.into_values())?;
        Results::from_values(&results)
    }

    /// The untyped function.
    pub fn func(&self) -> Func {
        self.func
    }
}

#[cfg(test)]
mod tests {
    use kiln_foundation::ValueType;

    use super::*;
    use crate::Engine;

    #[test]
    fn test_host_function_called_directly() {
        let mut store = Store::new(&Engine::default(), 0u32);
        let func = Func::new(
            &mut store,
            FuncType::new([ValueType::I32], [ValueType::I32]),
            |caller, args| {
                *caller.data_mut::<u32>().unwrap() += 1;
                let x = args[0].as_i32().unwrap_or_default();
                Ok(vec![Value::I32(x * 2)])
            },
        );
        assert_eq!(func.call(&mut store, &[Value::I32(21)]).unwrap(), vec![Value::I32(42)]);
        assert_eq!(store.data::<u32>(), Some(&1));
    }

    #[test]
    fn test_argument_mismatch_is_a_type_error() {
        let mut store = Store::new(&Engine::default(), ());
        let func = Func::wrap(&mut store, |a: i32| a);
        let err = func.call(&mut store, &[Value::I64(1)]).unwrap_err();
        assert_eq!(err.category, ErrorCategory::Type);
        assert!(!err.is_trap());
        let err = func.call(&mut store, &[]).unwrap_err();
        assert_eq!(err.code, codes::ARGUMENT_COUNT_MISMATCH);
    }

    #[test]
    fn test_typed_view_checks_signature() {
        let mut store = Store::new(&Engine::default(), ());
        let func = Func::wrap(&mut store, |a: i64, b: i64| a - b);
        assert!(func.typed::<(i32, i32), i32>(&store).is_err());
        let typed = func.typed::<(i64, i64), i64>(&store).unwrap();
        assert_eq!(typed.call(&mut store, (10, 4)).unwrap(), 6);
    }

    #[test]
    fn test_wrong_result_count_becomes_host_trap() {
        let mut store = Store::new(&Engine::default(), ());
        let func = Func::new(&mut store, FuncType::new([], [ValueType::I32]), |_, _| Ok(vec![]));
        let err = func.call(&mut store, &[]).unwrap_err();
        let trap = err.trap().unwrap();
        assert_eq!(trap.code(), kiln_error::TrapCode::HostError);
        assert!(trap.host_error().unwrap().message().contains("wrong number of results (given 0, expected 1)"));
    }

    #[test]
    fn test_funcref_round_trip() {
        let mut store = Store::new(&Engine::default(), ());
        let func = Func::wrap(&mut store, || {});
        assert_eq!(Func::from_value(&store, func.to_value()), Some(func));
        assert_eq!(Func::from_value(&store, Value::FuncRef(None)), None);
    }
}
