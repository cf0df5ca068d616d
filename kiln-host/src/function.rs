// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Host function objects.

use std::{fmt, sync::Arc};

use kiln_error::Result;
use kiln_foundation::{FuncType, Value};
use log::trace;

use crate::{
    context::HostContext,
    marshal::{check_results, HostReturn, WasmTy, WasmTyList},
};

/// Signature of an untyped host callback
pub type HostCallback = dyn Fn(&mut dyn HostContext, &[Value]) -> Result<Vec<Value>> + Send + Sync;

/// A function implemented by the embedder
///
/// Cloning is cheap and shares the callback. A host function is not tied to
/// a store, so the same object can be linked into any number of them.
#[derive(Clone)]
pub struct HostFunc {
    ty:       FuncType,
    callback: Arc<HostCallback>,
}

impl HostFunc {
    /// Create a host function from an untyped callback.
    ///
    /// The callback receives arguments already checked against `ty`. Its
    /// results are checked on every call.
    pub fn new<F>(ty: FuncType, callback: F) -> Self
    where
        F: Fn(&mut dyn HostContext, &[Value]) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        Self { ty, callback: Arc::new(callback) }
    }

    /// Create a host function from a typed closure.
    ///
    /// ```
    /// use kiln_host::HostFunc;
    /// use kiln_foundation::ValueType;
    ///
    /// let add = HostFunc::wrap(|a: i32, b: i32| a.wrapping_add(b));
    /// assert_eq!(add.ty().params(), &[ValueType::I32, ValueType::I32]);
    /// assert_eq!(add.ty().results(), &[ValueType::I32]);
    /// ```
    pub fn wrap<Params, Results>(func: impl IntoHostFunc<Params, Results>) -> Self {
        func.into_host_func()
    }

    /// The function's signature.
    pub fn ty(&self) -> &FuncType {
        &self.ty
    }

    /// Invoke the callback and check what it returned.
    pub fn call(&self, ctx: &mut dyn HostContext, params: &[Value]) -> Result<Vec<Value>> {
        trace!("host call {} with {} arguments", self.ty, params.len());
        let results = (self.callback)(ctx, params)?;
        check_results(&results, self.ty.results())?;
        Ok(results)
    }
}

impl fmt::Debug for HostFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunc").field("ty", &self.ty).finish_non_exhaustive()
    }
}

/// Closures that can become a [`HostFunc`]
///
/// Implemented for `Fn` closures of up to six [`WasmTy`] parameters whose
/// return type implements [`HostReturn`].
pub trait IntoHostFunc<Params, Results>: Send + Sync + 'static {
    /// Build the host function.
    fn into_host_func(self) -> HostFunc;
}

macro_rules! impl_into_host_func {
    ($($t:ident),*) => {
        impl<F, R, $($t),*> IntoHostFunc<($($t,)*), R> for F
        where
            F: Fn($($t),*) -> R + Send + Sync + 'static,
            $($t: WasmTy,)*
            R: HostReturn,
        {
            #[allow(non_snake_case)]
            fn into_host_func(self) -> HostFunc {
                let ty = FuncType::new(
                    <($($t,)*) as WasmTyList>::value_types(),
                    <R::Results as WasmTyList>::value_types(),
                );
                HostFunc::new(ty, move |_ctx, params| {
                    let ($($t,)*) = <($($t,)*) as WasmTyList>::from_values(params)?;
                    (self)($($t),*).into_result().map(WasmTyList::into_values)
                })
            }
        }
    };
}

impl_into_host_func!();
impl_into_host_func!(A1);
impl_into_host_func!(A1, A2);
impl_into_host_func!(A1, A2, A3);
impl_into_host_func!(A1, A2, A3, A4);
impl_into_host_func!(A1, A2, A3, A4, A5);
impl_into_host_func!(A1, A2, A3, A4, A5, A6);

#[cfg(test)]
mod tests {
    use std::any::Any;

    use kiln_error::{codes, Error};
    use kiln_foundation::ValueType;

    use super::*;

    struct NoCaller(u32);

    impl HostContext for NoCaller {
        fn data(&self) -> &dyn Any {
            &self.0
        }

        fn data_mut(&mut self) -> &mut dyn Any {
            &mut self.0
        }

        fn memory_size(&self) -> Option<usize> {
            None
        }

        fn read_memory(&self, _offset: usize, _buf: &mut [u8]) -> Result<()> {
            Err(Error::host("no memory"))
        }

        fn write_memory(&mut self, _offset: usize, _data: &[u8]) -> Result<()> {
            Err(Error::host("no memory"))
        }
    }

    #[test]
    fn test_wrapped_closure_marshals_values() {
        let func = HostFunc::wrap(|a: i64, b: f64| (a * 2, b + 0.5));
        let results = func.call(&mut NoCaller(0), &[Value::I64(21), Value::from(1.0f64)]).unwrap();
        assert_eq!(results, vec![Value::I64(42), Value::from(1.5f64)]);
        assert_eq!(func.ty().results(), &[ValueType::I64, ValueType::F64]);
    }

    #[test]
    fn test_wrapped_error_is_returned() {
        let func = HostFunc::wrap(|x: u32| -> Result<u32> {
            if x == 0 { Err(Error::host("zero")) } else { Ok(x - 1) }
        });
        assert_eq!(func.call(&mut NoCaller(0), &[Value::I32(3)]).unwrap(), vec![Value::I32(2)]);
        assert_eq!(func.call(&mut NoCaller(0), &[Value::I32(0)]).unwrap_err().message(), "zero");
    }

    #[test]
    fn test_untyped_results_are_checked() {
        let ty = FuncType::new([], [ValueType::I32]);
        let func = HostFunc::new(ty, |_, _| Ok(vec![]));
        let err = func.call(&mut NoCaller(0), &[]).unwrap_err();
        assert_eq!(err.code, codes::RESULT_COUNT_MISMATCH);
        assert_eq!(err.message(), "wrong number of results (given 0, expected 1)");
    }

    #[test]
    fn test_context_data_is_reachable() {
        let ty = FuncType::new([], [ValueType::I32]);
        let func = HostFunc::new(ty, |ctx, _| {
            let counter = ctx.data_mut_ref::<u32>().ok_or_else(|| Error::host("no data"))?;
            *counter += 1;
            Ok(vec![Value::I32(*counter as i32)])
        });
        let mut ctx = NoCaller(9);
        assert_eq!(func.call(&mut ctx, &[]).unwrap(), vec![Value::I32(10)]);
        assert_eq!(ctx.0, 10);
    }

    #[test]
    fn test_zero_arity_wrap() {
        let func = HostFunc::wrap(|| {});
        assert!(func.ty().params().is_empty());
        assert!(func.call(&mut NoCaller(0), &[]).unwrap().is_empty());
    }
}
