// Kiln - kiln-runtime
// Module: Execution Engine
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The interpreter.
//!
//! Executes lowered [`Op`]s on an explicit operand stack and frame stack.
//! A WebAssembly call pushes a [`Frame`] instead of recursing on the host
//! stack, so call depth is limited only by [`Config::max_call_depth`] and
//! [`Config::max_value_stack`].
//!
//! Each invocation moves through `Ready -> Running` and ends `Returned` or
//! `Trapped`. A call to a host function suspends the running frame, hands
//! the arguments to the host and resumes with its results, or traps with
//! [`TrapCode::HostError`] if the host fails.
//!
//! The interrupt flag is polled at every loop back-edge and every call.
//!
//! [`Config::max_call_depth`]: crate::Config::max_call_depth
//! [`Config::max_value_stack`]: crate::Config::max_value_stack

use std::sync::Arc;

use kiln_decoder::Module;
use kiln_error::{kinds, Error, FrameInfo, Result, Trap, TrapCode};
use kiln_foundation::Value;
use kiln_instructions::{BranchTarget, CompiledBody, Op};
use log::{debug, trace};

use crate::{
    func::{Caller, HostFuncEntity},
    memory::LinearMemory,
    stack::ValueStack,
    store::{FuncEntity, Store},
    table::TableInstance,
};

/// Activation record of a WebAssembly function
#[derive(Debug)]
struct Frame {
    module:   Module,
    /// Index in the module's function index space
    func:     u32,
    /// Index into the module's bodies
    body:     usize,
    instance: u32,
    /// The op being executed; for suspended frames, the call op
    pc:       usize,
    base:     usize,
    results:  usize,
}

/// Why the innermost frame stopped running
enum Flow {
    Call(u32),
    Return,
}

/// Call `addr` with arguments already checked against its signature.
pub(crate) fn invoke(store: &mut Store, addr: u32, args: &[Value]) -> Result<Vec<Value>> {
    let entity = store
        .funcs
        .get(addr as usize)
        .ok_or_else(|| kinds::runtime_error(format!("unknown function address {addr}")))?;
    let result_types = entity.ty().results().to_vec();

    if let FuncEntity::Host(host) = entity {
        let host = host.clone();
        check_interrupt(store)?;
        store.stats.host_calls += 1;
        return call_host(store, &host, None, args);
    }

    let mut executor = Executor::new();
    for arg in args {
        executor.stack.push(arg.to_raw());
    }
    let outcome = executor.call(store, addr).and_then(|()| executor.run(store));
    if let Err(err) = outcome {
        let err = err.with_trap_trace(|| executor.trace());
        if let Some(trap) = err.trap() {
            debug!("trap: {}", trap.code());
        }
        return Err(err);
    }

    let cells = executor.stack.as_slice();
    Ok(result_types.iter().zip(cells).map(|(ty, raw)| Value::from_raw(*ty, *raw)).collect())
}

fn check_interrupt(store: &Store) -> Result<()> {
    if store.interrupt().take() {
        return Err(TrapCode::Interrupted.into());
    }
    Ok(())
}

/// Run a host function, turning its failure into a trap.
fn call_host(
    store: &mut Store,
    host: &HostFuncEntity,
    instance: Option<u32>,
    args: &[Value],
) -> Result<Vec<Value>> {
    trace!("calling host function {}", host.ty);
    let mut caller = Caller::new(store, instance);
    (host.callback)(&mut caller, args).map_err(|err| {
        if err.is_trap() {
            err
        } else {
            Trap::host(err).into()
        }
    })
}

struct Executor {
    stack:  ValueStack,
    frames: Vec<Frame>,
}

impl Executor {
    fn new() -> Self {
        Self { stack: ValueStack::new(), frames: Vec::new() }
    }

    /// WebAssembly frames on the stack, innermost first.
    fn trace(&self) -> Vec<FrameInfo> {
        self.frames
            .iter()
            .rev()
            .map(|frame| FrameInfo {
                func_index:   frame.func,
                func_name:    frame.module.func_name(frame.func).map(str::to_owned),
                instr_offset: frame
                    .module
                    .bodies()
                    .get(frame.body)
                    .map_or(0, |body| body.offset_of(frame.pc)),
            })
            .collect()
    }

    /// Call `addr` with its arguments on top of the stack.
    ///
    /// WebAssembly callees get a new frame; host callees run to completion
    /// and the caller resumes after the call op.
    fn call(&mut self, store: &mut Store, addr: u32) -> Result<()> {
        check_interrupt(store)?;
        let entity = store
            .funcs
            .get(addr as usize)
            .ok_or_else(|| kinds::runtime_error(format!("unknown function address {addr}")))?;
        match entity {
            FuncEntity::Wasm(func) => {
                let (module, func_index, instance) = (func.module.clone(), func.index, func.instance);
                let params = func.ty.params().len();
                let results = func.ty.results().len();
                self.enter(store, module, func_index, instance, params, results)
            },
            FuncEntity::Host(host) => {
                let host = host.clone();
                self.call_host(store, &host)?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.pc += 1;
                }
                Ok(())
            },
        }
    }

    fn enter(
        &mut self,
        store: &mut Store,
        module: Module,
        func: u32,
        instance: u32,
        params: usize,
        results: usize,
    ) -> Result<()> {
        let (max_call_depth, max_value_stack) = {
            let config = store.config();
            (config.max_call_depth, config.max_value_stack)
        };
        let depth = store.depth + self.frames.len();
        if depth >= max_call_depth {
            return Err(TrapCode::StackOverflow.into());
        }
        let body_index = func.checked_sub(module.num_imported_funcs()).map(|index| index as usize);
        let body = body_index
            .and_then(|index| module.bodies().get(index))
            .ok_or_else(|| kinds::runtime_error(format!("function {func} has no body")))?;
        let base = self
            .stack
            .len()
            .checked_sub(params)
            .ok_or_else(|| kinds::runtime_error("missing call arguments"))?;
        let required = self.stack.len() + body.locals.len() + body.max_stack_height as usize;
        if required > max_value_stack {
            return Err(TrapCode::StackOverflow.into());
        }
        self.stack.push_zeros(body.locals.len());

        store.stats.function_calls += 1;
        store.stats.record_depth(depth + 1, self.stack.len());
        let body = body_index.unwrap_or_default();
        self.frames.push(Frame { module, func, body, instance, pc: 0, base, results });
        Ok(())
    }

    fn call_host(&mut self, store: &mut Store, host: &HostFuncEntity) -> Result<()> {
        let params = host.ty.params();
        let start = self
            .stack
            .len()
            .checked_sub(params.len())
            .ok_or_else(|| kinds::runtime_error("missing call arguments"))?;
        let args: Vec<Value> = self
            .stack
            .split_off(start)
            .into_iter()
            .zip(params)
            .map(|(raw, ty)| Value::from_raw(*ty, raw))
            .collect();
        let instance = self.frames.last().map(|frame| frame.instance);

        store.stats.host_calls += 1;
        let outer = store.depth;
        store.depth += self.frames.len();
        let results = call_host(store, host, instance, &args);
        store.depth = outer;

        for (value, ty) in results?.iter().zip(host.ty.results()) {
            let raw = store.value_to_raw(*value, *ty).map_err(|err| Error::from(Trap::host(err)))?;
            self.stack.push(raw);
        }
        Ok(())
    }

    fn run(&mut self, store: &mut Store) -> Result<()> {
        loop {
            match self.execute(store)? {
                Flow::Call(addr) => self.call(store, addr)?,
                Flow::Return => {
                    self.frames.pop();
                    match self.frames.last_mut() {
                        Some(caller) => caller.pc += 1,
                        None => return Ok(()),
                    }
                },
            }
        }
    }

    /// Run the innermost frame until it calls or returns.
    fn execute(&mut self, store: &mut Store) -> Result<Flow> {
        let Some(frame) = self.frames.last() else {
            return Ok(Flow::Return);
        };
        let module = frame.module.clone();
        let ctx = FrameContext { instance: frame.instance, base: frame.base, results: frame.results };
        let mut pc = frame.pc;
        let outcome = match module.bodies().get(frame.body) {
            Some(body) => run_body(&mut self.stack, store, &module, body, &ctx, &mut pc),
            None => Err(kinds::runtime_error("frame refers to a missing body")),
        };
        if let Some(frame) = self.frames.last_mut() {
            frame.pc = pc;
        }
        outcome
    }
}

struct FrameContext {
    instance: u32,
    base:     usize,
    results:  usize,
}

fn missing(what: &str, index: u32) -> Error {
    kinds::runtime_error(format!("unknown {what} {index}"))
}

fn lookup(addrs: &[u32], index: u32, what: &str) -> Result<usize> {
    addrs.get(index as usize).map(|addr| *addr as usize).ok_or_else(|| missing(what, index))
}

fn memory_at(store: &mut Store, addr: Option<usize>) -> Result<&mut LinearMemory> {
    addr.and_then(|addr| store.memories.get_mut(addr))
        .map(|slot| &mut slot.memory)
        .ok_or_else(|| missing("memory", 0))
}

fn table_at(store: &mut Store, addr: usize) -> Result<&mut TableInstance> {
    store.tables.get_mut(addr).ok_or_else(|| missing("table", addr as u32))
}

#[inline]
fn branch(stack: &mut ValueStack, target: &BranchTarget) {
    stack.drop_keep(target.drop as usize, target.keep as usize);
}

#[inline]
fn effective_address(stack: &mut ValueStack, offset: u32) -> u64 {
    u64::from(stack.pop_u32()) + u64::from(offset)
}

fn run_body(
    stack: &mut ValueStack,
    store: &mut Store,
    module: &Module,
    body: &CompiledBody,
    ctx: &FrameContext,
    pc: &mut usize,
) -> Result<Flow> {
    let instance = ctx.instance as usize;
    let memory = store
        .instances
        .get(instance)
        .ok_or_else(|| missing("instance", ctx.instance))?
        .memories
        .first()
        .map(|addr| *addr as usize);
    let ops = &body.ops;

    loop {
        let op = ops.get(*pc).ok_or_else(|| kinds::runtime_error("execution ran past the end of a function"))?;
        store.stats.ops_executed += 1;
        if let Some(fuel) = store.fuel.as_mut() {
            if *fuel == 0 {
                return Err(TrapCode::OutOfFuel.into());
            }
            *fuel -= 1;
        }

        match op {
            Op::Unreachable => return Err(TrapCode::Unreachable.into()),
            Op::Br(target) => {
                branch(stack, target);
                if target.pc as usize <= *pc {
                    check_interrupt(store)?;
                }
                *pc = target.pc as usize;
                continue;
            },
            Op::BrIf(target) => {
                if stack.pop_u32() != 0 {
                    branch(stack, target);
                    if target.pc as usize <= *pc {
                        check_interrupt(store)?;
                    }
                    *pc = target.pc as usize;
                    continue;
                }
            },
            Op::BrUnless(target) => {
                if stack.pop_u32() == 0 {
                    *pc = *target as usize;
                    continue;
                }
            },
            Op::Jump(target) => {
                *pc = *target as usize;
                continue;
            },
            Op::BrTable(targets) => {
                let index = stack.pop_u32() as usize;
                let target = targets
                    .get(index)
                    .or_else(|| targets.last())
                    .ok_or_else(|| kinds::runtime_error("empty branch table"))?;
                branch(stack, target);
                if target.pc as usize <= *pc {
                    check_interrupt(store)?;
                }
                *pc = target.pc as usize;
                continue;
            },
            Op::Return => {
                let height = stack.len();
                store.stats.record_depth(0, height);
                stack.drop_keep(height.saturating_sub(ctx.base + ctx.results), ctx.results);
                return Ok(Flow::Return);
            },
            Op::Call(index) => {
                let addr = lookup(&store.instances[instance].funcs, *index, "function")?;
                return Ok(Flow::Call(addr as u32));
            },
            Op::CallIndirect { type_index, table_index } => {
                let table_addr = lookup(&store.instances[instance].tables, *table_index, "table")?;
                let entry = stack.pop_u32();
                let raw = table_at(store, table_addr)?
                    .get(entry)
                    .map_err(|_| Error::from(TrapCode::UndefinedElement))?;
                if raw == 0 {
                    return Err(TrapCode::UninitializedElement.into());
                }
                let addr = (raw - 1) as u32;
                let expected = module.types().get(*type_index as usize).ok_or_else(|| missing("type", *type_index))?;
                let callee = store.funcs.get(addr as usize).ok_or_else(|| missing("function", addr))?;
                if callee.ty() != expected {
                    return Err(TrapCode::IndirectCallTypeMismatch.into());
                }
                return Ok(Flow::Call(addr));
            },
            Op::Drop => {
                stack.pop();
            },
            Op::Select => {
                let condition = stack.pop_u32();
                let second = stack.pop();
                let first = stack.pop();
                stack.push(if condition != 0 { first } else { second });
            },
            Op::LocalGet(index) => stack.push(stack.get(ctx.base + *index as usize)),
            Op::LocalSet(index) => {
                let value = stack.pop();
                stack.set(ctx.base + *index as usize, value);
            },
            Op::LocalTee(index) => stack.set(ctx.base + *index as usize, stack.peek()),
            Op::GlobalGet(index) => {
                let addr = lookup(&store.instances[instance].globals, *index, "global")?;
                let value = store.globals.get(addr).ok_or_else(|| missing("global", *index))?.value;
                stack.push(value);
            },
            Op::GlobalSet(index) => {
                let addr = lookup(&store.instances[instance].globals, *index, "global")?;
                let value = stack.pop();
                store.globals.get_mut(addr).ok_or_else(|| missing("global", *index))?.value = value;
            },
            Op::TableGet(index) => {
                let addr = lookup(&store.instances[instance].tables, *index, "table")?;
                let entry = stack.pop_u32();
                stack.push(table_at(store, addr)?.get(entry)?);
            },
            Op::TableSet(index) => {
                let addr = lookup(&store.instances[instance].tables, *index, "table")?;
                let value = stack.pop();
                let entry = stack.pop_u32();
                table_at(store, addr)?.set(entry, value)?;
            },
            Op::TableSize(index) => {
                let addr = lookup(&store.instances[instance].tables, *index, "table")?;
                stack.push(u64::from(table_at(store, addr)?.size()));
            },
            Op::TableGrow(index) => {
                let addr = lookup(&store.instances[instance].tables, *index, "table")?;
                let delta = stack.pop_u32();
                let init = stack.pop();
                let old = table_at(store, addr)?.grow(delta, init).unwrap_or(u32::MAX);
                stack.push(u64::from(old));
            },
            Op::TableFill(index) => {
                let addr = lookup(&store.instances[instance].tables, *index, "table")?;
                let len = stack.pop_u32();
                let value = stack.pop();
                let dst = stack.pop_u32();
                table_at(store, addr)?.fill(dst, value, len)?;
            },
            Op::TableCopy { dst, src } => {
                let dst_addr = lookup(&store.instances[instance].tables, *dst, "table")?;
                let src_addr = lookup(&store.instances[instance].tables, *src, "table")?;
                let len = stack.pop_u32();
                let src = stack.pop_u32();
                let dst = stack.pop_u32();
                if dst_addr == src_addr {
                    table_at(store, dst_addr)?.copy_within(dst, src, len)?;
                } else {
                    let items = table_at(store, src_addr)?.slice(src, len)?.to_vec();
                    table_at(store, dst_addr)?.init(dst, &items, 0, len)?;
                }
            },
            Op::TableInit { table, elem } => {
                let data = &store.instances[instance];
                let addr = lookup(&data.tables, *table, "table")?;
                let items = data.elements.get(*elem as usize).cloned().ok_or_else(|| missing("element segment", *elem))?;
                let len = stack.pop_u32();
                let src = stack.pop_u32();
                let dst = stack.pop_u32();
                table_at(store, addr)?.init(dst, &items, src, len)?;
            },
            Op::ElemDrop(elem) => {
                if let Some(items) = store.instances[instance].elements.get_mut(*elem as usize) {
                    *items = Arc::from([]);
                }
            },
            Op::Load(kind, offset) => {
                let ea = effective_address(stack, *offset);
                let raw = memory_at(store, memory)?.load(ea, kind.width())?;
                stack.push(kind.extend(raw));
            },
            Op::Store(kind, offset) => {
                let value = stack.pop();
                let ea = effective_address(stack, *offset);
                memory_at(store, memory)?.store(ea, kind.width(), value)?;
            },
            Op::MemorySize => stack.push(u64::from(memory_at(store, memory)?.size())),
            Op::MemoryGrow => {
                let delta = stack.pop_u32();
                let old = memory_at(store, memory)?.grow(delta).unwrap_or(u32::MAX);
                stack.push(u64::from(old));
            },
            Op::MemoryInit(segment) => {
                let bytes = store.instances[instance]
                    .data
                    .get(*segment as usize)
                    .cloned()
                    .ok_or_else(|| missing("data segment", *segment))?;
                let len = stack.pop_u32();
                let src = stack.pop_u32();
                let dst = stack.pop_u32();
                memory_at(store, memory)?.init(u64::from(dst), &bytes, u64::from(src), u64::from(len))?;
            },
            Op::DataDrop(segment) => {
                if let Some(bytes) = store.instances[instance].data.get_mut(*segment as usize) {
                    *bytes = Arc::from([]);
                }
            },
            Op::MemoryCopy => {
                let len = stack.pop_u32();
                let src = stack.pop_u32();
                let dst = stack.pop_u32();
                memory_at(store, memory)?.copy(u64::from(dst), u64::from(src), u64::from(len))?;
            },
            Op::MemoryFill => {
                let len = stack.pop_u32();
                let value = stack.pop_u32();
                let dst = stack.pop_u32();
                memory_at(store, memory)?.fill(u64::from(dst), value as u8, u64::from(len))?;
            },
            Op::Const(cell) => stack.push(*cell),
            Op::RefIsNull => {
                let reference = stack.pop();
                stack.push(u64::from(reference == 0));
            },
            Op::RefFunc(index) => {
                let addr = lookup(&store.instances[instance].funcs, *index, "function")?;
                stack.push(addr as u64 + 1);
            },
            Op::Numeric(op) => {
                let result = if op.params().len() == 1 {
                    op.eval(stack.pop(), 0)?
                } else {
                    let rhs = stack.pop();
                    let lhs = stack.pop();
                    op.eval(lhs, rhs)?
                };
                stack.push(result);
            },
        }
        *pc += 1;
    }
}
