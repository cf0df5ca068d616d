// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Function body validation and lowering.
//!
//! A single forward pass keeps an abstract operand stack of value types and a
//! stack of control frames. Code following an unconditional transfer is
//! checked against a polymorphic stack: popping past the frame's base yields
//! an unknown type that matches anything.
//!
//! The same pass emits [`Op`]s. Operand stack heights are static in valid
//! code, so every branch can be resolved to a target position plus the
//! number of cells to keep and to drop. Forward branches are recorded on
//! their frame and patched when the frame's `end` is reached.

use std::borrow::Cow;

use kiln_error::{codes, Error, ErrorCategory, Result};
use kiln_foundation::{RefType, Value, ValueType};
use kiln_instructions::{BlockType, BranchTarget, CompiledBody, Instruction, Op};

use super::ModuleContext;
use crate::module::FunctionBody;

/// `None` stands for the unknown type of the polymorphic stack.
type Operand = Option<ValueType>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Function,
    Block,
    Loop,
    If,
    Else,
}

/// A forward jump waiting for its frame's end position.
#[derive(Debug, Clone, Copy)]
enum Fixup {
    /// `Br` or `BrIf` at this op index
    Branch(usize),
    /// Entry of a `BrTable`
    Table(usize, usize),
    /// `Jump` emitted by `else`
    Jump(usize),
}

#[derive(Debug)]
struct ControlFrame {
    kind:        FrameKind,
    params:      Vec<ValueType>,
    results:     Vec<ValueType>,
    height:      usize,
    unreachable: bool,
    start_pc:    u32,
    fixups:      Vec<Fixup>,
    /// `BrUnless` emitted by `if`, patched at `else` or `end`
    if_jump:     Option<usize>,
}

impl ControlFrame {
    fn label_types(&self) -> &[ValueType] {
        if self.kind == FrameKind::Loop {
            &self.params
        } else {
            &self.results
        }
    }
}

struct FuncValidator<'a> {
    ctx:        &'a ModuleContext<'a>,
    func_index: u32,
    locals:     Vec<ValueType>,
    operands:   Vec<Operand>,
    controls:   Vec<ControlFrame>,
    ops:        Vec<Op>,
    offsets:    Vec<u32>,
    max_height: usize,
    offset:     usize,
}

/// Validate one module-defined function and lower it to [`Op`]s.
pub fn validate_function(
    ctx: &ModuleContext<'_>,
    func_index: u32,
    body: &FunctionBody,
) -> Result<CompiledBody> {
    let ty = ctx.func_type(func_index)?;
    let mut locals = ty.params().to_vec();
    locals.extend_from_slice(&body.locals);

    let mut validator = FuncValidator {
        ctx,
        func_index,
        locals,
        operands: Vec::new(),
        controls: Vec::new(),
        ops: Vec::with_capacity(body.instructions.len()),
        offsets: Vec::with_capacity(body.instructions.len()),
        max_height: 0,
        offset: body.offset,
    };
    validator.controls.push(ControlFrame {
        kind:        FrameKind::Function,
        params:      Vec::new(),
        results:     ty.results().to_vec(),
        height:      0,
        unreachable: false,
        start_pc:    0,
        fixups:      Vec::new(),
        if_jump:     None,
    });

    for (instruction, offset) in body.instructions.iter().zip(&body.offsets) {
        validator.offset = *offset as usize;
        if validator.controls.is_empty() {
            return Err(validator.error(codes::UNBALANCED_CONTROL, "operators remaining after end of function"));
        }
        validator.instruction(instruction)?;
    }
    if !validator.controls.is_empty() {
        return Err(validator.error(codes::UNBALANCED_CONTROL, "function body must end with END opcode"));
    }

    Ok(CompiledBody {
        locals:           body.locals.clone().into_boxed_slice(),
        ops:              validator.ops.into_boxed_slice(),
        offsets:          validator.offsets.into_boxed_slice(),
        max_stack_height: validator.max_height as u32,
    })
}

impl FuncValidator<'_> {
    fn error(&self, code: u16, message: impl Into<Cow<'static, str>>) -> Error {
        Error::new(ErrorCategory::Validation, code, message)
            .with_func_index(self.func_index)
            .with_offset(self.offset)
    }

    /// Attach this function's location to an error from the module context.
    fn locate(&self, error: Error) -> Error {
        error.with_func_index(self.func_index).or_offset(self.offset)
    }

    fn emit(&mut self, op: Op) {
        self.ops.push(op);
        self.offsets.push(self.offset as u32);
    }

    fn pc(&self) -> u32 {
        self.ops.len() as u32
    }

    fn frame(&self) -> Result<&ControlFrame> {
        self.controls
            .last()
            .ok_or_else(|| self.error(codes::UNBALANCED_CONTROL, "control stack is empty"))
    }

    fn push(&mut self, ty: impl Into<Operand>) {
        self.operands.push(ty.into());
        self.max_height = self.max_height.max(self.operands.len());
    }

    fn push_all(&mut self, types: &[ValueType]) {
        for ty in types {
            self.push(*ty);
        }
    }

    fn pop(&mut self) -> Result<Operand> {
        let frame = self.frame()?;
        if self.operands.len() == frame.height {
            if frame.unreachable {
                return Ok(None);
            }
            return Err(self.error(
                codes::TYPE_MISMATCH,
                "type mismatch: operand stack underflow",
            ));
        }
        Ok(self.operands.pop().flatten())
    }

    fn pop_expect(&mut self, expected: ValueType) -> Result<Operand> {
        let actual = self.pop()?;
        match actual {
            Some(ty) if ty != expected => Err(self.error(
                codes::TYPE_MISMATCH,
                format!("type mismatch: expected {expected}, found {ty}"),
            )),
            _ => Ok(actual.or(Some(expected))),
        }
    }

    fn pop_all(&mut self, types: &[ValueType]) -> Result<()> {
        for ty in types.iter().rev() {
            self.pop_expect(*ty)?;
        }
        Ok(())
    }

    fn pop_ref(&mut self) -> Result<Operand> {
        let actual = self.pop()?;
        match actual {
            Some(ty) if !ty.is_ref() => Err(self.error(
                codes::TYPE_MISMATCH,
                format!("type mismatch: expected a reference, found {ty}"),
            )),
            _ => Ok(actual),
        }
    }

    fn set_unreachable(&mut self) -> Result<()> {
        let frame = self
            .controls
            .last_mut()
            .ok_or_else(|| Error::new(ErrorCategory::Validation, codes::UNBALANCED_CONTROL, "control stack is empty"))?;
        self.operands.truncate(frame.height);
        frame.unreachable = true;
        Ok(())
    }

    fn block_signature(&self, block_type: BlockType) -> Result<(Vec<ValueType>, Vec<ValueType>)> {
        match block_type {
            BlockType::Empty => Ok((Vec::new(), Vec::new())),
            BlockType::Value(ty) => Ok((Vec::new(), vec![ty])),
            BlockType::FuncType(index) => {
                let ty = self.ctx.type_at(index).map_err(|e| self.locate(e))?;
                Ok((ty.params().to_vec(), ty.results().to_vec()))
            },
        }
    }

    fn push_frame(&mut self, kind: FrameKind, block_type: BlockType) -> Result<()> {
        let (params, results) = self.block_signature(block_type)?;
        self.pop_all(&params)?;
        let height = self.operands.len();
        self.push_all(&params);
        self.controls.push(ControlFrame {
            kind,
            params,
            results,
            height,
            unreachable: false,
            start_pc: self.pc(),
            fixups: Vec::new(),
            if_jump: None,
        });
        Ok(())
    }

    /// Check the end-of-frame stack shape without popping the frame.
    fn check_frame_end(&mut self) -> Result<()> {
        let (results, height) = {
            let frame = self.frame()?;
            (frame.results.clone(), frame.height)
        };
        self.pop_all(&results)?;
        if self.operands.len() != height {
            return Err(self.error(
                codes::TYPE_MISMATCH,
                format!(
                    "type mismatch: {} values remaining on the stack at end of block",
                    self.operands.len() - height
                ),
            ));
        }
        Ok(())
    }

    fn patch(&mut self, fixup: Fixup, pc: u32) {
        match fixup {
            Fixup::Branch(at) => {
                if let Some(Op::Br(target) | Op::BrIf(target)) = self.ops.get_mut(at) {
                    target.pc = pc;
                }
            },
            Fixup::Table(at, slot) => {
                if let Some(Op::BrTable(targets)) = self.ops.get_mut(at) {
                    if let Some(target) = targets.get_mut(slot) {
                        target.pc = pc;
                    }
                }
            },
            Fixup::Jump(at) => {
                if let Some(Op::Jump(target)) = self.ops.get_mut(at) {
                    *target = pc;
                }
            },
        }
    }

    fn patch_if_jump(&mut self, at: usize, pc: u32) {
        if let Some(Op::BrUnless(target)) = self.ops.get_mut(at) {
            *target = pc;
        }
    }

    /// Resolve a branch to label `depth` from the current stack height.
    fn branch_target(&self, depth: u32) -> Result<(BranchTarget, Option<usize>, Vec<ValueType>)> {
        let index = self
            .controls
            .len()
            .checked_sub(depth as usize + 1)
            .ok_or_else(|| self.error(codes::INVALID_BRANCH_TARGET, format!("unknown label {depth}")))?;
        let frame = &self.controls[index];
        let types = frame.label_types().to_vec();
        let keep = types.len();
        let drop = self.operands.len().saturating_sub(frame.height + keep);
        let target = BranchTarget {
            pc:   if frame.kind == FrameKind::Loop { frame.start_pc } else { 0 },
            keep: keep as u32,
            drop: drop as u32,
        };
        let pending = (frame.kind != FrameKind::Loop).then_some(index);
        Ok((target, pending, types))
    }

    fn memory(&self) -> Result<()> {
        self.ctx.memory(0).map(|_| ()).map_err(|e| self.locate(e))
    }

    fn check_alignment(&self, align: u32, natural: u32) -> Result<()> {
        if align > natural {
            return Err(self.error(
                codes::INVALID_ALIGNMENT,
                format!("alignment must not be larger than natural ({align} > {natural})"),
            ));
        }
        Ok(())
    }

    fn instruction(&mut self, instruction: &Instruction) -> Result<()> {
        match instruction {
            Instruction::Unreachable => {
                self.emit(Op::Unreachable);
                self.set_unreachable()?;
            },
            Instruction::Nop => {}
            Instruction::Block(bt) => self.push_frame(FrameKind::Block, *bt)?,
            Instruction::Loop(bt) => self.push_frame(FrameKind::Loop, *bt)?,
            Instruction::If(bt) => {
                self.pop_expect(ValueType::I32)?;
                self.push_frame(FrameKind::If, *bt)?;
                let at = self.ops.len();
                self.emit(Op::BrUnless(0));
                if let Some(frame) = self.controls.last_mut() {
                    frame.if_jump = Some(at);
                }
            },
            Instruction::Else => {
                if self.frame()?.kind != FrameKind::If {
                    return Err(self.error(codes::UNBALANCED_CONTROL, "else without matching if"));
                }
                self.check_frame_end()?;
                let jump_at = self.ops.len();
                self.emit(Op::Jump(0));
                let else_pc = self.pc();
                let (if_jump, params) = {
                    let frame = self
                        .controls
                        .last_mut()
                        .ok_or_else(|| Error::new(ErrorCategory::Validation, codes::UNBALANCED_CONTROL, "control stack is empty"))?;
                    frame.kind = FrameKind::Else;
                    frame.unreachable = false;
                    frame.fixups.push(Fixup::Jump(jump_at));
                    (frame.if_jump.take(), frame.params.clone())
                };
                if let Some(at) = if_jump {
                    self.patch_if_jump(at, else_pc);
                }
                self.push_all(&params);
            },
            Instruction::End => self.end()?,
            Instruction::Br(depth) => {
                let (target, pending, types) = self.branch_target(*depth)?;
                self.pop_all(&types)?;
                self.emit_branch(Op::Br(target), pending);
                self.set_unreachable()?;
            },
            Instruction::BrIf(depth) => {
                self.pop_expect(ValueType::I32)?;
                let (target, pending, types) = self.branch_target(*depth)?;
                self.pop_all(&types)?;
                self.push_all(&types);
                self.emit_branch(Op::BrIf(target), pending);
            },
            Instruction::BrTable { targets, default } => self.br_table(targets, *default)?,
            Instruction::Return => {
                let results = self.controls.first().map(|f| f.results.clone()).unwrap_or_default();
                self.pop_all(&results)?;
                self.emit(Op::Return);
                self.set_unreachable()?;
            },
            Instruction::Call(index) => {
                let ty = self.ctx.func_type(*index).map_err(|e| self.locate(e))?.clone();
                self.pop_all(ty.params())?;
                self.push_all(ty.results());
                self.emit(Op::Call(*index));
            },
            Instruction::CallIndirect { type_index, table_index } => {
                let table = *self.ctx.table(*table_index).map_err(|e| self.locate(e))?;
                if table.element != RefType::FuncRef {
                    return Err(self.error(
                        codes::TYPE_MISMATCH,
                        "type mismatch: call_indirect requires a funcref table",
                    ));
                }
                let ty = self.ctx.type_at(*type_index).map_err(|e| self.locate(e))?.clone();
                self.pop_expect(ValueType::I32)?;
                self.pop_all(ty.params())?;
                self.push_all(ty.results());
                self.emit(Op::CallIndirect { type_index: *type_index, table_index: *table_index });
            },

            Instruction::Drop => {
                self.pop()?;
                self.emit(Op::Drop);
            },
            Instruction::Select => {
                self.pop_expect(ValueType::I32)?;
                let first = self.pop()?;
                let second = self.pop()?;
                if first.is_some_and(ValueType::is_ref) || second.is_some_and(ValueType::is_ref) {
                    return Err(self.error(
                        codes::TYPE_MISMATCH,
                        "type mismatch: select without a type requires numeric operands",
                    ));
                }
                let result = match (first, second) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(self.error(
                            codes::TYPE_MISMATCH,
                            format!("type mismatch: select operands {b} and {a} differ"),
                        ))
                    },
                    (Some(a), _) => Some(a),
                    (None, b) => b,
                };
                self.push(result);
                self.emit(Op::Select);
            },
            Instruction::SelectTyped(ty) => {
                self.pop_expect(ValueType::I32)?;
                self.pop_expect(*ty)?;
                self.pop_expect(*ty)?;
                self.push(*ty);
                self.emit(Op::Select);
            },

            Instruction::LocalGet(index) => {
                let ty = self.local(*index)?;
                self.push(ty);
                self.emit(Op::LocalGet(*index));
            },
            Instruction::LocalSet(index) => {
                let ty = self.local(*index)?;
                self.pop_expect(ty)?;
                self.emit(Op::LocalSet(*index));
            },
            Instruction::LocalTee(index) => {
                let ty = self.local(*index)?;
                self.pop_expect(ty)?;
                self.push(ty);
                self.emit(Op::LocalTee(*index));
            },
            Instruction::GlobalGet(index) => {
                let ty = self.ctx.global(*index).map_err(|e| self.locate(e))?.value_type;
                self.push(ty);
                self.emit(Op::GlobalGet(*index));
            },
            Instruction::GlobalSet(index) => {
                let global = *self.ctx.global(*index).map_err(|e| self.locate(e))?;
                if !global.mutable {
                    return Err(self.error(
                        codes::IMMUTABLE_GLOBAL,
                        format!("global is immutable: cannot modify global {index}"),
                    ));
                }
                self.pop_expect(global.value_type)?;
                self.emit(Op::GlobalSet(*index));
            },

            Instruction::TableGet(index) => {
                let element = self.table_element(*index)?;
                self.pop_expect(ValueType::I32)?;
                self.push(element);
                self.emit(Op::TableGet(*index));
            },
            Instruction::TableSet(index) => {
                let element = self.table_element(*index)?;
                self.pop_expect(element)?;
                self.pop_expect(ValueType::I32)?;
                self.emit(Op::TableSet(*index));
            },
            Instruction::TableSize(index) => {
                self.table_element(*index)?;
                self.push(ValueType::I32);
                self.emit(Op::TableSize(*index));
            },
            Instruction::TableGrow(index) => {
                let element = self.table_element(*index)?;
                self.pop_expect(ValueType::I32)?;
                self.pop_expect(element)?;
                self.push(ValueType::I32);
                self.emit(Op::TableGrow(*index));
            },
            Instruction::TableFill(index) => {
                let element = self.table_element(*index)?;
                self.pop_expect(ValueType::I32)?;
                self.pop_expect(element)?;
                self.pop_expect(ValueType::I32)?;
                self.emit(Op::TableFill(*index));
            },
            Instruction::TableCopy { dst, src } => {
                let dst_ty = self.table_element(*dst)?;
                let src_ty = self.table_element(*src)?;
                if dst_ty != src_ty {
                    return Err(self.error(
                        codes::TYPE_MISMATCH,
                        format!("type mismatch: table.copy from {src_ty} to {dst_ty}"),
                    ));
                }
                self.pop_all(&[ValueType::I32; 3])?;
                self.emit(Op::TableCopy { dst: *dst, src: *src });
            },
            Instruction::TableInit { elem, table } => {
                let table_ty = self.table_element(*table)?;
                let elem_ty: ValueType = self.ctx.element(*elem).map_err(|e| self.locate(e))?.into();
                if table_ty != elem_ty {
                    return Err(self.error(
                        codes::TYPE_MISMATCH,
                        format!("type mismatch: table.init of {elem_ty} into {table_ty}"),
                    ));
                }
                self.pop_all(&[ValueType::I32; 3])?;
                self.emit(Op::TableInit { table: *table, elem: *elem });
            },
            Instruction::ElemDrop(index) => {
                self.ctx.element(*index).map_err(|e| self.locate(e))?;
                self.emit(Op::ElemDrop(*index));
            },

            Instruction::Load(kind, memarg) => {
                self.memory()?;
                self.check_alignment(memarg.align, kind.natural_alignment())?;
                self.pop_expect(ValueType::I32)?;
                self.push(kind.value_type());
                self.emit(Op::Load(*kind, memarg.offset));
            },
            Instruction::Store(kind, memarg) => {
                self.memory()?;
                self.check_alignment(memarg.align, kind.natural_alignment())?;
                self.pop_expect(kind.value_type())?;
                self.pop_expect(ValueType::I32)?;
                self.emit(Op::Store(*kind, memarg.offset));
            },
            Instruction::MemorySize => {
                self.memory()?;
                self.push(ValueType::I32);
                self.emit(Op::MemorySize);
            },
            Instruction::MemoryGrow => {
                self.memory()?;
                self.pop_expect(ValueType::I32)?;
                self.push(ValueType::I32);
                self.emit(Op::MemoryGrow);
            },
            Instruction::MemoryInit(data) => {
                self.memory()?;
                self.ctx.data(*data).map_err(|e| self.locate(e))?;
                self.pop_all(&[ValueType::I32; 3])?;
                self.emit(Op::MemoryInit(*data));
            },
            Instruction::DataDrop(data) => {
                self.ctx.data(*data).map_err(|e| self.locate(e))?;
                self.emit(Op::DataDrop(*data));
            },
            Instruction::MemoryCopy => {
                self.memory()?;
                self.pop_all(&[ValueType::I32; 3])?;
                self.emit(Op::MemoryCopy);
            },
            Instruction::MemoryFill => {
                self.memory()?;
                self.pop_all(&[ValueType::I32; 3])?;
                self.emit(Op::MemoryFill);
            },

            Instruction::I32Const(v) => self.constant(Value::I32(*v)),
            Instruction::I64Const(v) => self.constant(Value::I64(*v)),
            Instruction::F32Const(v) => self.constant(Value::F32(*v)),
            Instruction::F64Const(v) => self.constant(Value::F64(*v)),
            Instruction::RefNull(ty) => self.constant(Value::null(*ty)),
            Instruction::RefIsNull => {
                self.pop_ref()?;
                self.push(ValueType::I32);
                self.emit(Op::RefIsNull);
            },
            Instruction::RefFunc(index) => {
                self.ctx.func_type(*index).map_err(|e| self.locate(e))?;
                if !self.ctx.declared_funcs.contains(index) {
                    return Err(self.error(
                        codes::UNDECLARED_FUNC_REF,
                        format!("undeclared function reference {index}"),
                    ));
                }
                self.push(ValueType::FuncRef);
                self.emit(Op::RefFunc(*index));
            },

            Instruction::Numeric(op) => {
                self.pop_all(op.params())?;
                self.push(op.result());
                self.emit(Op::Numeric(*op));
            },
        }
        Ok(())
    }

    fn constant(&mut self, value: Value) {
        self.push(value.value_type());
        self.emit(Op::Const(value.to_raw()));
    }

    fn local(&self, index: u32) -> Result<ValueType> {
        self.locals
            .get(index as usize)
            .copied()
            .ok_or_else(|| self.error(codes::UNKNOWN_LOCAL, format!("unknown local {index}")))
    }

    fn table_element(&self, index: u32) -> Result<ValueType> {
        self.ctx
            .table(index)
            .map(|table| table.element.into())
            .map_err(|e| self.locate(e))
    }

    fn emit_branch(&mut self, op: Op, pending: Option<usize>) {
        let at = self.ops.len();
        self.emit(op);
        if let Some(frame) = pending.and_then(|index| self.controls.get_mut(index)) {
            frame.fixups.push(Fixup::Branch(at));
        }
    }

    fn br_table(&mut self, labels: &[u32], default: u32) -> Result<()> {
        self.pop_expect(ValueType::I32)?;
        let (default_target, default_pending, default_types) = self.branch_target(default)?;
        let arity = default_types.len();

        let mut targets = Vec::with_capacity(labels.len() + 1);
        let mut pending = Vec::with_capacity(labels.len() + 1);
        for (slot, depth) in labels.iter().enumerate() {
            let (target, frame, types) = self.branch_target(*depth)?;
            if types.len() != arity {
                return Err(self.error(
                    codes::TYPE_MISMATCH,
                    "type mismatch: br_table targets have inconsistent arity",
                ));
            }
            // Each label must accept the operands without consuming them.
            self.pop_all(&types)?;
            self.push_all(&types);
            targets.push(target);
            if let Some(frame) = frame {
                pending.push((frame, slot));
            }
        }
        if let Some(frame) = default_pending {
            pending.push((frame, targets.len()));
        }
        targets.push(default_target);
        self.pop_all(&default_types)?;

        let at = self.ops.len();
        self.emit(Op::BrTable(targets.into_boxed_slice()));
        for (frame, slot) in pending {
            if let Some(frame) = self.controls.get_mut(frame) {
                frame.fixups.push(Fixup::Table(at, slot));
            }
        }
        self.set_unreachable()
    }

    fn end(&mut self) -> Result<()> {
        self.check_frame_end()?;
        let frame = self
            .controls
            .pop()
            .ok_or_else(|| self.error(codes::UNBALANCED_CONTROL, "unexpected end"))?;

        if let Some(at) = frame.if_jump {
            // `if` without `else` passes its parameters through unchanged.
            if frame.params != frame.results {
                return Err(self.error(
                    codes::TYPE_MISMATCH,
                    "type mismatch: if without else must leave its parameters unchanged",
                ));
            }
            let pc = self.pc();
            self.patch_if_jump(at, pc);
        }

        let pc = self.pc();
        for fixup in &frame.fixups {
            self.patch(*fixup, pc);
        }
        if frame.kind == FrameKind::Function {
            // Branches to the function label land on this `Return`.
            self.emit(Op::Return);
        }

        self.push_all(&frame.results);
        Ok(())
    }
}
