// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Function body decoding.
//!
//! Turns the bytes of one code section entry into its local declarations and
//! a flat [`Instruction`] sequence. Every instruction keeps the module offset
//! of its opcode so that validation errors and traps can point at it.

use kiln_error::{codes, Error, ErrorCategory, Result};
use kiln_foundation::Features;
use kiln_instructions::{
    opcodes as op, BlockType, Instruction, LoadKind, MemArg, NumericOp, StoreKind,
};

use crate::{
    module::FunctionBody,
    reader::BinaryReader,
    sections::{read_val_type, DecodeLimits},
};

fn malformed(message: impl Into<std::borrow::Cow<'static, str>>, offset: usize) -> Error {
    Error::new(ErrorCategory::Parse, codes::PARSE_ERROR, message).with_offset(offset)
}

fn disabled(what: &str, offset: usize) -> Error {
    Error::new(
        ErrorCategory::Parse,
        codes::FEATURE_DISABLED,
        format!("{what} support is not enabled"),
    )
    .with_offset(offset)
}

/// Decode one function body from a reader spanning exactly that body.
pub fn decode_function_body(
    body: &mut BinaryReader<'_>,
    features: &Features,
    limits: &DecodeLimits,
) -> Result<FunctionBody> {
    let offset = body.pos();

    let groups = body.read_count()?;
    let mut declared = Vec::with_capacity(groups as usize);
    let mut total: u64 = 0;
    for _ in 0..groups {
        let at = body.pos();
        let count = body.read_u32()?;
        total += u64::from(count);
        if total > u64::from(limits.max_locals) {
            return Err(Error::new(
                ErrorCategory::Parse,
                codes::TOO_MANY_LOCALS,
                format!("too many locals: more than {}", limits.max_locals),
            )
            .with_offset(at));
        }
        declared.push((count, read_val_type(body, features)?));
    }
    let locals = declared
        .into_iter()
        .flat_map(|(count, ty)| core::iter::repeat_n(ty, count as usize))
        .collect();

    let mut instructions = Vec::new();
    let mut offsets = Vec::new();
    let mut depth = 1usize;
    while depth > 0 {
        if body.is_empty() {
            return Err(Error::new(
                ErrorCategory::Parse,
                codes::UNEXPECTED_EOF,
                "function body must end with END opcode",
            )
            .with_offset(body.pos()));
        }
        let at = body.pos();
        let instruction = decode_instruction(body, features)?;
        match instruction {
            Instruction::Block(_) | Instruction::Loop(_) | Instruction::If(_) => depth += 1,
            Instruction::End => depth -= 1,
            _ => {}
        }
        instructions.push(instruction);
        offsets.push(at as u32);
    }
    body.finish("function body")?;

    Ok(FunctionBody { locals, instructions, offsets, offset })
}

fn read_block_type(reader: &mut BinaryReader<'_>, features: &Features) -> Result<BlockType> {
    let at = reader.pos();
    let byte = reader.peek_u8()?;
    if byte == op::BLOCK_TYPE_EMPTY {
        reader.read_u8()?;
        return Ok(BlockType::Empty);
    }
    // Value types are single negative s33 bytes; anything else is a type index.
    if byte & 0xC0 == 0x40 {
        return Ok(BlockType::Value(read_val_type(reader, features)?));
    }
    let index = reader.read_s33()?;
    if !features.multi_value {
        return Err(disabled("multi-value", at));
    }
    u32::try_from(index)
        .map(BlockType::FuncType)
        .map_err(|_| malformed(format!("invalid block type {index}"), at))
}

fn read_memarg(reader: &mut BinaryReader<'_>) -> Result<MemArg> {
    let align = reader.read_u32()?;
    let offset = reader.read_u32()?;
    Ok(MemArg { align, offset })
}

fn read_zero_byte(reader: &mut BinaryReader<'_>) -> Result<()> {
    let at = reader.pos();
    match reader.read_u8()? {
        0 => Ok(()),
        _ => Err(malformed("zero byte expected", at)),
    }
}

fn decode_instruction(reader: &mut BinaryReader<'_>, features: &Features) -> Result<Instruction> {
    let at = reader.pos();
    let opcode = reader.read_u8()?;
    let instruction = match opcode {
        op::UNREACHABLE => Instruction::Unreachable,
        op::NOP => Instruction::Nop,
        op::BLOCK => Instruction::Block(read_block_type(reader, features)?),
        op::LOOP => Instruction::Loop(read_block_type(reader, features)?),
        op::IF => Instruction::If(read_block_type(reader, features)?),
        op::ELSE => Instruction::Else,
        op::END => Instruction::End,
        op::BR => Instruction::Br(reader.read_u32()?),
        op::BR_IF => Instruction::BrIf(reader.read_u32()?),
        op::BR_TABLE => {
            let count = reader.read_count()?;
            let targets = (0..count).map(|_| reader.read_u32()).collect::<Result<Box<[u32]>>>()?;
            Instruction::BrTable { targets, default: reader.read_u32()? }
        },
        op::RETURN => Instruction::Return,
        op::CALL => Instruction::Call(reader.read_u32()?),
        op::CALL_INDIRECT => {
            let type_index = reader.read_u32()?;
            let table_at = reader.pos();
            let table_index = reader.read_u32()?;
            if table_index != 0 && !features.reference_types {
                return Err(malformed("zero byte expected", table_at));
            }
            Instruction::CallIndirect { type_index, table_index }
        },

        op::DROP => Instruction::Drop,
        op::SELECT => Instruction::Select,
        op::SELECT_T => {
            if !features.reference_types {
                return Err(disabled("reference types", at));
            }
            let count_at = reader.pos();
            if reader.read_u32()? != 1 {
                return Err(malformed("invalid result arity for typed select", count_at));
            }
            Instruction::SelectTyped(read_val_type(reader, features)?)
        },

        op::LOCAL_GET => Instruction::LocalGet(reader.read_u32()?),
        op::LOCAL_SET => Instruction::LocalSet(reader.read_u32()?),
        op::LOCAL_TEE => Instruction::LocalTee(reader.read_u32()?),
        op::GLOBAL_GET => Instruction::GlobalGet(reader.read_u32()?),
        op::GLOBAL_SET => Instruction::GlobalSet(reader.read_u32()?),
        op::TABLE_GET | op::TABLE_SET if !features.reference_types => {
            return Err(disabled("reference types", at));
        },
        op::TABLE_GET => Instruction::TableGet(reader.read_u32()?),
        op::TABLE_SET => Instruction::TableSet(reader.read_u32()?),

        op::I32_LOAD => Instruction::Load(LoadKind::I32, read_memarg(reader)?),
        op::I64_LOAD => Instruction::Load(LoadKind::I64, read_memarg(reader)?),
        op::F32_LOAD => Instruction::Load(LoadKind::F32, read_memarg(reader)?),
        op::F64_LOAD => Instruction::Load(LoadKind::F64, read_memarg(reader)?),
        op::I32_LOAD8_S => Instruction::Load(LoadKind::I32Load8S, read_memarg(reader)?),
        op::I32_LOAD8_U => Instruction::Load(LoadKind::I32Load8U, read_memarg(reader)?),
        op::I32_LOAD16_S => Instruction::Load(LoadKind::I32Load16S, read_memarg(reader)?),
        op::I32_LOAD16_U => Instruction::Load(LoadKind::I32Load16U, read_memarg(reader)?),
        op::I64_LOAD8_S => Instruction::Load(LoadKind::I64Load8S, read_memarg(reader)?),
        op::I64_LOAD8_U => Instruction::Load(LoadKind::I64Load8U, read_memarg(reader)?),
        op::I64_LOAD16_S => Instruction::Load(LoadKind::I64Load16S, read_memarg(reader)?),
        op::I64_LOAD16_U => Instruction::Load(LoadKind::I64Load16U, read_memarg(reader)?),
        op::I64_LOAD32_S => Instruction::Load(LoadKind::I64Load32S, read_memarg(reader)?),
        op::I64_LOAD32_U => Instruction::Load(LoadKind::I64Load32U, read_memarg(reader)?),
        op::I32_STORE => Instruction::Store(StoreKind::I32, read_memarg(reader)?),
        op::I64_STORE => Instruction::Store(StoreKind::I64, read_memarg(reader)?),
        op::F32_STORE => Instruction::Store(StoreKind::F32, read_memarg(reader)?),
        op::F64_STORE => Instruction::Store(StoreKind::F64, read_memarg(reader)?),
        op::I32_STORE8 => Instruction::Store(StoreKind::I32Store8, read_memarg(reader)?),
        op::I32_STORE16 => Instruction::Store(StoreKind::I32Store16, read_memarg(reader)?),
        op::I64_STORE8 => Instruction::Store(StoreKind::I64Store8, read_memarg(reader)?),
        op::I64_STORE16 => Instruction::Store(StoreKind::I64Store16, read_memarg(reader)?),
        op::I64_STORE32 => Instruction::Store(StoreKind::I64Store32, read_memarg(reader)?),
        op::MEMORY_SIZE => {
            read_zero_byte(reader)?;
            Instruction::MemorySize
        },
        op::MEMORY_GROW => {
            read_zero_byte(reader)?;
            Instruction::MemoryGrow
        },

        op::I32_CONST => Instruction::I32Const(reader.read_i32()?),
        op::I64_CONST => Instruction::I64Const(reader.read_i64()?),
        op::F32_CONST => Instruction::F32Const(reader.read_f32()?),
        op::F64_CONST => Instruction::F64Const(reader.read_f64()?),

        op::REF_NULL | op::REF_IS_NULL | op::REF_FUNC if !features.reference_types => {
            return Err(disabled("reference types", at));
        },
        op::REF_NULL => Instruction::RefNull(reader.read_ref_type()?),
        op::REF_IS_NULL => Instruction::RefIsNull,
        op::REF_FUNC => Instruction::RefFunc(reader.read_u32()?),

        op::PREFIX_FC => decode_prefixed(reader, features, at)?,

        byte => {
            let numeric = NumericOp::from_code(u32::from(byte)).ok_or_else(|| {
                Error::new(
                    ErrorCategory::Parse,
                    codes::UNKNOWN_OPCODE,
                    format!("illegal opcode 0x{byte:02x}"),
                )
                .with_offset(at)
            })?;
            if numeric.is_sign_extension() && !features.sign_extension {
                return Err(disabled("sign extension", at));
            }
            Instruction::Numeric(numeric)
        },
    };
    Ok(instruction)
}

fn decode_prefixed(reader: &mut BinaryReader<'_>, features: &Features, at: usize) -> Result<Instruction> {
    let sub = reader.read_u32()?;
    if sub <= 7 {
        if !features.saturating_float_to_int {
            return Err(disabled("saturating float-to-int", at));
        }
        return NumericOp::from_code(0xFC00 | sub)
            .map(Instruction::Numeric)
            .ok_or_else(|| malformed(format!("illegal opcode 0xfc {sub}"), at));
    }

    let needs_ref_types = matches!(sub, op::TABLE_GROW | op::TABLE_SIZE | op::TABLE_FILL);
    if needs_ref_types && !features.reference_types {
        return Err(disabled("reference types", at));
    }
    if !needs_ref_types && !features.bulk_memory {
        return Err(disabled("bulk memory", at));
    }

    Ok(match sub {
        op::MEMORY_INIT => {
            let data = reader.read_u32()?;
            read_zero_byte(reader)?;
            Instruction::MemoryInit(data)
        },
        op::DATA_DROP => Instruction::DataDrop(reader.read_u32()?),
        op::MEMORY_COPY => {
            read_zero_byte(reader)?;
            read_zero_byte(reader)?;
            Instruction::MemoryCopy
        },
        op::MEMORY_FILL => {
            read_zero_byte(reader)?;
            Instruction::MemoryFill
        },
        op::TABLE_INIT => {
            let elem = reader.read_u32()?;
            let table = reader.read_u32()?;
            Instruction::TableInit { elem, table }
        },
        op::ELEM_DROP => Instruction::ElemDrop(reader.read_u32()?),
        op::TABLE_COPY => {
            let dst = reader.read_u32()?;
            let src = reader.read_u32()?;
            Instruction::TableCopy { dst, src }
        },
        op::TABLE_GROW => Instruction::TableGrow(reader.read_u32()?),
        op::TABLE_SIZE => Instruction::TableSize(reader.read_u32()?),
        op::TABLE_FILL => Instruction::TableFill(reader.read_u32()?),
        _ => {
            return Err(Error::new(
                ErrorCategory::Parse,
                codes::UNKNOWN_OPCODE,
                format!("illegal opcode 0xfc {sub}"),
            )
            .with_offset(at))
        },
    })
}
