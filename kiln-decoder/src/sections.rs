// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Module-level binary decoding.
//!
//! Walks the section sequence, enforcing the canonical order and exact
//! section sizes, and decodes every known section into a
//! [`DecodedModule`].

use std::sync::Arc;

use kiln_error::{codes, Error, ErrorCategory, Result};
use kiln_foundation::{
    ExternKind, Features, FuncType, GlobalType, MemoryType, RefType, TableType, ValueType,
};
use kiln_instructions::opcodes;
use log::{debug, trace};

use crate::{
    code::decode_function_body,
    module::{
        ConstExpr, CustomSection, DataMode, DataSegment, DecodedModule, ElementMode,
        ElementSegment, Export, GlobalDef, Import, ImportDesc,
    },
    name_section::parse_name_section,
    reader::BinaryReader,
};

/// The `\0asm` magic number
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
/// The only supported binary format version
pub const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Section identifiers
pub mod section_id {
    /// Custom section
    pub const CUSTOM: u8 = 0;
    /// Type section
    pub const TYPE: u8 = 1;
    /// Import section
    pub const IMPORT: u8 = 2;
    /// Function section
    pub const FUNCTION: u8 = 3;
    /// Table section
    pub const TABLE: u8 = 4;
    /// Memory section
    pub const MEMORY: u8 = 5;
    /// Global section
    pub const GLOBAL: u8 = 6;
    /// Export section
    pub const EXPORT: u8 = 7;
    /// Start section
    pub const START: u8 = 8;
    /// Element section
    pub const ELEMENT: u8 = 9;
    /// Code section
    pub const CODE: u8 = 10;
    /// Data section
    pub const DATA: u8 = 11;
    /// Data count section
    pub const DATA_COUNT: u8 = 12;
}

/// Structural limits enforced while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum number of declared locals per function, parameters excluded
    pub max_locals:       u32,
    /// Maximum size of a single section in bytes
    pub max_section_size: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self { max_locals: 50_000, max_section_size: 1 << 30 }
    }
}

/// Position of a section id in the canonical order.
const fn section_rank(id: u8) -> Option<u8> {
    Some(match id {
        section_id::TYPE => 1,
        section_id::IMPORT => 2,
        section_id::FUNCTION => 3,
        section_id::TABLE => 4,
        section_id::MEMORY => 5,
        section_id::GLOBAL => 6,
        section_id::EXPORT => 7,
        section_id::START => 8,
        section_id::ELEMENT => 9,
        section_id::DATA_COUNT => 10,
        section_id::CODE => 11,
        section_id::DATA => 12,
        _ => return None,
    })
}

fn parse_err(code: u16, message: impl Into<std::borrow::Cow<'static, str>>, offset: usize) -> Error {
    Error::new(ErrorCategory::Parse, code, message).with_offset(offset)
}

fn feature_disabled(what: &str, offset: usize) -> Error {
    parse_err(codes::FEATURE_DISABLED, format!("{what} support is not enabled"), offset)
}

/// Decode a binary module without validating it.
pub fn decode_module(bytes: &[u8], features: &Features, limits: &DecodeLimits) -> Result<DecodedModule> {
    let mut reader = BinaryReader::new(bytes);

    let magic = reader
        .read_bytes(4)
        .map_err(|_| parse_err(codes::INVALID_MAGIC, "magic header not detected", 0))?;
    if magic != WASM_MAGIC {
        return Err(parse_err(codes::INVALID_MAGIC, "magic header not detected", 0));
    }
    let version = reader
        .read_bytes(4)
        .map_err(|_| parse_err(codes::INVALID_VERSION, "unknown binary version", 4))?;
    if version != WASM_VERSION {
        return Err(parse_err(codes::INVALID_VERSION, "unknown binary version", 4));
    }

    let mut decoder = SectionDecoder { module: DecodedModule::default(), features, limits };
    let mut last_rank = 0u8;

    while !reader.is_empty() {
        let id_offset = reader.pos();
        let id = reader.read_u8()?;
        let size_offset = reader.pos();
        let size = reader.read_u32()? as usize;
        if size > limits.max_section_size {
            return Err(parse_err(
                codes::SECTION_TOO_LARGE,
                format!("section size {size} exceeds limit of {} bytes", limits.max_section_size),
                size_offset,
            ));
        }
        if size > reader.remaining() {
            return Err(parse_err(
                codes::SECTION_TOO_LARGE,
                format!("section size {size} exceeds the {} remaining bytes", reader.remaining()),
                size_offset,
            ));
        }
        let mut section = reader.sub_reader(size)?;

        if id == section_id::CUSTOM {
            decoder.custom_section(&mut section)?;
            continue;
        }

        let rank = section_rank(id).ok_or_else(|| {
            parse_err(codes::UNKNOWN_SECTION, format!("malformed section id {id}"), id_offset)
        })?;
        if rank <= last_rank {
            return Err(parse_err(
                codes::SECTION_OUT_OF_ORDER,
                format!("unexpected section {id}: duplicate or out of order"),
                id_offset,
            ));
        }
        last_rank = rank;
        trace!("decoding section {id} ({size} bytes at 0x{size_offset:x})");

        match id {
            section_id::TYPE => decoder.type_section(&mut section)?,
            section_id::IMPORT => decoder.import_section(&mut section)?,
            section_id::FUNCTION => decoder.function_section(&mut section)?,
            section_id::TABLE => decoder.table_section(&mut section)?,
            section_id::MEMORY => decoder.memory_section(&mut section)?,
            section_id::GLOBAL => decoder.global_section(&mut section)?,
            section_id::EXPORT => decoder.export_section(&mut section)?,
            section_id::START => decoder.module.start = Some(section.read_u32()?),
            section_id::ELEMENT => decoder.element_section(&mut section)?,
            section_id::DATA_COUNT => decoder.module.data_count = Some(section.read_u32()?),
            section_id::CODE => decoder.code_section(&mut section)?,
            section_id::DATA => decoder.data_section(&mut section)?,
            _ => {}
        }
        section.finish("section")?;
    }

    let module = decoder.module;
    if module.functions.len() != module.bodies.len() {
        return Err(parse_err(
            codes::FUNCTION_CODE_MISMATCH,
            "function and code section have inconsistent lengths",
            bytes.len(),
        ));
    }
    if let Some(count) = module.data_count {
        if count as usize != module.data.len() {
            return Err(parse_err(
                codes::DATA_COUNT_MISMATCH,
                "data count and data section have inconsistent lengths",
                bytes.len(),
            ));
        }
    }

    debug!(
        "decoded module: {} types, {} imports, {} functions, {} exports, {} bytes",
        module.types.len(),
        module.imports.len(),
        module.functions.len(),
        module.exports.len(),
        bytes.len()
    );
    Ok(module)
}

struct SectionDecoder<'f> {
    module:   DecodedModule,
    features: &'f Features,
    limits:   &'f DecodeLimits,
}

impl SectionDecoder<'_> {
    fn custom_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let name = section.read_name()?.to_owned();
        let offset = section.pos();
        let payload = section.clone();
        let data = section.read_bytes(section.remaining())?.to_vec();
        if name == "name" {
            match parse_name_section(payload) {
                Ok(names) => self.module.names = names,
                Err(e) => debug!("ignoring malformed name section: {e}"),
            }
        }
        self.module.custom_sections.push(CustomSection { name, offset, data });
        Ok(())
    }

    fn type_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        self.module.types.reserve(count as usize);
        for _ in 0..count {
            let at = section.pos();
            let form = section.read_u8()?;
            if form != 0x60 {
                return Err(parse_err(
                    codes::PARSE_ERROR,
                    format!("malformed function type form 0x{form:02x}"),
                    at,
                ));
            }
            let params = self.value_types(section)?;
            let results = self.value_types(section)?;
            self.module.types.push(FuncType::new(params, results));
        }
        Ok(())
    }

    fn value_types(&self, section: &mut BinaryReader<'_>) -> Result<Vec<ValueType>> {
        let count = section.read_count()?;
        (0..count).map(|_| read_val_type(section, self.features)).collect()
    }

    fn import_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        for _ in 0..count {
            let module = section.read_name()?.to_owned();
            let name = section.read_name()?.to_owned();
            let at = section.pos();
            let desc = match section.read_u8()? {
                0x00 => ImportDesc::Func(section.read_u32()?),
                0x01 => ImportDesc::Table(self.table_type(section)?),
                0x02 => ImportDesc::Memory(MemoryType { limits: section.read_limits()? }),
                0x03 => ImportDesc::Global(self.global_type(section)?),
                kind => {
                    return Err(parse_err(
                        codes::PARSE_ERROR,
                        format!("malformed import kind 0x{kind:02x}"),
                        at,
                    ))
                },
            };
            self.module.imports.push(Import { module, name, desc });
        }
        Ok(())
    }

    fn table_type(&self, section: &mut BinaryReader<'_>) -> Result<TableType> {
        let at = section.pos();
        let element = section.read_ref_type()?;
        if element == RefType::ExternRef && !self.features.reference_types {
            return Err(feature_disabled("reference types", at));
        }
        Ok(TableType { element, limits: section.read_limits()? })
    }

    fn global_type(&self, section: &mut BinaryReader<'_>) -> Result<GlobalType> {
        let value_type = read_val_type(section, self.features)?;
        let at = section.pos();
        let mutable = match section.read_u8()? {
            0x00 => false,
            0x01 => true,
            flag => {
                return Err(parse_err(
                    codes::PARSE_ERROR,
                    format!("malformed mutability 0x{flag:02x}"),
                    at,
                ))
            },
        };
        Ok(GlobalType { value_type, mutable })
    }

    fn function_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        self.module.functions = (0..count).map(|_| section.read_u32()).collect::<Result<_>>()?;
        Ok(())
    }

    fn table_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        for _ in 0..count {
            let table = self.table_type(section)?;
            self.module.tables.push(table);
        }
        Ok(())
    }

    fn memory_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        for _ in 0..count {
            self.module.memories.push(MemoryType { limits: section.read_limits()? });
        }
        Ok(())
    }

    fn global_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        for _ in 0..count {
            let ty = self.global_type(section)?;
            let init = read_const_expr(section, self.features)?;
            self.module.globals.push(GlobalDef { ty, init });
        }
        Ok(())
    }

    fn export_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        for _ in 0..count {
            let name = section.read_name()?.to_owned();
            let at = section.pos();
            let kind = match section.read_u8()? {
                0x00 => ExternKind::Func,
                0x01 => ExternKind::Table,
                0x02 => ExternKind::Memory,
                0x03 => ExternKind::Global,
                kind => {
                    return Err(parse_err(
                        codes::PARSE_ERROR,
                        format!("malformed export kind 0x{kind:02x}"),
                        at,
                    ))
                },
            };
            let index = section.read_u32()?;
            self.module.exports.push(Export { name, kind, index });
        }
        Ok(())
    }

    fn element_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        for _ in 0..count {
            let at = section.pos();
            let flags = section.read_u32()?;
            if flags > 7 {
                return Err(parse_err(
                    codes::PARSE_ERROR,
                    format!("malformed elements segment kind {flags}"),
                    at,
                ));
            }
            if flags != 0 && !(self.features.bulk_memory || self.features.reference_types) {
                return Err(feature_disabled("bulk memory", at));
            }

            let passive_or_declarative = flags & 0b001 != 0;
            let explicit_table = flags & 0b010 != 0;
            let uses_exprs = flags & 0b100 != 0;

            let mode = if passive_or_declarative {
                if explicit_table {
                    ElementMode::Declarative
                } else {
                    ElementMode::Passive
                }
            } else {
                let table = if explicit_table { section.read_u32()? } else { 0 };
                let offset = read_const_expr(section, self.features)?;
                ElementMode::Active { table, offset }
            };

            // Flags 0 and 4 imply funcref, every other form states the type.
            let ty = if flags & 0b011 == 0 {
                RefType::FuncRef
            } else if uses_exprs {
                let ty_at = section.pos();
                let ty = section.read_ref_type()?;
                if ty == RefType::ExternRef && !self.features.reference_types {
                    return Err(feature_disabled("reference types", ty_at));
                }
                ty
            } else {
                let kind_at = section.pos();
                let kind = section.read_u8()?;
                if kind != 0x00 {
                    return Err(parse_err(
                        codes::PARSE_ERROR,
                        format!("malformed element kind 0x{kind:02x}"),
                        kind_at,
                    ));
                }
                RefType::FuncRef
            };

            let item_count = section.read_count()?;
            let mut items = Vec::with_capacity(item_count as usize);
            for _ in 0..item_count {
                items.push(if uses_exprs {
                    read_const_expr(section, self.features)?
                } else {
                    ConstExpr::RefFunc(section.read_u32()?)
                });
            }

            self.module.elements.push(ElementSegment { ty, items, mode });
        }
        Ok(())
    }

    fn code_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        if count as usize != self.module.functions.len() {
            return Err(parse_err(
                codes::FUNCTION_CODE_MISMATCH,
                "function and code section have inconsistent lengths",
                section.pos(),
            ));
        }
        self.module.bodies.reserve(count as usize);
        for _ in 0..count {
            let size = section.read_u32()? as usize;
            let mut body = section.sub_reader(size)?;
            let decoded = decode_function_body(&mut body, self.features, self.limits)?;
            self.module.bodies.push(decoded);
        }
        Ok(())
    }

    fn data_section(&mut self, section: &mut BinaryReader<'_>) -> Result<()> {
        let count = section.read_count()?;
        for _ in 0..count {
            let at = section.pos();
            let mode = match section.read_u32()? {
                0 => DataMode::Active { memory: 0, offset: read_const_expr(section, self.features)? },
                1 if self.features.bulk_memory => DataMode::Passive,
                2 if self.features.bulk_memory => {
                    let memory = section.read_u32()?;
                    DataMode::Active { memory, offset: read_const_expr(section, self.features)? }
                },
                1 | 2 => return Err(feature_disabled("bulk memory", at)),
                flags => {
                    return Err(parse_err(
                        codes::PARSE_ERROR,
                        format!("malformed data segment kind {flags}"),
                        at,
                    ))
                },
            };
            let len = section.read_u32()? as usize;
            let bytes: Arc<[u8]> = Arc::from(section.read_bytes(len)?);
            self.module.data.push(DataSegment { mode, bytes });
        }
        Ok(())
    }
}

/// Read a value type, rejecting reference types when they are disabled.
pub(crate) fn read_val_type(reader: &mut BinaryReader<'_>, features: &Features) -> Result<ValueType> {
    let at = reader.pos();
    let ty = reader.read_value_type()?;
    if ty.is_ref() && !features.reference_types {
        return Err(feature_disabled("reference types", at));
    }
    Ok(ty)
}

/// Read a single-instruction constant expression terminated by `end`.
pub(crate) fn read_const_expr(reader: &mut BinaryReader<'_>, features: &Features) -> Result<ConstExpr> {
    let at = reader.pos();
    let expr = match reader.read_u8()? {
        opcodes::I32_CONST => ConstExpr::I32(reader.read_i32()?),
        opcodes::I64_CONST => ConstExpr::I64(reader.read_i64()?),
        opcodes::F32_CONST => ConstExpr::F32(reader.read_f32()?),
        opcodes::F64_CONST => ConstExpr::F64(reader.read_f64()?),
        opcodes::GLOBAL_GET => ConstExpr::GlobalGet(reader.read_u32()?),
        opcodes::REF_NULL if features.reference_types || features.bulk_memory => {
            ConstExpr::RefNull(reader.read_ref_type()?)
        },
        opcodes::REF_FUNC if features.reference_types || features.bulk_memory => {
            ConstExpr::RefFunc(reader.read_u32()?)
        },
        opcodes::END => {
            return Err(Error::new(
                ErrorCategory::Validation,
                codes::CONSTANT_EXPR,
                "type mismatch: constant expression is empty",
            )
            .with_offset(at))
        },
        opcode => {
            return Err(Error::new(
                ErrorCategory::Validation,
                codes::CONSTANT_EXPR,
                format!("constant expression required, found opcode 0x{opcode:02x}"),
            )
            .with_offset(at))
        },
    };
    let end_at = reader.pos();
    if reader.read_u8()? != opcodes::END {
        return Err(Error::new(
            ErrorCategory::Validation,
            codes::CONSTANT_EXPR,
            "constant expression must be a single instruction",
        )
        .with_offset(end_at));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        let mut bytes = WASM_MAGIC.to_vec();
        bytes.extend_from_slice(&WASM_VERSION);
        bytes
    }

    fn decode(bytes: &[u8]) -> Result<DecodedModule> {
        decode_module(bytes, &Features::default(), &DecodeLimits::default())
    }

    #[test]
    fn test_empty_module() {
        let module = decode(&header()).unwrap();
        assert!(module.types.is_empty());
    }

    #[test]
    fn test_bad_magic_and_version() {
        assert_eq!(decode(b"\0asn\x01\0\0\0").unwrap_err().code, codes::INVALID_MAGIC);
        assert_eq!(decode(b"\0asm\x02\0\0\0").unwrap_err().code, codes::INVALID_VERSION);
        assert_eq!(decode(b"\0as").unwrap_err().code, codes::INVALID_MAGIC);
    }

    #[test]
    fn test_sections_out_of_order() {
        let mut bytes = header();
        // memory section, then a type section
        bytes.extend_from_slice(&[5, 3, 1, 0, 1]);
        bytes.extend_from_slice(&[1, 1, 0]);
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.code, codes::SECTION_OUT_OF_ORDER);
        assert_eq!(err.offset(), Some(13));
    }

    #[test]
    fn test_duplicate_section() {
        let mut bytes = header();
        bytes.extend_from_slice(&[1, 1, 0, 1, 1, 0]);
        assert_eq!(decode(&bytes).unwrap_err().code, codes::SECTION_OUT_OF_ORDER);
    }

    #[test]
    fn test_section_size_mismatch() {
        let mut bytes = header();
        // type section declares 2 bytes but its single vector needs only 1
        bytes.extend_from_slice(&[1, 2, 0, 0]);
        assert_eq!(decode(&bytes).unwrap_err().code, codes::SECTION_SIZE_MISMATCH);

        let mut bytes = header();
        bytes.extend_from_slice(&[1, 10, 0]);
        assert_eq!(decode(&bytes).unwrap_err().code, codes::SECTION_TOO_LARGE);
    }

    #[test]
    fn test_section_limit() {
        let mut bytes = header();
        bytes.extend_from_slice(&[1, 1, 0]);
        let limits = DecodeLimits { max_section_size: 0, ..DecodeLimits::default() };
        let err = decode_module(&bytes, &Features::default(), &limits).unwrap_err();
        assert_eq!(err.code, codes::SECTION_TOO_LARGE);
    }

    #[test]
    fn test_custom_sections_anywhere() {
        let mut bytes = header();
        bytes.extend_from_slice(&[0, 4, 3, b'f', b'o', b'o']);
        bytes.extend_from_slice(&[1, 1, 0]);
        bytes.extend_from_slice(&[0, 2, 1, b'x']);
        let module = decode(&bytes).unwrap();
        assert_eq!(module.custom_sections.len(), 2);
        assert_eq!(module.custom_sections[0].name, "foo");
        assert_eq!(module.custom_sections[1].data, Vec::<u8>::new());
    }

    #[test]
    fn test_function_without_code() {
        let mut bytes = header();
        bytes.extend_from_slice(&[1, 4, 1, 0x60, 0, 0]);
        bytes.extend_from_slice(&[3, 2, 1, 0]);
        assert_eq!(decode(&bytes).unwrap_err().code, codes::FUNCTION_CODE_MISMATCH);
    }

    #[test]
    fn test_data_count_mismatch() {
        let mut bytes = header();
        bytes.extend_from_slice(&[12, 1, 1]);
        assert_eq!(decode(&bytes).unwrap_err().code, codes::DATA_COUNT_MISMATCH);
    }

    #[test]
    fn test_externref_requires_reference_types() {
        let mut bytes = header();
        bytes.extend_from_slice(&[1, 5, 1, 0x60, 1, 0x6F, 0]);
        let features = Features { reference_types: false, ..Features::default() };
        let err = decode_module(&bytes, &features, &DecodeLimits::default()).unwrap_err();
        assert_eq!(err.code, codes::FEATURE_DISABLED);
        assert!(decode(&bytes).is_ok());
    }
}
