// Kiln - kiln-decoder
// Module: WebAssembly Binary Decoder
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

//! WebAssembly module decoder and validator for the Kiln engine.
//!
//! Turning bytes into an executable [`Module`] happens in two steps:
//!
//! 1. [`decode_module`] parses the binary format into a [`DecodedModule`].
//!    It rejects malformed input (bad header, truncated data, invalid LEB128
//!    integers, misordered or mis-sized sections) with a
//!    [`ErrorCategory::Parse`](kiln_error::ErrorCategory::Parse) error.
//! 2. [`validate`] type-checks the decoded module and lowers every function
//!    body to the direct-dispatch [`kiln_instructions::Op`] form, failing
//!    with an [`ErrorCategory::Validation`](kiln_error::ErrorCategory::Validation)
//!    error.
//!
//! Both steps are pure. [`compile`] runs them back to back.
//!
//! ```
//! use kiln_decoder::{compile, DecodeLimits};
//! use kiln_foundation::Features;
//!
//! // (module (func (export "nop")))
//! let bytes = [
//!     0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // header
//!     0x01, 0x04, 0x01, 0x60, 0x00, 0x00, // type section
//!     0x03, 0x02, 0x01, 0x00, // function section
//!     0x07, 0x07, 0x01, 0x03, b'n', b'o', b'p', 0x00, 0x00, // export section
//!     0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b, // code section
//! ];
//! let module = compile(&bytes, &Features::default(), &DecodeLimits::default()).unwrap();
//! assert_eq!(module.exports()[0].name, "nop");
//! ```

#![warn(missing_docs)]

pub mod code;
pub mod leb128;
pub mod module;
pub mod name_section;
pub mod reader;
pub mod sections;
pub mod validation;

pub use kiln_error::{Error, Result};
use kiln_foundation::Features;
pub use module::{
    ConstExpr, CustomSection, DataMode, DataSegment, DecodedModule, ElementMode, ElementSegment,
    Export, FunctionBody, GlobalDef, Import, ImportDesc, Module, Names,
};
pub use reader::BinaryReader;
pub use sections::{decode_module, DecodeLimits};
pub use validation::validate;

/// Decode and validate a binary module.
pub fn compile(bytes: &[u8], features: &Features, limits: &DecodeLimits) -> Result<Module> {
    let decoded = decode_module(bytes, features, limits)?;
    validate(decoded, features)
}
