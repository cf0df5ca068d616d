// Kiln - kiln-error
// Module: Error Codes
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Error codes for kiln

// Decode error codes (1000-1099)
/// Generic malformed binary
pub const PARSE_ERROR: u16 = 1000;
/// Magic number is not `\0asm`
pub const INVALID_MAGIC: u16 = 1001;
/// Unsupported binary format version
pub const INVALID_VERSION: u16 = 1002;
/// Input ended in the middle of a construct
pub const UNEXPECTED_EOF: u16 = 1003;
/// LEB128 integer is too long or has unused bits set
pub const INVALID_LEB128: u16 = 1004;
/// Non-custom section appears out of order or more than once
pub const SECTION_OUT_OF_ORDER: u16 = 1005;
/// Section content does not match its declared size
pub const SECTION_SIZE_MISMATCH: u16 = 1006;
/// Section declares more bytes than are available or allowed
pub const SECTION_TOO_LARGE: u16 = 1007;
/// Name is not valid UTF-8
pub const INVALID_UTF8: u16 = 1008;
/// Unknown section id
pub const UNKNOWN_SECTION: u16 = 1009;
/// Unknown or disabled opcode
pub const UNKNOWN_OPCODE: u16 = 1010;
/// Unknown value or reference type encoding
pub const INVALID_VALUE_TYPE: u16 = 1011;
/// Function and code section lengths differ
pub const FUNCTION_CODE_MISMATCH: u16 = 1012;
/// Data count section disagrees with the data section
pub const DATA_COUNT_MISMATCH: u16 = 1013;
/// Function declares too many locals
pub const TOO_MANY_LOCALS: u16 = 1014;
/// Encoding uses a feature disabled in the configuration
pub const FEATURE_DISABLED: u16 = 1015;
/// Integer representation too large for its target
pub const INTEGER_TOO_LARGE: u16 = 1016;

// Validation error codes (2000-2099)
/// Generic validation failure
pub const VALIDATION_ERROR: u16 = 2000;
/// Operand stack does not have the expected types
pub const TYPE_MISMATCH: u16 = 2001;
/// Branch depth exceeds the enclosing labels
pub const INVALID_BRANCH_TARGET: u16 = 2002;
/// Unknown type index
pub const UNKNOWN_TYPE: u16 = 2003;
/// Unknown function index
pub const UNKNOWN_FUNCTION: u16 = 2004;
/// Unknown local index
pub const UNKNOWN_LOCAL: u16 = 2005;
/// Unknown global index
pub const UNKNOWN_GLOBAL: u16 = 2006;
/// Unknown table index
pub const UNKNOWN_TABLE: u16 = 2007;
/// Unknown memory index
pub const UNKNOWN_MEMORY: u16 = 2008;
/// Unknown data segment index
pub const UNKNOWN_DATA: u16 = 2009;
/// Unknown element segment index
pub const UNKNOWN_ELEM: u16 = 2010;
/// Limits are out of range or `min > max`
pub const INVALID_LIMITS: u16 = 2011;
/// Write to an immutable global
pub const IMMUTABLE_GLOBAL: u16 = 2012;
/// Two exports share a name
pub const DUPLICATE_EXPORT: u16 = 2013;
/// Start function has the wrong type
pub const INVALID_START: u16 = 2014;
/// Alignment larger than natural alignment
pub const INVALID_ALIGNMENT: u16 = 2015;
/// Initializer is not a valid constant expression
pub const CONSTANT_EXPR: u16 = 2016;
/// More than one memory or table declared
pub const MULTIPLE_MEMORIES: u16 = 2017;
/// `ref.func` refers to an undeclared function
pub const UNDECLARED_FUNC_REF: u16 = 2018;
/// Instruction requires the data count section
pub const DATA_COUNT_REQUIRED: u16 = 2019;
/// Control frames are unbalanced at the end of a body
pub const UNBALANCED_CONTROL: u16 = 2020;

// Link error codes (3000-3099)
/// Generic link failure
pub const LINK_ERROR: u16 = 3000;
/// No definition for an import
pub const MISSING_IMPORT: u16 = 3001;
/// Definition kind differs from the import kind
pub const IMPORT_KIND_MISMATCH: u16 = 3002;
/// Definition type is incompatible with the import type
pub const IMPORT_TYPE_MISMATCH: u16 = 3003;
/// Memory is already owned by another instance
pub const MEMORY_ALREADY_OWNED: u16 = 3004;
/// Handle belongs to a different store
pub const STORE_MISMATCH: u16 = 3005;
/// Name already defined in the linker
pub const DUPLICATE_DEFINITION: u16 = 3006;

// Trap codes (4000-4099)
/// `unreachable` executed
pub const TRAP_UNREACHABLE: u16 = 4000;
/// Linear memory access out of bounds
pub const TRAP_MEMORY_OUT_OF_BOUNDS: u16 = 4001;
/// Table access out of bounds
pub const TRAP_TABLE_OUT_OF_BOUNDS: u16 = 4002;
/// Indirect call index past the end of the table
pub const TRAP_UNDEFINED_ELEMENT: u16 = 4003;
/// Indirect call through a null reference
pub const TRAP_UNINITIALIZED_ELEMENT: u16 = 4004;
/// Indirect call signature mismatch
pub const TRAP_INDIRECT_CALL_TYPE_MISMATCH: u16 = 4005;
/// Integer division or remainder by zero
pub const TRAP_INTEGER_DIVIDE_BY_ZERO: u16 = 4006;
/// Integer overflow
pub const TRAP_INTEGER_OVERFLOW: u16 = 4007;
/// Float to integer conversion of NaN
pub const TRAP_INVALID_CONVERSION: u16 = 4008;
/// Call depth or operand stack limit exceeded
pub const TRAP_STACK_OVERFLOW: u16 = 4009;
/// Execution interrupted by the embedder
pub const TRAP_INTERRUPTED: u16 = 4010;
/// Fuel exhausted
pub const TRAP_OUT_OF_FUEL: u16 = 4011;
/// Host function failed
pub const TRAP_HOST_ERROR: u16 = 4012;

// Embedder error codes (5000-5099)
/// Wrong number of arguments passed to a function
pub const ARGUMENT_COUNT_MISMATCH: u16 = 5000;
/// Argument has the wrong type
pub const ARGUMENT_TYPE_MISMATCH: u16 = 5001;
/// Host function returned the wrong number of results
pub const RESULT_COUNT_MISMATCH: u16 = 5002;
/// Host function returned a result of the wrong type
pub const RESULT_TYPE_MISMATCH: u16 = 5003;
/// Memory could not grow
pub const MEMORY_GROW_FAILED: u16 = 5004;
/// Table could not grow
pub const TABLE_GROW_FAILED: u16 = 5005;
/// Export not found
pub const EXPORT_NOT_FOUND: u16 = 5006;
/// Embedder attempted to set an immutable global
pub const IMMUTABLE_GLOBAL_SET: u16 = 5007;
/// Handle does not refer to a live object
pub const INVALID_HANDLE: u16 = 5008;
/// Configured resource limit reached
pub const RESOURCE_LIMIT: u16 = 5009;
/// Generic runtime failure outside of a trap
pub const RUNTIME_ERROR: u16 = 5010;
