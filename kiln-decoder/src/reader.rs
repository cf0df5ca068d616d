// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Bounds-checked cursor over a module's bytes.

use kiln_error::{codes, Error, ErrorCategory, Result};
use kiln_foundation::{FloatBits32, FloatBits64, Limits, RefType, ValueType};

use crate::leb128;

/// Cursor over a window `[pos, end)` of the module bytes
///
/// Positions are absolute offsets into the whole module, so every error can
/// report where in the binary it was detected.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos:  usize,
    end:  usize,
}

impl<'a> BinaryReader<'a> {
    /// Reader over all of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, end: data.len() }
    }

    /// Current absolute offset.
    #[must_use]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left before the end of the window.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Whether the window is exhausted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    fn eof(&self) -> Error {
        Error::new(ErrorCategory::Parse, codes::UNEXPECTED_EOF, "unexpected end of section or function")
            .with_offset(self.pos)
    }

    /// Split off the next `len` bytes as a nested reader and skip past them.
    pub fn sub_reader(&mut self, len: usize) -> Result<BinaryReader<'a>> {
        if len > self.remaining() {
            return Err(Error::new(
                ErrorCategory::Parse,
                codes::SECTION_SIZE_MISMATCH,
                format!("length {len} out of bounds, {} bytes remaining", self.remaining()),
            )
            .with_offset(self.pos));
        }
        let sub = BinaryReader { data: self.data, pos: self.pos, end: self.pos + len };
        self.pos += len;
        Ok(sub)
    }

    /// Fail unless the window has been consumed completely.
    pub fn finish(&self, what: &str) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::new(
                ErrorCategory::Parse,
                codes::SECTION_SIZE_MISMATCH,
                format!("{what} size mismatch: {} unconsumed bytes", self.remaining()),
            )
            .with_offset(self.pos))
        }
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        if self.is_empty() {
            return Err(self.eof());
        }
        Ok(self.data[self.pos])
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.eof());
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn window(&self) -> &'a [u8] {
        &self.data[..self.end]
    }

    /// Read an unsigned 32-bit LEB128 integer.
    pub fn read_u32(&mut self) -> Result<u32> {
        let (value, len) = leb128::read_leb128_u32(self.window(), self.pos)?;
        self.pos += len;
        Ok(value)
    }

    /// Read a signed 32-bit LEB128 integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        let (value, len) = leb128::read_leb128_i32(self.window(), self.pos)?;
        self.pos += len;
        Ok(value)
    }

    /// Read a signed 33-bit LEB128 integer.
    pub fn read_s33(&mut self) -> Result<i64> {
        let (value, len) = leb128::read_leb128_s33(self.window(), self.pos)?;
        self.pos += len;
        Ok(value)
    }

    /// Read a signed 64-bit LEB128 integer.
    pub fn read_i64(&mut self) -> Result<i64> {
        let (value, len) = leb128::read_leb128_i64(self.window(), self.pos)?;
        self.pos += len;
        Ok(value)
    }

    /// Read a little-endian `f32` bit pattern.
    pub fn read_f32(&mut self) -> Result<FloatBits32> {
        let bytes = self.read_bytes(4)?;
        Ok(FloatBits32::from_bits(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
    }

    /// Read a little-endian `f64` bit pattern.
    pub fn read_f64(&mut self) -> Result<FloatBits64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(FloatBits64::from_bits(u64::from_le_bytes(buf)))
    }

    /// Read a vector length, rejecting counts that cannot possibly fit in
    /// the remaining bytes.
    pub fn read_count(&mut self) -> Result<u32> {
        let at = self.pos;
        let count = self.read_u32()?;
        if count as usize > self.remaining() {
            return Err(Error::new(
                ErrorCategory::Parse,
                codes::UNEXPECTED_EOF,
                format!("vector of {count} items exceeds remaining input"),
            )
            .with_offset(at));
        }
        Ok(count)
    }

    /// Read a length-prefixed UTF-8 name.
    pub fn read_name(&mut self) -> Result<&'a str> {
        let len = self.read_u32()? as usize;
        let at = self.pos;
        let bytes = self.read_bytes(len)?;
        core::str::from_utf8(bytes).map_err(|_| {
            Error::new(ErrorCategory::Parse, codes::INVALID_UTF8, "malformed UTF-8 encoding")
                .with_offset(at)
        })
    }

    /// Read a value type byte.
    pub fn read_value_type(&mut self) -> Result<ValueType> {
        let at = self.pos;
        ValueType::from_binary(self.read_u8()?).map_err(|e| e.with_offset(at))
    }

    /// Read a reference type byte.
    pub fn read_ref_type(&mut self) -> Result<RefType> {
        let at = self.pos;
        RefType::from_binary(self.read_u8()?).map_err(|e| e.with_offset(at))
    }

    /// Read memory or table limits.
    pub fn read_limits(&mut self) -> Result<Limits> {
        let at = self.pos;
        match self.read_u8()? {
            0x00 => Ok(Limits::new(self.read_u32()?, None)),
            0x01 => {
                let min = self.read_u32()?;
                let max = self.read_u32()?;
                Ok(Limits::new(min, Some(max)))
            },
            flag => Err(Error::new(
                ErrorCategory::Parse,
                codes::PARSE_ERROR,
                format!("invalid limits flag 0x{flag:02x}"),
            )
            .with_offset(at)),
        }
    }
}
