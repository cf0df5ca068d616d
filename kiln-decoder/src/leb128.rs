// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! LEB128 integer decoding.
//!
//! Decoding is strict: an encoding may not use more bytes than the integer
//! width requires, and the unused bits of the final byte must be zero
//! (unsigned) or copies of the sign bit (signed). Each function takes the
//! position to read at and returns the value with the number of bytes
//! consumed. Errors carry the offset of the offending byte.

use kiln_error::{codes, Error, ErrorCategory, Result};

fn truncated(offset: usize) -> Error {
    Error::new(ErrorCategory::Parse, codes::UNEXPECTED_EOF, "unexpected end of LEB128 integer")
        .with_offset(offset)
}

fn too_long(offset: usize) -> Error {
    Error::new(ErrorCategory::Parse, codes::INVALID_LEB128, "integer representation too long")
        .with_offset(offset)
}

fn too_large(offset: usize) -> Error {
    Error::new(ErrorCategory::Parse, codes::INTEGER_TOO_LARGE, "integer too large")
        .with_offset(offset)
}

fn read_unsigned(bytes: &[u8], pos: usize, bits: u32) -> Result<(u64, usize)> {
    let max_bytes = bits.div_ceil(7) as usize;
    let mut result = 0u64;

    for i in 0..max_bytes {
        let byte = *bytes.get(pos + i).ok_or_else(|| truncated(pos + i))?;
        let low = u64::from(byte & 0x7F);

        if i == max_bytes - 1 {
            if byte & 0x80 != 0 {
                return Err(too_long(pos + i));
            }
            let remaining = bits - 7 * i as u32;
            if remaining < 7 && low >> remaining != 0 {
                return Err(too_large(pos + i));
            }
        }

        result |= low << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(too_long(pos + max_bytes))
}

fn read_signed(bytes: &[u8], pos: usize, bits: u32) -> Result<(i64, usize)> {
    let max_bytes = bits.div_ceil(7) as usize;
    let mut result = 0i64;
    let mut shift = 0u32;

    for i in 0..max_bytes {
        let byte = *bytes.get(pos + i).ok_or_else(|| truncated(pos + i))?;
        let low = byte & 0x7F;

        if i == max_bytes - 1 {
            if byte & 0x80 != 0 {
                return Err(too_long(pos + i));
            }
            // Bits from the sign bit upwards must all agree.
            let remaining = bits - 7 * i as u32;
            if remaining < 7 {
                let upper = low >> (remaining - 1);
                if upper != 0 && upper != 0x7F >> (remaining - 1) {
                    return Err(too_large(pos + i));
                }
            }
        }

        result |= i64::from(low) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 64 && byte & 0x40 != 0 {
                result |= -1i64 << shift;
            }
            return Ok((result, i + 1));
        }
    }

    Err(too_long(pos + max_bytes))
}

/// Read an unsigned 32-bit LEB128 integer.
pub fn read_leb128_u32(bytes: &[u8], pos: usize) -> Result<(u32, usize)> {
    let (value, len) = read_unsigned(bytes, pos, 32)?;
    Ok((value as u32, len))
}

/// Read an unsigned 64-bit LEB128 integer.
pub fn read_leb128_u64(bytes: &[u8], pos: usize) -> Result<(u64, usize)> {
    read_unsigned(bytes, pos, 64)
}

/// Read a signed 32-bit LEB128 integer.
pub fn read_leb128_i32(bytes: &[u8], pos: usize) -> Result<(i32, usize)> {
    let (value, len) = read_signed(bytes, pos, 32)?;
    Ok((value as i32, len))
}

/// Read a signed 33-bit LEB128 integer (block type indices).
pub fn read_leb128_s33(bytes: &[u8], pos: usize) -> Result<(i64, usize)> {
    read_signed(bytes, pos, 33)
}

/// Read a signed 64-bit LEB128 integer.
pub fn read_leb128_i64(bytes: &[u8], pos: usize) -> Result<(i64, usize)> {
    read_signed(bytes, pos, 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_values() {
        assert_eq!(read_leb128_u32(&[0x00], 0).ok(), Some((0, 1)));
        assert_eq!(read_leb128_u32(&[0xE5, 0x8E, 0x26], 0).ok(), Some((624_485, 3)));
        assert_eq!(read_leb128_u32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F], 0).ok(), Some((u32::MAX, 5)));
        // Padding with a redundant zero group is allowed within the width.
        assert_eq!(read_leb128_u32(&[0x80, 0x00], 0).ok(), Some((0, 2)));
    }

    #[test]
    fn test_signed_values() {
        assert_eq!(read_leb128_i32(&[0x7F], 0).ok(), Some((-1, 1)));
        assert_eq!(read_leb128_i32(&[0xC0, 0xBB, 0x78], 0).ok(), Some((-123_456, 3)));
        assert_eq!(
            read_leb128_i32(&[0x80, 0x80, 0x80, 0x80, 0x78], 0).ok(),
            Some((i32::MIN, 5))
        );
        assert_eq!(
            read_leb128_i64(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x7F], 0).ok(),
            Some((i64::MIN, 10))
        );
    }

    #[test]
    fn test_truncated_reports_offset() {
        let err = read_leb128_u32(&[0x01, 0x80, 0x80], 1).unwrap_err();
        assert_eq!(err.code, codes::UNEXPECTED_EOF);
        assert_eq!(err.offset(), Some(3));
    }

    #[test]
    fn test_overlong_and_unused_bits() {
        let err = read_leb128_u32(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x00], 0).unwrap_err();
        assert_eq!(err.code, codes::INVALID_LEB128);
        let err = read_leb128_u32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F], 0).unwrap_err();
        assert_eq!(err.code, codes::INTEGER_TOO_LARGE);
        let err = read_leb128_i32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x4F], 0).unwrap_err();
        assert_eq!(err.code, codes::INTEGER_TOO_LARGE);
    }
}
