//! Property tests for LEB128 decoding and decoder robustness

use kiln_decoder::{
    decode_module,
    leb128::{read_leb128_i32, read_leb128_i64, read_leb128_u32},
    DecodeLimits,
};
use kiln_error::ErrorCategory;
use kiln_foundation::Features;
use proptest::prelude::*;

fn encode_unsigned(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn encode_signed(mut value: i64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

proptest! {
    #[test]
    fn unsigned_encodings_decode_to_their_value(value in any::<u32>()) {
        let bytes = encode_unsigned(u64::from(value));
        prop_assert_eq!(read_leb128_u32(&bytes, 0).ok(), Some((value, bytes.len())));
    }

    #[test]
    fn signed_encodings_decode_to_their_value(a in any::<i32>(), b in any::<i64>()) {
        let bytes = encode_signed(i64::from(a));
        prop_assert_eq!(read_leb128_i32(&bytes, 0).ok(), Some((a, bytes.len())));
        let bytes = encode_signed(b);
        prop_assert_eq!(read_leb128_i64(&bytes, 0).ok(), Some((b, bytes.len())));
    }

    #[test]
    fn truncated_encodings_are_rejected(value in 128u32..) {
        let bytes = encode_unsigned(u64::from(value));
        let err = read_leb128_u32(&bytes[..bytes.len() - 1], 0).unwrap_err();
        prop_assert_eq!(err.category, ErrorCategory::Parse);
        prop_assert_eq!(err.offset(), Some(bytes.len() - 1));
    }

    #[test]
    fn values_wider_than_32_bits_are_rejected(value in (1u64 << 32)..(1u64 << 35)) {
        let bytes = encode_unsigned(value);
        prop_assert!(read_leb128_u32(&bytes, 0).is_err());
    }

    #[test]
    fn arbitrary_bytes_after_header_never_panic(tail in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&tail);
        if let Err(err) = decode_module(&bytes, &Features::default(), &DecodeLimits::default()) {
            prop_assert!(err.category == ErrorCategory::Parse || err.category == ErrorCategory::Validation);
        }
    }
}
