//! Properties of numeric instruction evaluation on raw stack cells

use kiln_instructions::NumericOp;
use proptest::prelude::*;

fn cell(v: i32) -> u64 {
    v as u32 as u64
}

proptest! {
    #[test]
    fn i32_results_never_set_high_bits(a in any::<i32>(), b in any::<i32>()) {
        for op in [NumericOp::I32Add, NumericOp::I32Mul, NumericOp::I32Shl, NumericOp::I32ShrS, NumericOp::I32Rotr] {
            let result = op.eval(cell(a), cell(b));
            prop_assert!(matches!(result, Ok(r) if r >> 32 == 0));
        }
    }

    #[test]
    fn shift_amount_is_masked(a in any::<u64>(), b in any::<u64>()) {
        prop_assert_eq!(NumericOp::I64Shl.eval(a, b), NumericOp::I64Shl.eval(a, b & 63));
        prop_assert_eq!(NumericOp::I64ShrU.eval(a, b), Ok(a >> (b & 63)));
    }

    #[test]
    fn every_code_round_trips(code in prop_oneof![0x45u32..=0xC4, 0xFC00u32..=0xFC07]) {
        let op = NumericOp::from_code(code);
        prop_assert!(op.is_some());
        if let Some(op) = op {
            prop_assert_eq!(op.code(), code);
        }
    }
}
