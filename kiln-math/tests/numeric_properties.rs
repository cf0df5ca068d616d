//! Property tests for the integer and float operations

use kiln_error::TrapCode;
use kiln_math::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn div_rem_reconstruct_dividend(lhs in any::<i32>(), rhs in any::<i32>()) {
        match (i32_div_s(lhs, rhs), i32_rem_s(lhs, rhs)) {
            (Ok(q), Ok(r)) => {
                prop_assert_eq!(q.wrapping_mul(rhs).wrapping_add(r), lhs);
            },
            (Err(TrapCode::IntegerDivideByZero), Err(TrapCode::IntegerDivideByZero)) => {
                prop_assert_eq!(rhs, 0);
            },
            (Err(TrapCode::IntegerOverflow), Ok(0)) => {
                prop_assert!(lhs == i32::MIN && rhs == -1);
            },
            other => {
                prop_assert!(false, "unexpected pair {:?}", other);
            },
        }
    }

    #[test]
    fn unsigned_div_matches_std(lhs in any::<u64>(), rhs in 1u64..) {
        prop_assert_eq!(i64_div_u(lhs, rhs), Ok(lhs / rhs));
        prop_assert_eq!(i64_rem_u(lhs, rhs), Ok(lhs % rhs));
    }

    #[test]
    fn trapping_trunc_agrees_with_saturating_in_range(x in -2.0e9f64..2.0e9f64) {
        prop_assert_eq!(i32_trunc_f64_s(x), Ok(i32_trunc_sat_f64_s(x)));
    }

    #[test]
    fn min_max_never_leak_noncanonical_nan(bits in any::<u32>(), y in any::<f32>()) {
        let x = f32::from_bits(bits);
        let lo = f32_min(x, y);
        let hi = f32_max(x, y);
        if x.is_nan() || y.is_nan() {
            prop_assert_eq!(lo.to_bits(), FloatBits32::NAN.to_bits());
            prop_assert_eq!(hi.to_bits(), FloatBits32::NAN.to_bits());
        } else {
            prop_assert!(lo <= hi);
        }
    }
}
