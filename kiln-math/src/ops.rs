// Copyright (c) 2025 Ralf Anton Beier
// SPDX-License-Identifier: MIT
// Project: Kiln
// Module: kiln-math::ops

//! Numeric operations with WebAssembly semantics.

use kiln_error::TrapCode;

use crate::TrapResult;

const F32_CANONICAL_NAN: u32 = 0x7fc0_0000;
const F64_CANONICAL_NAN: u64 = 0x7ff8_0000_0000_0000;

/// Replace any NaN with the canonical f32 NaN.
#[inline]
#[must_use]
pub fn canonicalize_f32(x: f32) -> f32 {
    if x.is_nan() {
        f32::from_bits(F32_CANONICAL_NAN)
    } else {
        x
    }
}

/// Replace any NaN with the canonical f64 NaN.
#[inline]
#[must_use]
pub fn canonicalize_f64(x: f64) -> f64 {
    if x.is_nan() {
        f64::from_bits(F64_CANONICAL_NAN)
    } else {
        x
    }
}

// ----------------------------------------------------------------------------
// Integer division and remainder
// ----------------------------------------------------------------------------

macro_rules! int_div_ops {
    ($signed:ty, $unsigned:ty, $div_s:ident, $div_u:ident, $rem_s:ident, $rem_u:ident) => {
        /// Signed division; traps on zero divisor and on `MIN / -1`.
        #[inline]
        pub fn $div_s(lhs: $signed, rhs: $signed) -> TrapResult<$signed> {
            if rhs == 0 {
                return Err(TrapCode::IntegerDivideByZero);
            }
            lhs.checked_div(rhs).ok_or(TrapCode::IntegerOverflow)
        }

        /// Unsigned division; traps on zero divisor.
        #[inline]
        pub fn $div_u(lhs: $unsigned, rhs: $unsigned) -> TrapResult<$unsigned> {
            lhs.checked_div(rhs).ok_or(TrapCode::IntegerDivideByZero)
        }

        /// Signed remainder; traps on zero divisor. `MIN % -1` is 0.
        #[inline]
        pub fn $rem_s(lhs: $signed, rhs: $signed) -> TrapResult<$signed> {
            if rhs == 0 {
                return Err(TrapCode::IntegerDivideByZero);
            }
            Ok(lhs.wrapping_rem(rhs))
        }

        /// Unsigned remainder; traps on zero divisor.
        #[inline]
        pub fn $rem_u(lhs: $unsigned, rhs: $unsigned) -> TrapResult<$unsigned> {
            lhs.checked_rem(rhs).ok_or(TrapCode::IntegerDivideByZero)
        }
    };
}

int_div_ops!(i32, u32, i32_div_s, i32_div_u, i32_rem_s, i32_rem_u);
int_div_ops!(i64, u64, i64_div_s, i64_div_u, i64_rem_s, i64_rem_u);

// ----------------------------------------------------------------------------
// Float arithmetic
// ----------------------------------------------------------------------------

macro_rules! float_ops {
    (
        $ty:ty, $canon:ident,
        $add:ident, $sub:ident, $mul:ident, $div:ident, $sqrt:ident,
        $min:ident, $max:ident, $ceil:ident, $floor:ident, $trunc:ident, $nearest:ident,
        $abs:ident, $neg:ident, $copysign:ident
    ) => {
        /// IEEE-754 addition.
        #[inline]
        #[must_use]
        pub fn $add(lhs: $ty, rhs: $ty) -> $ty {
            $canon(lhs + rhs)
        }

        /// IEEE-754 subtraction.
        #[inline]
        #[must_use]
        pub fn $sub(lhs: $ty, rhs: $ty) -> $ty {
            $canon(lhs - rhs)
        }

        /// IEEE-754 multiplication.
        #[inline]
        #[must_use]
        pub fn $mul(lhs: $ty, rhs: $ty) -> $ty {
            $canon(lhs * rhs)
        }

        /// IEEE-754 division; division by zero yields an infinity or NaN.
        #[inline]
        #[must_use]
        pub fn $div(lhs: $ty, rhs: $ty) -> $ty {
            $canon(lhs / rhs)
        }

        /// Square root.
        #[inline]
        #[must_use]
        pub fn $sqrt(x: $ty) -> $ty {
            $canon(x.sqrt())
        }

        /// Minimum; NaN if either operand is NaN, `-0.0` is below `+0.0`.
        #[inline]
        #[must_use]
        pub fn $min(lhs: $ty, rhs: $ty) -> $ty {
            if lhs.is_nan() || rhs.is_nan() {
                return $canon(<$ty>::NAN);
            }
            if lhs == rhs {
                // Only differs for signed zeros.
                return if lhs.is_sign_negative() { lhs } else { rhs };
            }
            if lhs < rhs { lhs } else { rhs }
        }

        /// Maximum; NaN if either operand is NaN, `+0.0` is above `-0.0`.
        #[inline]
        #[must_use]
        pub fn $max(lhs: $ty, rhs: $ty) -> $ty {
            if lhs.is_nan() || rhs.is_nan() {
                return $canon(<$ty>::NAN);
            }
            if lhs == rhs {
                return if lhs.is_sign_positive() { lhs } else { rhs };
            }
            if lhs > rhs { lhs } else { rhs }
        }

        /// Round toward positive infinity.
        #[inline]
        #[must_use]
        pub fn $ceil(x: $ty) -> $ty {
            $canon(x.ceil())
        }

        /// Round toward negative infinity.
        #[inline]
        #[must_use]
        pub fn $floor(x: $ty) -> $ty {
            $canon(x.floor())
        }

        /// Round toward zero.
        #[inline]
        #[must_use]
        pub fn $trunc(x: $ty) -> $ty {
            $canon(x.trunc())
        }

        /// Round to nearest, ties to even.
        #[inline]
        #[must_use]
        pub fn $nearest(x: $ty) -> $ty {
            $canon(x.round_ties_even())
        }

        /// Absolute value; only clears the sign bit, NaN payloads survive.
        #[inline]
        #[must_use]
        pub fn $abs(x: $ty) -> $ty {
            x.abs()
        }

        /// Negation; only flips the sign bit, NaN payloads survive.
        #[inline]
        #[must_use]
        pub fn $neg(x: $ty) -> $ty {
            -x
        }

        /// Magnitude of `lhs` with the sign of `rhs`.
        #[inline]
        #[must_use]
        pub fn $copysign(lhs: $ty, rhs: $ty) -> $ty {
            lhs.copysign(rhs)
        }
    };
}

float_ops!(
    f32, canonicalize_f32, f32_add, f32_sub, f32_mul, f32_div, f32_sqrt, f32_min, f32_max,
    f32_ceil, f32_floor, f32_trunc, f32_nearest, f32_abs, f32_neg, f32_copysign
);
float_ops!(
    f64, canonicalize_f64, f64_add, f64_sub, f64_mul, f64_div, f64_sqrt, f64_min, f64_max,
    f64_ceil, f64_floor, f64_trunc, f64_nearest, f64_abs, f64_neg, f64_copysign
);

/// Demote f64 to f32, rounding to nearest.
#[inline]
#[must_use]
pub fn f32_demote_f64(x: f64) -> f32 {
    canonicalize_f32(x as f32)
}

/// Promote f32 to f64 exactly.
#[inline]
#[must_use]
pub fn f64_promote_f32(x: f32) -> f64 {
    canonicalize_f64(f64::from(x))
}

// ----------------------------------------------------------------------------
// Float to integer truncation
// ----------------------------------------------------------------------------

macro_rules! trunc_op {
    ($name:ident, $sat:ident, $from:ty, $to:ty, $lower_exclusive:expr, $upper_exclusive:expr) => {
        /// Truncate toward zero; traps on NaN and on out-of-range input.
        #[inline]
        pub fn $name(x: $from) -> TrapResult<$to> {
            if x.is_nan() {
                return Err(TrapCode::InvalidConversionToInteger);
            }
            if x <= $lower_exclusive || x >= $upper_exclusive {
                return Err(TrapCode::IntegerOverflow);
            }
            Ok(x as $to)
        }

        /// Truncate toward zero, saturating at the integer bounds; NaN is 0.
        #[inline]
        #[must_use]
        pub fn $sat(x: $from) -> $to {
            // Rust's float-to-int casts saturate and map NaN to 0.
            x as $to
        }
    };
}

trunc_op!(i32_trunc_f32_s, i32_trunc_sat_f32_s, f32, i32, -2_147_483_904.0_f32, 2_147_483_648.0_f32);
trunc_op!(i32_trunc_f32_u, i32_trunc_sat_f32_u, f32, u32, -1.0_f32, 4_294_967_296.0_f32);
trunc_op!(i32_trunc_f64_s, i32_trunc_sat_f64_s, f64, i32, -2_147_483_649.0_f64, 2_147_483_648.0_f64);
trunc_op!(i32_trunc_f64_u, i32_trunc_sat_f64_u, f64, u32, -1.0_f64, 4_294_967_296.0_f64);
trunc_op!(
    i64_trunc_f32_s,
    i64_trunc_sat_f32_s,
    f32,
    i64,
    -9_223_373_136_366_403_584.0_f32,
    9_223_372_036_854_775_808.0_f32
);
trunc_op!(i64_trunc_f32_u, i64_trunc_sat_f32_u, f32, u64, -1.0_f32, 18_446_744_073_709_551_616.0_f32);
trunc_op!(
    i64_trunc_f64_s,
    i64_trunc_sat_f64_s,
    f64,
    i64,
    -9_223_372_036_854_777_856.0_f64,
    9_223_372_036_854_775_808.0_f64
);
trunc_op!(i64_trunc_f64_u, i64_trunc_sat_f64_u, f64, u64, -1.0_f64, 18_446_744_073_709_551_616.0_f64);

// ----------------------------------------------------------------------------
// Sign extension
// ----------------------------------------------------------------------------

/// Sign-extend the low 8 bits of an i32.
#[inline]
#[must_use]
pub const fn i32_extend8_s(x: i32) -> i32 {
    x as i8 as i32
}

/// Sign-extend the low 16 bits of an i32.
#[inline]
#[must_use]
pub const fn i32_extend16_s(x: i32) -> i32 {
    x as i16 as i32
}

/// Sign-extend the low 8 bits of an i64.
#[inline]
#[must_use]
pub const fn i64_extend8_s(x: i64) -> i64 {
    x as i8 as i64
}

/// Sign-extend the low 16 bits of an i64.
#[inline]
#[must_use]
pub const fn i64_extend16_s(x: i64) -> i64 {
    x as i16 as i64
}

/// Sign-extend the low 32 bits of an i64.
#[inline]
#[must_use]
pub const fn i64_extend32_s(x: i64) -> i64 {
    x as i32 as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i32_div_s_traps() {
        assert_eq!(i32_div_s(7, 0), Err(TrapCode::IntegerDivideByZero));
        assert_eq!(i32_div_s(i32::MIN, -1), Err(TrapCode::IntegerOverflow));
        assert_eq!(i32_div_s(-7, 2), Ok(-3));
    }

    #[test]
    fn test_rem_s_min_by_minus_one_is_zero() {
        assert_eq!(i32_rem_s(i32::MIN, -1), Ok(0));
        assert_eq!(i64_rem_s(i64::MIN, -1), Ok(0));
        assert_eq!(i32_rem_s(-7, 2), Ok(-1));
    }

    #[test]
    fn test_unsigned_division() {
        assert_eq!(i32_div_u(u32::MAX, 2), Ok(0x7fff_ffff));
        assert_eq!(i64_rem_u(10, 0), Err(TrapCode::IntegerDivideByZero));
    }

    #[test]
    fn test_min_max_signed_zero() {
        assert!(f32_min(0.0, -0.0).is_sign_negative());
        assert!(f32_max(-0.0, 0.0).is_sign_positive());
        assert!(f64_min(-0.0, 0.0).is_sign_negative());
    }

    #[test]
    fn test_nan_results_are_canonical() {
        let noisy = f32::from_bits(0x7fa0_0001);
        assert_eq!(f32_add(noisy, 1.0).to_bits(), F32_CANONICAL_NAN);
        assert_eq!(f32_min(noisy, 1.0).to_bits(), F32_CANONICAL_NAN);
        assert_eq!(f64_sqrt(-1.0).to_bits(), F64_CANONICAL_NAN);
    }

    #[test]
    fn test_neg_preserves_nan_payload() {
        let noisy = f32::from_bits(0x7fa0_0001);
        assert_eq!(f32_neg(noisy).to_bits(), 0xffa0_0001);
        assert_eq!(f32_abs(f32::from_bits(0xffa0_0001)).to_bits(), 0x7fa0_0001);
    }

    #[test]
    fn test_nearest_ties_to_even() {
        assert_eq!(f32_nearest(2.5), 2.0);
        assert_eq!(f32_nearest(3.5), 4.0);
        assert_eq!(f64_nearest(-0.5), -0.0);
        assert!(f64_nearest(-0.5).is_sign_negative());
    }

    #[test]
    fn test_trunc_boundaries() {
        assert_eq!(i32_trunc_f32_s(-2_147_483_648.0), Ok(i32::MIN));
        assert_eq!(i32_trunc_f32_s(2_147_483_648.0), Err(TrapCode::IntegerOverflow));
        assert_eq!(i32_trunc_f64_s(-2_147_483_648.9), Ok(i32::MIN));
        assert_eq!(i32_trunc_f64_s(-2_147_483_649.0), Err(TrapCode::IntegerOverflow));
        assert_eq!(i32_trunc_f32_u(-0.9), Ok(0));
        assert_eq!(i32_trunc_f32_u(-1.0), Err(TrapCode::IntegerOverflow));
        assert_eq!(i64_trunc_f64_u(f64::NAN), Err(TrapCode::InvalidConversionToInteger));
        assert_eq!(i64_trunc_f64_s(-9_223_372_036_854_775_808.0), Ok(i64::MIN));
    }

    #[test]
    fn test_trunc_sat() {
        assert_eq!(i32_trunc_sat_f32_s(f32::NAN), 0);
        assert_eq!(i32_trunc_sat_f64_s(1e20), i32::MAX);
        assert_eq!(i32_trunc_sat_f64_u(-5.0), 0);
        assert_eq!(i64_trunc_sat_f32_u(f32::INFINITY), u64::MAX);
    }

    #[test]
    fn test_sign_extension() {
        assert_eq!(i32_extend8_s(0x80), -128);
        assert_eq!(i32_extend16_s(0x7fff), 0x7fff);
        assert_eq!(i64_extend32_s(0xffff_ffff), -1);
    }
}
