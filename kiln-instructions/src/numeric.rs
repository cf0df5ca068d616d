// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Stack-only numeric instructions.
//!
//! Comparisons, arithmetic, bit operations and conversions all pop one or two
//! operands and push exactly one result, so a single table describes their
//! encoding, their signature and their semantics. Operands and results are
//! untyped 64-bit stack cells: `i32` and `f32` occupy the low 32 bits.

use kiln_error::TrapCode;
use kiln_foundation::ValueType;
use kiln_math as math;

macro_rules! numeric_ops {
    ($( $variant:ident = $code:literal, $name:literal, [$($param:ident),*] -> $result:ident; )*) => {
        /// A numeric instruction that only touches the operand stack
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NumericOp {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl NumericOp {
            /// Look up an instruction by its encoding.
            ///
            /// Single-byte opcodes map to themselves, `0xFC`-prefixed ones to
            /// `0xFC00 | subopcode`.
            #[must_use]
            pub const fn from_code(code: u32) -> Option<Self> {
                match code {
                    $( $code => Some(NumericOp::$variant), )*
                    _ => None,
                }
            }

            /// The encoding accepted by [`NumericOp::from_code`].
            #[must_use]
            pub const fn code(self) -> u32 {
                match self {
                    $( NumericOp::$variant => $code, )*
                }
            }

            /// Text format mnemonic.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $( NumericOp::$variant => $name, )*
                }
            }

            /// Operand types, bottom of stack first.
            #[must_use]
            pub const fn params(self) -> &'static [ValueType] {
                match self {
                    $( NumericOp::$variant => &[$(ValueType::$param),*], )*
                }
            }

            /// Result type.
            #[must_use]
            pub const fn result(self) -> ValueType {
                match self {
                    $( NumericOp::$variant => ValueType::$result, )*
                }
            }
        }
    };
}

numeric_ops! {
    I32Eqz = 0x45, "i32.eqz", [I32] -> I32;
    I32Eq = 0x46, "i32.eq", [I32, I32] -> I32;
    I32Ne = 0x47, "i32.ne", [I32, I32] -> I32;
    I32LtS = 0x48, "i32.lt_s", [I32, I32] -> I32;
    I32LtU = 0x49, "i32.lt_u", [I32, I32] -> I32;
    I32GtS = 0x4A, "i32.gt_s", [I32, I32] -> I32;
    I32GtU = 0x4B, "i32.gt_u", [I32, I32] -> I32;
    I32LeS = 0x4C, "i32.le_s", [I32, I32] -> I32;
    I32LeU = 0x4D, "i32.le_u", [I32, I32] -> I32;
    I32GeS = 0x4E, "i32.ge_s", [I32, I32] -> I32;
    I32GeU = 0x4F, "i32.ge_u", [I32, I32] -> I32;

    I64Eqz = 0x50, "i64.eqz", [I64] -> I32;
    I64Eq = 0x51, "i64.eq", [I64, I64] -> I32;
    I64Ne = 0x52, "i64.ne", [I64, I64] -> I32;
    I64LtS = 0x53, "i64.lt_s", [I64, I64] -> I32;
    I64LtU = 0x54, "i64.lt_u", [I64, I64] -> I32;
    I64GtS = 0x55, "i64.gt_s", [I64, I64] -> I32;
    I64GtU = 0x56, "i64.gt_u", [I64, I64] -> I32;
    I64LeS = 0x57, "i64.le_s", [I64, I64] -> I32;
    I64LeU = 0x58, "i64.le_u", [I64, I64] -> I32;
    I64GeS = 0x59, "i64.ge_s", [I64, I64] -> I32;
    I64GeU = 0x5A, "i64.ge_u", [I64, I64] -> I32;

    F32Eq = 0x5B, "f32.eq", [F32, F32] -> I32;
    F32Ne = 0x5C, "f32.ne", [F32, F32] -> I32;
    F32Lt = 0x5D, "f32.lt", [F32, F32] -> I32;
    F32Gt = 0x5E, "f32.gt", [F32, F32] -> I32;
    F32Le = 0x5F, "f32.le", [F32, F32] -> I32;
    F32Ge = 0x60, "f32.ge", [F32, F32] -> I32;

    F64Eq = 0x61, "f64.eq", [F64, F64] -> I32;
    F64Ne = 0x62, "f64.ne", [F64, F64] -> I32;
    F64Lt = 0x63, "f64.lt", [F64, F64] -> I32;
    F64Gt = 0x64, "f64.gt", [F64, F64] -> I32;
    F64Le = 0x65, "f64.le", [F64, F64] -> I32;
    F64Ge = 0x66, "f64.ge", [F64, F64] -> I32;

    I32Clz = 0x67, "i32.clz", [I32] -> I32;
    I32Ctz = 0x68, "i32.ctz", [I32] -> I32;
    I32Popcnt = 0x69, "i32.popcnt", [I32] -> I32;
    I32Add = 0x6A, "i32.add", [I32, I32] -> I32;
    I32Sub = 0x6B, "i32.sub", [I32, I32] -> I32;
    I32Mul = 0x6C, "i32.mul", [I32, I32] -> I32;
    I32DivS = 0x6D, "i32.div_s", [I32, I32] -> I32;
    I32DivU = 0x6E, "i32.div_u", [I32, I32] -> I32;
    I32RemS = 0x6F, "i32.rem_s", [I32, I32] -> I32;
    I32RemU = 0x70, "i32.rem_u", [I32, I32] -> I32;
    I32And = 0x71, "i32.and", [I32, I32] -> I32;
    I32Or = 0x72, "i32.or", [I32, I32] -> I32;
    I32Xor = 0x73, "i32.xor", [I32, I32] -> I32;
    I32Shl = 0x74, "i32.shl", [I32, I32] -> I32;
    I32ShrS = 0x75, "i32.shr_s", [I32, I32] -> I32;
    I32ShrU = 0x76, "i32.shr_u", [I32, I32] -> I32;
    I32Rotl = 0x77, "i32.rotl", [I32, I32] -> I32;
    I32Rotr = 0x78, "i32.rotr", [I32, I32] -> I32;

    I64Clz = 0x79, "i64.clz", [I64] -> I64;
    I64Ctz = 0x7A, "i64.ctz", [I64] -> I64;
    I64Popcnt = 0x7B, "i64.popcnt", [I64] -> I64;
    I64Add = 0x7C, "i64.add", [I64, I64] -> I64;
    I64Sub = 0x7D, "i64.sub", [I64, I64] -> I64;
    I64Mul = 0x7E, "i64.mul", [I64, I64] -> I64;
    I64DivS = 0x7F, "i64.div_s", [I64, I64] -> I64;
    I64DivU = 0x80, "i64.div_u", [I64, I64] -> I64;
    I64RemS = 0x81, "i64.rem_s", [I64, I64] -> I64;
    I64RemU = 0x82, "i64.rem_u", [I64, I64] -> I64;
    I64And = 0x83, "i64.and", [I64, I64] -> I64;
    I64Or = 0x84, "i64.or", [I64, I64] -> I64;
    I64Xor = 0x85, "i64.xor", [I64, I64] -> I64;
    I64Shl = 0x86, "i64.shl", [I64, I64] -> I64;
    I64ShrS = 0x87, "i64.shr_s", [I64, I64] -> I64;
    I64ShrU = 0x88, "i64.shr_u", [I64, I64] -> I64;
    I64Rotl = 0x89, "i64.rotl", [I64, I64] -> I64;
    I64Rotr = 0x8A, "i64.rotr", [I64, I64] -> I64;

    F32Abs = 0x8B, "f32.abs", [F32] -> F32;
    F32Neg = 0x8C, "f32.neg", [F32] -> F32;
    F32Ceil = 0x8D, "f32.ceil", [F32] -> F32;
    F32Floor = 0x8E, "f32.floor", [F32] -> F32;
    F32Trunc = 0x8F, "f32.trunc", [F32] -> F32;
    F32Nearest = 0x90, "f32.nearest", [F32] -> F32;
    F32Sqrt = 0x91, "f32.sqrt", [F32] -> F32;
    F32Add = 0x92, "f32.add", [F32, F32] -> F32;
    F32Sub = 0x93, "f32.sub", [F32, F32] -> F32;
    F32Mul = 0x94, "f32.mul", [F32, F32] -> F32;
    F32Div = 0x95, "f32.div", [F32, F32] -> F32;
    F32Min = 0x96, "f32.min", [F32, F32] -> F32;
    F32Max = 0x97, "f32.max", [F32, F32] -> F32;
    F32Copysign = 0x98, "f32.copysign", [F32, F32] -> F32;

    F64Abs = 0x99, "f64.abs", [F64] -> F64;
    F64Neg = 0x9A, "f64.neg", [F64] -> F64;
    F64Ceil = 0x9B, "f64.ceil", [F64] -> F64;
    F64Floor = 0x9C, "f64.floor", [F64] -> F64;
    F64Trunc = 0x9D, "f64.trunc", [F64] -> F64;
    F64Nearest = 0x9E, "f64.nearest", [F64] -> F64;
    F64Sqrt = 0x9F, "f64.sqrt", [F64] -> F64;
    F64Add = 0xA0, "f64.add", [F64, F64] -> F64;
    F64Sub = 0xA1, "f64.sub", [F64, F64] -> F64;
    F64Mul = 0xA2, "f64.mul", [F64, F64] -> F64;
    F64Div = 0xA3, "f64.div", [F64, F64] -> F64;
    F64Min = 0xA4, "f64.min", [F64, F64] -> F64;
    F64Max = 0xA5, "f64.max", [F64, F64] -> F64;
    F64Copysign = 0xA6, "f64.copysign", [F64, F64] -> F64;

    I32WrapI64 = 0xA7, "i32.wrap_i64", [I64] -> I32;
    I32TruncF32S = 0xA8, "i32.trunc_f32_s", [F32] -> I32;
    I32TruncF32U = 0xA9, "i32.trunc_f32_u", [F32] -> I32;
    I32TruncF64S = 0xAA, "i32.trunc_f64_s", [F64] -> I32;
    I32TruncF64U = 0xAB, "i32.trunc_f64_u", [F64] -> I32;
    I64ExtendI32S = 0xAC, "i64.extend_i32_s", [I32] -> I64;
    I64ExtendI32U = 0xAD, "i64.extend_i32_u", [I32] -> I64;
    I64TruncF32S = 0xAE, "i64.trunc_f32_s", [F32] -> I64;
    I64TruncF32U = 0xAF, "i64.trunc_f32_u", [F32] -> I64;
    I64TruncF64S = 0xB0, "i64.trunc_f64_s", [F64] -> I64;
    I64TruncF64U = 0xB1, "i64.trunc_f64_u", [F64] -> I64;
    F32ConvertI32S = 0xB2, "f32.convert_i32_s", [I32] -> F32;
    F32ConvertI32U = 0xB3, "f32.convert_i32_u", [I32] -> F32;
    F32ConvertI64S = 0xB4, "f32.convert_i64_s", [I64] -> F32;
    F32ConvertI64U = 0xB5, "f32.convert_i64_u", [I64] -> F32;
    F32DemoteF64 = 0xB6, "f32.demote_f64", [F64] -> F32;
    F64ConvertI32S = 0xB7, "f64.convert_i32_s", [I32] -> F64;
    F64ConvertI32U = 0xB8, "f64.convert_i32_u", [I32] -> F64;
    F64ConvertI64S = 0xB9, "f64.convert_i64_s", [I64] -> F64;
    F64ConvertI64U = 0xBA, "f64.convert_i64_u", [I64] -> F64;
    F64PromoteF32 = 0xBB, "f64.promote_f32", [F32] -> F64;
    I32ReinterpretF32 = 0xBC, "i32.reinterpret_f32", [F32] -> I32;
    I64ReinterpretF64 = 0xBD, "i64.reinterpret_f64", [F64] -> I64;
    F32ReinterpretI32 = 0xBE, "f32.reinterpret_i32", [I32] -> F32;
    F64ReinterpretI64 = 0xBF, "f64.reinterpret_i64", [I64] -> F64;

    I32Extend8S = 0xC0, "i32.extend8_s", [I32] -> I32;
    I32Extend16S = 0xC1, "i32.extend16_s", [I32] -> I32;
    I64Extend8S = 0xC2, "i64.extend8_s", [I64] -> I64;
    I64Extend16S = 0xC3, "i64.extend16_s", [I64] -> I64;
    I64Extend32S = 0xC4, "i64.extend32_s", [I64] -> I64;

    I32TruncSatF32S = 0xFC00, "i32.trunc_sat_f32_s", [F32] -> I32;
    I32TruncSatF32U = 0xFC01, "i32.trunc_sat_f32_u", [F32] -> I32;
    I32TruncSatF64S = 0xFC02, "i32.trunc_sat_f64_s", [F64] -> I32;
    I32TruncSatF64U = 0xFC03, "i32.trunc_sat_f64_u", [F64] -> I32;
    I64TruncSatF32S = 0xFC04, "i64.trunc_sat_f32_s", [F32] -> I64;
    I64TruncSatF32U = 0xFC05, "i64.trunc_sat_f32_u", [F32] -> I64;
    I64TruncSatF64S = 0xFC06, "i64.trunc_sat_f64_s", [F64] -> I64;
    I64TruncSatF64U = 0xFC07, "i64.trunc_sat_f64_u", [F64] -> I64;
}

#[inline]
fn i32_of(cell: u64) -> i32 {
    cell as u32 as i32
}

#[inline]
fn u32_of(cell: u64) -> u32 {
    cell as u32
}

#[inline]
fn f32_of(cell: u64) -> f32 {
    f32::from_bits(cell as u32)
}

#[inline]
fn f64_of(cell: u64) -> f64 {
    f64::from_bits(cell)
}

#[inline]
fn from_i32(v: i32) -> u64 {
    v as u32 as u64
}

#[inline]
fn from_u32(v: u32) -> u64 {
    v as u64
}

#[inline]
fn from_f32(v: f32) -> u64 {
    v.to_bits() as u64
}

#[inline]
fn from_f64(v: f64) -> u64 {
    v.to_bits()
}

#[inline]
fn from_bool(v: bool) -> u64 {
    v as u64
}

impl NumericOp {
    /// Whether the instruction pops one operand (otherwise two).
    #[must_use]
    pub const fn is_unary(self) -> bool {
        self.params().len() == 1
    }

    /// Whether the instruction belongs to the sign-extension proposal.
    #[must_use]
    pub const fn is_sign_extension(self) -> bool {
        matches!(self.code(), 0xC0..=0xC4)
    }

    /// Whether the instruction belongs to the saturating conversion proposal.
    #[must_use]
    pub const fn is_saturating(self) -> bool {
        self.code() >= 0xFC00
    }

    /// Evaluate on raw stack cells.
    ///
    /// `lhs` is the deeper operand; unary instructions read only `lhs`.
    pub fn eval(self, lhs: u64, rhs: u64) -> Result<u64, TrapCode> {
        use NumericOp::*;

        let (a, b) = (lhs, rhs);
        Ok(match self {
            I32Eqz => from_bool(u32_of(a) == 0),
            I32Eq => from_bool(u32_of(a) == u32_of(b)),
            I32Ne => from_bool(u32_of(a) != u32_of(b)),
            I32LtS => from_bool(i32_of(a) < i32_of(b)),
            I32LtU => from_bool(u32_of(a) < u32_of(b)),
            I32GtS => from_bool(i32_of(a) > i32_of(b)),
            I32GtU => from_bool(u32_of(a) > u32_of(b)),
            I32LeS => from_bool(i32_of(a) <= i32_of(b)),
            I32LeU => from_bool(u32_of(a) <= u32_of(b)),
            I32GeS => from_bool(i32_of(a) >= i32_of(b)),
            I32GeU => from_bool(u32_of(a) >= u32_of(b)),

            I64Eqz => from_bool(a == 0),
            I64Eq => from_bool(a == b),
            I64Ne => from_bool(a != b),
            I64LtS => from_bool((a as i64) < (b as i64)),
            I64LtU => from_bool(a < b),
            I64GtS => from_bool((a as i64) > (b as i64)),
            I64GtU => from_bool(a > b),
            I64LeS => from_bool((a as i64) <= (b as i64)),
            I64LeU => from_bool(a <= b),
            I64GeS => from_bool((a as i64) >= (b as i64)),
            I64GeU => from_bool(a >= b),

            F32Eq => from_bool(f32_of(a) == f32_of(b)),
            F32Ne => from_bool(f32_of(a) != f32_of(b)),
            F32Lt => from_bool(f32_of(a) < f32_of(b)),
            F32Gt => from_bool(f32_of(a) > f32_of(b)),
            F32Le => from_bool(f32_of(a) <= f32_of(b)),
            F32Ge => from_bool(f32_of(a) >= f32_of(b)),

            F64Eq => from_bool(f64_of(a) == f64_of(b)),
            F64Ne => from_bool(f64_of(a) != f64_of(b)),
            F64Lt => from_bool(f64_of(a) < f64_of(b)),
            F64Gt => from_bool(f64_of(a) > f64_of(b)),
            F64Le => from_bool(f64_of(a) <= f64_of(b)),
            F64Ge => from_bool(f64_of(a) >= f64_of(b)),

            I32Clz => from_u32(u32_of(a).leading_zeros()),
            I32Ctz => from_u32(u32_of(a).trailing_zeros()),
            I32Popcnt => from_u32(u32_of(a).count_ones()),
            I32Add => from_u32(u32_of(a).wrapping_add(u32_of(b))),
            I32Sub => from_u32(u32_of(a).wrapping_sub(u32_of(b))),
            I32Mul => from_u32(u32_of(a).wrapping_mul(u32_of(b))),
            I32DivS => from_i32(math::i32_div_s(i32_of(a), i32_of(b))?),
            I32DivU => from_u32(math::i32_div_u(u32_of(a), u32_of(b))?),
            I32RemS => from_i32(math::i32_rem_s(i32_of(a), i32_of(b))?),
            I32RemU => from_u32(math::i32_rem_u(u32_of(a), u32_of(b))?),
            I32And => from_u32(u32_of(a) & u32_of(b)),
            I32Or => from_u32(u32_of(a) | u32_of(b)),
            I32Xor => from_u32(u32_of(a) ^ u32_of(b)),
            I32Shl => from_u32(u32_of(a).wrapping_shl(u32_of(b))),
            I32ShrS => from_i32(i32_of(a).wrapping_shr(u32_of(b))),
            I32ShrU => from_u32(u32_of(a).wrapping_shr(u32_of(b))),
            I32Rotl => from_u32(u32_of(a).rotate_left(u32_of(b) % 32)),
            I32Rotr => from_u32(u32_of(a).rotate_right(u32_of(b) % 32)),

            I64Clz => a.leading_zeros() as u64,
            I64Ctz => a.trailing_zeros() as u64,
            I64Popcnt => a.count_ones() as u64,
            I64Add => a.wrapping_add(b),
            I64Sub => a.wrapping_sub(b),
            I64Mul => a.wrapping_mul(b),
            I64DivS => math::i64_div_s(a as i64, b as i64)? as u64,
            I64DivU => math::i64_div_u(a, b)?,
            I64RemS => math::i64_rem_s(a as i64, b as i64)? as u64,
            I64RemU => math::i64_rem_u(a, b)?,
            I64And => a & b,
            I64Or => a | b,
            I64Xor => a ^ b,
            I64Shl => a.wrapping_shl((b % 64) as u32),
            I64ShrS => (a as i64).wrapping_shr((b % 64) as u32) as u64,
            I64ShrU => a.wrapping_shr((b % 64) as u32),
            I64Rotl => a.rotate_left((b % 64) as u32),
            I64Rotr => a.rotate_right((b % 64) as u32),

            F32Abs => from_f32(math::f32_abs(f32_of(a))),
            F32Neg => from_f32(math::f32_neg(f32_of(a))),
            F32Ceil => from_f32(math::f32_ceil(f32_of(a))),
            F32Floor => from_f32(math::f32_floor(f32_of(a))),
            F32Trunc => from_f32(math::f32_trunc(f32_of(a))),
            F32Nearest => from_f32(math::f32_nearest(f32_of(a))),
            F32Sqrt => from_f32(math::f32_sqrt(f32_of(a))),
            F32Add => from_f32(math::f32_add(f32_of(a), f32_of(b))),
            F32Sub => from_f32(math::f32_sub(f32_of(a), f32_of(b))),
            F32Mul => from_f32(math::f32_mul(f32_of(a), f32_of(b))),
            F32Div => from_f32(math::f32_div(f32_of(a), f32_of(b))),
            F32Min => from_f32(math::f32_min(f32_of(a), f32_of(b))),
            F32Max => from_f32(math::f32_max(f32_of(a), f32_of(b))),
            F32Copysign => from_f32(math::f32_copysign(f32_of(a), f32_of(b))),

            F64Abs => from_f64(math::f64_abs(f64_of(a))),
            F64Neg => from_f64(math::f64_neg(f64_of(a))),
            F64Ceil => from_f64(math::f64_ceil(f64_of(a))),
            F64Floor => from_f64(math::f64_floor(f64_of(a))),
            F64Trunc => from_f64(math::f64_trunc(f64_of(a))),
            F64Nearest => from_f64(math::f64_nearest(f64_of(a))),
            F64Sqrt => from_f64(math::f64_sqrt(f64_of(a))),
            F64Add => from_f64(math::f64_add(f64_of(a), f64_of(b))),
            F64Sub => from_f64(math::f64_sub(f64_of(a), f64_of(b))),
            F64Mul => from_f64(math::f64_mul(f64_of(a), f64_of(b))),
            F64Div => from_f64(math::f64_div(f64_of(a), f64_of(b))),
            F64Min => from_f64(math::f64_min(f64_of(a), f64_of(b))),
            F64Max => from_f64(math::f64_max(f64_of(a), f64_of(b))),
            F64Copysign => from_f64(math::f64_copysign(f64_of(a), f64_of(b))),

            I32WrapI64 => from_u32(a as u32),
            I32TruncF32S => from_i32(math::i32_trunc_f32_s(f32_of(a))?),
            I32TruncF32U => from_u32(math::i32_trunc_f32_u(f32_of(a))?),
            I32TruncF64S => from_i32(math::i32_trunc_f64_s(f64_of(a))?),
            I32TruncF64U => from_u32(math::i32_trunc_f64_u(f64_of(a))?),
            I64ExtendI32S => i32_of(a) as i64 as u64,
            I64ExtendI32U => u32_of(a) as u64,
            I64TruncF32S => math::i64_trunc_f32_s(f32_of(a))? as u64,
            I64TruncF32U => math::i64_trunc_f32_u(f32_of(a))?,
            I64TruncF64S => math::i64_trunc_f64_s(f64_of(a))? as u64,
            I64TruncF64U => math::i64_trunc_f64_u(f64_of(a))?,
            F32ConvertI32S => from_f32(i32_of(a) as f32),
            F32ConvertI32U => from_f32(u32_of(a) as f32),
            F32ConvertI64S => from_f32(a as i64 as f32),
            F32ConvertI64U => from_f32(a as f32),
            F32DemoteF64 => from_f32(math::f32_demote_f64(f64_of(a))),
            F64ConvertI32S => from_f64(i32_of(a) as f64),
            F64ConvertI32U => from_f64(u32_of(a) as f64),
            F64ConvertI64S => from_f64(a as i64 as f64),
            F64ConvertI64U => from_f64(a as f64),
            F64PromoteF32 => from_f64(math::f64_promote_f32(f32_of(a))),
            // Cells already hold raw bits.
            I32ReinterpretF32 | I64ReinterpretF64 | F32ReinterpretI32 | F64ReinterpretI64 => a,

            I32Extend8S => from_i32(math::i32_extend8_s(i32_of(a))),
            I32Extend16S => from_i32(math::i32_extend16_s(i32_of(a))),
            I64Extend8S => math::i64_extend8_s(a as i64) as u64,
            I64Extend16S => math::i64_extend16_s(a as i64) as u64,
            I64Extend32S => math::i64_extend32_s(a as i64) as u64,

            I32TruncSatF32S => from_i32(math::i32_trunc_sat_f32_s(f32_of(a))),
            I32TruncSatF32U => from_u32(math::i32_trunc_sat_f32_u(f32_of(a))),
            I32TruncSatF64S => from_i32(math::i32_trunc_sat_f64_s(f64_of(a))),
            I32TruncSatF64U => from_u32(math::i32_trunc_sat_f64_u(f64_of(a))),
            I64TruncSatF32S => math::i64_trunc_sat_f32_s(f32_of(a)) as u64,
            I64TruncSatF32U => math::i64_trunc_sat_f32_u(f32_of(a)),
            I64TruncSatF64S => math::i64_trunc_sat_f64_s(f64_of(a)) as u64,
            I64TruncSatF64U => math::i64_trunc_sat_f64_u(f64_of(a)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(v: i32) -> u64 {
        v as u32 as u64
    }

    #[test]
    fn test_lookup_by_code() {
        assert_eq!(NumericOp::from_code(0x6A), Some(NumericOp::I32Add));
        assert_eq!(NumericOp::from_code(0xFC03), Some(NumericOp::I32TruncSatF64U));
        assert_eq!(NumericOp::from_code(0xC5), None);
        assert_eq!(NumericOp::I64Eqz.params(), &[ValueType::I64]);
        assert_eq!(NumericOp::I64Eqz.result(), ValueType::I32);
        assert!(NumericOp::I32Extend16S.is_sign_extension());
        assert!(NumericOp::I64TruncSatF64S.is_saturating());
        assert!(!NumericOp::I32Add.is_unary());
    }

    #[test]
    fn test_i32_arithmetic_wraps() {
        assert_eq!(NumericOp::I32Add.eval(cell(i32::MAX), cell(1)), Ok(cell(i32::MIN)));
        assert_eq!(NumericOp::I32Sub.eval(cell(0), cell(1)), Ok(cell(-1)));
        assert_eq!(NumericOp::I32Shl.eval(cell(1), cell(33)), Ok(2));
        assert_eq!(NumericOp::I32ShrS.eval(cell(-8), cell(1)), Ok(cell(-4)));
        assert_eq!(NumericOp::I32Rotl.eval(cell(i32::MIN), cell(1)), Ok(1));
    }

    #[test]
    fn test_division_traps() {
        assert_eq!(NumericOp::I32DivS.eval(cell(1), 0), Err(TrapCode::IntegerDivideByZero));
        assert_eq!(
            NumericOp::I32DivS.eval(cell(i32::MIN), cell(-1)),
            Err(TrapCode::IntegerOverflow)
        );
        assert_eq!(NumericOp::I64RemU.eval(7, 0), Err(TrapCode::IntegerDivideByZero));
    }

    #[test]
    fn test_comparisons_produce_i32_bools() {
        assert_eq!(NumericOp::I32LtS.eval(cell(-1), cell(0)), Ok(1));
        assert_eq!(NumericOp::I32LtU.eval(cell(-1), cell(0)), Ok(0));
        let nan = from_f64(f64::NAN);
        assert_eq!(NumericOp::F64Eq.eval(nan, nan), Ok(0));
        assert_eq!(NumericOp::F64Ne.eval(nan, nan), Ok(1));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(NumericOp::I64ExtendI32S.eval(cell(-1), 0), Ok(u64::MAX));
        assert_eq!(NumericOp::I64ExtendI32U.eval(cell(-1), 0), Ok(0xffff_ffff));
        assert_eq!(NumericOp::I32WrapI64.eval(0x1_0000_0002, 0), Ok(2));
        assert_eq!(
            NumericOp::I32TruncF32S.eval(from_f32(f32::NAN), 0),
            Err(TrapCode::InvalidConversionToInteger)
        );
        assert_eq!(NumericOp::I32TruncSatF32S.eval(from_f32(1e20), 0), Ok(cell(i32::MAX)));
        assert_eq!(NumericOp::F32ConvertI32U.eval(cell(-1), 0), Ok(from_f32(4_294_967_296.0)));
    }
}
