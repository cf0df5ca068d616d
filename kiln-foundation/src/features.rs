// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly proposal flags.

/// WebAssembly features accepted by the decoder and validator.
///
/// Every post-MVP proposal supported by the engine is enabled by default.
/// Turning a flag off makes modules that use the feature fail to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Features {
    /// Multiple results for functions and blocks, block types by type index
    pub multi_value:             bool,
    /// `i32.extend8_s` and friends
    pub sign_extension:          bool,
    /// `i32.trunc_sat_f32_s` and friends
    pub saturating_float_to_int: bool,
    /// `memory.copy`, `memory.fill`, passive segments, `data.drop`, ...
    pub bulk_memory:             bool,
    /// `externref`, `ref.*`, `table.*`, multiple tables, typed `select`
    pub reference_types:         bool,
}

impl Features {
    /// Only the WebAssembly 1.0 instruction set.
    #[must_use]
    pub const fn mvp() -> Self {
        Self {
            multi_value:             false,
            sign_extension:          false,
            saturating_float_to_int: false,
            bulk_memory:             false,
            reference_types:         false,
        }
    }

    /// Every supported feature.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            multi_value:             true,
            sign_extension:          true,
            saturating_float_to_int: true,
            bulk_memory:             true,
            reference_types:         true,
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::all()
    }
}
