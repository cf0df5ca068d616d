// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Engine configuration.

use kiln_decoder::DecodeLimits;
use kiln_foundation::{Features, MAX_MEMORY_PAGES};

/// Default limit on nested WebAssembly calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Default limit on operand stack cells (8 MiB of 64-bit cells)
pub const DEFAULT_MAX_VALUE_STACK: usize = 1 << 20;

/// Configuration shared by an engine and every store created from it
///
/// Built with the `with_*` methods and frozen once handed to an `Engine`.
///
/// ```
/// use kiln_runtime::Config;
///
/// let config = Config::default().with_max_call_depth(256).with_consume_fuel(true);
/// assert_eq!(config.max_call_depth, 256);
/// assert!(config.consume_fuel);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Enabled WebAssembly proposals
    pub features:         Features,
    /// Maximum number of active WebAssembly frames
    pub max_call_depth:   usize,
    /// Maximum number of operand stack cells, locals included
    pub max_value_stack:  usize,
    /// Charge one unit of fuel per executed instruction
    pub consume_fuel:     bool,
    /// Upper bound on any linear memory, in pages
    pub max_memory_pages: u32,
    /// Structural limits applied while decoding
    pub decode_limits:    DecodeLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            features:         Features::default(),
            max_call_depth:   DEFAULT_MAX_CALL_DEPTH,
            max_value_stack:  DEFAULT_MAX_VALUE_STACK,
            consume_fuel:     false,
            max_memory_pages: MAX_MEMORY_PAGES,
            decode_limits:    DecodeLimits::default(),
        }
    }
}

impl Config {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the enabled proposals.
    #[must_use]
    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Set the maximum call depth.
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the operand stack limit in cells.
    #[must_use]
    pub fn with_max_value_stack(mut self, cells: usize) -> Self {
        self.max_value_stack = cells;
        self
    }

    /// Enable or disable fuel metering.
    #[must_use]
    pub fn with_consume_fuel(mut self, enable: bool) -> Self {
        self.consume_fuel = enable;
        self
    }

    /// Cap the size of every memory. Values above 65536 pages are clamped.
    #[must_use]
    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = pages.min(MAX_MEMORY_PAGES);
        self
    }

    /// Set the decoder limits.
    #[must_use]
    pub fn with_decode_limits(mut self, limits: DecodeLimits) -> Self {
        self.decode_limits = limits;
        self
    }
}
