// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Configuration file support.
//!
//! An optional TOML file sets engine limits. Every field is optional and
//! command-line flags take precedence over the file.
//!
//! ```toml
//! max_call_depth = 2000
//! max_value_stack = 65536
//! max_memory_pages = 256
//! fuel = 1000000
//! timeout_ms = 5000
//!
//! [features]
//! bulk_memory = false
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result};
use kiln::{Config, Features};
use serde::{Deserialize, Serialize};

/// Contents of a `kilnd` configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Maximum nesting of WebAssembly calls
    pub max_call_depth:   Option<usize>,
    /// Maximum operand stack cells
    pub max_value_stack:  Option<usize>,
    /// Upper bound on every linear memory, in pages
    pub max_memory_pages: Option<u32>,
    /// Fuel for the invocation; enables fuel metering
    pub fuel:             Option<u64>,
    /// Wall-clock budget before the run is interrupted
    pub timeout_ms:       Option<u64>,
    /// Proposal switches, unset ones stay enabled
    #[serde(default)]
    pub features:         FeatureConfig,
}

/// Proposal switches of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureConfig {
    /// Multiple results for functions and blocks
    pub multi_value:             Option<bool>,
    /// Sign extension operators
    pub sign_extension:          Option<bool>,
    /// Saturating float to int conversions
    pub saturating_float_to_int: Option<bool>,
    /// Bulk memory operations and passive segments
    pub bulk_memory:             Option<bool>,
    /// Reference types and multiple tables
    pub reference_types:         Option<bool>,
}

impl FeatureConfig {
    fn apply(&self, mut features: Features) -> Features {
        let switches = [
            (self.multi_value, &mut features.multi_value),
            (self.sign_extension, &mut features.sign_extension),
            (self.saturating_float_to_int, &mut features.saturating_float_to_int),
            (self.bulk_memory, &mut features.bulk_memory),
            (self.reference_types, &mut features.reference_types),
        ];
        for (setting, flag) in switches {
            if let Some(enabled) = setting {
                *flag = enabled;
            }
        }
        features
    }
}

/// Settings after merging the file with command-line overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Engine configuration
    pub engine:     Config,
    /// Fuel to put into the store, if metering is on
    pub fuel:       Option<u64>,
    /// Wall-clock budget in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Command-line values that override the file
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    /// `--fuel`
    pub fuel:           Option<u64>,
    /// `--timeout-ms`
    pub timeout_ms:     Option<u64>,
    /// `--max-call-depth`
    pub max_call_depth: Option<usize>,
}

impl FileConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Merge with command-line overrides into the settings of one run.
    pub fn merge(&self, overrides: Overrides) -> RunConfig {
        let defaults = Config::default();
        let fuel = overrides.fuel.or(self.fuel);
        let engine = Config::new()
            .with_features(self.features.apply(defaults.features))
            .with_max_call_depth(overrides.max_call_depth.or(self.max_call_depth).unwrap_or(defaults.max_call_depth))
            .with_max_value_stack(self.max_value_stack.unwrap_or(defaults.max_value_stack))
            .with_max_memory_pages(self.max_memory_pages.unwrap_or(defaults.max_memory_pages))
            .with_consume_fuel(fuel.is_some());
        RunConfig { engine, fuel, timeout_ms: overrides.timeout_ms.or(self.timeout_ms) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        let run = config.merge(Overrides::default());
        assert_eq!(run.engine, Config::default());
        assert_eq!(run.fuel, None);
    }

    #[test]
    fn test_flags_override_file() {
        let config: FileConfig = toml::from_str(
            r#"
            max_call_depth = 50
            max_memory_pages = 4
            fuel = 1000
            timeout_ms = 10

            [features]
            bulk_memory = false
            "#,
        )
        .unwrap();

        let run = config.merge(Overrides { fuel: Some(7), max_call_depth: None, timeout_ms: None });
        assert_eq!(run.fuel, Some(7));
        assert_eq!(run.timeout_ms, Some(10));
        assert!(run.engine.consume_fuel);
        assert_eq!(run.engine.max_call_depth, 50);
        assert_eq!(run.engine.max_memory_pages, 4);
        assert!(!run.engine.features.bulk_memory);
        assert!(run.engine.features.multi_value);

        let run = config.merge(Overrides { max_call_depth: Some(8), ..Overrides::default() });
        assert_eq!(run.engine.max_call_depth, 8);
        assert_eq!(run.fuel, Some(1000));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("max_depth = 3").is_err());
    }
}
