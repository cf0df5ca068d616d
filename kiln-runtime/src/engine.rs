// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The engine: configuration plus compilation.

use std::sync::Arc;

use kiln_decoder::Module;
use kiln_error::Result;
use log::debug;

use crate::config::Config;

/// Compiles modules under one [`Config`]
///
/// Cloning an engine shares its configuration. Stores created from an
/// engine carry that configuration for their whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: Arc<Config>,
}

impl Engine {
    /// Create an engine with the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config: Arc::new(config) }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decode and validate a binary module.
    ///
    /// Fails with a decode error for malformed input and a validation error
    /// for ill-typed code. Nothing is instantiated either way.
    pub fn compile(&self, bytes: &[u8]) -> Result<Module> {
        let module = kiln_decoder::compile(bytes, &self.config.features, &self.config.decode_limits)?;
        debug!(
            "compiled module{}: {} functions, {} imports, {} exports",
            module.name().map(|name| format!(" {name}")).unwrap_or_default(),
            module.bodies().len(),
            module.imports().len(),
            module.exports().len()
        );
        Ok(module)
    }
}
