// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! A single log message emitted by a guest.

use crate::level::LogLevel;

/// Log message from a WebAssembly instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOperation {
    /// Severity
    pub level:   LogLevel,
    /// Message text
    pub message: String,
    /// Name of the calling module, if it has one
    pub module:  Option<String>,
}

impl LogOperation {
    /// Create a log operation without a module name.
    #[must_use]
    pub const fn new(level: LogLevel, message: String) -> Self {
        Self { level, message, module: None }
    }

    /// Create a log operation attributed to `module`.
    pub fn with_module(level: LogLevel, message: impl Into<String>, module: impl Into<String>) -> Self {
        Self { level, message: message.into(), module: Some(module.into()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_operation_creation() {
        let op = LogOperation::new(LogLevel::Info, "ready".to_string());
        assert_eq!(op.module, None);

        let op = LogOperation::with_module(LogLevel::Debug, "ready", "guest");
        assert_eq!(op.level, LogLevel::Debug);
        assert_eq!(op.module.as_deref(), Some("guest"));
    }
}
