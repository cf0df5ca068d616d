// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Log levels a guest can pass to `env.log`.

use core::{fmt, str::FromStr};

use kiln_error::{kinds, Error};

/// Severity of a guest log message
///
/// The discriminants are the integers a guest passes as the first argument
/// of `env.log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Detailed tracing output
    Trace    = 0,
    /// Debugging output
    Debug    = 1,
    /// General information
    Info     = 2,
    /// Potential problems
    Warn     = 3,
    /// Recoverable errors
    Error    = 4,
    /// Severe errors
    Critical = 5,
}

impl LogLevel {
    /// Level for the raw integer a guest passed.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::Trace,
            1 => Self::Debug,
            2 => Self::Info,
            3 => Self::Warn,
            4 => Self::Error,
            5 => Self::Critical,
            _ => return None,
        })
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// The `log` crate level; `Critical` maps to `Error`.
    #[must_use]
    pub const fn to_log_level(self) -> log::Level {
        match self {
            Self::Trace => log::Level::Trace,
            Self::Debug => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error | Self::Critical => log::Level::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "err" => Ok(Self::Error),
            "critical" | "fatal" => Ok(Self::Critical),
            _ => Err(kinds::runtime_error(format!("invalid log level `{s}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("fatal".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_raw_levels() {
        for raw in 0..=5 {
            let level = LogLevel::from_raw(raw).unwrap();
            assert_eq!(level as i32, raw);
        }
        assert_eq!(LogLevel::from_raw(6), None);
        assert_eq!(LogLevel::from_raw(-1), None);
        assert!(LogLevel::Trace < LogLevel::Critical);
        assert_eq!(LogLevel::Critical.to_log_level(), log::Level::Error);
    }
}
