// Copyright (c) 2025 Sean McNamara <smcnam@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Severity levels and the process-wide default level.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::constants::LEVEL_ENV_VAR;

/// Severity of a log line, ordered from least to most severe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Accepts everything when used as a minimum level.
    All,
    Debug,
    Warning,
    Info,
    Error,
    Fatal,
}

impl LogLevel {
    pub const ALL_LEVELS: [LogLevel; 6] = [
        Self::All,
        Self::Debug,
        Self::Warning,
        Self::Info,
        Self::Error,
        Self::Fatal,
    ];

    /// Label embedded in formatted lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Debug => "DEBUG",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Whether a line at `self` passes a filter configured at `minimum`.
    pub fn passes(self, minimum: LogLevel) -> bool {
        self >= minimum
    }

    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(raw: u8) -> Self {
        Self::ALL_LEVELS
            .get(usize::from(raw))
            .copied()
            .unwrap_or(Self::All)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "debug" => Ok(Self::Debug),
            "warning" | "warn" => Ok(Self::Warning),
            "info" | "information" => Ok(Self::Info),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

/// Lock-free cell holding a level, shared by the global default and each logger.
#[derive(Debug)]
pub(crate) struct LevelCell(AtomicU8);

impl LevelCell {
    pub(crate) fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level.to_u8()))
    }

    pub(crate) fn get(&self) -> LogLevel {
        LogLevel::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, level: LogLevel) {
        self.0.store(level.to_u8(), Ordering::Relaxed);
    }
}

/// Process-wide default, seeded from the environment on first use.
static DEFAULT_LEVEL: Lazy<LevelCell> = Lazy::new(|| LevelCell::new(level_from_env()));

fn level_from_env() -> LogLevel {
    match std::env::var(LEVEL_ENV_VAR) {
        Ok(raw) => raw.parse().unwrap_or_else(|err| {
            eprintln!("Warning: ignoring {}: {}", LEVEL_ENV_VAR, err);
            LogLevel::Debug
        }),
        Err(_) => LogLevel::Debug,
    }
}

/// Level new loggers start with when their options do not name one.
pub fn default_level() -> LogLevel {
    DEFAULT_LEVEL.get()
}

/// Replace the process-wide default. Existing loggers keep their own level.
pub fn set_default_level(level: LogLevel) {
    DEFAULT_LEVEL.set(level);
}
