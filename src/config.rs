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

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::level::LogLevel;

/// Configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Destination log file
    pub path: Option<PathBuf>,

    /// Caption embedded in every line
    pub caption: Option<String>,

    /// Minimum severity written (all, debug, warning, info, error, fatal)
    pub level: Option<String>,

    /// Pending lines that trigger an immediate flush
    pub flush_threshold: Option<usize>,

    /// Flush timer period (in milliseconds)
    pub flush_interval_ms: Option<u64>,

    /// Capacity of the incoming line queue
    pub queue_capacity: Option<usize>,

    /// Echo lines to stdout
    pub echo: Option<bool>,
}

impl Config {
    /// Load config from a file, or return default if file doesn't exist
    pub fn load(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Parsed `level`, if one is configured
    pub fn log_level(&self) -> Result<Option<LogLevel>> {
        self.level
            .as_deref()
            .map(|raw| raw.parse::<LogLevel>().map_err(|err| anyhow!(err)))
            .transpose()
            .context("Invalid `level` in config file")
    }

    /// Merge this config with CLI args, where CLI args take precedence
    ///
    /// A value given on the command line always wins, even when it equals
    /// the default.
    pub fn merge_with_cli<T>(
        &self,
        cli_value: Option<T>,
        config_value: Option<T>,
        default_value: T,
    ) -> T {
        cli_value.or(config_value).unwrap_or(default_value)
    }
}
