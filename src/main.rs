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

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use batchlog::cli::Cli;
use batchlog::commands::{RunSettings, cmd_run};
use batchlog::config::Config;
use batchlog::constants::{
    DEFAULT_CAPTION, DEFAULT_CONFIG_FILE, DEFAULT_FLUSH_INTERVAL, DEFAULT_FLUSH_THRESHOLD,
    DEFAULT_QUEUE_CAPACITY,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config from specified path or default batchlog.toml
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = Config::load(&config_path)?;

    let settings = merge_settings(cli, &config)?;
    cmd_run(settings)
}

fn merge_settings(cli: Cli, config: &Config) -> Result<RunSettings> {
    let path = cli
        .path
        .or_else(|| config.path.clone())
        .context("No log file given; pass --path or set `path` in the config file")?;

    let caption = config.merge_with_cli(
        cli.caption,
        config.caption.clone(),
        DEFAULT_CAPTION.to_string(),
    );
    let level = match cli.level {
        Some(level) => Some(level),
        None => config.log_level()?,
    };
    let flush_threshold =
        config.merge_with_cli(cli.threshold, config.flush_threshold, DEFAULT_FLUSH_THRESHOLD);
    if flush_threshold == 0 {
        bail!("Flush threshold must be positive");
    }
    let default_interval_ms = DEFAULT_FLUSH_INTERVAL.as_millis() as u64;
    let interval_ms =
        config.merge_with_cli(cli.interval_ms, config.flush_interval_ms, default_interval_ms);
    if interval_ms == 0 {
        bail!("Flush interval must be positive");
    }
    let queue_capacity =
        config.merge_with_cli(cli.queue_capacity, config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    if queue_capacity == 0 {
        bail!("Queue capacity must be positive");
    }
    let echo = if cli.quiet {
        false
    } else {
        config.echo.unwrap_or(true)
    };

    Ok(RunSettings {
        path,
        caption,
        level,
        severity: cli.severity,
        flush_threshold,
        flush_interval: Duration::from_millis(interval_ms),
        queue_capacity,
        echo,
        banner: !cli.no_banner,
        messages: cli.messages,
    })
}
