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

use anyhow::{Context, Result};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::level::LogLevel;
use crate::logger::{Logger, LoggerOptions};

/// Fully merged settings for one `batchlog` invocation.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub path: PathBuf,
    pub caption: String,
    pub level: Option<LogLevel>,
    pub severity: LogLevel,
    pub flush_threshold: usize,
    pub flush_interval: Duration,
    pub queue_capacity: usize,
    pub echo: bool,
    pub banner: bool,
    pub messages: Vec<String>,
}

impl RunSettings {
    fn logger_options(&self) -> LoggerOptions {
        LoggerOptions {
            level: self.level,
            flush_threshold: self.flush_threshold,
            flush_interval: self.flush_interval,
            queue_capacity: self.queue_capacity,
            echo: self.echo,
        }
    }
}

pub fn cmd_run(settings: RunSettings) -> Result<()> {
    let logger = Arc::new(Logger::open_with(
        &settings.path,
        &settings.caption,
        settings.logger_options(),
    ));

    // Run the teardown contract before exiting on Ctrl+C
    let handler_logger = Arc::clone(&logger);
    ctrlc::set_handler(move || {
        handler_logger.shutdown();
        std::process::exit(130);
    })
    .context("Error setting Ctrl-C handler")?;

    if settings.banner {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        logger.infof(format_args!("Session started at {}", timestamp));
    }

    let result = submit_input(&logger, &settings);

    // The handler still holds a reference, so teardown is explicit
    logger.shutdown();

    let stats = logger.stats();
    if stats.failed_flushes > 0 {
        eprintln!(
            "Warning: {} flush attempt(s) to {} failed",
            stats.failed_flushes,
            settings.path.display()
        );
    }

    result
}

fn submit_input(logger: &Logger, settings: &RunSettings) -> Result<()> {
    if !settings.messages.is_empty() {
        logger.log_join(settings.severity, &settings.messages);
        return Ok(());
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        logger.log_fmt(settings.severity, format_args!("{}", line));
    }
    Ok(())
}
