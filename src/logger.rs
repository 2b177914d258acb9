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

use anyhow::Result;
use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::constants::{
    DEFAULT_FLUSH_INTERVAL, DEFAULT_FLUSH_THRESHOLD, DEFAULT_QUEUE_CAPACITY, SHUTDOWN_TIMEOUT,
};
use crate::coordinator::{CoordinatorConfig, CoordinatorHandle, CoordinatorState, CoordinatorStats};
use crate::level::{LevelCell, LogLevel, default_level};
use crate::sink::{DurableSink, FileSink};

/// Construction-time settings for a [`Logger`].
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Minimum level; `None` takes the process-wide default at construction.
    pub level: Option<LogLevel>,
    pub flush_threshold: usize,
    pub flush_interval: Duration,
    pub queue_capacity: usize,
    /// Print every accepted line to stdout.
    pub echo: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            level: None,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            echo: true,
        }
    }
}

/// Logger that echoes lines to the console and batches them to a durable sink.
///
/// Lines are formatted as `[<caption> - <LEVEL>]: <message>` and always end in
/// exactly one newline. Writes to the sink happen on a background coordinator;
/// see [`crate::coordinator`].
///
/// Logging calls block while the incoming queue is full. They must not be
/// made from inside an async runtime.
pub struct Logger {
    caption: String,
    level: LevelCell,
    echo: bool,
    coordinator: Option<CoordinatorHandle>,
    closed: AtomicBool,
}

impl Logger {
    /// Open (or create) `path` in append mode with default options.
    pub fn open(path: impl AsRef<Path>, caption: &str) -> Self {
        Self::open_with(path, caption, LoggerOptions::default())
    }

    /// Open (or create) `path` in append mode.
    ///
    /// Never fails: if the file cannot be opened a warning is printed and the
    /// logger keeps echoing to the console while its flushes do nothing.
    pub fn open_with(path: impl AsRef<Path>, caption: &str, options: LoggerOptions) -> Self {
        let sink: Option<Box<dyn DurableSink>> = match FileSink::open(path.as_ref()) {
            Ok(sink) => Some(Box::new(sink)),
            Err(e) => {
                eprintln!("Warning: {:#}. Logging to console only.", e);
                None
            }
        };
        Self::start(caption, sink, options)
    }

    /// Build a logger around any sink.
    pub fn with_sink(
        caption: &str,
        sink: impl DurableSink + 'static,
        options: LoggerOptions,
    ) -> Self {
        Self::start(caption, Some(Box::new(sink)), options)
    }

    fn start(caption: &str, sink: Option<Box<dyn DurableSink>>, options: LoggerOptions) -> Self {
        let flush_threshold = if options.flush_threshold == 0 {
            eprintln!(
                "Warning: Flush threshold must be positive, using {}",
                DEFAULT_FLUSH_THRESHOLD
            );
            DEFAULT_FLUSH_THRESHOLD
        } else {
            options.flush_threshold
        };

        let config = CoordinatorConfig {
            flush_threshold,
            flush_interval: options.flush_interval,
            queue_capacity: options.queue_capacity,
        };
        let coordinator = match CoordinatorHandle::spawn(sink, config) {
            Ok(handle) => Some(handle),
            Err(e) => {
                eprintln!("Warning: {:#}. Logging to console only.", e);
                None
            }
        };

        Self {
            caption: caption.to_string(),
            level: LevelCell::new(options.level.unwrap_or_else(default_level)),
            echo: options.echo,
            coordinator,
            closed: AtomicBool::new(false),
        }
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn level(&self) -> LogLevel {
        self.level.get()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    /// Current flush threshold, or `None` in console-only mode.
    pub fn flush_threshold(&self) -> Option<usize> {
        self.coordinator.as_ref().map(CoordinatorHandle::flush_threshold)
    }

    /// Change the flush threshold. Zero is rejected and the old value kept.
    pub fn set_flush_threshold(&self, threshold: usize) -> Result<()> {
        match &self.coordinator {
            Some(coordinator) => coordinator.set_flush_threshold(threshold),
            None if threshold == 0 => {
                anyhow::bail!("Flush threshold must be positive, got {}", threshold)
            }
            None => Ok(()),
        }
    }

    /// Whether the durable pipeline is running (false in console-only mode).
    pub fn has_coordinator(&self) -> bool {
        self.coordinator.is_some()
    }

    pub fn state(&self) -> CoordinatorState {
        self.coordinator
            .as_ref()
            .map_or(CoordinatorState::Stopped, CoordinatorHandle::state)
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.coordinator
            .as_ref()
            .map(CoordinatorHandle::stats)
            .unwrap_or_default()
    }

    /// Log a pre-formatted message at `level`.
    pub fn log_fmt(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        if !level.passes(self.level()) {
            return;
        }
        let message = match args.as_str() {
            Some(text) => text.to_string(),
            None => args.to_string(),
        };
        self.emit(level, &message);
    }

    /// Log the parts joined by single spaces at `level`.
    pub fn log_join<I>(&self, level: LogLevel, parts: I)
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        if !level.passes(self.level()) {
            return;
        }
        let mut message = String::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                message.push(' ');
            }
            let _ = write!(message, "{}", part);
        }
        self.emit(level, &message);
    }

    /// Non-generic entry point used by the `*ln!` macros.
    #[doc(hidden)]
    pub fn log_parts(&self, level: LogLevel, parts: &[&dyn fmt::Display]) {
        self.log_join(level, parts.iter());
    }

    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Debug, args);
    }

    pub fn warningf(&self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Warning, args);
    }

    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Info, args);
    }

    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Error, args);
    }

    /// Logs at `Fatal`. Does not terminate the process.
    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Fatal, args);
    }

    pub fn debugln<I>(&self, parts: I)
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log_join(LogLevel::Debug, parts);
    }

    pub fn warningln<I>(&self, parts: I)
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log_join(LogLevel::Warning, parts);
    }

    pub fn infoln<I>(&self, parts: I)
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log_join(LogLevel::Info, parts);
    }

    pub fn errorln<I>(&self, parts: I)
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log_join(LogLevel::Error, parts);
    }

    pub fn fatalln<I>(&self, parts: I)
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.log_join(LogLevel::Fatal, parts);
    }

    fn emit(&self, level: LogLevel, message: &str) {
        let line = format_line(&self.caption, level, message);

        if self.echo {
            let mut stdout = io::stdout().lock();
            let _ = stdout.write_all(line.as_bytes());
            let _ = stdout.flush();
        }

        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if let Some(coordinator) = &self.coordinator {
            coordinator.submit(line);
        }
    }

    /// Ask the coordinator to flush soon. Does not wait for the write.
    pub fn request_flush(&self) {
        if let Some(coordinator) = &self.coordinator {
            coordinator.request_flush();
        }
    }

    /// Ask the coordinator to stop. Unflushed lines are lost; prefer [`Logger::close`].
    pub fn request_exit(&self) {
        if let Some(coordinator) = &self.coordinator {
            coordinator.request_exit();
        }
    }

    /// Wait for the coordinator to stop, up to `timeout`.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        self.coordinator
            .as_ref()
            .is_none_or(|coordinator| coordinator.wait_stopped(timeout))
    }

    /// Flush, stop the coordinator and close the sink. Only the first call acts.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(coordinator) = &self.coordinator else {
            return;
        };

        coordinator.request_flush();
        coordinator.request_exit();
        if coordinator.wait_stopped(SHUTDOWN_TIMEOUT) {
            coordinator.join();
        } else {
            eprintln!(
                "Warning: Logger '{}' did not stop within {:?}",
                self.caption, SHUTDOWN_TIMEOUT
            );
        }
    }

    /// Tear the logger down: flush, stop, close.
    pub fn close(self) {
        self.shutdown();
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Render one log line, terminated by exactly one newline.
pub fn format_line(caption: &str, level: LogLevel, message: &str) -> String {
    let message = message
        .strip_suffix('\n')
        .map(|m| m.strip_suffix('\r').unwrap_or(m))
        .unwrap_or(message);
    format!("[{} - {}]: {}\n", caption, level.label(), message)
}
