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

//! Durable destinations written by the flush coordinator.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Append-only text destination owned by exactly one coordinator.
///
/// A flush writes the whole pending batch with `write_line` followed by
/// `sync`. If any call fails the entire batch is retried on the next flush,
/// so lines accepted before the failure (including bytes still buffered by
/// the sink) can reach the destination twice.
pub trait DurableSink: Send {
    /// Append one already-terminated line.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Push anything buffered down to the destination.
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Called once when the coordinator stops.
    fn close(&mut self) -> io::Result<()> {
        self.sync()
    }
}

/// File destination opened in append mode, created if missing.
///
/// Writes go through an 8 KiB buffer that is not discarded when a write
/// fails, so a retried batch may duplicate lines in the file.
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;

        Ok(Self {
            path,
            writer: BufWriter::with_capacity(8192, file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DurableSink for FileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// In-memory destination whose contents stay readable through a shared handle.
///
/// Useful for embedding the logger where no file is wanted, and for tests.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far, in write order.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// All written lines concatenated, as they would appear in a file.
    pub fn contents(&self) -> String {
        self.lines().concat()
    }
}

impl DurableSink for MemorySink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| io::Error::other("memory sink poisoned"))?;
        lines.push(line.to_string());
        Ok(())
    }
}
