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

//! Process-local logger that echoes each line to the console and batches
//! lines to a durable sink from a single background coordinator.
//!
//! ```ignore
//! use batchlog::{Logger, infof, warningln};
//!
//! let logger = Logger::open("service.log", "api");
//! infof!(logger, "listening on port {}", 8080);
//! warningln!(logger, "cache", "cold");
//! logger.close();
//! ```

#[macro_use]
mod macros;

pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod level;
pub mod logger;
pub mod sink;

pub use coordinator::{CoordinatorState, CoordinatorStats};
pub use level::{LogLevel, default_level, set_default_level};
pub use logger::{Logger, LoggerOptions, format_line};
pub use sink::{DurableSink, FileSink, MemorySink};
