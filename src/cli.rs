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

use clap::Parser;
use std::path::PathBuf;

use crate::level::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "batchlog")]
#[command(about = "Echo log lines to the console while batching them into a log file")]
#[command(version)]
pub struct Cli {
    /// Path to config file (defaults to batchlog.toml in current directory if it exists)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log file to append to (falls back to `path` in the config file)
    #[arg(long, short = 'o')]
    pub path: Option<PathBuf>,

    /// Message parts to log as a single line; stdin is read line by line when omitted
    pub messages: Vec<String>,

    /// Caption embedded in every line [default: batchlog]
    #[arg(long)]
    pub caption: Option<String>,

    /// Minimum severity written (defaults to $BATCHLOG_LEVEL, then debug)
    #[arg(long)]
    pub level: Option<LogLevel>,

    /// Severity of the submitted lines
    #[arg(long, default_value = "info")]
    pub severity: LogLevel,

    /// Pending lines that trigger an immediate flush [default: 100]
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Flush timer period in milliseconds [default: 2000]
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Capacity of the incoming line queue [default: 1000]
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Do not echo lines to stdout
    #[arg(long, short)]
    pub quiet: bool,

    /// Skip the session-start banner line
    #[arg(long)]
    pub no_banner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_positional_is_a_message() {
        let cli = Cli::parse_from(["batchlog", "hello", "world"]);
        assert!(cli.path.is_none());
        assert_eq!(cli.messages, vec!["hello", "world"]);
    }

    #[test]
    fn test_destination_is_named() {
        let cli = Cli::parse_from(["batchlog", "-o", "out.log", "hi", "--threshold", "100"]);
        assert_eq!(cli.path, Some(PathBuf::from("out.log")));
        assert_eq!(cli.messages, vec!["hi"]);
        assert_eq!(cli.threshold, Some(100));
        assert!(cli.interval_ms.is_none());
    }
}
