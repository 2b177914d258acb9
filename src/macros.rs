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

//! Per-level logging macros.
//!
//! The `*f!` macros take a format template, the `*ln!` macros take any
//! number of `Display` values and join them with spaces:
//!
//! ```ignore
//! infof!(logger, "listening on {}:{}", host, port);
//! warningln!(logger, "retrying", attempt, "of", max);
//! ```

#[macro_export]
macro_rules! logf {
    ($logger:expr, $lvl:expr, $($arg:tt)+) => {
        $logger.log_fmt($lvl, format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! logln {
    ($logger:expr, $lvl:expr $(, $part:expr)* $(,)?) => {
        $logger.log_parts($lvl, &[$(&$part as &dyn ::std::fmt::Display),*])
    };
}

#[macro_export]
macro_rules! debugf   { ($logger:expr, $($arg:tt)+) => { $crate::logf!($logger, $crate::LogLevel::Debug, $($arg)+) } }
#[macro_export]
macro_rules! warningf { ($logger:expr, $($arg:tt)+) => { $crate::logf!($logger, $crate::LogLevel::Warning, $($arg)+) } }
#[macro_export]
macro_rules! infof    { ($logger:expr, $($arg:tt)+) => { $crate::logf!($logger, $crate::LogLevel::Info, $($arg)+) } }
#[macro_export]
macro_rules! errorf   { ($logger:expr, $($arg:tt)+) => { $crate::logf!($logger, $crate::LogLevel::Error, $($arg)+) } }
#[macro_export]
macro_rules! fatalf   { ($logger:expr, $($arg:tt)+) => { $crate::logf!($logger, $crate::LogLevel::Fatal, $($arg)+) } }

#[macro_export]
macro_rules! debugln   { ($logger:expr $(, $part:expr)* $(,)?) => { $crate::logln!($logger, $crate::LogLevel::Debug $(, $part)*) } }
#[macro_export]
macro_rules! warningln { ($logger:expr $(, $part:expr)* $(,)?) => { $crate::logln!($logger, $crate::LogLevel::Warning $(, $part)*) } }
#[macro_export]
macro_rules! infoln    { ($logger:expr $(, $part:expr)* $(,)?) => { $crate::logln!($logger, $crate::LogLevel::Info $(, $part)*) } }
#[macro_export]
macro_rules! errorln   { ($logger:expr $(, $part:expr)* $(,)?) => { $crate::logln!($logger, $crate::LogLevel::Error $(, $part)*) } }
#[macro_export]
macro_rules! fatalln   { ($logger:expr $(, $part:expr)* $(,)?) => { $crate::logln!($logger, $crate::LogLevel::Fatal $(, $part)*) } }

#[cfg(test)]
mod tests {
    use crate::{LogLevel, Logger, LoggerOptions, MemorySink};
    use std::time::Duration;

    #[test]
    fn test_macros_format_and_join() {
        let sink = MemorySink::new();
        let logger = Logger::with_sink(
            "m",
            sink.clone(),
            LoggerOptions {
                level: Some(LogLevel::All),
                flush_interval: Duration::from_secs(60),
                echo: false,
                ..LoggerOptions::default()
            },
        );

        let port = 8080;
        infof!(logger, "port={}", port);
        debugf!(logger, "plain\n");
        warningln!(logger, "a", 1, 2.5);
        errorln!(logger);
        fatalln!(logger, "bye");
        logln!(logger, LogLevel::Info, "generic");
        logger.close();

        assert_eq!(
            sink.lines(),
            vec![
                "[m - INFO]: port=8080\n",
                "[m - DEBUG]: plain\n",
                "[m - WARNING]: a 1 2.5\n",
                "[m - ERROR]: \n",
                "[m - FATAL]: bye\n",
                "[m - INFO]: generic\n",
            ]
        );
    }
}
