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

use std::time::Duration;

/// Capacity of the incoming line queue. Producers block once it is full.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Capacity of the control channel carrying flush/exit requests.
pub const CONTROL_CHANNEL_CAPACITY: usize = 1;

/// Pending-list length at which the coordinator requests a flush on its own.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 100;

/// Period of the flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(2);

/// How long teardown waits for the coordinator to report that it stopped.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable consulted for the process-wide default level.
pub const LEVEL_ENV_VAR: &str = "BATCHLOG_LEVEL";

pub const DEFAULT_CONFIG_FILE: &str = "batchlog.toml";

pub const DEFAULT_CAPTION: &str = "batchlog";
