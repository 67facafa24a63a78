// Copyright 2026 Ferry Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration shared by all buffers rooted under one base directory.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Directory holding the shared `messages/` payload directory and the
    /// per-key manifest files.
    pub base_dir: PathBuf,
    /// How long the manifest writer sleeps after each flush attempt, so
    /// bursts of puts coalesce into one manifest rewrite.
    pub flush_interval: Duration,
    /// Lifetime granted to every payload accepted by `put`.
    pub message_ttl: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./buffer_data"),
            flush_interval: Duration::from_secs(1),
            message_ttl: Duration::from_secs(5 * 60),
        }
    }
}
