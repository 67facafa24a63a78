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

//! Keyed registry multiplexing durable buffers over one base directory.

use std::{collections::HashMap, sync::Mutex};

use tracing::debug;

use crate::{buffer::DurableBuffer, config::BufferConfig};

/// Lazily creates and caches one [`DurableBuffer`] per peer key.
///
/// All buffers share the registry's base directory: payload files land in
/// the common `messages/` directory while each key keeps its own
/// `manifest-<key>` file. Entries are never evicted; every buffer lives for
/// the process lifetime.
pub struct BufferRegistry {
    config:  BufferConfig,
    buffers: Mutex<HashMap<String, DurableBuffer>>,
}

impl BufferRegistry {
    /// Create a registry rooted at `config.base_dir`.
    #[must_use]
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            buffers: Mutex::new(HashMap::new()),
        }
    }

    /// Return the buffer for `key`, creating and starting it on first use.
    ///
    /// Construction is synchronous and cheap; recovery runs inside the
    /// buffer's own startup task, so the returned handle may not be ready
    /// yet. `put` and `get` gate on readiness themselves.
    pub fn get_or_create(&self, key: &str) -> DurableBuffer {
        let mut buffers = self.buffers.lock().unwrap();
        buffers
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(key, "Creating durable buffer");
                DurableBuffer::open(&self.config, key)
            })
            .clone()
    }

    /// The configuration shared by all buffers in this registry.
    #[must_use]
    pub fn config(&self) -> &BufferConfig { &self.config }
}
