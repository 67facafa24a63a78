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

use std::{path::PathBuf, time::Duration};

use crate::{config::BufferConfig, registry::BufferRegistry};

/// Fluent construction of a [`BufferRegistry`].
pub struct RegistryBuilder {
    config: BufferConfig,
}

impl RegistryBuilder {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            config: BufferConfig {
                base_dir: base_dir.into(),
                ..Default::default()
            },
        }
    }

    #[must_use]
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    #[must_use]
    pub fn message_ttl(mut self, ttl: Duration) -> Self {
        self.config.message_ttl = ttl;
        self
    }

    #[must_use]
    pub fn build(self) -> BufferRegistry { BufferRegistry::new(self.config) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default_config() {
        let builder = RegistryBuilder::new("/tmp/test_buffers");
        assert_eq!(builder.config.base_dir, PathBuf::from("/tmp/test_buffers"));
        assert_eq!(builder.config.flush_interval, Duration::from_secs(1));
        assert_eq!(builder.config.message_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_builder_custom_config() {
        let registry = RegistryBuilder::new("/tmp/test_buffers")
            .flush_interval(Duration::from_millis(250))
            .message_ttl(Duration::from_secs(60))
            .build();

        assert_eq!(registry.config().flush_interval, Duration::from_millis(250));
        assert_eq!(registry.config().message_ttl, Duration::from_secs(60));
    }
}
