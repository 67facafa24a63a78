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

//! Durable, crash-recoverable FIFO buffering for relay message payloads.
//!
//! Each buffered message is written to its own file under
//! `<base>/messages/`; a per-key manifest file records which files are still
//! pending, so a restart rebuilds the queue without replaying any log.
//! Buffers are multiplexed over one base directory by a keyed registry, one
//! buffer per remote peer.
//!
//! ```ignore
//! let registry = RegistryBuilder::new("/var/lib/relay/buffers").build();
//! let buffer = registry.get_or_create("peer-7");
//!
//! buffer.put(framed_message).await?;
//!
//! let item = buffer.get().await;
//! let payload = std::fs::read(&item.path)?;
//! // ... forward payload, then delete item.path
//! ```

pub mod buffer;
pub mod builder;
pub mod config;
pub mod error;
pub mod item;
pub mod manifest;
pub mod registry;

pub use buffer::DurableBuffer;
pub use builder::RegistryBuilder;
pub use config::BufferConfig;
pub use error::{BufferError, Result};
pub use item::{Item, Payload};
pub use registry::BufferRegistry;
