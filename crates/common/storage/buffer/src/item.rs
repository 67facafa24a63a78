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

//! Item descriptors and the payload forms accepted by `put`.

use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptor of one buffered message.
///
/// Exists in the in-memory queue and/or the manifest exactly while the
/// payload file it points at has been neither consumed nor
/// expired-and-deleted. The descriptor and its file are not transactionally
/// linked: a crash between the payload write and the enqueue leaves an
/// orphaned file behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Absolute location of the persisted payload file.
    pub path: PathBuf,

    /// Instant after which the payload is considered stale.
    pub expire_time: DateTime<Utc>,
}

impl Item {
    /// Whether this item's expiration time has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expire_time < now }
}

/// Payload forms accepted by [`DurableBuffer::put`](crate::DurableBuffer::put).
///
/// Either variant is written to the payload file as one blocking unit;
/// chunks are concatenated back to back without separators.
#[derive(Debug, Clone)]
pub enum Payload {
    /// One contiguous byte blob.
    Bytes(Bytes),

    /// A sequence of chunks, e.g. framed message segments.
    Chunks(Vec<Bytes>),
}

impl Payload {
    /// Total payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Payload::Bytes(data) => data.len(),
            Payload::Chunks(chunks) => chunks.iter().map(Bytes::len).sum(),
        }
    }

    /// Whether the payload carries no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self { Payload::Bytes(data) }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self { Payload::Bytes(Bytes::from(data)) }
}

impl From<&'static [u8]> for Payload {
    fn from(data: &'static [u8]) -> Self { Payload::Bytes(Bytes::from_static(data)) }
}

impl From<&'static str> for Payload {
    fn from(data: &'static str) -> Self { Payload::Bytes(Bytes::from_static(data.as_bytes())) }
}

impl From<String> for Payload {
    fn from(data: String) -> Self { Payload::Bytes(Bytes::from(data)) }
}

impl From<Vec<Bytes>> for Payload {
    fn from(chunks: Vec<Bytes>) -> Self { Payload::Chunks(chunks) }
}
