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

//! Manifest codec for queue snapshots.
//!
//! A manifest is the JSON array of all descriptors queued at flush time,
//! rewritten wholesale on every flush — a snapshot, not an operation log:
//!
//! ```json
//! [
//!   {"path": "/var/lib/relay/buffers/messages/5c3a…", "expire_time": "2026-01-16T12:30:00Z"},
//!   {"path": "/var/lib/relay/buffers/messages/9f01…", "expire_time": "2026-01-16T12:31:07Z"}
//! ]
//! ```
//!
//! Decoding is deliberately lenient. A document that is not a JSON array is
//! a corrupt manifest: it is logged and treated as empty, trading the lost
//! snapshot for a buffer that still starts. A record that is not a
//! well-formed descriptor is dropped on its own so it cannot poison the
//! rest of the snapshot.

use serde_json::Value;
use snafu::ResultExt;
use tracing::{debug, error};

use crate::{Result, error::EncodeManifestSnafu, item::Item};

/// Serialize a queue snapshot to manifest bytes.
pub fn encode(items: &[Item]) -> Result<Vec<u8>> {
    serde_json::to_vec(items).context(EncodeManifestSnafu)
}

/// Decode manifest bytes into the descriptors they describe.
///
/// Never fails: an undecodable document yields an empty list, malformed
/// records are skipped.
#[must_use]
pub fn decode(data: &[u8]) -> Vec<Item> {
    let records: Vec<Value> = match serde_json::from_slice(data) {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Failed to decode manifest");
            return Vec::new();
        }
    };

    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(%record, error = %e, "Malformed descriptor in manifest, dropping");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    use super::*;

    fn item(path: &str, expire_secs: i64) -> Item {
        Item {
            path:        PathBuf::from(path),
            expire_time: Utc.timestamp_opt(expire_secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_roundtrip_preserves_order_and_fields() {
        let items = vec![
            item("/buffers/messages/first", 1_700_000_000),
            item("/buffers/messages/second", 1_700_000_300),
        ];

        let data = encode(&items).unwrap();
        assert_eq!(decode(&data), items);
    }

    #[test]
    fn test_empty_snapshot_roundtrip() {
        let data = encode(&[]).unwrap();
        assert!(decode(&data).is_empty());
    }

    #[test_case(b"not json at all" ; "garbage bytes")]
    #[test_case(b"{\"path\": \"/x\"}" ; "object instead of array")]
    #[test_case(b"" ; "empty file")]
    fn test_corrupt_manifest_decodes_to_empty(data: &[u8]) {
        assert!(decode(data).is_empty());
    }

    #[test]
    fn test_malformed_records_are_dropped() {
        let data = br#"[
            {"path": "/buffers/messages/keep", "expire_time": "2026-01-16T12:30:00Z"},
            {"path": "/buffers/messages/no-expiry"},
            {"expire_time": "2026-01-16T12:30:00Z"},
            42
        ]"#;

        let items = decode(data);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, PathBuf::from("/buffers/messages/keep"));
    }
}
