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

use std::{path::Path, time::Duration};

use bytes::Bytes;
use chrono::Utc;
use ferry_common_storage_buffer::{BufferConfig, DurableBuffer, Item, RegistryBuilder, manifest};
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

fn test_config(base: &Path) -> BufferConfig {
    BufferConfig {
        base_dir: base.to_path_buf(),
        flush_interval: Duration::from_millis(20),
        message_ttl: Duration::from_secs(300),
    }
}

async fn wait_until_clean(buffer: &DurableBuffer) {
    timeout(Duration::from_secs(5), async {
        while buffer.is_dirty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("buffer never flushed");
}

#[tokio::test]
async fn test_put_get_fifo_order() {
    ferry_common_telemetry::init_default_ut_logging();
    let temp_dir = TempDir::new().unwrap();
    let buffer = DurableBuffer::open(&test_config(temp_dir.path()), "peer-a");

    for i in 0..20 {
        buffer.put(format!("payload-{i:02}")).await.unwrap();
    }

    for i in 0..20 {
        let item = buffer.get().await;
        let bytes = std::fs::read(&item.path).unwrap();
        assert_eq!(bytes, format!("payload-{i:02}").into_bytes());
        std::fs::remove_file(&item.path).unwrap();
    }
    assert!(buffer.is_empty().await);
}

#[tokio::test]
async fn test_chunked_payload_written_contiguously() {
    let temp_dir = TempDir::new().unwrap();
    let buffer = DurableBuffer::open(&test_config(temp_dir.path()), "peer-a");

    let chunks = vec![
        Bytes::from_static(b"head-"),
        Bytes::from_static(b"body-"),
        Bytes::from_static(b"tail"),
    ];
    buffer.put(chunks).await.unwrap();

    let item = buffer.get().await;
    assert_eq!(std::fs::read(&item.path).unwrap(), b"head-body-tail");
}

#[tokio::test]
async fn test_crash_recovery_round_trip() {
    ferry_common_telemetry::init_default_ut_logging();
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    {
        let buffer = DurableBuffer::open(&config, "peer-a");
        for i in 0..5 {
            buffer.put(format!("msg-{i}")).await.unwrap();
        }
        wait_until_clean(&buffer).await;
    }

    let manifest_data = std::fs::read(config.base_dir.join("manifest-peer-a")).unwrap();
    let before = manifest::decode(&manifest_data);
    assert_eq!(before.len(), 5);

    // A fresh instance over the same directory plays the restart.
    let buffer = DurableBuffer::open(&config, "peer-a");
    timeout(Duration::from_secs(5), async {
        while buffer.len().await != 5 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("recovery never finished");

    for (i, expected) in before.iter().enumerate() {
        let item = buffer.get().await;
        assert_eq!(item.path, expected.path);
        assert_eq!(
            std::fs::read(&item.path).unwrap(),
            format!("msg-{i}").into_bytes()
        );
    }
    assert!(buffer.is_empty().await);
}

#[tokio::test]
async fn test_corrupt_manifest_is_non_fatal() {
    ferry_common_telemetry::init_default_ut_logging();
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    std::fs::write(config.base_dir.join("manifest-peer-a"), b"not json at all").unwrap();

    let buffer = DurableBuffer::open(&config, "peer-a");
    buffer.put("fresh payload").await.unwrap();

    assert_eq!(buffer.len().await, 1);
    let item = buffer.get().await;
    assert_eq!(std::fs::read(&item.path).unwrap(), b"fresh payload");
}

#[tokio::test]
async fn test_expired_item_skipped_on_get() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    let buffer = DurableBuffer::open(&config, "peer-a");

    let stale_path = config.base_dir.join("messages").join("stale-payload");
    std::fs::create_dir_all(config.base_dir.join("messages")).unwrap();
    std::fs::write(&stale_path, b"stale").unwrap();
    buffer
        .put_ident(Item {
            path:        stale_path.clone(),
            expire_time: Utc::now() - chrono::Duration::seconds(1),
        })
        .await;
    buffer.put("live payload").await.unwrap();

    let item = buffer.get().await;
    assert_eq!(std::fs::read(&item.path).unwrap(), b"live payload");
    // The expired payload was deleted on the way to the live one.
    assert!(!stale_path.exists());
}

#[tokio::test]
async fn test_expire_all_sweep() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    let buffer = DurableBuffer::open(&config, "peer-a");

    let message_dir = config.base_dir.join("messages");
    std::fs::create_dir_all(&message_dir).unwrap();

    let mut live_paths = Vec::new();
    let mut stale_paths = Vec::new();
    for i in 0..6 {
        let path = message_dir.join(format!("payload-{i}"));
        std::fs::write(&path, format!("payload-{i}")).unwrap();
        // Odd entries are already expired, interleaved with live ones.
        let expire_time = if i % 2 == 1 {
            stale_paths.push(path.clone());
            Utc::now() - chrono::Duration::seconds(1)
        } else {
            live_paths.push(path.clone());
            Utc::now() + chrono::Duration::minutes(5)
        };
        buffer.put_ident(Item { path, expire_time }).await;
    }

    buffer.expire_all().await;

    assert_eq!(buffer.len().await, live_paths.len());
    for path in &stale_paths {
        assert!(!path.exists(), "expired payload {path:?} still on disk");
    }
    // Live items come back out in their original relative order.
    for path in &live_paths {
        let item = buffer.get().await;
        assert_eq!(&item.path, path);
        assert!(path.exists());
    }
}

#[tokio::test]
async fn test_clean_after_flush_matches_queue() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    let buffer = DurableBuffer::open(&config, "peer-a");

    buffer.put("one").await.unwrap();
    buffer.put("two").await.unwrap();
    wait_until_clean(&buffer).await;

    let data = std::fs::read(buffer.manifest_path()).unwrap();
    let flushed = manifest::decode(&data);
    assert_eq!(flushed.len(), 2);

    // The flushed snapshot is exactly the queue contents, in order.
    let first = buffer.get().await;
    let second = buffer.get().await;
    assert_eq!(flushed, vec![first, second]);
}

#[tokio::test]
async fn test_manifest_write_failure_keeps_dirty() {
    ferry_common_telemetry::init_default_ut_logging();
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    // Occupy the manifest path with a directory so every flush fails.
    std::fs::create_dir_all(config.base_dir.join("manifest-peer-a")).unwrap();

    let buffer = DurableBuffer::open(&config, "peer-a");
    buffer.put("still served").await.unwrap();

    // Several flush cycles later the buffer is still dirty and still serves.
    sleep(Duration::from_millis(100)).await;
    timeout(Duration::from_secs(5), async {
        while !buffer.is_dirty() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("buffer did not stay dirty");

    let item = buffer.get().await;
    assert_eq!(std::fs::read(&item.path).unwrap(), b"still served");
}

#[tokio::test]
async fn test_get_waits_for_put() {
    let temp_dir = TempDir::new().unwrap();
    let buffer = DurableBuffer::open(&test_config(temp_dir.path()), "peer-a");

    let getter = {
        let buffer = buffer.clone();
        tokio::spawn(async move { buffer.get().await })
    };

    sleep(Duration::from_millis(50)).await;
    assert!(!getter.is_finished());

    buffer.put("late payload").await.unwrap();

    let item = timeout(Duration::from_secs(5), getter)
        .await
        .expect("getter never woke")
        .unwrap();
    assert_eq!(std::fs::read(&item.path).unwrap(), b"late payload");
}

#[tokio::test]
async fn test_registry_shares_buffers_by_key() {
    let temp_dir = TempDir::new().unwrap();
    let registry = RegistryBuilder::new(temp_dir.path())
        .flush_interval(Duration::from_millis(20))
        .build();

    let a = registry.get_or_create("alpha");
    let b = registry.get_or_create("alpha");
    let other = registry.get_or_create("beta");

    a.put("hello alpha").await.unwrap();
    assert_eq!(b.len().await, 1);
    assert!(other.is_empty().await);
    assert_ne!(a.manifest_path(), other.manifest_path());

    let item = b.get().await;
    assert_eq!(std::fs::read(&item.path).unwrap(), b"hello alpha");
}
