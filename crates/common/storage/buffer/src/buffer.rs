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

//! The durable buffer: one peer key's crash-recoverable FIFO of payload
//! files.
//!
//! ## Life of a message
//!
//! ```text
//! ┌──────────┐  put   ┌───────────────┐ descriptor ┌─────────────┐
//! │ producer │ ─────► │ payload file  │ ─────────► │  in-memory  │──► get
//! │          │        │ messages/<id> │   + dirty  │    queue    │
//! └──────────┘        └───────────────┘            └──────┬──────┘
//!                                                         │ snapshot
//!                                                  ┌──────▼──────┐
//!                                                  │  manifest-  │
//!                                                  │    <key>    │
//!                                                  └─────────────┘
//! ```
//!
//! A put is visible to `get` immediately but durable only once the manifest
//! writer has flushed the queue snapshot; the flush loop coalesces bursts of
//! puts into one manifest rewrite per interval. On restart the manifest is
//! read back and every recorded descriptor re-enters the queue in order.
//!
//! Two loss windows are accepted: a payload written right before a crash
//! whose descriptor never reached the manifest is orphaned on disk (no
//! sweeper reclaims it), and descriptors enqueued after the last completed
//! flush are forgotten by the restart.

use std::{
    collections::VecDeque,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use ferry_common_runtime::{spawn_background, spawn_blocking_file_io};
use snafu::ResultExt;
use tokio::sync::{Mutex, Notify, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::BufferConfig,
    error::{DeferSnafu, Result, WriteManifestSnafu, WritePayloadSnafu},
    item::{Item, Payload},
    manifest,
};

/// Name of the payload directory shared by all keys under one base
/// directory.
const MESSAGE_DIR: &str = "messages";

/// A durable, crash-recoverable FIFO buffer for one peer key.
///
/// Cheap to clone; every clone shares the same queue and background tasks.
/// Created via [`DurableBuffer::open`] or a
/// [`BufferRegistry`](crate::BufferRegistry), after which it lives for the
/// process lifetime — its flush loop is never cancelled.
#[derive(Clone)]
pub struct DurableBuffer {
    pub(crate) shared: Arc<Shared>,
}

pub(crate) struct Shared {
    /// Directory holding one file per buffered payload.
    message_dir:    PathBuf,
    /// Snapshot file for this key's queue.
    manifest_path:  PathBuf,
    /// Sleep between flush attempts.
    flush_interval: Duration,
    /// Lifetime granted to each accepted payload.
    message_ttl:    chrono::Duration,
    /// FIFO of descriptors not yet handed to a consumer.
    queue:          Mutex<VecDeque<Item>>,
    /// Wakes consumers blocked on an empty queue.
    items:          Notify,
    /// True while the queue has diverged from the on-disk manifest.
    dirty_flag:     AtomicBool,
    /// Wakes the manifest writer when the buffer turns dirty.
    dirty_signal:   Notify,
    /// Serializes manifest flushes against full-queue sweeps.
    manifest_lock:  Mutex<()>,
    /// Flips to true once startup recovery has finished.
    ready:          watch::Sender<bool>,
}

impl DurableBuffer {
    /// Create the buffer for `key` rooted under `config.base_dir` and launch
    /// its startup task on the background runtime.
    ///
    /// Returns immediately: directory creation, manifest recovery and the
    /// flush loop all run asynchronously. `put` and `get` suspend until that
    /// startup has signalled readiness.
    #[must_use]
    pub fn open(config: &BufferConfig, key: &str) -> Self {
        let message_ttl =
            chrono::Duration::from_std(config.message_ttl).unwrap_or(chrono::Duration::MAX);
        let (ready, _) = watch::channel(false);

        let buffer = Self {
            shared: Arc::new(Shared {
                message_dir: config.base_dir.join(MESSAGE_DIR),
                manifest_path: config.base_dir.join(format!("manifest-{key}")),
                flush_interval: config.flush_interval,
                message_ttl,
                queue: Mutex::new(VecDeque::new()),
                items: Notify::new(),
                dirty_flag: AtomicBool::new(false),
                dirty_signal: Notify::new(),
                manifest_lock: Mutex::new(()),
                ready,
            }),
        };

        spawn_background(buffer.clone().start());
        buffer
    }

    /// Persist `payload` to its own file and enqueue a descriptor for it.
    ///
    /// Suspends until the buffer is ready. The payload is written under a
    /// unique name in one deferred blocking unit; splitting the write into
    /// separately scheduled operations would churn file descriptors under
    /// concurrent puts. On success the descriptor is visible to `get`
    /// immediately but reaches the manifest only with the next flush.
    ///
    /// # Errors
    /// Returns an error if the payload file cannot be written; the item is
    /// not enqueued in that case.
    pub async fn put(&self, payload: impl Into<Payload>) -> Result<()> {
        self.ready().await;

        let path = self.shared.message_dir.join(Uuid::new_v4().to_string());
        let payload = payload.into();
        let write_path = path.clone();
        spawn_blocking_file_io(move || write_payload(&write_path, &payload))
            .await
            .context(DeferSnafu)?
            .context(WritePayloadSnafu { path: path.clone() })?;

        let expire_time = Utc::now()
            .checked_add_signed(self.shared.message_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.put_ident(Item { path, expire_time }).await;
        Ok(())
    }

    /// Enqueue a previously built descriptor without writing any payload.
    ///
    /// Used to re-inject descriptors whose payload files already exist, e.g.
    /// survivors of a partial sweep.
    pub async fn put_ident(&self, item: Item) {
        self.shared.queue.lock().await.push_back(item);
        self.shared.items.notify_waiters();
        self.dirty();
    }

    /// Pop the oldest live descriptor, suspending while the queue is empty.
    ///
    /// Expired descriptors are discarded on the way: their payload files are
    /// deleted through the I/O executor and the next entry is considered.
    /// The caller owns the returned descriptor's payload file, including
    /// deleting it once consumed.
    pub async fn get(&self) -> Item {
        self.ready().await;
        loop {
            let item = self.pop_front().await;
            self.dirty();
            if item.is_expired(Utc::now()) {
                self.expire(item).await;
                continue;
            }
            return item;
        }
    }

    /// Sweep the whole queue: delete expired items' payloads and keep live
    /// items in their original relative order.
    ///
    /// Holds the manifest lock so a concurrent flush cannot serialize the
    /// queue mid-swap.
    pub async fn expire_all(&self) {
        let _guard = self.shared.manifest_lock.lock().await;

        let drained = std::mem::take(&mut *self.shared.queue.lock().await);
        let now = Utc::now();
        let (expired, live): (Vec<_>, Vec<_>) =
            drained.into_iter().partition(|item| item.is_expired(now));

        for item in expired {
            self.expire(item).await;
        }

        if !live.is_empty() {
            let mut queue = self.shared.queue.lock().await;
            for item in live {
                queue.push_back(item);
            }
            drop(queue);
            self.shared.items.notify_waiters();
        }
        self.dirty();
    }

    /// Whether queue state has diverged from the last flushed manifest.
    #[must_use]
    pub fn is_dirty(&self) -> bool { self.shared.dirty_flag.load(Ordering::Acquire) }

    /// Number of descriptors currently queued.
    pub async fn len(&self) -> usize { self.shared.queue.lock().await.len() }

    /// Whether no descriptors are queued.
    pub async fn is_empty(&self) -> bool { self.len().await == 0 }

    /// Path of this buffer's manifest file.
    #[must_use]
    pub fn manifest_path(&self) -> &Path { &self.shared.manifest_path }

    /// Directory where payload files are written.
    #[must_use]
    pub fn message_dir(&self) -> &Path { &self.shared.message_dir }

    /// Suspend until startup recovery has completed.
    async fn ready(&self) {
        let mut rx = self.shared.ready.subscribe();
        // The sender lives in Shared, so it cannot drop while `self` exists.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Mark the queue as diverged from the on-disk manifest and wake the
    /// flush loop.
    fn dirty(&self) {
        self.shared.dirty_flag.store(true, Ordering::Release);
        self.shared.dirty_signal.notify_one();
    }

    fn clean(&self) { self.shared.dirty_flag.store(false, Ordering::Release); }

    async fn pop_front(&self) -> Item {
        loop {
            let notified = self.shared.items.notified();
            tokio::pin!(notified);
            // Register for wakeups before checking the queue, so a push
            // between the check and the await cannot be missed.
            let _ = notified.as_mut().enable();
            if let Some(item) = self.shared.queue.lock().await.pop_front() {
                return item;
            }
            notified.await;
        }
    }

    /// Delete an expired item's payload file through the I/O executor.
    async fn expire(&self, item: Item) {
        info!(path = ?item.path, "Expiring message");
        let path = item.path;
        if let Err(e) = spawn_blocking_file_io(move || remove_payload(&path)).await {
            error!(error = %e, "Deferred payload deletion task failed");
        }
    }

    /// Startup sequence: ensure the payload directory exists, recover the
    /// manifest, open the readiness gate, launch the manifest writer.
    async fn start(self) {
        let message_dir = self.shared.message_dir.clone();
        match spawn_blocking_file_io(move || std::fs::create_dir_all(&message_dir)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // Startup stays lenient; the put that first needs the
                // directory will surface the real failure to its caller.
                warn!(
                    dir = ?self.shared.message_dir,
                    error = %e,
                    "Failed to create message directory"
                );
            }
            Err(e) => error!(error = %e, "Deferred directory creation task failed"),
        }

        let recovered = self.read_manifest().await;
        if !recovered.is_empty() {
            info!(
                path = ?self.shared.manifest_path,
                items = recovered.len(),
                "Recovered manifest"
            );
            self.shared.queue.lock().await.extend(recovered);
            self.shared.items.notify_waiters();
        }

        self.shared.ready.send_replace(true);

        let flush_interval = self.shared.flush_interval;
        spawn_background(self.manifest_writer(flush_interval));
    }

    /// Load the manifest snapshot, treating every failure as an empty list.
    ///
    /// A missing file is a first run. An unreadable or undecodable file is
    /// logged and ignored so the buffer still starts; whatever that manifest
    /// described is lost.
    async fn read_manifest(&self) -> Vec<Item> {
        let path = self.shared.manifest_path.clone();
        match spawn_blocking_file_io(move || std::fs::read(&path)).await {
            Ok(Ok(data)) => manifest::decode(&data),
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Ok(Err(e)) => {
                error!(path = ?self.shared.manifest_path, error = %e, "Failed to read manifest");
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, "Deferred manifest read task failed");
                Vec::new()
            }
        }
    }

    /// Background flush loop: wait for the dirty signal, snapshot the queue,
    /// rewrite the manifest, then sleep `flush_interval` so bursts of puts
    /// coalesce into one flush.
    ///
    /// Runs for the process lifetime. A failed write leaves the buffer dirty
    /// and is retried next cycle; rewriting the same snapshot is harmless.
    async fn manifest_writer(self, flush_interval: Duration) {
        loop {
            while !self.is_dirty() {
                self.shared.dirty_signal.notified().await;
            }

            {
                let _guard = self.shared.manifest_lock.lock().await;
                let snapshot: Vec<Item> = self.shared.queue.lock().await.iter().cloned().collect();
                // Clear the flag at snapshot time: a mutation racing the
                // write below re-marks it and is captured next cycle.
                self.clean();
                if let Err(e) = self.write_manifest(snapshot).await {
                    error!(
                        path = ?self.shared.manifest_path,
                        error = %e,
                        "Failed to write manifest"
                    );
                    self.dirty();
                }
            }

            tokio::time::sleep(flush_interval).await;
        }
    }

    async fn write_manifest(&self, items: Vec<Item>) -> Result<()> {
        let data = manifest::encode(&items)?;
        let path = self.shared.manifest_path.clone();
        spawn_blocking_file_io(move || std::fs::write(&path, data))
            .await
            .context(DeferSnafu)?
            .context(WriteManifestSnafu {
                path: self.shared.manifest_path.clone(),
            })?;
        Ok(())
    }
}

/// Write a payload to `path` as one blocking unit: open, write, close.
fn write_payload(path: &Path, payload: &Payload) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    match payload {
        Payload::Bytes(data) => file.write_all(data)?,
        Payload::Chunks(chunks) => {
            for chunk in chunks {
                file.write_all(chunk)?;
            }
        }
    }
    Ok(())
}

/// Delete an expired payload file.
fn remove_payload(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = ?path, "Cannot remove payload, already gone");
        }
        Err(e) => warn!(path = ?path, error = %e, "Failed to remove payload"),
    }
}
