//! Background write queue for persisted snapshots.
//!
//! Callers hand over a fully serialized snapshot and return immediately. A
//! single writer task drains a one-slot buffer: scheduling while a write is in
//! flight replaces the pending snapshot, so rapid mutations coalesce and the
//! newest snapshot is always the last one written.
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

use log::{debug, error, info, trace, warn};
use serde::Serialize;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};

use crate::{KeyValueStore, NotesError, Result};

/// Counters describing what the queue has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistQueueStats {
    /// Snapshots handed to [`PersistQueue::schedule`]
    pub scheduled: u64,
    /// Snapshots written successfully
    pub written: u64,
    /// Snapshots whose write failed
    pub failed: u64,
}

impl PersistQueueStats {
    /// Snapshots replaced in the slot before the writer reached them.
    pub fn coalesced(&self) -> u64 {
        self.scheduled.saturating_sub(self.written + self.failed)
    }
}

#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone)]
struct Snapshot {
    generation: u64,
    bytes: Arc<Vec<u8>>,
}

pub struct PersistQueue {
    /// Key every snapshot is written under
    key: String,

    /// Single pending slot; `None` once the queue is shut down
    pending_tx: Mutex<Option<watch::Sender<Option<Snapshot>>>>,

    /// Generation of the last snapshot the writer finished with
    handled_rx: watch::Receiver<u64>,

    counters: Arc<Counters>,

    /// Handle to the writer task
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl PersistQueue {
    /// Starts the writer task on the current tokio runtime.
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let handle = Handle::try_current().map_err(|e| NotesError::Runtime {
            message: format!("persist queue for '{}' needs a tokio runtime: {}", key, e),
        })?;

        let (pending_tx, pending_rx) = watch::channel(None);
        let (handled_tx, handled_rx) = watch::channel(0);
        let counters = Arc::new(Counters::default());

        let writer = handle.spawn(run_writer(
            kv,
            key.clone(),
            pending_rx,
            handled_tx,
            Arc::clone(&counters),
        ));

        debug!("Persist queue started for key '{}'", key);

        Ok(Self {
            key,
            pending_tx: Mutex::new(Some(pending_tx)),
            handled_rx,
            counters,
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replaces the pending snapshot with `bytes` and wakes the writer.
    pub fn schedule(&self, bytes: Vec<u8>) {
        let guard = self.pending_tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(pending_tx) = guard.as_ref() else {
            warn!("Persist queue for '{}' is shut down, dropping write", self.key);
            return;
        };

        // Generations are issued under the lock so the slot only moves forward
        let generation = self.counters.scheduled.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(
            "Scheduling snapshot {} ({} bytes) for '{}'",
            generation,
            bytes.len(),
            self.key
        );
        pending_tx.send_replace(Some(Snapshot {
            generation,
            bytes: Arc::new(bytes),
        }));
    }

    /// Serializes `value` as JSON and schedules it. Encode failures skip the write.
    pub fn schedule_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.schedule(bytes),
            Err(e) => error!("Failed to serialize snapshot for '{}': {}", self.key, e),
        }
    }

    /// Waits until every snapshot scheduled so far has been written or dropped.
    pub async fn flush(&self) {
        let target = self.counters.scheduled.load(Ordering::SeqCst);
        let mut handled = self.handled_rx.clone();
        if handled.wait_for(|generation| *generation >= target).await.is_err() {
            warn!("Writer for '{}' stopped before reaching snapshot {}", self.key, target);
        }
    }

    /// Flushes, then stops the writer task. Later writes are dropped.
    pub async fn shutdown(&self) {
        self.flush().await;

        let pending_tx = self
            .pending_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(pending_tx);

        let writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = writer {
            if let Err(e) = task.await {
                error!("Writer task for '{}' failed: {}", self.key, e);
            }
            info!("Persist queue for '{}' stopped", self.key);
        }
    }

    pub fn stats(&self) -> PersistQueueStats {
        PersistQueueStats {
            scheduled: self.counters.scheduled.load(Ordering::SeqCst),
            written: self.counters.written.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }
}

async fn run_writer(
    kv: Arc<dyn KeyValueStore>,
    key: String,
    mut pending_rx: watch::Receiver<Option<Snapshot>>,
    handled_tx: watch::Sender<u64>,
    counters: Arc<Counters>,
) {
    while pending_rx.changed().await.is_ok() {
        let snapshot = pending_rx.borrow_and_update().clone();
        let Some(snapshot) = snapshot else {
            continue;
        };

        let kv = Arc::clone(&kv);
        let write_key = key.clone();
        let bytes = Arc::clone(&snapshot.bytes);
        let outcome = tokio::task::spawn_blocking(move || kv.set(&write_key, &bytes)).await;

        match outcome {
            Ok(Ok(())) => {
                counters.written.fetch_add(1, Ordering::SeqCst);
                debug!("Persisted snapshot {} for '{}'", snapshot.generation, key);
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!("Failed to persist snapshot {} for '{}': {}", snapshot.generation, key, e);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!("Write task for '{}' panicked: {}", key, e);
            }
        }

        handled_tx.send_replace(snapshot.generation);
    }

    debug!("Writer for '{}' exiting", key);
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::MemoryKeyValueStore;

    /// Blocks every write until the test releases it.
    struct GatedKv {
        inner: MemoryKeyValueStore,
        writes: Mutex<Vec<Vec<u8>>>,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl KeyValueStore for GatedKv {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<()> {
            self.writes.lock().unwrap().push(value.to_vec());
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    struct FailingKv;

    impl KeyValueStore for FailingKv {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Err(NotesError::Io(std::io::Error::other("disk full")))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn requires_a_runtime() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        assert!(matches!(
            PersistQueue::new(kv, "saved_notes"),
            Err(NotesError::Runtime { .. })
        ));
    }

    #[tokio::test]
    async fn last_scheduled_snapshot_wins() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let queue = PersistQueue::new(kv.clone(), "saved_notes").unwrap();

        for i in 0..50 {
            queue.schedule(format!("[{}]", i).into_bytes());
        }
        queue.flush().await;

        assert_eq!(kv.get("saved_notes").unwrap(), Some(b"[49]".to_vec()));
        let stats = queue.stats();
        assert_eq!(stats.scheduled, 50);
        assert_eq!(stats.failed, 0);
        assert!(stats.written >= 1);
        assert_eq!(stats.written + stats.coalesced(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn writes_in_flight_coalesce_pending_snapshots() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let kv = Arc::new(GatedKv {
            inner: MemoryKeyValueStore::new(),
            writes: Mutex::new(Vec::new()),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let queue = PersistQueue::new(kv.clone(), "saved_notes").unwrap();

        queue.schedule(b"a".to_vec());
        let entered_rx = tokio::task::spawn_blocking(move || {
            entered_rx.recv().unwrap();
            entered_rx
        })
        .await
        .unwrap();

        // "a" is being written; these three share the single slot
        queue.schedule(b"b".to_vec());
        queue.schedule(b"c".to_vec());
        queue.schedule(b"d".to_vec());

        release_tx.send(()).unwrap();
        tokio::task::spawn_blocking(move || entered_rx.recv().unwrap())
            .await
            .unwrap();
        release_tx.send(()).unwrap();
        queue.flush().await;

        let writes = kv.writes.lock().unwrap().clone();
        assert_eq!(writes, vec![b"a".to_vec(), b"d".to_vec()]);
        assert_eq!(kv.get("saved_notes").unwrap(), Some(b"d".to_vec()));
        assert_eq!(queue.stats().coalesced(), 2);
    }

    #[tokio::test]
    async fn failed_writes_are_counted_not_raised() {
        let queue = PersistQueue::new(Arc::new(FailingKv), "saved_notes").unwrap();
        queue.schedule(b"[]".to_vec());
        queue.flush().await;

        let stats = queue.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.written, 0);
    }

    #[tokio::test]
    async fn shutdown_flushes_and_drops_later_writes() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let queue = PersistQueue::new(kv.clone(), "saved_custom_tags").unwrap();

        queue.schedule_json(&vec!["work"]);
        queue.shutdown().await;
        assert_eq!(
            kv.get("saved_custom_tags").unwrap(),
            Some(br#"["work"]"#.to_vec())
        );

        queue.schedule(b"[]".to_vec());
        queue.flush().await;
        assert_eq!(
            kv.get("saved_custom_tags").unwrap(),
            Some(br#"["work"]"#.to_vec())
        );
    }

    #[tokio::test]
    async fn flush_without_writes_returns_immediately() {
        let queue = PersistQueue::new(Arc::new(MemoryKeyValueStore::new()), "k").unwrap();
        queue.flush().await;
        assert_eq!(queue.stats(), PersistQueueStats::default());
    }
}
