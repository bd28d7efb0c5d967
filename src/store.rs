//! An in-memory list with an observable snapshot and a persisted mirror.
//!
//! Both the note store and the tag store are thin wrappers over
//! [`PersistedList`]. The list starts empty, loads its blob in the background,
//! and schedules a full JSON snapshot on the [`PersistQueue`] after every
//! mutation. Edits made before the load finishes are kept in memory and
//! written once the loaded records have been merged in, so an early write
//! never races the initial read.
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, error, info, warn};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

use crate::{KeyValueStore, PersistQueue, PersistQueueStats, Result};

/// A record that can live in a [`PersistedList`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn record_id(&self) -> Uuid;
}

/// Ordering applied after inserts, edits and loads.
pub type Normalize<T> = fn(&mut Vec<T>);

/// Edits made before the background load finished.
#[derive(Debug, Default)]
struct PreLoadEdits {
    touched: bool,
    cleared: bool,
    removed: HashSet<Uuid>,
}

struct Shared<T: Record> {
    records: watch::Sender<Vec<T>>,
    /// `Some` until the load has been applied
    pre_load: Mutex<Option<PreLoadEdits>>,
    loaded: watch::Sender<bool>,
    queue: PersistQueue,
    normalize: Normalize<T>,
}

impl<T: Record> Shared<T> {
    fn pre_load(&self) -> MutexGuard<'_, Option<PreLoadEdits>> {
        self.pre_load.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self) {
        let records = self.records.borrow();
        self.queue.schedule_json(&*records);
    }

    /// Runs `f` against a copy of the list and publishes the result.
    ///
    /// The pre-load guard is held throughout, which serializes mutations and
    /// lets a concurrent load see either all of an edit or none of it.
    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>, Option<&mut PreLoadEdits>) -> R) -> R {
        let mut pre_load = self.pre_load();
        let mut records = self.records.borrow().clone();
        let edits = pre_load.as_mut().map(|edits| {
            edits.touched = true;
            edits
        });
        let loading = edits.is_some();

        let result = f(&mut records, edits);
        self.records.send_replace(records);
        drop(pre_load);

        if loading {
            debug!("'{}' is still loading, deferring write", self.queue.key());
        } else {
            self.persist();
        }
        result
    }

    fn apply_loaded(&self, loaded: Vec<T>) {
        let mut pre_load = self.pre_load();
        let edits = pre_load.take().unwrap_or_default();
        let loaded_count = loaded.len();

        if !edits.touched {
            let normalize = self.normalize;
            self.records.send_modify(|records| {
                *records = loaded;
                normalize(records);
            });
            info!("Loaded {} records from '{}'", loaded_count, self.queue.key());
            return;
        }

        if edits.cleared {
            drop(pre_load);
            info!(
                "Discarding {} loaded records from '{}': list was cleared before load",
                loaded_count,
                self.queue.key()
            );
            self.persist();
            return;
        }

        let normalize = self.normalize;
        let mut merged = 0;
        self.records.send_modify(|records| {
            let present: HashSet<Uuid> = records.iter().map(Record::record_id).collect();
            for record in loaded {
                let id = record.record_id();
                if !present.contains(&id) && !edits.removed.contains(&id) {
                    records.push(record);
                    merged += 1;
                }
            }
            normalize(records);
        });
        drop(pre_load);

        info!(
            "Merged {} of {} loaded records into '{}' after early edits",
            merged,
            loaded_count,
            self.queue.key()
        );
        self.persist();
    }

    fn mark_loaded(&self) {
        let leftover = self.pre_load().take();
        if leftover.is_some_and(|edits| edits.touched) {
            self.persist();
        }
        self.loaded.send_replace(true);
    }
}

pub struct PersistedList<T: Record> {
    shared: Arc<Shared<T>>,
    loader: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Record> PersistedList<T> {
    /// Opens the list under `key` and starts loading it in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(kv: Arc<dyn KeyValueStore>, key: &str, normalize: Normalize<T>) -> Result<Self> {
        let queue = PersistQueue::new(Arc::clone(&kv), key)?;
        let (records, _) = watch::channel(Vec::new());
        let (loaded, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            records,
            pre_load: Mutex::new(Some(PreLoadEdits::default())),
            loaded,
            queue,
            normalize,
        });

        let loader = tokio::spawn(load_in_background(kv, key.to_string(), Arc::clone(&shared)));

        Ok(Self {
            shared,
            loader: Mutex::new(Some(loader)),
        })
    }

    /// Waits for the background load to finish.
    pub async fn wait_loaded(&self) {
        let loader = self
            .loader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = loader {
            if let Err(e) = task.await {
                error!("Load task for '{}' failed: {}", self.shared.queue.key(), e);
                self.shared.mark_loaded();
            }
        }

        // Another caller may have taken the handle first
        let mut loaded = self.shared.loaded.subscribe();
        let _ = loaded.wait_for(|loaded| *loaded).await;
    }

    pub fn is_loaded(&self) -> bool {
        *self.shared.loaded.borrow()
    }

    /// Current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.shared.records.borrow().clone()
    }

    /// Runs `f` over the current contents without cloning them.
    pub fn with_records<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.shared.records.borrow())
    }

    /// Receiver that observes every change to the list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.shared.records.subscribe()
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.with_records(|records| records.iter().find(|r| r.record_id() == id).cloned())
    }

    pub fn len(&self) -> usize {
        self.with_records(<[T]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `record`, then applies the list ordering.
    pub fn insert(&self, record: T) {
        let normalize = self.shared.normalize;
        self.shared.mutate(|records, _| {
            records.push(record);
            normalize(records);
        });
    }

    /// Removes the record with `id`. Missing ids change nothing but still persist.
    pub fn remove(&self, id: Uuid) -> Option<T> {
        self.shared.mutate(|records, edits| {
            if let Some(edits) = edits {
                edits.removed.insert(id);
            }
            let index = records.iter().position(|r| r.record_id() == id)?;
            Some(records.remove(index))
        })
    }

    /// Removes the records at `indices`; out-of-range positions are ignored.
    pub fn remove_at(&self, indices: &[usize]) -> Vec<T> {
        let positions: HashSet<usize> = indices.iter().copied().collect();
        self.shared.mutate(|records, edits| {
            let mut removed = Vec::new();
            let mut index = 0;
            records.retain(|record| {
                let keep = !positions.contains(&index);
                if !keep {
                    removed.push(record.clone());
                }
                index += 1;
                keep
            });

            if let Some(edits) = edits {
                edits.removed.extend(removed.iter().map(Record::record_id));
            }
            removed
        })
    }

    /// Applies `edit` to the record with `id`, then re-applies the ordering.
    ///
    /// Returns `false`, without persisting, when no record has that id.
    pub fn modify(&self, id: Uuid, edit: impl FnOnce(&mut T)) -> bool {
        if self.get(id).is_none() {
            debug!("No record {} in '{}', nothing to modify", id, self.shared.queue.key());
            return false;
        }

        let normalize = self.shared.normalize;
        self.shared.mutate(|records, _| {
            match records.iter_mut().find(|r| r.record_id() == id) {
                Some(record) => {
                    edit(record);
                    normalize(records);
                    true
                }
                None => false,
            }
        })
    }

    pub fn clear(&self) {
        self.shared.mutate(|records, edits| {
            if let Some(edits) = edits {
                edits.cleared = true;
            }
            records.clear();
        });
    }

    /// Waits for all scheduled writes.
    pub async fn flush(&self) {
        self.shared.queue.flush().await;
    }

    /// Finishes loading, flushes and stops the writer.
    pub async fn shutdown(&self) {
        self.wait_loaded().await;
        self.shared.queue.shutdown().await;
    }

    pub fn persist_stats(&self) -> PersistQueueStats {
        self.shared.queue.stats()
    }
}

async fn load_in_background<T: Record>(kv: Arc<dyn KeyValueStore>, key: String, shared: Arc<Shared<T>>) {
    debug!("Loading '{}' in the background", key);
    let read_key = key.clone();
    let read = tokio::task::spawn_blocking(move || kv.get(&read_key)).await;

    let loaded = match read {
        Ok(Ok(Some(bytes))) => match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Failed to decode '{}', starting empty: {}", key, e);
                Vec::new()
            }
        },
        Ok(Ok(None)) => {
            debug!("No persisted data under '{}'", key);
            Vec::new()
        }
        Ok(Err(e)) => {
            warn!("Failed to read '{}', starting empty: {}", key, e);
            Vec::new()
        }
        Err(e) => {
            error!("Read task for '{}' failed: {}", key, e);
            Vec::new()
        }
    };

    shared.apply_loaded(loaded);
    shared.mark_loaded();
}
