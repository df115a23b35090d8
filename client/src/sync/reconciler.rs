//! # Collection Persistence Reconciler
//!
//! Pushes whole-collection snapshots to the [`StorageGateway`] whenever a
//! watched collection changes. Each storage key has exactly one writer task
//! consuming snapshots in the order they were observed, so an older snapshot
//! can never land after a newer one.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::services::notifications::Notifier;
use crate::services::storage::StorageGateway;

enum Command {
    Snapshot(Value),
    Flush(oneshot::Sender<()>),
}

pub struct Reconciler {
    gateway: Arc<StorageGateway>,
    notifier: Notifier,
    writers: Mutex<HashMap<String, mpsc::UnboundedSender<Command>>>,
}

impl Reconciler {
    pub fn new(gateway: Arc<StorageGateway>, notifier: Notifier) -> Self {
        Self {
            gateway,
            notifier,
            writers: Mutex::new(HashMap::new()),
        }
    }

    /// Start watching the collection stored under `key`.
    ///
    /// Must be called from within a tokio runtime; the key's writer task is
    /// spawned on first use and shared by every watch of the same key.
    pub fn watch<T: Serialize>(&self, key: &str) -> CollectionWatch<T> {
        CollectionWatch {
            key: key.to_string(),
            tx: self.writer(key),
            initialized: false,
            seen_non_empty: false,
            _items: PhantomData,
        }
    }

    fn writer(&self, key: &str) -> mpsc::UnboundedSender<Command> {
        let mut writers = self.writers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(tx) = writers.get(key).filter(|tx| !tx.is_closed()) {
            return tx.clone();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(
            key.to_string(),
            self.gateway.clone(),
            self.notifier.clone(),
            rx,
        ));
        writers.insert(key.to_string(), tx.clone());
        debug!("Started writer for '{}'", key);
        tx
    }
}

async fn run_writer(
    key: String,
    gateway: Arc<StorageGateway>,
    notifier: Notifier,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Snapshot(snapshot) => {
                if let Err(e) = gateway.write(&key, &snapshot).await {
                    warn!("Snapshot of '{}' was not saved: {}", key, e);
                    notifier.error("Save error", format!("Changes to {} could not be saved", key));
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Writer for '{}' stopped", key);
}

/// Handle through which the owner of a collection reports changes
pub struct CollectionWatch<T> {
    key: String,
    tx: mpsc::UnboundedSender<Command>,
    initialized: bool,
    seen_non_empty: bool,
    _items: PhantomData<fn(&T)>,
}

impl<T: Serialize> CollectionWatch<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Call once the collection has been loaded; nothing is written before that.
    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Report the collection's current contents after a change.
    /// Returns whether a snapshot was queued for writing.
    pub fn observe(&mut self, items: &[T]) -> bool {
        if !self.initialized {
            return false;
        }
        // An empty collection right after loading is the load still racing, not a user action
        if items.is_empty() && !self.seen_non_empty {
            debug!("Skipping empty snapshot of '{}'", self.key);
            return false;
        }

        let snapshot = match serde_json::to_value(items) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Cannot serialize snapshot of '{}': {}", self.key, e);
                return false;
            }
        };

        if self.tx.send(Command::Snapshot(snapshot)).is_err() {
            warn!("Writer for '{}' is gone, snapshot dropped", self.key);
            return false;
        }
        self.seen_non_empty |= !items.is_empty();
        info!("Queued {} items for '{}'", items.len(), self.key);
        true
    }

    /// Wait until every snapshot queued so far has been handled
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_ok() {
            let _ = finished.await;
        }
    }
}
