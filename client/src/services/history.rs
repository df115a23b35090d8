//! # Audit Trail Recorder
//!
//! Appends history entries to the remote log and invalidates dependent
//! views. Destructive flows go through [`HistoryRecorder::record_then`] so
//! the entry describing an entity is written before the entity is gone.

use shared::{HistoryEntry, NewHistoryEntry, STUDENT_HISTORY_KEY};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::services::notifications::{Notifier, RefreshBus};
use crate::services::traits::HistoryLog;

#[derive(Clone)]
pub struct HistoryRecorder {
    log: Arc<dyn HistoryLog>,
    refresh: RefreshBus,
    notifier: Notifier,
}

impl HistoryRecorder {
    pub fn new(log: Arc<dyn HistoryLog>, refresh: RefreshBus, notifier: Notifier) -> Self {
        Self { log, refresh, notifier }
    }

    /// Append one entry. Failures are logged and reported as `false`.
    pub async fn append(&self, entry: &NewHistoryEntry) -> bool {
        match self.log.append_entry(entry).await {
            Ok(stored) => {
                info!(
                    "Recorded {} history entry {} for '{}'",
                    stored.action_type, stored.id, stored.student_name
                );
                self.refresh.invalidate(STUDENT_HISTORY_KEY);
                true
            }
            Err(e) => {
                warn!(
                    "Failed to record {} history entry for '{}': {}",
                    entry.action_type, entry.student_name, e
                );
                false
            }
        }
    }

    /// Await the append, whatever its outcome, and only then run `effect`.
    pub async fn record_then<F, Fut, T>(&self, entry: &NewHistoryEntry, effect: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.append(entry).await {
            warn!("Proceeding with {} without a history entry", entry.action_type);
        }
        effect().await
    }

    pub async fn clear_all(&self) {
        match self.log.clear_entries().await {
            Ok(()) => {
                info!("Cleared history");
                self.notifier.success("History cleared", "All history entries were removed");
                self.refresh.invalidate(STUDENT_HISTORY_KEY);
            }
            Err(e) => {
                error!("Failed to clear history: {}", e);
                self.notifier.error("Error", "History could not be cleared");
            }
        }
    }

    /// Read-through listing, newest first. Empty when the log is unreachable.
    pub async fn list(&self) -> Vec<HistoryEntry> {
        match self.log.list_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load history: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn list_for_student(&self, student_id: i64) -> Vec<HistoryEntry> {
        self.list()
            .await
            .into_iter()
            .filter(|entry| entry.student_id == Some(student_id))
            .collect()
    }
}
