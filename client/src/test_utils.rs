//! In-memory stand-ins for the remote API used across unit tests.

use async_trait::async_trait;
use serde_json::Value;
use shared::{HistoryEntry, NewHistoryEntry, PhoneCheckResponse};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::error::ApiError;
use crate::services::traits::{HistoryLog, RemoteStore, StudentDirectory};

fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        body: "Service unavailable".to_string(),
    }
}

/// Ordered record of remote calls shared between fakes
#[derive(Clone, Default)]
pub struct Timeline(Arc<Mutex<Vec<String>>>);

impl Timeline {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeRemoteStore {
    values: Mutex<HashMap<String, Value>>,
    puts: Mutex<Vec<(String, Value)>>,
    failing: AtomicBool,
}

impl FakeRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.values.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn stored(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    /// Every attempted put, failed ones included
    pub fn puts(&self) -> Vec<(String, Value)> {
        self.puts.lock().unwrap().clone()
    }

    fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for FakeRemoteStore {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, ApiError> {
        if self.is_failing() {
            return Err(unavailable());
        }
        Ok(self.stored(key))
    }

    async fn put_value(&self, key: &str, value: &Value) -> Result<(), ApiError> {
        self.puts.lock().unwrap().push((key.to_string(), value.clone()));
        if self.is_failing() {
            return Err(unavailable());
        }
        self.insert(key, value.clone());
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<(), ApiError> {
        if self.is_failing() {
            return Err(unavailable());
        }
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    /// normalized phone -> (id, name)
    students: Mutex<HashMap<String, (i64, String)>>,
    /// phones reported as taken without naming the owner
    unnamed: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    checks: AtomicUsize,
    failing_checks: AtomicBool,
    failing_deletes: AtomicBool,
    timeline: Timeline,
}

impl FakeDirectory {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            ..Self::default()
        }
    }

    pub fn add_student(&self, id: i64, name: &str, phone: &str) {
        self.students
            .lock()
            .unwrap()
            .insert(phone.to_string(), (id, name.to_string()));
    }

    pub fn add_unnamed_match(&self, phone: &str) {
        self.unnamed.lock().unwrap().insert(phone.to_string());
    }

    /// Hold checks for `phone` until the returned handle is notified
    pub fn gate(&self, phone: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(phone.to_string(), gate.clone());
        gate
    }

    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn set_failing_checks(&self, failing: bool) {
        self.failing_checks.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_deletes(&self, failing: bool) {
        self.failing_deletes.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl StudentDirectory for FakeDirectory {
    async fn check_phone(&self, phone: &str) -> Result<PhoneCheckResponse, ApiError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(phone).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing_checks.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        if self.unnamed.lock().unwrap().contains(phone) {
            return Ok(PhoneCheckResponse {
                exists: true,
                student: None,
            });
        }
        let owner = self.students.lock().unwrap().get(phone).cloned();
        Ok(match owner {
            Some((id, name)) => PhoneCheckResponse::taken_by(id, name),
            None => PhoneCheckResponse::available(),
        })
    }

    async fn delete_student(&self, id: i64) -> Result<(), ApiError> {
        self.timeline.push(format!("delete student {}", id));
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.students.lock().unwrap().retain(|_, (owner, _)| *owner != id);
        Ok(())
    }

    async fn delete_supplement(&self, id: i64) -> Result<(), ApiError> {
        self.timeline.push(format!("delete supplement {}", id));
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeHistoryLog {
    entries: Mutex<Vec<HistoryEntry>>,
    next_id: AtomicI64,
    failing: AtomicBool,
    timeline: Timeline,
}

impl FakeHistoryLog {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryLog for FakeHistoryLog {
    async fn list_entries(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut entries = self.entries();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn append_entry(&self, entry: &NewHistoryEntry) -> Result<HistoryEntry, ApiError> {
        self.timeline.push(format!("append {}", entry.action_type));
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = entry.clone().into_entry(id);
        self.entries.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn clear_entries(&self) -> Result<(), ApiError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}
