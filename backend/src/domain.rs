use crate::db::DbConnection;
use anyhow::{Context, Result};
use serde_json::Value;
use shared::{fold_digits, HistoryEntry, NewHistoryEntry, PhoneCheckResponse, Student, STUDENTS_KEY};
use tracing::{info, warn};

/// JSON value slots addressed by key
#[derive(Clone)]
pub struct ValueStore {
    db: DbConnection,
}

impl ValueStore {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        info!("Getting value for key: {}", key);
        match self.db.get_value(key).await? {
            Some(text) => {
                let value = serde_json::from_str(&text)
                    .with_context(|| format!("Stored value for '{}' is not valid JSON", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn put_value(&self, key: &str, value: &Value) -> Result<()> {
        info!("Putting value for key: {}", key);
        self.db.put_value(key, &serde_json::to_string(value)?).await
    }

    pub async fn delete_value(&self, key: &str) -> Result<bool> {
        info!("Deleting value for key: {}", key);
        self.db.delete_value(key).await
    }
}

/// Entity lookups over the collections the client persists as whole snapshots
#[derive(Clone)]
pub struct StudentRegistry {
    values: ValueStore,
}

impl StudentRegistry {
    pub fn new(values: ValueStore) -> Self {
        Self { values }
    }

    /// Find the student that owns `phone`, comparing normalized digits
    pub async fn check_phone(&self, phone: &str) -> Result<PhoneCheckResponse> {
        let wanted = fold_digits(phone);
        let students = self.load_students().await?;

        let owner = students.into_iter().find(|s| fold_digits(&s.phone) == wanted);
        info!("Phone check for {}: {}", wanted, if owner.is_some() { "taken" } else { "free" });

        Ok(match owner {
            Some(student) => PhoneCheckResponse::taken_by(student.id, student.name),
            None => PhoneCheckResponse::available(),
        })
    }

    /// Remove the element with the given id from the collection stored under `key`.
    /// Returns false when no such element exists.
    pub async fn remove_from_collection(&self, key: &str, id: i64) -> Result<bool> {
        let Some(Value::Array(items)) = self.values.get_value(key).await? else {
            return Ok(false);
        };

        let before = items.len();
        let remaining: Vec<Value> = items
            .into_iter()
            .filter(|item| item.get("id").and_then(Value::as_i64) != Some(id))
            .collect();

        if remaining.len() == before {
            return Ok(false);
        }

        self.values.put_value(key, &Value::Array(remaining)).await?;
        info!("Removed id {} from '{}'", id, key);
        Ok(true)
    }

    async fn load_students(&self) -> Result<Vec<Student>> {
        let Some(value) = self.values.get_value(STUDENTS_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_value::<Vec<Student>>(value) {
            Ok(students) => Ok(students),
            Err(e) => {
                warn!("Stored students collection is malformed: {}", e);
                Err(e.into())
            }
        }
    }
}

/// The remote audit log
#[derive(Clone)]
pub struct HistoryService {
    db: DbConnection,
}

impl HistoryService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self.db.list_history().await?;
        info!("Returning {} history entries", entries.len());
        Ok(entries)
    }

    pub async fn append(&self, entry: &NewHistoryEntry) -> Result<HistoryEntry> {
        info!(
            "Recording '{}' history entry for {}",
            entry.action_type, entry.student_name
        );
        self.db.insert_history(entry).await
    }

    pub async fn clear(&self) -> Result<u64> {
        let removed = self.db.clear_history().await?;
        info!("Cleared {} history entries", removed);
        Ok(removed)
    }
}
