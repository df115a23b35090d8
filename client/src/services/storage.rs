//! # Storage Gateway
//!
//! Uniform write/read/remove over the remote key/value store. When the
//! remote is unreachable the last value written for a key is kept in a
//! process-local fallback map so reads in the same session still see it.
//! The fallback is consulted only after a remote operation failed and is
//! never persisted.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::services::traits::RemoteStore;

pub struct StorageGateway {
    remote: Arc<dyn RemoteStore>,
    fallback: Mutex<HashMap<String, Value>>,
}

impl StorageGateway {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            fallback: Mutex::new(HashMap::new()),
        }
    }

    /// Write `value` under `key`. On failure the value lands in the fallback
    /// map and the error is returned for the caller to report.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Cannot serialize value for '{}': {}", key, e);
                return Err(StorageError::Serialization(e));
            }
        };

        match self.remote.put_value(key, &value).await {
            Ok(()) => {
                info!("Saved '{}' to remote store", key);
                // A stale offline copy must not shadow the stored value later
                self.fallback().remove(key);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to save '{}' to remote store, keeping it in memory: {}", key, e);
                self.fallback().insert(key.to_string(), value);
                Err(e.into())
            }
        }
    }

    /// Read the value under `key`, or `default` when nothing is stored.
    pub async fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.remote.get_value(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(decoded) => {
                    debug!("Loaded '{}' from remote store", key);
                    return decoded;
                }
                Err(e) => warn!("Stored value for '{}' has an unexpected shape: {}", key, e),
            },
            Ok(None) => {
                debug!("No value stored for '{}'", key);
                return default;
            }
            Err(e) => warn!("Failed to load '{}' from remote store: {}", key, e),
        }

        match self.fallback_value(key) {
            Some(value) => match serde_json::from_value(value) {
                Ok(decoded) => {
                    info!("Using in-memory copy of '{}'", key);
                    decoded
                }
                Err(e) => {
                    warn!("In-memory copy of '{}' has an unexpected shape: {}", key, e);
                    default
                }
            },
            None => default,
        }
    }

    /// Remove `key` remotely. The fallback entry is dropped either way.
    pub async fn remove(&self, key: &str) -> StorageResult {
        let result = self.remote.delete_value(key).await;
        self.fallback().remove(key);

        match result {
            Ok(()) => {
                info!("Removed '{}' from remote store", key);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to remove '{}' from remote store: {}", key, e);
                Err(e.into())
            }
        }
    }

    /// Always true; failures are discovered per operation.
    pub fn is_available(&self) -> bool {
        true
    }

    pub(crate) fn fallback_value(&self, key: &str) -> Option<Value> {
        self.fallback().get(key).cloned()
    }

    fn fallback(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.fallback.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeRemoteStore;
    use serde_json::json;

    fn gateway() -> (Arc<FakeRemoteStore>, StorageGateway) {
        let remote = Arc::new(FakeRemoteStore::new());
        let gateway = StorageGateway::new(remote.clone());
        (remote, gateway)
    }

    #[tokio::test]
    async fn test_write_then_read_when_reachable() {
        let (remote, gateway) = gateway();
        let students = json!([{ "id": 1, "name": "Ali", "phone": "09123823886" }]);

        assert!(gateway.write("students", &students).await.is_ok());
        let loaded: Value = gateway.read("students", json!([])).await;

        assert_eq!(loaded, students);
        assert_eq!(remote.stored("students"), Some(students));
        assert!(gateway.fallback_value("students").is_none());
    }

    #[tokio::test]
    async fn test_missing_key_reads_default() {
        let (_, gateway) = gateway();
        let loaded: Vec<String> = gateway.read("exercise-types", vec!["default".to_string()]).await;
        assert_eq!(loaded, vec!["default".to_string()]);
    }

    #[tokio::test]
    async fn test_offline_write_is_readable_from_fallback() {
        let (remote, gateway) = gateway();
        remote.set_failing(true);

        let students = vec![json!({ "id": 7, "name": "Ali" })];
        let result = gateway.write("students", &students).await;
        assert!(matches!(result, Err(StorageError::Remote(_))));
        assert_eq!(gateway.fallback_value("students"), Some(json!(students)));

        let loaded: Vec<Value> = gateway.read("students", Vec::new()).await;
        assert_eq!(loaded, students);
    }

    #[tokio::test]
    async fn test_latest_failed_write_wins() {
        let (remote, gateway) = gateway();
        remote.set_failing(true);

        let _ = gateway.write("isLoggedIn", &false).await;
        let _ = gateway.write("isLoggedIn", &true).await;

        assert!(gateway.read("isLoggedIn", false).await);
    }

    #[tokio::test]
    async fn test_successful_write_clears_stale_fallback() {
        let (remote, gateway) = gateway();
        remote.set_failing(true);
        let _ = gateway.write("supplements", &json!(["old"])).await;

        remote.set_failing(false);
        gateway.write("supplements", &json!(["new"])).await.unwrap();
        assert!(gateway.fallback_value("supplements").is_none());

        remote.set_failing(true);
        let loaded: Value = gateway.read("supplements", json!([])).await;
        assert_eq!(loaded, json!([]));
    }

    #[tokio::test]
    async fn test_remove_clears_fallback_even_when_remote_fails() {
        let (remote, gateway) = gateway();
        remote.set_failing(true);
        let _ = gateway.write("students", &json!([1, 2])).await;

        assert!(gateway.remove("students").await.is_err());
        assert!(gateway.fallback_value("students").is_none());

        let loaded: Value = gateway.read("students", json!([])).await;
        assert_eq!(loaded, json!([]));
    }

    #[tokio::test]
    async fn test_remove_then_read_returns_default() {
        let (_, gateway) = gateway();
        gateway.write("students", &json!([1])).await.unwrap();
        gateway.remove("students").await.unwrap();

        let loaded: Value = gateway.read("students", json!("default")).await;
        assert_eq!(loaded, json!("default"));
    }

    #[tokio::test]
    async fn test_undecodable_remote_value_falls_back_to_default() {
        let (remote, gateway) = gateway();
        remote.insert("students", json!("not a list"));

        let loaded: Vec<i64> = gateway.read("students", vec![42]).await;
        assert_eq!(loaded, vec![42]);
    }

    #[test]
    fn test_always_available() {
        let (_, gateway) = gateway();
        assert!(gateway.is_available());
    }
}
