//! # Remote Interfaces
//!
//! The seams between the persistence core and the remote API. [`ApiClient`]
//! implements all three over HTTP; tests substitute in-memory fakes.
//!
//! [`ApiClient`]: crate::services::api::ApiClient

use async_trait::async_trait;
use serde_json::Value;
use shared::{HistoryEntry, NewHistoryEntry, PhoneCheckResponse};

use crate::error::ApiError;

/// Remote key-addressed value store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `Ok(None)` when the store holds no value for `key`
    async fn get_value(&self, key: &str) -> Result<Option<Value>, ApiError>;

    async fn put_value(&self, key: &str, value: &Value) -> Result<(), ApiError>;

    async fn delete_value(&self, key: &str) -> Result<(), ApiError>;
}

/// Entity endpoints used by uniqueness checks and destructive actions
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    /// Look up the student owning a normalized phone number
    async fn check_phone(&self, phone: &str) -> Result<PhoneCheckResponse, ApiError>;

    async fn delete_student(&self, id: i64) -> Result<(), ApiError>;

    async fn delete_supplement(&self, id: i64) -> Result<(), ApiError>;
}

/// Remote audit log
#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn list_entries(&self) -> Result<Vec<HistoryEntry>, ApiError>;

    /// Returns the stored entry with its remote-assigned id
    async fn append_entry(&self, entry: &NewHistoryEntry) -> Result<HistoryEntry, ApiError>;

    async fn clear_entries(&self) -> Result<(), ApiError>;
}
