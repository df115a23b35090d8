use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{HistoryEntry, KeyValue, NewHistoryEntry, PhoneCheckResponse};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::services::traits::{HistoryLog, RemoteStore, StudentDirectory};

/// API client for communicating with the backend server.
///
/// Requests carry the session's cookies, so every call is credentialed.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Create a new API client from the session config
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout())
            .build()?;
        let client = Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        };
        // Fail early on an unusable base url
        client.endpoint(&[])?;
        Ok(client)
    }

    /// Create a new API client with a custom base URL and default settings
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let config = ClientConfig {
            base_url: base_url.into(),
            ..ClientConfig::default()
        };
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base_url}/api/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("api")
            .extend(segments.iter().copied());
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        debug!("{} {}", method, url);
        Ok(self.http.request(method, url))
    }

    fn with_json<T: Serialize + ?Sized>(builder: RequestBuilder, body: &T) -> Result<RequestBuilder, ApiError> {
        let bytes = serde_json::to_vec(body).map_err(ApiError::Encode)?;
        Ok(builder.header(header::CONTENT_TYPE, "application/json").body(bytes))
    }

    /// Turn a non-2xx response into [`ApiError::Status`]
    async fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ApiError::Decode)
    }
}

/// Decode history entries one by one, skipping those that cannot be normalized
fn decode_history(raw: Vec<Value>) -> Vec<HistoryEntry> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<HistoryEntry>(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable history entry: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl RemoteStore for ApiClient {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, ApiError> {
        let response = self.request(Method::GET, &["values", key])?.send().await?;
        match Self::check_status(response).await {
            Ok(response) => {
                let kv: KeyValue = Self::decode(response).await?;
                Ok(Some(kv.value))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_value(&self, key: &str, value: &Value) -> Result<(), ApiError> {
        let kv = KeyValue {
            key: key.to_string(),
            value: value.clone(),
        };
        let request = Self::with_json(self.request(Method::POST, &["values"])?, &kv)?;
        Self::check_status(request.send().await?).await?;
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<(), ApiError> {
        let response = self.request(Method::DELETE, &["values", key])?.send().await?;
        match Self::check_status(response).await {
            // Nothing stored is as good as removed
            Err(e) if e.is_not_found() => Ok(()),
            other => other.map(|_| ()),
        }
    }
}

#[async_trait]
impl StudentDirectory for ApiClient {
    async fn check_phone(&self, phone: &str) -> Result<PhoneCheckResponse, ApiError> {
        let response = self
            .request(Method::GET, &["students", "check-phone", phone])?
            .send()
            .await?;
        Self::decode(Self::check_status(response).await?).await
    }

    async fn delete_student(&self, id: i64) -> Result<(), ApiError> {
        let id = id.to_string();
        let response = self.request(Method::DELETE, &["students", id.as_str()])?.send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete_supplement(&self, id: i64) -> Result<(), ApiError> {
        let id = id.to_string();
        let response = self.request(Method::DELETE, &["supplements", id.as_str()])?.send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryLog for ApiClient {
    async fn list_entries(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let response = self.request(Method::GET, &["history"])?.send().await?;
        let raw: Vec<Value> = Self::decode(Self::check_status(response).await?).await?;
        Ok(decode_history(raw))
    }

    async fn append_entry(&self, entry: &NewHistoryEntry) -> Result<HistoryEntry, ApiError> {
        let request = Self::with_json(self.request(Method::POST, &["history"])?, entry)?;
        Self::decode(Self::check_status(request.send().await?).await?).await
    }

    async fn clear_entries(&self) -> Result<(), ApiError> {
        let response = self.request(Method::DELETE, &["history"])?.send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_building() {
        let client = ApiClient::with_base_url("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");

        let url = client.endpoint(&["values", "students"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/values/students");

        let url = client.endpoint(&["students", "check-phone", "09123823886"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/students/check-phone/09123823886");
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client = ApiClient::with_base_url("http://localhost:3000").unwrap();
        let url = client.endpoint(&["values", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/values/a%2Fb%20c");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::with_base_url("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_unreadable_history_entries_are_skipped() {
        let raw = vec![
            serde_json::json!({
                "id": 1, "timestamp": 1000, "student_id": 7, "student_name": "Ali",
                "action_type": "delete", "details": "phone: 09123823886", "description": "Ali was deleted"
            }),
            serde_json::json!({
                "id": 2, "timestamp": "not a date", "student_name": "Sara",
                "action_type": "diet", "details": "low carb"
            }),
            serde_json::json!({
                "id": 3, "timestamp": "2023-12-14 01:08:42", "student_name": "Reza",
                "action_type": "teleport", "details": ""
            }),
            serde_json::json!({
                "id": 4, "timestamp": "2023-12-14T01:08:42Z", "student_id": 3, "student_name": "Sara",
                "action_type": "exercise", "details": "leg day"
            }),
        ];

        let entries = decode_history(raw);

        let ids: Vec<i64> = entries.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(entries[1].timestamp, 1_702_516_122_000);
        assert_eq!(entries[1].description, "leg day");
    }

    #[test]
    fn test_not_found_detection() {
        let missing = ApiError::Status { status: 404, body: "Key not found".to_string() };
        let broken = ApiError::Status { status: 500, body: "boom".to_string() };
        assert!(missing.is_not_found());
        assert!(!broken.is_not_found());
    }
}
