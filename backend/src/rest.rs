use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{KeyValue, NewHistoryEntry, STUDENTS_KEY, SUPPLEMENTS_KEY};
use tracing::{error, info};

use crate::AppState;

/// Axum handler function for GET /api/values/:key
pub async fn get_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/values/{}", key);

    match state.value_store.get_value(&key).await {
        Ok(Some(value)) => (StatusCode::OK, Json(KeyValue { key, value })).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Key not found").into_response(),
        Err(e) => {
            error!("Error retrieving value: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving value").into_response()
        }
    }
}

/// Axum handler function for POST /api/values
pub async fn put_value(
    State(state): State<AppState>,
    Json(kv): Json<KeyValue>,
) -> impl IntoResponse {
    info!("POST /api/values - key: {}", kv.key);

    match state.value_store.put_value(&kv.key, &kv.value).await {
        Ok(()) => (StatusCode::CREATED, Json(kv)).into_response(),
        Err(e) => {
            error!("Error storing value: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store value").into_response()
        }
    }
}

/// Axum handler function for DELETE /api/values/:key
pub async fn delete_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/values/{}", key);

    match state.value_store.delete_value(&key).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Key not found").into_response(),
        Err(e) => {
            error!("Error deleting value: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete value").into_response()
        }
    }
}

/// Axum handler function for GET /api/students/check-phone/:phone
pub async fn check_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/students/check-phone/{}", phone);

    match state.student_registry.check_phone(&phone).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Error checking phone: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error checking phone").into_response()
        }
    }
}

/// Axum handler function for DELETE /api/students/:id
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    info!("DELETE /api/students/{}", id);
    remove_entity(&state, STUDENTS_KEY, id, "Student not found").await
}

/// Axum handler function for DELETE /api/supplements/:id
pub async fn delete_supplement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    info!("DELETE /api/supplements/{}", id);
    remove_entity(&state, SUPPLEMENTS_KEY, id, "Supplement not found").await
}

async fn remove_entity(
    state: &AppState,
    key: &str,
    id: i64,
    not_found: &'static str,
) -> axum::response::Response {
    match state.student_registry.remove_from_collection(key, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, not_found).into_response(),
        Err(e) => {
            error!("Failed to delete {} {}: {:?}", key, id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Axum handler function for GET /api/history
pub async fn list_history(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/history");

    match state.history_service.list().await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => {
            error!("Error listing history: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing history").into_response()
        }
    }
}

/// Axum handler function for POST /api/history
pub async fn append_history(
    State(state): State<AppState>,
    Json(entry): Json<NewHistoryEntry>,
) -> impl IntoResponse {
    info!("POST /api/history - action: {}", entry.action_type);

    match state.history_service.append(&entry).await {
        Ok(stored) => (StatusCode::CREATED, Json(stored)).into_response(),
        Err(e) => {
            error!("Error appending history: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to append history").into_response()
        }
    }
}

/// Axum handler function for DELETE /api/history
pub async fn clear_history(State(state): State<AppState>) -> impl IntoResponse {
    info!("DELETE /api/history");

    match state.history_service.clear().await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Error clearing history: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to clear history").into_response()
        }
    }
}
