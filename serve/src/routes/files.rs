//! CRUD surface for uploaded-file metadata (§3, §4.1).
//!
//! Blob storage (reading/writing the bytes at [`chatcore::File::path`]) is out of
//! scope here; this surface only manages the entity row. Extraction into
//! [`chatcore::File::content`] is [`chatcore::FileAttach`]'s job, triggered from the
//! chat turn rather than from this CRUD surface.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use chatcore::File;

use crate::api_error::ApiError;
use crate::state::AppState;
use crate::user::UserId;

pub async fn get(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<Json<File>, ApiError> {
    Ok(Json(state.store.get_file(&id, &user).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFileRequest {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    pub path: String,
    pub url: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<RegisterFileRequest>,
) -> Result<Json<File>, ApiError> {
    let now = now_unix();
    let file = File {
        id: body.id,
        name: body.name,
        mime_type: body.mime_type,
        size: body.size,
        path: body.path,
        url: body.url,
        content: String::new(),
        user,
        created_at: now,
        uploaded_at: now,
    };
    state.store.save_file(&file).await?;
    Ok(Json(file))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    state.store.delete_file(&id, &user).await?;
    Ok(())
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
