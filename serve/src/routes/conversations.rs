//! CRUD surface for conversations (§3, §4.1).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use chatcore::{Conversation, Message};

use crate::api_error::ApiError;
use crate::state::AppState;
use crate::user::UserId;

pub async fn list(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(state.store.list_conversations(&user).await?))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.store.get_conversation(&id, &user).await?))
}

pub async fn messages(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.store.list_messages_by_conversation(&id, &user).await?))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

pub async fn rename(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
    Json(body): Json<RenameRequest>,
) -> Result<(), ApiError> {
    state.store.rename_conversation(&id, &user, &body.title).await?;
    Ok(())
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    state.store.delete_conversation(&id, &user).await?;
    Ok(())
}
