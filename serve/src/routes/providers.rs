//! CRUD surface for LLM providers (§3, §4.1).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use chatcore::Provider;

use crate::api_error::ApiError;
use crate::state::AppState;
use crate::user::UserId;

pub async fn list(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> Result<Json<Vec<Provider>>, ApiError> {
    Ok(Json(state.store.list_providers(&user).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProviderRequest {
    pub base_url: String,
    pub api_key: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<CreateProviderRequest>,
) -> Result<Json<Provider>, ApiError> {
    let provider = Provider {
        id: Uuid::new_v4().to_string(),
        base_url: body.base_url,
        api_key: body.api_key,
        user,
    };
    state.store.save_provider(&provider).await?;
    Ok(Json(provider))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    state.store.delete_provider(&id, &user).await?;
    Ok(())
}
