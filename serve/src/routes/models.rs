//! CRUD surface for per-provider models (§3, §4.1).
//!
//! A model's id is always `"<providerId>/<modelName>"` ([`chatcore::split_model_id`]),
//! so deleting one takes the full id rather than a bare name.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use chatcore::Model;

use crate::api_error::{bad_request, ApiError};
use crate::state::AppState;
use crate::user::UserId;

pub async fn list(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> Result<Json<Vec<Model>>, ApiError> {
    Ok(Json(state.store.list_models(&user).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelRequest {
    pub provider_id: String,
    pub name: String,
    #[serde(default)]
    pub is_enabled: bool,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<CreateModelRequest>,
) -> Result<Json<Model>, ApiError> {
    state.store.get_provider(&body.provider_id, &user).await?;
    if body.name.is_empty() {
        return Err(bad_request("name must not be empty"));
    }
    let model = Model {
        id: format!("{}/{}", body.provider_id, body.name),
        provider_id: body.provider_id,
        name: body.name,
        is_enabled: body.is_enabled,
    };
    state.store.save_model(&model).await?;
    Ok(Json(model))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    state.store.delete_model(&id, &user).await?;
    Ok(())
}
