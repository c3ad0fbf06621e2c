//! CRUD surface for per-user settings (§3, §4.1). Always exactly one row per
//! user; a read before any write synthesizes a default one.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use chatcore::{ReasoningEffort, Settings};

use crate::api_error::ApiError;
use crate::state::AppState;
use crate::user::UserId;

pub async fn get(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.store.get_settings(&user).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub system_prompt: String,
    pub default_model: Option<String>,
    pub reasoning_effort: ReasoningEffort,
    pub attachment_ocr_only: bool,
    pub ocr_model: Option<String>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<Settings>, ApiError> {
    let settings = Settings {
        user,
        system_prompt: body.system_prompt,
        default_model: body.default_model,
        reasoning_effort: body.reasoning_effort,
        attachment_ocr_only: body.attachment_ocr_only,
        ocr_model: body.ocr_model,
    };
    state.store.save_settings(&settings).await?;
    Ok(Json(settings))
}
