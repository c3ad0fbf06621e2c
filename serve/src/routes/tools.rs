//! CRUD surface for MCP-backed tool definitions (§3, §4.1).
//!
//! There is no "list all tools" operation on [`chatcore::Store`], only
//! `list_enabled_tools` — a disabled tool is invisible to a turn's catalog by
//! construction, so this surface mirrors that rather than adding a second list path.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use chatcore::ToolDef;

use crate::api_error::ApiError;
use crate::state::AppState;
use crate::user::UserId;

pub async fn list(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> Result<Json<Vec<ToolDef>>, ApiError> {
    Ok(Json(state.store.list_enabled_tools(&user).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateToolRequest {
    pub mcp_server_id: String,
    pub name: String,
    pub description: String,
    pub input_schema: String,
    #[serde(default)]
    pub require_approval: bool,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

fn default_true() -> bool {
    true
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<CreateToolRequest>,
) -> Result<Json<ToolDef>, ApiError> {
    state.store.get_mcp_server(&body.mcp_server_id, &user).await?;
    let tool = ToolDef {
        id: Uuid::new_v4().to_string(),
        mcp_server_id: body.mcp_server_id,
        name: body.name,
        description: body.description,
        input_schema: body.input_schema,
        require_approval: body.require_approval,
        is_enabled: body.is_enabled,
    };
    state.store.save_tool(&tool).await?;
    Ok(Json(tool))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    state.store.delete_tool(&id, &user).await?;
    Ok(())
}
