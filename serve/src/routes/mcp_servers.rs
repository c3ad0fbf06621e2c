//! CRUD surface for MCP servers (§3, §4.1).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use chatcore::MCPServer;

use crate::api_error::ApiError;
use crate::state::AppState;
use crate::user::UserId;

pub async fn list(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> Result<Json<Vec<MCPServer>>, ApiError> {
    Ok(Json(state.store.list_mcp_servers(&user).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMcpServerRequest {
    pub name: String,
    pub endpoint: String,
    pub api_key: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<CreateMcpServerRequest>,
) -> Result<Json<MCPServer>, ApiError> {
    let server = MCPServer {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        endpoint: body.endpoint,
        api_key: body.api_key,
        user,
    };
    state.store.save_mcp_server(&server).await?;
    Ok(Json(server))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    state.store.delete_mcp_server(&id, &user).await?;
    Ok(())
}
