//! `GET /api/tools/approve?callId=&approved=<bool>` (§6).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::state::AppState;
use crate::user::UserId;

#[derive(Debug, Deserialize)]
pub struct ApproveQuery {
    #[serde(rename = "callId")]
    pub call_id: String,
    pub approved: bool,
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Query(query): Query<ApproveQuery>,
) -> StatusCode {
    match state.approvals.decide(&user, &query.call_id, query.approved) {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::NOT_FOUND,
    }
}
