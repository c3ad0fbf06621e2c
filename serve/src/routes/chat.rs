//! `POST /api/chat/stream`, `POST /api/chat/retry`, `POST /api/chat/update` (§6).
//!
//! `stream` and `retry` both end in the same SSE-producing turn; `retry` differs
//! only in that it starts from an existing user message instead of creating one.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use chatcore::{Conversation, Message, MessageId, Role, StreamMux, ToolLoop};

use crate::api_error::{bad_request, busy, ApiError};
use crate::sse;
use crate::state::AppState;
use crate::user::UserId;

/// A per-request deadline bounding the whole turn, independent of the
/// per-provider-call timeout (§5: "A per-request deadline (default 600s) bounds
/// the whole turn").
const TURN_DEADLINE: Duration = Duration::from_secs(600);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamRequest {
    pub conversation_id: Option<String>,
    /// `0` means "no parent" (new root message), matching the monotonic id space
    /// starting at 1.
    pub parent_id: MessageId,
    pub model: String,
    pub content: String,
    #[serde(default)]
    pub attachment_ids: Vec<String>,
    /// Accepted but unmapped: whether `webSearch` should enable a built-in tool is
    /// left unspecified; see DESIGN.md.
    #[serde(default)]
    pub web_search: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRetryRequest {
    pub conversation_id: String,
    pub parent_id: MessageId,
    pub model: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUpdateRequest {
    pub conversation_id: String,
    pub message_id: MessageId,
    pub content: String,
}

pub async fn stream(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<ChatStreamRequest>,
) -> Result<Response, ApiError> {
    if body.content.trim().is_empty() {
        return Err(bad_request("content must not be empty"));
    }
    let (conv_id, is_new) = match &body.conversation_id {
        Some(id) => {
            state.store.get_conversation(id, &user).await?;
            (id.clone(), false)
        }
        None => (Uuid::new_v4().to_string(), true),
    };

    let guard = state
        .locks
        .try_acquire(&user, &conv_id)
        .ok_or_else(|| busy(&conv_id))?;

    if is_new {
        let now = now_unix();
        state
            .store
            .save_conversation(&Conversation {
                id: conv_id.clone(),
                user: user.clone(),
                title: title_from_content(&body.content),
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    let parent_id = if body.parent_id == 0 { None } else { Some(body.parent_id) };
    let user_msg = Message {
        id: 0,
        conv_id: conv_id.clone(),
        role: Role::User,
        model: None,
        parent_id,
        content: body.content,
        reasoning: None,
        error: None,
    };
    let user_msg_id = state.store.save_message(&user_msg).await?;

    for file_id in &body.attachment_ids {
        state.store.get_file(file_id, &user).await?;
        state
            .store
            .save_attachment(&Uuid::new_v4().to_string(), user_msg_id, file_id)
            .await?;
    }
    state.store.touch_conversation(&conv_id, &user).await?;

    let model = body.model;
    Ok(run_turn(state, guard, user, conv_id, user_msg_id, model))
}

pub async fn retry(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<ChatRetryRequest>,
) -> Result<Response, ApiError> {
    state.store.get_conversation(&body.conversation_id, &user).await?;
    let parent = state.store.get_message(body.parent_id, &user).await?;
    if parent.role != Role::User {
        return Err(bad_request("retry parentId must reference a user message"));
    }

    let guard = state
        .locks
        .try_acquire(&user, &body.conversation_id)
        .ok_or_else(|| busy(&body.conversation_id))?;

    state.store.touch_conversation(&body.conversation_id, &user).await?;
    Ok(run_turn(state, guard, user, body.conversation_id, body.parent_id, body.model))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<ChatUpdateRequest>,
) -> Result<(), ApiError> {
    state.store.get_conversation(&body.conversation_id, &user).await?;
    state
        .store
        .update_message_content(body.message_id, &user, &body.content)
        .await?;
    state.store.touch_conversation(&body.conversation_id, &user).await?;
    Ok(())
}

/// Spawns the single cooperative task that owns the response writer for the rest
/// of the turn (§5), and returns the SSE response immediately so headers flush
/// before the first chunk is produced.
fn run_turn(
    state: Arc<AppState>,
    guard: crate::conversation_lock::ConversationLockGuard,
    user: String,
    conv_id: String,
    user_msg_id: MessageId,
    model: String,
) -> Response {
    let (mut writer, response) = sse::channel();
    tokio::spawn(async move {
        let _guard = guard;
        let timed_out = tokio::time::timeout(TURN_DEADLINE, async {
            let settings = match state.store.get_settings(&user).await {
                Ok(s) => s,
                Err(e) => {
                    let mut mux = StreamMux::new(&mut writer);
                    let _ = mux.error(&e.to_string(), Some("internal")).await;
                    return;
                }
            };
            let tool_loop = ToolLoop::new(
                state.store.as_ref(),
                &state.approvals,
                state.approval_timeout,
                state.provider_timeout,
                state.tool_loop_limit,
            );
            let mut mux = StreamMux::new(&mut writer);
            let _ = tool_loop
                .run(&mut mux, &conv_id, &user, user_msg_id, &model, &settings)
                .await;
        })
        .await
        .is_err();

        if timed_out {
            tracing::warn!(conv_id = %conv_id, "turn exceeded its per-request deadline");
            let mut mux = StreamMux::new(&mut writer);
            let _ = mux.error("turn deadline exceeded", Some("internal")).await;
        }
    });
    response
}

fn title_from_content(content: &str) -> String {
    const MAX_TITLE_CHARS: usize = 60;
    let trimmed = content.trim();
    if trimmed.chars().count() <= MAX_TITLE_CHARS {
        trimmed.to_string()
    } else {
        trimmed.chars().take(MAX_TITLE_CHARS).collect::<String>() + "…"
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
