//! Domain entities shared by Store, Tree, ContextBuilder, and the HTTP layer.

use serde::{Deserialize, Serialize};

pub type MessageId = i64;

/// A message's position in the tree: `None` marks a root.
pub type ParentId = Option<MessageId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReasoningEffort {
    Disabled,
    Low,
    Medium,
    High,
}

impl Default for ReasoningEffort {
    fn default() -> Self {
        ReasoningEffort::Disabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolCallStatus {
    Pending,
    AwaitingApproval,
    Executed,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub user: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A single node in a conversation's message forest.
///
/// `children` is never stored; it is derived by [`crate::tree`] from the set of
/// messages whose `parent_id` points at this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conv_id: String,
    pub role: Role,
    pub model: Option<String>,
    pub parent_id: ParentId,
    pub content: String,
    pub reasoning: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub message_id: MessageId,
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    pub path: String,
    pub url: String,
    /// Extracted text; populated lazily by FileAttach, empty until then.
    pub content: String,
    pub user: String,
    pub created_at: i64,
    pub uploaded_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    /// Provider-supplied id; not trusted for uniqueness across providers.
    pub reference_id: String,
    pub conv_id: String,
    pub message_id: MessageId,
    pub name: String,
    pub args: String,
    pub output: Option<String>,
    pub status: ToolCallStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MCPServer {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    pub id: String,
    pub mcp_server_id: String,
    pub name: String,
    pub description: String,
    pub input_schema: String,
    pub require_approval: bool,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub user: String,
}

/// Id is always `"<providerId>/<modelName>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub user: String,
    pub system_prompt: String,
    pub default_model: Option<String>,
    pub reasoning_effort: ReasoningEffort,
    pub attachment_ocr_only: bool,
    pub ocr_model: Option<String>,
}

impl Settings {
    pub fn default_for(user: &str) -> Self {
        Settings {
            user: user.to_string(),
            system_prompt: String::new(),
            default_model: None,
            reasoning_effort: ReasoningEffort::Disabled,
            attachment_ocr_only: false,
            ocr_model: None,
        }
    }
}

/// Splits a fully-qualified model id `"<providerId>/<modelName>"` on the first `/`.
pub fn split_model_id(model: &str) -> Option<(&str, &str)> {
    model.split_once('/')
}
