//! The single durable boundary. All operations take a `user` argument and MUST
//! filter/scope by it — defense in depth beyond whatever sits in front of this crate.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{
    Conversation, File, MCPServer, Message, MessageId, Model, Provider, Settings, ToolCall,
    ToolCallStatus, ToolDef,
};

/// Per-entity repositories backing the chat backend's persisted state.
///
/// `list` operations never return a partial row set on a scan error; they log and
/// skip the bad row. `get` operations surface the error instead.
#[async_trait]
pub trait Store: Send + Sync {
    // Conversations — list() is ordered by `updated_at` descending.
    async fn save_conversation(&self, conv: &Conversation) -> Result<(), StoreError>;
    async fn get_conversation(&self, id: &str, user: &str) -> Result<Conversation, StoreError>;
    async fn list_conversations(&self, user: &str) -> Result<Vec<Conversation>, StoreError>;
    async fn touch_conversation(&self, id: &str, user: &str) -> Result<(), StoreError>;
    async fn rename_conversation(
        &self,
        id: &str,
        user: &str,
        title: &str,
    ) -> Result<(), StoreError>;
    async fn delete_conversation(&self, id: &str, user: &str) -> Result<(), StoreError>;

    // Messages — list_by_conversation() is ordered by ascending id (insertion order).
    async fn save_message(&self, msg: &Message) -> Result<MessageId, StoreError>;
    async fn get_message(&self, id: MessageId, user: &str) -> Result<Message, StoreError>;
    async fn update_message_content(
        &self,
        id: MessageId,
        user: &str,
        content: &str,
    ) -> Result<(), StoreError>;
    async fn list_messages_by_conversation(
        &self,
        conv_id: &str,
        user: &str,
    ) -> Result<Vec<Message>, StoreError>;

    // Tool calls.
    async fn save_tool_call(&self, call: &ToolCall) -> Result<(), StoreError>;
    async fn update_tool_call_status(
        &self,
        id: &str,
        user: &str,
        status: ToolCallStatus,
    ) -> Result<(), StoreError>;
    async fn update_tool_call_output(
        &self,
        id: &str,
        user: &str,
        output: &str,
    ) -> Result<(), StoreError>;
    async fn get_tool_call(&self, id: &str, user: &str) -> Result<ToolCall, StoreError>;
    async fn list_tool_calls_by_message(
        &self,
        message_id: MessageId,
        user: &str,
    ) -> Result<Vec<ToolCall>, StoreError>;

    // Files.
    async fn save_file(&self, file: &File) -> Result<(), StoreError>;
    async fn get_file(&self, id: &str, user: &str) -> Result<File, StoreError>;
    async fn get_files_by_ids(&self, ids: &[String], user: &str) -> Result<Vec<File>, StoreError>;
    async fn delete_file(&self, id: &str, user: &str) -> Result<(), StoreError>;
    async fn set_file_content(&self, id: &str, user: &str, content: &str) -> Result<(), StoreError>;

    // Attachments, scoped by owning message.
    async fn save_attachment(
        &self,
        id: &str,
        message_id: MessageId,
        file_id: &str,
    ) -> Result<(), StoreError>;
    async fn list_attachments_by_message(
        &self,
        message_id: MessageId,
    ) -> Result<Vec<crate::model::Attachment>, StoreError>;

    // Providers / Models.
    async fn save_provider(&self, provider: &Provider) -> Result<(), StoreError>;
    async fn get_provider(&self, id: &str, user: &str) -> Result<Provider, StoreError>;
    async fn list_providers(&self, user: &str) -> Result<Vec<Provider>, StoreError>;
    async fn delete_provider(&self, id: &str, user: &str) -> Result<(), StoreError>;

    async fn save_model(&self, model: &Model) -> Result<(), StoreError>;
    async fn get_model(&self, id: &str, user: &str) -> Result<Model, StoreError>;
    async fn list_models(&self, user: &str) -> Result<Vec<Model>, StoreError>;
    async fn delete_model(&self, id: &str, user: &str) -> Result<(), StoreError>;

    // MCP servers / tools.
    async fn save_mcp_server(&self, server: &MCPServer) -> Result<(), StoreError>;
    async fn get_mcp_server(&self, id: &str, user: &str) -> Result<MCPServer, StoreError>;
    async fn list_mcp_servers(&self, user: &str) -> Result<Vec<MCPServer>, StoreError>;
    async fn delete_mcp_server(&self, id: &str, user: &str) -> Result<(), StoreError>;

    async fn save_tool(&self, tool: &ToolDef) -> Result<(), StoreError>;
    async fn get_tool_by_name(&self, name: &str, user: &str) -> Result<ToolDef, StoreError>;
    async fn list_enabled_tools(&self, user: &str) -> Result<Vec<ToolDef>, StoreError>;
    async fn delete_tool(&self, id: &str, user: &str) -> Result<(), StoreError>;

    // Settings — always exactly one row per user; reads synthesize a default row.
    async fn get_settings(&self, user: &str) -> Result<Settings, StoreError>;
    async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError>;
}
