//! SQLite-backed [`Store`]. Every operation opens a fresh connection inside
//! `spawn_blocking`, matching the pool-free, connection-per-call pattern used
//! elsewhere in this codebase's SQLite stores.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::model::{
    Attachment, Conversation, File, MCPServer, Message, MessageId, Model, ParentId, Provider,
    ReasoningEffort, Role, Settings, ToolCall, ToolCallStatus, ToolDef,
};

use super::Store;

pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(SqliteStore { db_path })
    }

    fn open(&self) -> Result<Connection, StoreError> {
        Connection::open(&self.db_path).map_err(|e| StoreError::Io(e.to_string()))
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    user TEXT NOT NULL,
    title TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conv_id TEXT NOT NULL,
    user TEXT NOT NULL,
    role TEXT NOT NULL,
    model TEXT,
    parent_id INTEGER,
    content TEXT NOT NULL,
    reasoning TEXT,
    error TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_conv ON messages(conv_id);
CREATE TABLE IF NOT EXISTS attachments (
    id TEXT PRIMARY KEY,
    message_id INTEGER NOT NULL,
    file_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_attachments_message ON attachments(message_id);
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    size INTEGER NOT NULL,
    path TEXT NOT NULL,
    url TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    user TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    uploaded_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS tool_calls (
    id TEXT PRIMARY KEY,
    reference_id TEXT NOT NULL,
    conv_id TEXT NOT NULL,
    message_id INTEGER NOT NULL,
    user TEXT NOT NULL,
    name TEXT NOT NULL,
    args TEXT NOT NULL,
    output TEXT,
    status TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tool_calls_message ON tool_calls(message_id);
CREATE TABLE IF NOT EXISTS mcp_servers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    api_key TEXT,
    user TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tools (
    id TEXT PRIMARY KEY,
    mcp_server_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    input_schema TEXT NOT NULL,
    require_approval INTEGER NOT NULL,
    is_enabled INTEGER NOT NULL,
    user TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS providers (
    id TEXT PRIMARY KEY,
    base_url TEXT NOT NULL,
    api_key TEXT,
    user TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS models (
    id TEXT PRIMARY KEY,
    provider_id TEXT NOT NULL,
    name TEXT NOT NULL,
    is_enabled INTEGER NOT NULL,
    user TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS settings (
    user TEXT PRIMARY KEY,
    system_prompt TEXT NOT NULL DEFAULT '',
    default_model TEXT,
    reasoning_effort TEXT NOT NULL DEFAULT 'disabled',
    attachment_ocr_only INTEGER NOT NULL DEFAULT 0,
    ocr_model TEXT
);
"#;

fn role_to_str(r: Role) -> &'static str {
    match r {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn role_from_str(s: &str) -> Result<Role, StoreError> {
    match s {
        "system" => Ok(Role::System),
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        "tool" => Ok(Role::Tool),
        other => Err(StoreError::Io(format!("unknown role in storage: {other}"))),
    }
}

fn status_to_str(s: ToolCallStatus) -> &'static str {
    match s {
        ToolCallStatus::Pending => "pending",
        ToolCallStatus::AwaitingApproval => "awaitingApproval",
        ToolCallStatus::Executed => "executed",
        ToolCallStatus::Rejected => "rejected",
        ToolCallStatus::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> Result<ToolCallStatus, StoreError> {
    match s {
        "pending" => Ok(ToolCallStatus::Pending),
        "awaitingApproval" => Ok(ToolCallStatus::AwaitingApproval),
        "executed" => Ok(ToolCallStatus::Executed),
        "rejected" => Ok(ToolCallStatus::Rejected),
        "failed" => Ok(ToolCallStatus::Failed),
        other => Err(StoreError::Io(format!("unknown tool call status: {other}"))),
    }
}

fn effort_to_str(e: ReasoningEffort) -> &'static str {
    match e {
        ReasoningEffort::Disabled => "disabled",
        ReasoningEffort::Low => "low",
        ReasoningEffort::Medium => "medium",
        ReasoningEffort::High => "high",
    }
}

fn effort_from_str(s: &str) -> ReasoningEffort {
    match s {
        "low" => ReasoningEffort::Low,
        "medium" => ReasoningEffort::Medium,
        "high" => ReasoningEffort::High,
        _ => ReasoningEffort::Disabled,
    }
}

fn not_found_if_none<T>(row: Option<T>) -> Result<T, StoreError> {
    row.ok_or(StoreError::NotFound)
}

#[async_trait]
impl Store for SqliteStore {
    async fn save_conversation(&self, conv: &Conversation) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let conv = conv.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "INSERT INTO conversations (id, user, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET title = excluded.title, updated_at = excluded.updated_at",
                params![conv.id, conv.user, conv.title, conv.created_at, conv.updated_at],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_conversation(&self, id: &str, user: &str) -> Result<Conversation, StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let row = db
                .query_row(
                    "SELECT id, user, title, created_at, updated_at FROM conversations WHERE id = ?1 AND user = ?2",
                    params![id, user],
                    |r| {
                        Ok(Conversation {
                            id: r.get(0)?,
                            user: r.get(1)?,
                            title: r.get(2)?,
                            created_at: r.get(3)?,
                            updated_at: r.get(4)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            not_found_if_none(row)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn list_conversations(&self, user: &str) -> Result<Vec<Conversation>, StoreError> {
        let db_path = self.db_path.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let mut stmt = db
                .prepare(
                    "SELECT id, user, title, created_at, updated_at FROM conversations
                     WHERE user = ?1 ORDER BY updated_at DESC",
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let rows = stmt
                .query_map(params![user], |r| {
                    Ok(Conversation {
                        id: r.get(0)?,
                        user: r.get(1)?,
                        title: r.get(2)?,
                        created_at: r.get(3)?,
                        updated_at: r.get(4)?,
                    })
                })
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                match row {
                    Ok(c) => out.push(c),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable conversation row"),
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn touch_conversation(&self, id: &str, user: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let now = chrono::Utc::now().timestamp();
            let updated = db
                .execute(
                    "UPDATE conversations SET updated_at = ?1 WHERE id = ?2 AND user = ?3",
                    params![now, id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn rename_conversation(
        &self,
        id: &str,
        user: &str,
        title: &str,
    ) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user, title) = (id.to_string(), user.to_string(), title.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let now = chrono::Utc::now().timestamp();
            let updated = db
                .execute(
                    "UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3 AND user = ?4",
                    params![title, now, id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn delete_conversation(&self, id: &str, user: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "DELETE FROM tool_calls WHERE conv_id = ?1 AND user = ?2",
                params![id, user],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "DELETE FROM attachments WHERE message_id IN (SELECT id FROM messages WHERE conv_id = ?1 AND user = ?2)",
                params![id, user],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "DELETE FROM messages WHERE conv_id = ?1 AND user = ?2",
                params![id, user],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            let deleted = db
                .execute(
                    "DELETE FROM conversations WHERE id = ?1 AND user = ?2",
                    params![id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn save_message(&self, msg: &Message) -> Result<MessageId, StoreError> {
        let db_path = self.db_path.clone();
        let msg = msg.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            // The caller supplies conv_id's owning user implicitly via the Conversation row;
            // messages denormalize `user` for cheap per-row scoping.
            let user = db
                .query_row(
                    "SELECT user FROM conversations WHERE id = ?1",
                    params![msg.conv_id],
                    |r| r.get::<_, String>(0),
                )
                .map_err(|_| StoreError::NotFound)?;
            db.execute(
                "INSERT INTO messages (id, conv_id, user, role, model, parent_id, content, reasoning, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET content = excluded.content, reasoning = excluded.reasoning, error = excluded.error",
                params![
                    if msg.id == 0 { None } else { Some(msg.id) },
                    msg.conv_id,
                    user,
                    role_to_str(msg.role),
                    msg.model,
                    msg.parent_id,
                    msg.content,
                    msg.reasoning,
                    msg.error,
                ],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            let id = if msg.id == 0 {
                db.last_insert_rowid()
            } else {
                msg.id
            };
            Ok(id)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_message(&self, id: MessageId, user: &str) -> Result<Message, StoreError> {
        let db_path = self.db_path.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let row = db
                .query_row(
                    "SELECT id, conv_id, role, model, parent_id, content, reasoning, error
                     FROM messages WHERE id = ?1 AND user = ?2",
                    params![id, user],
                    map_message_row,
                )
                .optional()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            not_found_if_none(row.transpose()?)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn update_message_content(
        &self,
        id: MessageId,
        user: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (user, content) = (user.to_string(), content.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let updated = db
                .execute(
                    "UPDATE messages SET content = ?1 WHERE id = ?2 AND user = ?3",
                    params![content, id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn list_messages_by_conversation(
        &self,
        conv_id: &str,
        user: &str,
    ) -> Result<Vec<Message>, StoreError> {
        let db_path = self.db_path.clone();
        let (conv_id, user) = (conv_id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let mut stmt = db
                .prepare(
                    "SELECT id, conv_id, role, model, parent_id, content, reasoning, error
                     FROM messages WHERE conv_id = ?1 AND user = ?2 ORDER BY id ASC",
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let rows = stmt
                .query_map(params![conv_id, user], map_message_row)
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                match row {
                    Ok(Ok(m)) => out.push(m),
                    Ok(Err(e)) => tracing::warn!(error = %e, "skipping unreadable message row"),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable message row"),
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn save_tool_call(&self, call: &ToolCall) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let call = call.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let user = db
                .query_row(
                    "SELECT user FROM messages WHERE id = ?1",
                    params![call.message_id],
                    |r| r.get::<_, String>(0),
                )
                .map_err(|_| StoreError::NotFound)?;
            db.execute(
                "INSERT INTO tool_calls (id, reference_id, conv_id, message_id, user, name, args, output, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET output = excluded.output, status = excluded.status",
                params![
                    call.id,
                    call.reference_id,
                    call.conv_id,
                    call.message_id,
                    user,
                    call.name,
                    call.args,
                    call.output,
                    status_to_str(call.status),
                ],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn update_tool_call_status(
        &self,
        id: &str,
        user: &str,
        status: ToolCallStatus,
    ) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let updated = db
                .execute(
                    "UPDATE tool_calls SET status = ?1 WHERE id = ?2 AND user = ?3",
                    params![status_to_str(status), id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn update_tool_call_output(
        &self,
        id: &str,
        user: &str,
        output: &str,
    ) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user, output) = (id.to_string(), user.to_string(), output.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let updated = db
                .execute(
                    "UPDATE tool_calls SET output = ?1 WHERE id = ?2 AND user = ?3",
                    params![output, id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_tool_call(&self, id: &str, user: &str) -> Result<ToolCall, StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let row = db
                .query_row(
                    "SELECT id, reference_id, conv_id, message_id, name, args, output, status
                     FROM tool_calls WHERE id = ?1 AND user = ?2",
                    params![id, user],
                    map_tool_call_row,
                )
                .optional()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            not_found_if_none(row.transpose()?)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn list_tool_calls_by_message(
        &self,
        message_id: MessageId,
        user: &str,
    ) -> Result<Vec<ToolCall>, StoreError> {
        let db_path = self.db_path.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let mut stmt = db
                .prepare(
                    "SELECT id, reference_id, conv_id, message_id, name, args, output, status
                     FROM tool_calls WHERE message_id = ?1 AND user = ?2 ORDER BY rowid ASC",
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let rows = stmt
                .query_map(params![message_id, user], map_tool_call_row)
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                match row {
                    Ok(Ok(c)) => out.push(c),
                    Ok(Err(e)) => tracing::warn!(error = %e, "skipping unreadable tool call row"),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable tool call row"),
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn save_file(&self, file: &File) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let file = file.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "INSERT INTO files (id, name, mime_type, size, path, url, content, user, created_at, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET content = excluded.content",
                params![
                    file.id, file.name, file.mime_type, file.size, file.path, file.url,
                    file.content, file.user, file.created_at, file.uploaded_at
                ],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_file(&self, id: &str, user: &str) -> Result<File, StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let row = db
                .query_row(
                    "SELECT id, name, mime_type, size, path, url, content, user, created_at, uploaded_at
                     FROM files WHERE id = ?1 AND user = ?2",
                    params![id, user],
                    map_file_row,
                )
                .optional()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            not_found_if_none(row)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_files_by_ids(&self, ids: &[String], user: &str) -> Result<Vec<File>, StoreError> {
        let db_path = self.db_path.clone();
        let ids = ids.to_vec();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                let row = db
                    .query_row(
                        "SELECT id, name, mime_type, size, path, url, content, user, created_at, uploaded_at
                         FROM files WHERE id = ?1 AND user = ?2",
                        params![id, user],
                        map_file_row,
                    )
                    .optional()
                    .map_err(|e| StoreError::Io(e.to_string()))?;
                out.push(not_found_if_none(row)?);
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn delete_file(&self, id: &str, user: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let deleted = db
                .execute(
                    "DELETE FROM files WHERE id = ?1 AND user = ?2",
                    params![id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn set_file_content(&self, id: &str, user: &str, content: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user, content) = (id.to_string(), user.to_string(), content.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let updated = db
                .execute(
                    "UPDATE files SET content = ?1 WHERE id = ?2 AND user = ?3",
                    params![content, id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn save_attachment(
        &self,
        id: &str,
        message_id: MessageId,
        file_id: &str,
    ) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, file_id) = (id.to_string(), file_id.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "INSERT INTO attachments (id, message_id, file_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO NOTHING",
                params![id, message_id, file_id],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn list_attachments_by_message(
        &self,
        message_id: MessageId,
    ) -> Result<Vec<Attachment>, StoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let mut stmt = db
                .prepare("SELECT id, message_id, file_id FROM attachments WHERE message_id = ?1")
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let rows = stmt
                .query_map(params![message_id], |r| {
                    Ok(Attachment {
                        id: r.get(0)?,
                        message_id: r.get(1)?,
                        file_id: r.get(2)?,
                    })
                })
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                match row {
                    Ok(a) => out.push(a),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable attachment row"),
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn save_provider(&self, provider: &Provider) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let provider = provider.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "INSERT INTO providers (id, base_url, api_key, user) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET base_url = excluded.base_url, api_key = excluded.api_key",
                params![provider.id, provider.base_url, provider.api_key, provider.user],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_provider(&self, id: &str, user: &str) -> Result<Provider, StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let row = db
                .query_row(
                    "SELECT id, base_url, api_key, user FROM providers WHERE id = ?1 AND user = ?2",
                    params![id, user],
                    |r| {
                        Ok(Provider {
                            id: r.get(0)?,
                            base_url: r.get(1)?,
                            api_key: r.get(2)?,
                            user: r.get(3)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            not_found_if_none(row)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn list_providers(&self, user: &str) -> Result<Vec<Provider>, StoreError> {
        let db_path = self.db_path.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let mut stmt = db
                .prepare("SELECT id, base_url, api_key, user FROM providers WHERE user = ?1")
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let rows = stmt
                .query_map(params![user], |r| {
                    Ok(Provider {
                        id: r.get(0)?,
                        base_url: r.get(1)?,
                        api_key: r.get(2)?,
                        user: r.get(3)?,
                    })
                })
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                match row {
                    Ok(p) => out.push(p),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable provider row"),
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn delete_provider(&self, id: &str, user: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "DELETE FROM models WHERE provider_id = ?1 AND user = ?2",
                params![id, user],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            let deleted = db
                .execute(
                    "DELETE FROM providers WHERE id = ?1 AND user = ?2",
                    params![id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn save_model(&self, model: &Model) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let model = model.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let user = db
                .query_row(
                    "SELECT user FROM providers WHERE id = ?1",
                    params![model.provider_id],
                    |r| r.get::<_, String>(0),
                )
                .map_err(|_| StoreError::NotFound)?;
            db.execute(
                "INSERT INTO models (id, provider_id, name, is_enabled, user) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET is_enabled = excluded.is_enabled",
                params![model.id, model.provider_id, model.name, model.is_enabled, user],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_model(&self, id: &str, user: &str) -> Result<Model, StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let row = db
                .query_row(
                    "SELECT id, provider_id, name, is_enabled FROM models WHERE id = ?1 AND user = ?2",
                    params![id, user],
                    |r| {
                        Ok(Model {
                            id: r.get(0)?,
                            provider_id: r.get(1)?,
                            name: r.get(2)?,
                            is_enabled: r.get(3)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            not_found_if_none(row)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn list_models(&self, user: &str) -> Result<Vec<Model>, StoreError> {
        let db_path = self.db_path.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let mut stmt = db
                .prepare("SELECT id, provider_id, name, is_enabled FROM models WHERE user = ?1")
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let rows = stmt
                .query_map(params![user], |r| {
                    Ok(Model {
                        id: r.get(0)?,
                        provider_id: r.get(1)?,
                        name: r.get(2)?,
                        is_enabled: r.get(3)?,
                    })
                })
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                match row {
                    Ok(m) => out.push(m),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable model row"),
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn delete_model(&self, id: &str, user: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let deleted = db
                .execute(
                    "DELETE FROM models WHERE id = ?1 AND user = ?2",
                    params![id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn save_mcp_server(&self, server: &MCPServer) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let server = server.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "INSERT INTO mcp_servers (id, name, endpoint, api_key, user) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, endpoint = excluded.endpoint, api_key = excluded.api_key",
                params![server.id, server.name, server.endpoint, server.api_key, server.user],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_mcp_server(&self, id: &str, user: &str) -> Result<MCPServer, StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let row = db
                .query_row(
                    "SELECT id, name, endpoint, api_key, user FROM mcp_servers WHERE id = ?1 AND user = ?2",
                    params![id, user],
                    |r| {
                        Ok(MCPServer {
                            id: r.get(0)?,
                            name: r.get(1)?,
                            endpoint: r.get(2)?,
                            api_key: r.get(3)?,
                            user: r.get(4)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            not_found_if_none(row)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn list_mcp_servers(&self, user: &str) -> Result<Vec<MCPServer>, StoreError> {
        let db_path = self.db_path.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let mut stmt = db
                .prepare("SELECT id, name, endpoint, api_key, user FROM mcp_servers WHERE user = ?1")
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let rows = stmt
                .query_map(params![user], |r| {
                    Ok(MCPServer {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        endpoint: r.get(2)?,
                        api_key: r.get(3)?,
                        user: r.get(4)?,
                    })
                })
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                match row {
                    Ok(s) => out.push(s),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable mcp server row"),
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn delete_mcp_server(&self, id: &str, user: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "DELETE FROM tools WHERE mcp_server_id = ?1 AND user = ?2",
                params![id, user],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            let deleted = db
                .execute(
                    "DELETE FROM mcp_servers WHERE id = ?1 AND user = ?2",
                    params![id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn save_tool(&self, tool: &ToolDef) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let tool = tool.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let user = db
                .query_row(
                    "SELECT user FROM mcp_servers WHERE id = ?1",
                    params![tool.mcp_server_id],
                    |r| r.get::<_, String>(0),
                )
                .map_err(|_| StoreError::NotFound)?;
            db.execute(
                "INSERT INTO tools (id, mcp_server_id, name, description, input_schema, require_approval, is_enabled, user)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET description = excluded.description, input_schema = excluded.input_schema,
                     require_approval = excluded.require_approval, is_enabled = excluded.is_enabled",
                params![
                    tool.id, tool.mcp_server_id, tool.name, tool.description, tool.input_schema,
                    tool.require_approval, tool.is_enabled, user
                ],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_tool_by_name(&self, name: &str, user: &str) -> Result<ToolDef, StoreError> {
        let db_path = self.db_path.clone();
        let (name, user) = (name.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let row = db
                .query_row(
                    "SELECT id, mcp_server_id, name, description, input_schema, require_approval, is_enabled
                     FROM tools WHERE name = ?1 AND user = ?2 AND is_enabled = 1",
                    params![name, user],
                    map_tool_row,
                )
                .optional()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            not_found_if_none(row)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn list_enabled_tools(&self, user: &str) -> Result<Vec<ToolDef>, StoreError> {
        let db_path = self.db_path.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let mut stmt = db
                .prepare(
                    "SELECT id, mcp_server_id, name, description, input_schema, require_approval, is_enabled
                     FROM tools WHERE user = ?1 AND is_enabled = 1",
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let rows = stmt
                .query_map(params![user], map_tool_row)
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                match row {
                    Ok(t) => out.push(t),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable tool row"),
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn delete_tool(&self, id: &str, user: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let (id, user) = (id.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let deleted = db
                .execute(
                    "DELETE FROM tools WHERE id = ?1 AND user = ?2",
                    params![id, user],
                )
                .map_err(|e| StoreError::Io(e.to_string()))?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn get_settings(&self, user: &str) -> Result<Settings, StoreError> {
        let db_path = self.db_path.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            let row = db
                .query_row(
                    "SELECT user, system_prompt, default_model, reasoning_effort, attachment_ocr_only, ocr_model
                     FROM settings WHERE user = ?1",
                    params![user],
                    |r| {
                        Ok(Settings {
                            user: r.get(0)?,
                            system_prompt: r.get(1)?,
                            default_model: r.get(2)?,
                            reasoning_effort: effort_from_str(&r.get::<_, String>(3)?),
                            attachment_ocr_only: r.get(4)?,
                            ocr_model: r.get(5)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(row.unwrap_or_else(|| Settings::default_for(&user)))
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || {
            let db = Connection::open(&db_path).map_err(|e| StoreError::Io(e.to_string()))?;
            db.execute(
                "INSERT INTO settings (user, system_prompt, default_model, reasoning_effort, attachment_ocr_only, ocr_model)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user) DO UPDATE SET system_prompt = excluded.system_prompt,
                     default_model = excluded.default_model, reasoning_effort = excluded.reasoning_effort,
                     attachment_ocr_only = excluded.attachment_ocr_only, ocr_model = excluded.ocr_model",
                params![
                    settings.user,
                    settings.system_prompt,
                    settings.default_model,
                    effort_to_str(settings.reasoning_effort),
                    settings.attachment_ocr_only,
                    settings.ocr_model,
                ],
            )
            .map_err(|e| StoreError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }
}

fn map_message_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Message, StoreError>> {
    let role_str: String = r.get(2)?;
    let parent_id: ParentId = r.get(4)?;
    Ok(role_from_str(&role_str).map(|role| Message {
        id: r.get(0).unwrap_or_default(),
        conv_id: r.get(1).unwrap_or_default(),
        role,
        model: r.get(3).unwrap_or_default(),
        parent_id,
        content: r.get(5).unwrap_or_default(),
        reasoning: r.get(6).unwrap_or_default(),
        error: r.get(7).unwrap_or_default(),
    }))
}

fn map_tool_call_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Result<ToolCall, StoreError>> {
    let status_str: String = r.get(7)?;
    Ok(status_from_str(&status_str).map(|status| ToolCall {
        id: r.get(0).unwrap_or_default(),
        reference_id: r.get(1).unwrap_or_default(),
        conv_id: r.get(2).unwrap_or_default(),
        message_id: r.get(3).unwrap_or_default(),
        name: r.get(4).unwrap_or_default(),
        args: r.get(5).unwrap_or_default(),
        output: r.get(6).unwrap_or_default(),
        status,
    }))
}

fn map_file_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<File> {
    Ok(File {
        id: r.get(0)?,
        name: r.get(1)?,
        mime_type: r.get(2)?,
        size: r.get(3)?,
        path: r.get(4)?,
        url: r.get(5)?,
        content: r.get(6)?,
        user: r.get(7)?,
        created_at: r.get(8)?,
        uploaded_at: r.get(9)?,
    })
}

fn map_tool_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<ToolDef> {
    Ok(ToolDef {
        id: r.get(0)?,
        mcp_server_id: r.get(1)?,
        name: r.get(2)?,
        description: r.get(3)?,
        input_schema: r.get(4)?,
        require_approval: r.get(5)?,
        is_enabled: r.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcore.db");
        let store = SqliteStore::new(&path).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn conversation_round_trip_and_ordering() {
        let (_dir, store) = new_store();
        store
            .save_conversation(&Conversation {
                id: "c1".into(),
                user: "alice".into(),
                title: "first".into(),
                created_at: 1,
                updated_at: 1,
            })
            .await
            .unwrap();
        store
            .save_conversation(&Conversation {
                id: "c2".into(),
                user: "alice".into(),
                title: "second".into(),
                created_at: 2,
                updated_at: 5,
            })
            .await
            .unwrap();

        let list = store.list_conversations("alice").await.unwrap();
        assert_eq!(list[0].id, "c2");
        assert_eq!(list[1].id, "c1");

        let err = store.get_conversation("c1", "bob").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn message_insert_assigns_monotonic_id() {
        let (_dir, store) = new_store();
        store
            .save_conversation(&Conversation {
                id: "c1".into(),
                user: "alice".into(),
                title: "t".into(),
                created_at: 1,
                updated_at: 1,
            })
            .await
            .unwrap();

        let id1 = store
            .save_message(&Message {
                id: 0,
                conv_id: "c1".into(),
                role: Role::User,
                model: None,
                parent_id: None,
                content: "hi".into(),
                reasoning: None,
                error: None,
            })
            .await
            .unwrap();
        let id2 = store
            .save_message(&Message {
                id: 0,
                conv_id: "c1".into(),
                role: Role::Assistant,
                model: Some("openai-x/gpt-4o".into()),
                parent_id: Some(id1),
                content: "hello".into(),
                reasoning: None,
                error: None,
            })
            .await
            .unwrap();

        assert!(id2 > id1);
        let messages = store.list_messages_by_conversation("c1", "alice").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, id1);
        assert_eq!(messages[1].parent_id, Some(id1));
    }

    #[tokio::test]
    async fn settings_defaults_when_absent() {
        let (_dir, store) = new_store();
        let settings = store.get_settings("alice").await.unwrap();
        assert_eq!(settings.user, "alice");
        assert_eq!(settings.reasoning_effort, ReasoningEffort::Disabled);
    }

    #[tokio::test]
    async fn delete_conversation_cascades_messages_and_tool_calls() {
        let (_dir, store) = new_store();
        store
            .save_conversation(&Conversation {
                id: "c1".into(),
                user: "alice".into(),
                title: "t".into(),
                created_at: 1,
                updated_at: 1,
            })
            .await
            .unwrap();
        let msg_id = store
            .save_message(&Message {
                id: 0,
                conv_id: "c1".into(),
                role: Role::User,
                model: None,
                parent_id: None,
                content: "hi".into(),
                reasoning: None,
                error: None,
            })
            .await
            .unwrap();
        store
            .save_tool_call(&ToolCall {
                id: "call1".into(),
                reference_id: "ref1".into(),
                conv_id: "c1".into(),
                message_id: msg_id,
                name: "fs.delete".into(),
                args: "{}".into(),
                output: None,
                status: ToolCallStatus::Pending,
            })
            .await
            .unwrap();

        store.delete_conversation("c1", "alice").await.unwrap();

        let messages = store.list_messages_by_conversation("c1", "alice").await.unwrap();
        assert!(messages.is_empty());
        let err = store.get_tool_call("call1", "alice").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
