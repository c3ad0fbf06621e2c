//! Turns a `(conversation, leaf message)` pair into the ordered prompt sequence a
//! [`crate::provider::ProviderClient`] can serialize to the remote.

use serde::Serialize;

use crate::error::CoreError;
use crate::model::{File, MessageId, Role, ToolCall, ToolCallStatus, ToolDef};
use crate::store::Store;
use crate::tree::MessageTree;

/// One turn in the assembled prompt. Mirrors the provider wire roles, plus `Tool`
/// for a synthesized tool-result turn inlined after its owning assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum PromptTurn {
    System {
        content: String,
    },
    User {
        content: String,
        /// Inline image URLs for `image/*` attachments.
        images: Vec<String>,
    },
    Assistant {
        content: String,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

/// The tool catalog is attached out-of-band, not as part of the message sequence —
/// the ProviderClient passes it to the remote as a parallel parameter.
pub struct Prompt {
    pub turns: Vec<PromptTurn>,
    pub tool_catalog: Vec<ToolDef>,
}

pub struct ContextBuilder<'a> {
    store: &'a dyn Store,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        ContextBuilder { store }
    }

    /// Builds the prompt for `leaf_msg_id` in `conv_id`, scoped to `user`.
    ///
    /// `exclude_leaf` skips the leaf message itself from the history — used when the
    /// leaf is the not-yet-sent turn currently being generated.
    pub async fn build(
        &self,
        conv_id: &str,
        user: &str,
        leaf_msg_id: MessageId,
        system_prompt: &str,
        exclude_leaf: bool,
    ) -> Result<Prompt, CoreError> {
        let messages = self
            .store
            .list_messages_by_conversation(conv_id, user)
            .await?;
        let tree = MessageTree::from_messages(messages);
        let mut path = tree.path_to_root(leaf_msg_id)?;
        if exclude_leaf {
            path.pop();
        }

        let mut turns = vec![PromptTurn::System {
            content: system_prompt.to_string(),
        }];

        for msg_id in path {
            let msg = tree
                .get(msg_id)
                .ok_or_else(|| CoreError::Internal(format!("message {msg_id} vanished mid-build")))?;
            match msg.role {
                Role::User => {
                    let attachments = self.store.list_attachments_by_message(msg_id).await?;
                    let mut content = msg.content.clone();
                    let mut images = Vec::new();
                    for attachment in attachments {
                        let file = self
                            .store
                            .get_file(&attachment.file_id, user)
                            .await
                            .map_err(CoreError::from)?;
                        append_attachment(&file, &mut content, &mut images)?;
                    }
                    turns.push(PromptTurn::User { content, images });
                }
                Role::Assistant => {
                    turns.push(PromptTurn::Assistant {
                        content: msg.content.clone(),
                    });
                    let calls = self.store.list_tool_calls_by_message(msg_id, user).await?;
                    for call in calls {
                        if let Some(turn) = finalized_tool_turn(&call) {
                            turns.push(turn);
                        }
                    }
                }
                // System/tool rows don't feed the walk directly: the configured system
                // prompt above stands in for `system`, and tool output is carried by
                // ToolCall rows attached to the owning assistant message.
                Role::System | Role::Tool => {}
            }
        }

        let tool_catalog = self.store.list_enabled_tools(user).await?;
        Ok(Prompt { turns, tool_catalog })
    }
}

fn append_attachment(
    file: &File,
    content: &mut String,
    images: &mut Vec<String>,
) -> Result<(), CoreError> {
    if file.mime_type.starts_with("image/") {
        images.push(file.url.clone());
    } else if !file.content.is_empty() {
        content.push_str("\n\n--- attachment: ");
        content.push_str(&file.name);
        content.push_str(" ---\n");
        content.push_str(&file.content);
    } else {
        return Err(CoreError::AttachmentNotReady(file.id.clone()));
    }
    Ok(())
}

fn finalized_tool_turn(call: &ToolCall) -> Option<PromptTurn> {
    match call.status {
        ToolCallStatus::Executed | ToolCallStatus::Rejected | ToolCallStatus::Failed => {
            Some(PromptTurn::Tool {
                call_id: call.id.clone(),
                content: call.output.clone().unwrap_or_default(),
            })
        }
        ToolCallStatus::Pending | ToolCallStatus::AwaitingApproval => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Conversation, Message};
    use crate::store::SqliteStore;

    async fn seeded_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("db.sqlite")).unwrap();
        store
            .save_conversation(&Conversation {
                id: "c1".into(),
                user: "alice".into(),
                title: "t".into(),
                created_at: 0,
                updated_at: 0,
            })
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn build_is_deterministic_across_repeated_calls() {
        let (_dir, store) = seeded_store().await;
        let user_id = store
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
        let assistant_id = store
            .save_message(&Message {
                id: 0,
                conv_id: "c1".into(),
                role: Role::Assistant,
                model: Some("openai-x/gpt-4o".into()),
                parent_id: Some(user_id),
                content: "hello".into(),
                reasoning: None,
                error: None,
            })
            .await
            .unwrap();

        let builder = ContextBuilder::new(&store);
        let first = builder
            .build("c1", "alice", assistant_id, "be helpful", false)
            .await
            .unwrap();
        let second = builder
            .build("c1", "alice", assistant_id, "be helpful", false)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_string(&first.turns).unwrap(),
            serde_json::to_string(&second.turns).unwrap()
        );
        assert_eq!(first.turns[0], PromptTurn::System { content: "be helpful".into() });
    }

    #[tokio::test]
    async fn unresolved_non_image_attachment_fails_fast() {
        let (_dir, store) = seeded_store().await;
        store
            .save_file(&File {
                id: "f1".into(),
                name: "doc.pdf".into(),
                mime_type: "application/pdf".into(),
                size: 10,
                path: "/tmp/f1".into(),
                url: "https://example/f1".into(),
                content: String::new(),
                user: "alice".into(),
                created_at: 0,
                uploaded_at: 0,
            })
            .await
            .unwrap();
        let user_msg_id = store
            .save_message(&Message {
                id: 0,
                conv_id: "c1".into(),
                role: Role::User,
                model: None,
                parent_id: None,
                content: "see attached".into(),
                reasoning: None,
                error: None,
            })
            .await
            .unwrap();
        store
            .save_attachment("a1", user_msg_id, "f1")
            .await
            .unwrap();

        let builder = ContextBuilder::new(&store);
        let err = builder
            .build("c1", "alice", user_msg_id, "sys", false)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AttachmentNotReady(_)));
    }
}
