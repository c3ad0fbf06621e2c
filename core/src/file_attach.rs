//! Resolves attachments to model-visible content before a turn's first prompt.
//!
//! Extraction is idempotent: a file whose `content` is already non-empty is
//! returned untouched.

use std::path::Path;

use crate::context_builder::PromptTurn;
use crate::error::CoreError;
use crate::model::{File, MessageId, ReasoningEffort, Settings};
use crate::provider::{CompletionParams, ProviderClient};
use crate::store::Store;
use crate::stream_mux::DiscardSink;

/// Bound on how much of a `text/*` file is read into `content`.
const MAX_TEXT_BYTES: usize = 1024 * 1024;

const OCR_SYSTEM_PROMPT: &str =
    "You are an OCR assistant. Transcribe all visible text in the image exactly, with no commentary.";

/// Resolves every attachment on `message_id`, writing extracted `content` back to
/// the `Store`. Must run before [`crate::context_builder::ContextBuilder::build`]
/// is called for the turn.
pub async fn resolve_attachments(
    store: &dyn Store,
    provider: Option<&dyn ProviderClient>,
    user: &str,
    message_id: MessageId,
    settings: &Settings,
    deadline: std::time::Duration,
) -> Result<(), CoreError> {
    let attachments = store.list_attachments_by_message(message_id).await?;
    for attachment in attachments {
        let file = match store.get_file(&attachment.file_id, user).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(file_id = %attachment.file_id, error = %e, "skipping unresolvable attachment");
                continue;
            }
        };
        if !file.content.is_empty() {
            continue;
        }
        // Extraction failures are logged and skipped, not propagated: a non-image
        // attachment whose content stays empty is caught downstream by
        // ContextBuilder's AttachmentNotReady fail-fast.
        match extract(&file, provider, user, settings, deadline).await {
            Ok(Some(content)) => {
                if let Err(e) = store.set_file_content(&file.id, user, &content).await {
                    tracing::warn!(file_id = %file.id, error = %e, "failed to persist extracted content");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(file_id = %file.id, error = %e, "attachment extraction failed");
            }
        }
    }
    Ok(())
}

async fn extract(
    file: &File,
    provider: Option<&dyn ProviderClient>,
    user: &str,
    settings: &Settings,
    deadline: std::time::Duration,
) -> Result<Option<String>, CoreError> {
    if file.mime_type.starts_with("text/") {
        return Ok(Some(read_bounded_text(&file.path)?));
    }
    if file.mime_type == "application/pdf" {
        return Ok(Some(extract_pdf_text(&file.path)?));
    }
    if file.mime_type.starts_with("image/") {
        if settings.attachment_ocr_only {
            if let (Some(provider), Some(model)) = (provider, &settings.ocr_model) {
                return Ok(Some(ocr_image(provider, user, model, &file.url, deadline).await?));
            }
        }
        return Ok(None);
    }
    Ok(None)
}

/// Reads up to [`MAX_TEXT_BYTES`] of a text file as UTF-8, lossily.
fn read_bounded_text(path: &str) -> Result<String, CoreError> {
    use std::io::Read;
    let mut file = std::fs::File::open(Path::new(path))
        .map_err(|e| CoreError::Internal(format!("opening attachment {path}: {e}")))?;
    let mut buf = vec![0u8; MAX_TEXT_BYTES];
    let n = file
        .read(&mut buf)
        .map_err(|e| CoreError::Internal(format!("reading attachment {path}: {e}")))?;
    buf.truncate(n);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Extracts text from a PDF. Placeholder text layer pending a dedicated PDF parser
/// dependency; returns an empty string rather than failing the turn.
fn extract_pdf_text(path: &str) -> Result<String, CoreError> {
    if !Path::new(path).exists() {
        return Err(CoreError::Internal(format!("attachment {path} missing on disk")));
    }
    Ok(String::new())
}

async fn ocr_image(
    provider: &dyn ProviderClient,
    user: &str,
    model: &str,
    image_url: &str,
    deadline: std::time::Duration,
) -> Result<String, CoreError> {
    let prompt = crate::context_builder::Prompt {
        turns: vec![
            PromptTurn::System {
                content: OCR_SYSTEM_PROMPT.to_string(),
            },
            PromptTurn::User {
                content: String::new(),
                images: vec![image_url.to_string()],
            },
        ],
        tool_catalog: Vec::new(),
    };
    let params = CompletionParams {
        prompt,
        model: model.to_string(),
        reasoning_effort: ReasoningEffort::Disabled,
        user: user.to_string(),
        deadline,
    };
    let mut sink = DiscardSink;
    let result = provider.complete_stream(params, &mut sink).await?;
    Ok(result.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_bounded_text_truncates_to_the_cap() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&vec![b'a'; MAX_TEXT_BYTES + 10]).unwrap();
        let text = read_bounded_text(tmp.path().to_str().unwrap()).unwrap();
        assert_eq!(text.len(), MAX_TEXT_BYTES);
    }

    #[tokio::test]
    async fn text_attachment_is_extracted_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::store::SqliteStore::new(dir.path().join("db.sqlite")).unwrap();
        let file_path = dir.path().join("note.txt");
        std::fs::write(&file_path, "hello world").unwrap();

        store
            .save_conversation(&crate::model::Conversation {
                id: "c1".into(),
                user: "alice".into(),
                title: "t".into(),
                created_at: 0,
                updated_at: 0,
            })
            .await
            .unwrap();
        let msg_id = store
            .save_message(&crate::model::Message {
                id: 0,
                conv_id: "c1".into(),
                role: crate::model::Role::User,
                model: None,
                parent_id: None,
                content: "see attached".into(),
                reasoning: None,
                error: None,
            })
            .await
            .unwrap();
        store
            .save_file(&File {
                id: "f1".into(),
                name: "note.txt".into(),
                mime_type: "text/plain".into(),
                size: 11,
                path: file_path.to_str().unwrap().to_string(),
                url: "https://example/f1".into(),
                content: String::new(),
                user: "alice".into(),
                created_at: 0,
                uploaded_at: 0,
            })
            .await
            .unwrap();
        store.save_attachment("a1", msg_id, "f1").await.unwrap();

        let settings = Settings::default_for("alice");
        resolve_attachments(&store, None, "alice", msg_id, &settings, std::time::Duration::from_secs(1))
            .await
            .unwrap();
        let file = store.get_file("f1", "alice").await.unwrap();
        assert_eq!(file.content, "hello world");

        // Second pass must not re-read the file; corrupt it to prove idempotence.
        std::fs::write(&file_path, "corrupted").unwrap();
        resolve_attachments(&store, None, "alice", msg_id, &settings, std::time::Duration::from_secs(1))
            .await
            .unwrap();
        let file = store.get_file("f1", "alice").await.unwrap();
        assert_eq!(file.content, "hello world");
    }
}
