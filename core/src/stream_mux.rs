//! Owns the SSE wire format: typed chunks written one at a time to a client writer
//! that exposes flush.
//!
//! Framing: `metadata`, `complete`, `error` are emitted with a named `event:` line;
//! every other chunk emits only `data:`. Every chunk is followed by a blank line and
//! an explicit flush.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::provider::CompletionStats;

/// A tool call chunk forwarded to the client the moment its arguments parse as valid JSON.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallChunk {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

/// Sink for provider stream deltas, implemented by a ToolLoop-owned adapter over
/// [`StreamMux`] for the live SSE path, and by a no-op discard sink for the
/// recursive OCR call (§4.7).
#[async_trait]
pub trait DeltaSink: Send {
    async fn content(&mut self, text: &str);
    async fn reasoning(&mut self, text: &str);
    async fn tool_call(&mut self, call: &ToolCallChunk);
}

/// A sink that drops every delta — used by FileAttach's recursive OCR completion so
/// it never leaks SSE chunks to the outer client.
pub struct DiscardSink;

#[async_trait]
impl DeltaSink for DiscardSink {
    async fn content(&mut self, _text: &str) {}
    async fn reasoning(&mut self, _text: &str) {}
    async fn tool_call(&mut self, _call: &ToolCallChunk) {}
}

/// A writer a [`StreamMux`] can flush chunks to. `write_line` receives one fully
/// framed `data:`/`event:` block (including the trailing blank line); the caller
/// flushes after every write.
#[async_trait]
pub trait ChunkWriter: Send {
    async fn write_line(&mut self, line: String) -> std::io::Result<()>;
    async fn flush(&mut self) -> std::io::Result<()>;
}

/// Writes the typed SSE chunks from §4.4 to a [`ChunkWriter`], tracking whether a
/// terminal chunk (`complete`/`error`) has already gone out so later writes are
/// refused.
pub struct StreamMux<'w> {
    writer: &'w mut dyn ChunkWriter,
    terminated: bool,
}

impl<'w> StreamMux<'w> {
    pub fn new(writer: &'w mut dyn ChunkWriter) -> Self {
        StreamMux {
            writer,
            terminated: false,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    async fn write_event(&mut self, event: &str, payload: serde_json::Value) -> std::io::Result<()> {
        let line = format!(
            "event: {event}\ndata: {}\n\n",
            json!({ event: payload })
        );
        self.writer.write_line(line).await?;
        self.writer.flush().await
    }

    async fn write_data(&mut self, event: &str, payload: serde_json::Value) -> std::io::Result<()> {
        let line = format!("data: {}\n\n", json!({ event: payload }));
        self.writer.write_line(line).await?;
        self.writer.flush().await
    }

    /// Emitted exactly once, first.
    pub async fn metadata(&mut self, conversation_id: &str, user_message_id: i64) -> std::io::Result<()> {
        self.write_event(
            "metadata",
            json!({ "conversationId": conversation_id, "userMessageId": user_message_id }),
        )
        .await
    }

    pub async fn content(&mut self, delta: &str) -> std::io::Result<()> {
        self.write_data("content", json!(delta)).await
    }

    pub async fn reasoning(&mut self, delta: &str) -> std::io::Result<()> {
        self.write_data("reasoning", json!(delta)).await
    }

    /// Emitted when a tool call is fully parsed.
    pub async fn tool_call(&mut self, call: &ToolCallChunk) -> std::io::Result<()> {
        self.write_data(
            "tool_call",
            json!({ "id": call.id, "name": call.name, "args": call.args }),
        )
        .await
    }

    /// Emitted after the tool executes, with either `output` or `error`.
    pub async fn tool_output(&mut self, call_id: &str, output: Result<&str, &str>) -> std::io::Result<()> {
        let payload = match output {
            Ok(output) => json!({ "callId": call_id, "output": output }),
            Err(error) => json!({ "callId": call_id, "error": error }),
        };
        self.write_data("tool_output", payload).await
    }

    /// Emitted when the loop suspends for human approval.
    pub async fn awaiting_approval(&mut self, call_id: &str) -> std::io::Result<()> {
        self.write_data("awaiting_approval", json!({ "callId": call_id }))
            .await
    }

    /// Fatal for the current stream. Emitted at most once; no chunks may follow.
    pub async fn error(&mut self, message: &str, code: Option<&str>) -> std::io::Result<()> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;
        self.write_event("error", json!({ "message": message, "code": code }))
            .await
    }

    /// Emitted exactly once, last, unless `error` was already emitted.
    pub async fn complete(
        &mut self,
        user_message_id: i64,
        assistant_message_id: i64,
        stats: &CompletionStats,
    ) -> std::io::Result<()> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;
        self.write_event(
            "complete",
            json!({
                "userMessageId": user_message_id,
                "assistantMessageId": assistant_message_id,
                "stats": {
                    "promptTokens": stats.prompt_tokens,
                    "completionTokens": stats.completion_tokens,
                    "durationSecs": stats.duration_secs,
                    "speed": stats.speed,
                },
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingWriter {
        lines: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ChunkWriter for RecordingWriter {
        async fn write_line(&mut self, line: String) -> std::io::Result<()> {
            self.lines.lock().unwrap().push(line);
            Ok(())
        }
        async fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn metadata_complete_and_error_carry_event_lines() {
        let mut writer = RecordingWriter::default();
        let lines = writer.lines.clone();
        {
            let mut mux = StreamMux::new(&mut writer);
            mux.metadata("c1", 1).await.unwrap();
            mux.content("hel").await.unwrap();
            mux.content("lo").await.unwrap();
            mux.complete(1, 2, &CompletionStats::finalize(10, 5, 2.0))
                .await
                .unwrap();
        }
        let lines = lines.lock().unwrap();
        assert!(lines[0].starts_with("event: metadata\n"));
        assert!(lines[1].starts_with("data: "));
        assert!(!lines[1].starts_with("event:"));
        assert!(lines.last().unwrap().starts_with("event: complete\n"));
    }

    #[tokio::test]
    async fn no_chunks_follow_complete_or_error() {
        let mut writer = RecordingWriter::default();
        let lines = writer.lines.clone();
        {
            let mut mux = StreamMux::new(&mut writer);
            mux.complete(1, 2, &CompletionStats::default()).await.unwrap();
            mux.error("should not appear", None).await.unwrap();
        }
        assert_eq!(lines.lock().unwrap().len(), 1);
    }
}
