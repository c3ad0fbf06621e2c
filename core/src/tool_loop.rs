//! The central per-turn state machine:
//! `Prompting -> (Executing <-> Prompting)* -> (Awaiting -> Prompting)* -> Done | Failed`.
//!
//! Runs as a single cooperative task: provider streaming, StreamMux writes, tool
//! execution, and approval waits all happen here, in order, with no fan-out.

use std::time::Duration;

use async_trait::async_trait;

use crate::approval_registry::{ApprovalRegistry, Decision};
use crate::context_builder::ContextBuilder;
use crate::error::CoreError;
use crate::model::{split_model_id, Message, MessageId, Role, Settings, ToolCall, ToolCallStatus, ToolDef};
use crate::provider::{CompletionParams, OpenAiCompatClient, ProviderClient};
use crate::store::Store;
use crate::stream_mux::{DeltaSink, StreamMux, ToolCallChunk};
use crate::tool_source::{McpToolSource, ToolSource};

pub struct ToolLoop<'a> {
    store: &'a dyn Store,
    approvals: &'a ApprovalRegistry,
    approval_timeout: Duration,
    provider_timeout: Duration,
    /// Hard cap on model↔tool round trips in a single turn.
    tool_loop_limit: usize,
}

/// Forwards provider stream deltas to the client via [`StreamMux`] while also
/// buffering them, so a mid-stream provider failure still leaves us with whatever
/// content/reasoning/tool-call fragments arrived before it.
struct AccumulatingMuxSink<'m, 'w> {
    mux: &'m mut StreamMux<'w>,
    content: String,
    reasoning: String,
    tool_calls: Vec<ToolCallChunk>,
}

impl<'m, 'w> AccumulatingMuxSink<'m, 'w> {
    fn new(mux: &'m mut StreamMux<'w>) -> Self {
        AccumulatingMuxSink {
            mux,
            content: String::new(),
            reasoning: String::new(),
            tool_calls: Vec::new(),
        }
    }

    /// Consumes the sink, releasing its borrow of `mux` immediately so the caller
    /// can use it again right away.
    fn into_parts(self) -> (String, String, Vec<ToolCallChunk>) {
        (self.content, self.reasoning, self.tool_calls)
    }
}

#[async_trait]
impl<'m, 'w> DeltaSink for AccumulatingMuxSink<'m, 'w> {
    async fn content(&mut self, text: &str) {
        self.content.push_str(text);
        if let Err(e) = self.mux.content(text).await {
            tracing::warn!(error = %e, "client writer failed on content chunk, continuing in background");
        }
    }

    async fn reasoning(&mut self, text: &str) {
        self.reasoning.push_str(text);
        if let Err(e) = self.mux.reasoning(text).await {
            tracing::warn!(error = %e, "client writer failed on reasoning chunk, continuing in background");
        }
    }

    async fn tool_call(&mut self, call: &ToolCallChunk) {
        self.tool_calls.push(call.clone());
        if let Err(e) = self.mux.tool_call(call).await {
            tracing::warn!(error = %e, "client writer failed on tool_call chunk, continuing in background");
        }
    }
}

/// Outcome of resolving one tool call, independent of approval path.
struct Resolution {
    status: ToolCallStatus,
    output: String,
}

impl<'a> ToolLoop<'a> {
    pub fn new(
        store: &'a dyn Store,
        approvals: &'a ApprovalRegistry,
        approval_timeout: Duration,
        provider_timeout: Duration,
        tool_loop_limit: usize,
    ) -> Self {
        ToolLoop {
            store,
            approvals,
            approval_timeout,
            provider_timeout,
            tool_loop_limit,
        }
    }

    /// Runs the turn rooted at the already-persisted user message `user_msg_id`.
    /// Always returns `Ok(())`: failures are terminal states of the state machine,
    /// reported via the `error` SSE chunk, not propagated to the caller.
    pub async fn run(
        &self,
        mux: &mut StreamMux<'_>,
        conv_id: &str,
        user: &str,
        user_msg_id: MessageId,
        model: &str,
        settings: &Settings,
    ) -> Result<(), CoreError> {
        if let Err(e) = mux.metadata(conv_id, user_msg_id).await {
            tracing::warn!(error = %e, "client writer failed on metadata chunk, continuing in background");
        }

        if let Err(e) = crate::file_attach::resolve_attachments(
            self.store,
            None,
            user,
            user_msg_id,
            settings,
            self.provider_timeout,
        )
        .await
        {
            self.fail_turn(mux, conv_id, user_msg_id, model, &e).await;
            return Ok(());
        }

        let mut current_leaf = user_msg_id;
        for cycle in 0..self.tool_loop_limit {
            match self.prompting_cycle(mux, conv_id, user, current_leaf, model, settings).await {
                Ok(CycleOutcome::Done { user_msg_id, assistant_msg_id, stats }) => {
                    if let Err(e) = mux.complete(user_msg_id, assistant_msg_id, &stats).await {
                        tracing::warn!(error = %e, "client writer failed on complete chunk");
                    }
                    return Ok(());
                }
                Ok(CycleOutcome::Continue { next_leaf }) => {
                    current_leaf = next_leaf;
                }
                Ok(CycleOutcome::AlreadyFailed(e)) => {
                    if let Err(write_err) = mux.error(&e.to_string(), Some(error_code(&e))).await {
                        tracing::warn!(error = %write_err, "client writer failed on error chunk");
                    }
                    return Ok(());
                }
                Err(e) => {
                    self.fail_turn(mux, conv_id, current_leaf, model, &e).await;
                    return Ok(());
                }
            }
            if cycle + 1 == self.tool_loop_limit {
                self.fail_turn(mux, conv_id, current_leaf, model, &CoreError::ToolLoopLimit)
                    .await;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Persists an assistant row carrying `error`, scoped to whatever text had
    /// already streamed, and emits the `error` SSE chunk.
    async fn fail_turn(
        &self,
        mux: &mut StreamMux<'_>,
        conv_id: &str,
        parent: MessageId,
        model: &str,
        error: &CoreError,
    ) {
        let message = Message {
            id: 0,
            conv_id: conv_id.to_string(),
            role: Role::Assistant,
            model: Some(model.to_string()),
            parent_id: Some(parent),
            content: String::new(),
            reasoning: None,
            error: Some(error.to_string()),
        };
        if let Err(e) = self.store.save_message(&message).await {
            tracing::warn!(error = %e, "failed to persist failed-turn assistant message");
        }
        if let Err(e) = mux.error(&error.to_string(), Some(error_code(error))).await {
            tracing::warn!(error = %e, "client writer failed on error chunk");
        }
    }

    /// One Prompting step plus its Executing/Awaiting sub-steps.
    async fn prompting_cycle(
        &self,
        mux: &mut StreamMux<'_>,
        conv_id: &str,
        user: &str,
        leaf: MessageId,
        model: &str,
        settings: &Settings,
    ) -> Result<CycleOutcome, CoreError> {
        let prompt = ContextBuilder::new(self.store)
            .build(conv_id, user, leaf, &settings.system_prompt, false)
            .await?;

        let (provider_id, model_name) =
            split_model_id(model).ok_or_else(|| CoreError::BadRequest(format!("malformed model id: {model}")))?;
        let provider_row = self.store.get_provider(provider_id, user).await?;
        let client = OpenAiCompatClient::new(&provider_row.base_url, provider_row.api_key.as_deref());

        let params = CompletionParams {
            prompt,
            model: model_name.to_string(),
            reasoning_effort: settings.reasoning_effort,
            user: user.to_string(),
            deadline: self.provider_timeout,
        };

        let mut sink = AccumulatingMuxSink::new(mux);
        let result = client.complete_stream(params, &mut sink).await;
        let (content, reasoning, tool_call_chunks) = sink.into_parts();

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                // Persist whatever streamed before the fatal error, then propagate so
                // `run` emits the terminal `error` chunk.
                let message = Message {
                    id: 0,
                    conv_id: conv_id.to_string(),
                    role: Role::Assistant,
                    model: Some(model.to_string()),
                    parent_id: Some(leaf),
                    content,
                    reasoning: if reasoning.is_empty() { None } else { Some(reasoning) },
                    error: Some(e.to_string()),
                };
                self.store.save_message(&message).await?;
                return Ok(CycleOutcome::AlreadyFailed(CoreError::from(e)));
            }
        };
        let _ = tool_call_chunks;

        let assistant_msg = Message {
            id: 0,
            conv_id: conv_id.to_string(),
            role: Role::Assistant,
            model: Some(model.to_string()),
            parent_id: Some(leaf),
            content: result.content,
            reasoning: result.reasoning,
            error: None,
        };
        let assistant_id = self.store.save_message(&assistant_msg).await?;

        if result.tool_calls.is_empty() {
            return Ok(CycleOutcome::Done {
                user_msg_id: leaf,
                assistant_msg_id: assistant_id,
                stats: result.stats,
            });
        }

        for call in &result.tool_calls {
            let row = ToolCall {
                id: call.id.clone(),
                reference_id: call.reference_id.clone(),
                conv_id: conv_id.to_string(),
                message_id: assistant_id,
                name: call.name.clone(),
                args: call.args.clone(),
                output: None,
                status: ToolCallStatus::Pending,
            };
            self.store.save_tool_call(&row).await?;
        }

        for call in &result.tool_calls {
            self.resolve_call(mux, user, &call.id, &call.name, &call.args).await?;
        }

        Ok(CycleOutcome::Continue { next_leaf: assistant_id })
    }

    /// Executing/Awaiting for one persisted, still-pending tool call.
    async fn resolve_call(
        &self,
        mux: &mut StreamMux<'_>,
        user: &str,
        call_id: &str,
        name: &str,
        args: &str,
    ) -> Result<(), CoreError> {
        let tool_def = match self.store.get_tool_by_name(name, user).await {
            Ok(tool_def) => tool_def,
            Err(_) => {
                return self
                    .finish_call(mux, user, call_id, Resolution {
                        status: ToolCallStatus::Failed,
                        output: "unknown tool".to_string(),
                    })
                    .await;
            }
        };

        if tool_def.require_approval {
            self.store
                .update_tool_call_status(call_id, user, ToolCallStatus::AwaitingApproval)
                .await?;
            if let Err(e) = mux.awaiting_approval(call_id).await {
                tracing::warn!(error = %e, "client writer failed on awaiting_approval chunk");
            }
            let decision = self.approvals.wait(user, call_id, self.approval_timeout).await;
            let resolution = match decision {
                Some(Decision::Approved) => self.execute(&tool_def, args, user).await,
                Some(Decision::Rejected) => Resolution {
                    status: ToolCallStatus::Rejected,
                    output: "rejected by user".to_string(),
                },
                None => Resolution {
                    status: ToolCallStatus::Failed,
                    output: "approval timeout".to_string(),
                },
            };
            self.finish_call(mux, user, call_id, resolution).await
        } else {
            let resolution = self.execute(&tool_def, args, user).await;
            self.finish_call(mux, user, call_id, resolution).await
        }
    }

    async fn execute(&self, tool_def: &ToolDef, args: &str, user: &str) -> Resolution {
        let args_value: serde_json::Value = serde_json::from_str(args).unwrap_or(serde_json::Value::Null);
        match self.call_tool(tool_def, args_value, user).await {
            Ok(output) => Resolution {
                status: ToolCallStatus::Executed,
                output,
            },
            Err(e) => Resolution {
                status: ToolCallStatus::Failed,
                output: e.to_string(),
            },
        }
    }

    /// Dials the owning MCP server fresh for this one call, matching the Store's
    /// one-connection-per-operation idiom.
    async fn call_tool(&self, tool_def: &ToolDef, args: serde_json::Value, user: &str) -> Result<String, CoreError> {
        let server = self.store.get_mcp_server(&tool_def.mcp_server_id, user).await?;
        let source = McpToolSource::connect(&server).await.map_err(CoreError::from)?;
        let content = source.call_tool(&tool_def.name, args).await.map_err(CoreError::from)?;
        Ok(content.text)
    }

    async fn finish_call(
        &self,
        mux: &mut StreamMux<'_>,
        user: &str,
        call_id: &str,
        resolution: Resolution,
    ) -> Result<(), CoreError> {
        self.store.update_tool_call_status(call_id, user, resolution.status).await?;
        self.store.update_tool_call_output(call_id, user, &resolution.output).await?;
        let outcome = if resolution.status == ToolCallStatus::Executed {
            Ok(resolution.output.as_str())
        } else {
            Err(resolution.output.as_str())
        };
        if let Err(e) = mux.tool_output(call_id, outcome).await {
            tracing::warn!(error = %e, "client writer failed on tool_output chunk");
        }
        Ok(())
    }
}

enum CycleOutcome {
    Done {
        user_msg_id: MessageId,
        assistant_msg_id: MessageId,
        stats: crate::provider::CompletionStats,
    },
    Continue {
        next_leaf: MessageId,
    },
    /// The provider call failed mid-stream; the partial assistant message (with
    /// `error` set) was already persisted by `prompting_cycle` itself.
    AlreadyFailed(CoreError),
}

fn error_code(e: &CoreError) -> &'static str {
    match e {
        CoreError::BadRequest(_) => "bad_request",
        CoreError::NotFound(_) => "not_found",
        CoreError::Conflict(_) => "conflict",
        CoreError::ProviderError { .. } => "provider_error",
        CoreError::AttachmentNotReady(_) => "attachment_not_ready",
        CoreError::ToolExecError(_) => "tool_exec_error",
        CoreError::ApprovalTimeout => "approval_timeout",
        CoreError::ToolLoopLimit => "tool_loop_limit",
        CoreError::Internal(_) => "internal",
    }
}
