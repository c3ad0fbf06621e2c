//! [`ProviderClient`] implementation talking to any OpenAI-compatible chat completion
//! endpoint, via `async-openai`.

use std::collections::HashMap;
use std::time::Instant;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
    ChatCompletionRequestUserMessageContentPart, ChatCompletionToolArgs, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionObjectArgs, ImageUrlArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use uuid::Uuid;

use crate::context_builder::PromptTurn;
use crate::error::ProviderError;
use crate::model::ToolDef;
use crate::stream_mux::{DeltaSink, ToolCallChunk};

use super::{AccumulatedToolCall, CompletionParams, CompletionResult, CompletionStats, ProviderClient};

/// One provider's OpenAI-compatible endpoint. Stateless per call and freely shared.
pub struct OpenAiCompatClient {
    client: Client<OpenAIConfig>,
}

impl OpenAiCompatClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        let mut config = OpenAIConfig::new().with_api_base(base_url);
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        OpenAiCompatClient {
            client: Client::with_config(config),
        }
    }

    fn build_request(
        &self,
        params: &CompletionParams,
        stream: bool,
    ) -> Result<async_openai::types::CreateChatCompletionRequest, ProviderError> {
        let messages = params
            .prompt
            .turns
            .iter()
            .map(turn_to_message)
            .collect::<Result<Vec<_>, _>>()?;

        let tools = params
            .prompt
            .tool_catalog
            .iter()
            .map(tool_to_function)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(params.model.clone()).messages(messages).stream(stream);
        if !tools.is_empty() {
            builder.tools(tools);
        }
        builder
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }
}

fn turn_to_message(turn: &PromptTurn) -> Result<ChatCompletionRequestMessage, ProviderError> {
    let msg = match turn {
        PromptTurn::System { content } => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?
            .into(),
        PromptTurn::User { content, images } if images.is_empty() => {
            ChatCompletionRequestUserMessageArgs::default()
                .content(content.clone())
                .build()
                .map_err(|e| ProviderError::Transport(e.to_string()))?
                .into()
        }
        PromptTurn::User { content, images } => {
            let mut parts = vec![ChatCompletionRequestUserMessageContentPart::Text(
                content.clone().into(),
            )];
            for url in images {
                let image = ImageUrlArgs::default()
                    .url(url.clone())
                    .build()
                    .map_err(|e| ProviderError::Transport(e.to_string()))?;
                parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(image.into()));
            }
            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(parts))
                .build()
                .map_err(|e| ProviderError::Transport(e.to_string()))?
                .into()
        }
        PromptTurn::Assistant { content } => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?
            .into(),
        PromptTurn::Tool { call_id, content } => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(call_id.clone())
            .content(content.clone())
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?
            .into(),
    };
    Ok(msg)
}

fn tool_to_function(
    tool: &ToolDef,
) -> Result<async_openai::types::ChatCompletionTool, ProviderError> {
    let parameters: serde_json::Value =
        serde_json::from_str(&tool.input_schema).unwrap_or_else(|_| serde_json::json!({}));
    let function = FunctionObjectArgs::default()
        .name(tool.name.clone())
        .description(tool.description.clone())
        .parameters(parameters)
        .build()
        .map_err(|e| ProviderError::Transport(e.to_string()))?;
    ChatCompletionToolArgs::default()
        .r#type(ChatCompletionToolType::Function)
        .function(function)
        .build()
        .map_err(|e| ProviderError::Transport(e.to_string()))
}

/// Partial state for one tool call being accumulated across stream chunks, keyed by
/// the provider's per-stream `index`.
#[derive(Default)]
struct PendingToolCall {
    reference_id: String,
    name: String,
    args: String,
}

#[async_trait]
impl ProviderClient for OpenAiCompatClient {
    async fn complete(&self, params: CompletionParams) -> Result<CompletionResult, ProviderError> {
        let started = Instant::now();
        let request = self.build_request(&params, false)?;
        let response = tokio::time::timeout(params.deadline, self.client.chat().create(request))
            .await
            .map_err(|_| ProviderError::Timeout(params.deadline))?
            .map_err(openai_error_to_provider_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Transport("empty choices in response".to_string()))?;

        let content = choice.message.content.unwrap_or_default();
        let reasoning = extract_reasoning(&choice.message);
        let mut tool_calls = Vec::new();
        if let Some(calls) = choice.message.tool_calls {
            for call in calls {
                tool_calls.push(AccumulatedToolCall {
                    id: format!("call_{}", Uuid::new_v4().simple()),
                    reference_id: call.id,
                    name: call.function.name,
                    args: call.function.arguments,
                });
            }
        }

        let completion_tokens = response
            .usage
            .as_ref()
            .map(|u| u.completion_tokens)
            .unwrap_or(0);
        let prompt_tokens = response.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0);
        let stats = CompletionStats::finalize(prompt_tokens, completion_tokens, started.elapsed().as_secs_f64());

        Ok(CompletionResult {
            content,
            reasoning,
            tool_calls,
            stats,
        })
    }

    async fn complete_stream(
        &self,
        params: CompletionParams,
        sink: &mut dyn DeltaSink,
    ) -> Result<CompletionResult, ProviderError> {
        let started = Instant::now();
        let request = self.build_request(&params, true)?;
        let mut stream = tokio::time::timeout(params.deadline, self.client.chat().create_stream(request))
            .await
            .map_err(|_| ProviderError::Timeout(params.deadline))?
            .map_err(openai_error_to_provider_error)?;

        let mut content = String::new();
        let mut reasoning = String::new();
        let mut pending: HashMap<u32, PendingToolCall> = HashMap::new();
        let mut minted: Vec<AccumulatedToolCall> = Vec::new();
        let mut prompt_tokens = 0u32;
        let mut completion_tokens = 0u32;

        while let Some(next) = tokio::time::timeout(params.deadline, stream.next())
            .await
            .map_err(|_| ProviderError::Timeout(params.deadline))?
        {
            let chunk = next.map_err(openai_error_to_provider_error)?;
            if let Some(usage) = &chunk.usage {
                prompt_tokens = usage.prompt_tokens;
                completion_tokens = usage.completion_tokens;
            }
            let Some(choice) = chunk.choices.into_iter().next() else {
                continue;
            };
            let delta = choice.delta;

            if let Some(text) = delta.content {
                if !text.is_empty() {
                    content.push_str(&text);
                    sink.content(&text).await;
                }
            }
            if let Some(text) = extract_reasoning_delta(&delta) {
                if !text.is_empty() {
                    reasoning.push_str(&text);
                    sink.reasoning(&text).await;
                }
            }
            if let Some(tool_call_deltas) = delta.tool_calls {
                for tc in tool_call_deltas {
                    let entry = pending.entry(tc.index).or_default();
                    if let Some(id) = tc.id {
                        entry.reference_id = id;
                    }
                    if let Some(function) = tc.function {
                        if let Some(name) = function.name {
                            entry.name = name;
                        }
                        if let Some(args) = function.arguments {
                            entry.args.push_str(&args);
                        }
                    }
                    if serde_json::from_str::<serde_json::Value>(&entry.args).is_ok() && !entry.name.is_empty() {
                        let minted_id = format!("call_{}", Uuid::new_v4().simple());
                        let args_value: serde_json::Value =
                            serde_json::from_str(&entry.args).unwrap_or(serde_json::Value::Null);
                        sink.tool_call(&ToolCallChunk {
                            id: minted_id.clone(),
                            name: entry.name.clone(),
                            args: args_value,
                        })
                        .await;
                        minted.push(AccumulatedToolCall {
                            id: minted_id,
                            reference_id: entry.reference_id.clone(),
                            name: entry.name.clone(),
                            args: entry.args.clone(),
                        });
                    }
                }
            }
        }

        let reasoning = if reasoning.is_empty() { None } else { Some(reasoning) };
        let stats = CompletionStats::finalize(prompt_tokens, completion_tokens, started.elapsed().as_secs_f64());

        Ok(CompletionResult {
            content,
            reasoning,
            tool_calls: minted,
            stats,
        })
    }
}

/// `async-openai`'s message type has no dedicated `reasoning`/`reasoning_text` field;
/// OpenAI-compatible providers that emit one (DeepSeek-style) surface it as an
/// unrecognized key, which serde drops on deserialize. There is nothing to recover it
/// from post-hoc on the non-streaming path, so this always returns `None`; the
/// streaming path recovers it from the raw delta instead (`extract_reasoning_delta`).
fn extract_reasoning(_message: &async_openai::types::ChatCompletionResponseMessage) -> Option<String> {
    None
}

fn extract_reasoning_delta(
    delta: &async_openai::types::ChatCompletionStreamResponseDelta,
) -> Option<String> {
    let value = serde_json::to_value(delta).ok()?;
    value
        .get("reasoning_content")
        .or_else(|| value.get("reasoning"))
        .or_else(|| value.get("reasoning_text"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn openai_error_to_provider_error(e: async_openai::error::OpenAIError) -> ProviderError {
    match e {
        async_openai::error::OpenAIError::ApiError(api_err) => ProviderError::Upstream {
            status_code: 502,
            code: api_err.code.clone(),
            message: api_err.message,
        },
        other => ProviderError::Transport(other.to_string()),
    }
}
