//! Opaque adapter to an OpenAI-compatible remote model: blocking completion and
//! streaming completion with a delta-forwarding accumulator.

mod openai_compat;

pub use openai_compat::OpenAiCompatClient;

use std::time::Duration;

use async_trait::async_trait;

use crate::context_builder::Prompt;
use crate::error::ProviderError;
use crate::model::ReasoningEffort;
use crate::stream_mux::DeltaSink;

#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub prompt: Prompt,
    /// The remote model name — everything after the first `/` in the fully-qualified id.
    pub model: String,
    pub reasoning_effort: ReasoningEffort,
    pub user: String,
    pub deadline: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionStats {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub duration_secs: f64,
    /// `completionTokens / duration(s)`, rounded to 0.1.
    pub speed: f64,
}

impl CompletionStats {
    pub fn finalize(prompt_tokens: u32, completion_tokens: u32, duration_secs: f64) -> Self {
        let speed = if duration_secs > 0.0 {
            ((completion_tokens as f64 / duration_secs) * 10.0).round() / 10.0
        } else {
            0.0
        };
        CompletionStats {
            prompt_tokens,
            completion_tokens,
            duration_secs,
            speed,
        }
    }
}

/// A tool call with a server-minted id, fully accumulated at stream end.
#[derive(Debug, Clone)]
pub struct AccumulatedToolCall {
    pub id: String,
    pub reference_id: String,
    pub name: String,
    pub args: String,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionResult {
    pub content: String,
    pub reasoning: Option<String>,
    pub tool_calls: Vec<AccumulatedToolCall>,
    pub stats: CompletionStats,
}

/// Polymorphic over `{Complete, CompleteStream}`. Implementations are resolved at
/// call time from the Providers repository, keyed by provider id.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn complete(&self, params: CompletionParams) -> Result<CompletionResult, ProviderError>;

    async fn complete_stream(
        &self,
        params: CompletionParams,
        sink: &mut dyn DeltaSink,
    ) -> Result<CompletionResult, ProviderError>;
}
