//! Branching conversation store, streaming completion engine, and tool loop for a
//! multi-user chat backend.
//!
//! ## Main modules
//!
//! - [`model`]: domain entities — [`Conversation`], [`Message`], [`ToolCall`], [`File`], [`Settings`].
//! - [`store`]: the durable boundary ([`Store`] trait, [`SqliteStore`]).
//! - [`tree`]: derives parent/child structure and active-leaf resolution over a flat message set.
//! - [`context_builder`]: turns `(conversation, leaf)` into an ordered [`Prompt`].
//! - [`provider`]: [`ProviderClient`] trait and its [`OpenAiCompatClient`] implementation.
//! - [`stream_mux`]: the SSE wire format ([`StreamMux`], [`DeltaSink`]).
//! - [`tool_loop`]: the per-turn state machine wiring the above together.
//! - [`approval_registry`]: human-in-the-loop rendezvous for approval-gated tools.
//! - [`file_attach`]: resolves attachments to model-visible content before a turn.
//! - [`tool_source`]: tool execution over an MCP server's endpoint.
//! - [`error`]: closed error-kind sets per subsystem, rolling up into [`CoreError`].

pub mod approval_registry;
pub mod context_builder;
pub mod error;
pub mod file_attach;
pub mod model;
pub mod provider;
pub mod store;
pub mod stream_mux;
pub mod tool_loop;
pub mod tool_source;
pub mod tree;

pub use approval_registry::{ApprovalRegistry, Decision};
pub use context_builder::{ContextBuilder, Prompt, PromptTurn};
pub use error::{CoreError, ProviderError, StoreError, ToolSourceError};
pub use model::{
    Attachment, Conversation, File, MCPServer, Message, MessageId, Model, ParentId, Provider,
    ReasoningEffort, Role, Settings, ToolCall, ToolCallStatus, ToolDef,
};
pub use provider::{CompletionParams, CompletionResult, CompletionStats, OpenAiCompatClient, ProviderClient};
pub use store::{SqliteStore, Store};
pub use stream_mux::{ChunkWriter, DeltaSink, DiscardSink, StreamMux, ToolCallChunk};
pub use tool_loop::ToolLoop;
pub use tool_source::{McpToolSource, ToolCallContent, ToolSource, ToolSpec};
pub use tree::MessageTree;
