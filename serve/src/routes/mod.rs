//! HTTP route handlers, one module per resource (§3, §6).

pub mod approve;
pub mod chat;
pub mod conversations;
pub mod files;
pub mod mcp_servers;
pub mod models;
pub mod providers;
pub mod settings;
pub mod tools;
