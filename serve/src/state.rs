//! The explicit `CoreContext`-style dependency bundle threaded into every handler
//! (§9 "Global singleton state" design note): no process-global repositories or
//! logger, everything flows through this one value.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chatcore::{ApprovalRegistry, Store};
use config::AppConfig;

use crate::conversation_lock::ConversationLocks;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub approvals: ApprovalRegistry,
    pub locks: Arc<ConversationLocks>,
    pub approval_timeout: Duration,
    pub provider_timeout: Duration,
    pub tool_loop_limit: usize,
    pub resource_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<dyn Store>) -> Self {
        AppState {
            store,
            approvals: ApprovalRegistry::new(),
            locks: ConversationLocks::new(),
            approval_timeout: Duration::from_secs(config.approval_timeout_secs),
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
            tool_loop_limit: config.tool_loop_limit as usize,
            resource_dir: config.resource_dir.clone(),
        }
    }
}
