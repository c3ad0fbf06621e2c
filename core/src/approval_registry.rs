//! Process-wide rendezvous keyed by `(user, callId)`. One entry is one pending
//! human-in-the-loop decision; there is at most one waiter per id by construction,
//! so resolution is inherently FIFO per call id.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("a rendezvous is already registered for this call")]
    Duplicate,
}

#[derive(Debug, Error)]
pub enum DecideError {
    #[error("no pending approval for this call")]
    NotFound,
}

/// A map guarded by a mutex; each value is a single-shot notification primitive
/// (`tokio::sync::oneshot`). `register` hands the loop a future to await; `decide`
/// publishes the decision and removes the entry.
#[derive(Default)]
pub struct ApprovalRegistry {
    pending: Mutex<HashMap<(String, String), oneshot::Sender<Decision>>>,
}

impl ApprovalRegistry {
    pub fn new() -> Self {
        ApprovalRegistry {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a rendezvous and returns a future resolving to the decision, or
    /// `ApprovalTimeout`-shaped `None` if `timeout` elapses first.
    pub fn register(
        &self,
        user: &str,
        call_id: &str,
    ) -> Result<oneshot::Receiver<Decision>, RegisterError> {
        let key = (user.to_string(), call_id.to_string());
        let mut pending = self.pending.lock().unwrap();
        if pending.contains_key(&key) {
            return Err(RegisterError::Duplicate);
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(key, tx);
        Ok(rx)
    }

    /// Waits on a previously [`register`](Self::register)ed rendezvous, bounded by
    /// `timeout`. Returns `None` on timeout; the entry is removed either way since a
    /// timed-out rendezvous can never be decided afterward.
    pub async fn wait(&self, user: &str, call_id: &str, timeout: Duration) -> Option<Decision> {
        let rx = self.register(user, call_id).ok()?;
        let result = tokio::time::timeout(timeout, rx).await;
        // Remove on timeout; a successful decide() already removed it in `decide`.
        if result.is_err() {
            self.pending
                .lock()
                .unwrap()
                .remove(&(user.to_string(), call_id.to_string()));
        }
        result.ok().and_then(Result::ok)
    }

    /// Resolves the rendezvous. Only callable by the owning user — a mismatched
    /// `(user, callId)` pair simply isn't found.
    pub fn decide(&self, user: &str, call_id: &str, approved: bool) -> Result<(), DecideError> {
        let key = (user.to_string(), call_id.to_string());
        let tx = self
            .pending
            .lock()
            .unwrap()
            .remove(&key)
            .ok_or(DecideError::NotFound)?;
        let decision = if approved {
            Decision::Approved
        } else {
            Decision::Rejected
        };
        // The receiver may already be gone (loop abandoned the wait); that's fine.
        let _ = tx.send(decision);
        Ok(())
    }

    /// Resolves with `Rejected`, used on client disconnect if the loop is abandoned.
    pub fn cancel(&self, user: &str, call_id: &str) {
        let _ = self.decide(user, call_id, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decide_unblocks_wait() {
        let registry = ApprovalRegistry::new();
        let wait = async { registry.wait("alice", "call1", Duration::from_secs(5)).await };
        let decide = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            registry.decide("alice", "call1", true).unwrap();
        };
        let (decision, _) = tokio::join!(wait, decide);
        assert_eq!(decision, Some(Decision::Approved));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let registry = ApprovalRegistry::new();
        let _rx = registry.register("alice", "call1").unwrap();
        let err = registry.register("alice", "call1").unwrap_err();
        assert!(matches!(err, RegisterError::Duplicate));
    }

    #[tokio::test]
    async fn decide_for_unknown_call_is_not_found() {
        let registry = ApprovalRegistry::new();
        let err = registry.decide("alice", "ghost", true).unwrap_err();
        assert!(matches!(err, DecideError::NotFound));
    }

    #[tokio::test]
    async fn timeout_resolves_to_none_and_clears_entry() {
        let registry = ApprovalRegistry::new();
        let decision = registry.wait("alice", "call1", Duration::from_millis(20)).await;
        assert_eq!(decision, None);
        // Entry was cleared; a fresh registration for the same id must succeed.
        assert!(registry.register("alice", "call1").is_ok());
    }

    #[tokio::test]
    async fn cancel_resolves_waiter_as_rejected() {
        let registry = ApprovalRegistry::new();
        let wait = async { registry.wait("alice", "call1", Duration::from_secs(5)).await };
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            registry.cancel("alice", "call1");
        };
        let (decision, _) = tokio::join!(wait, cancel);
        assert_eq!(decision, Some(Decision::Rejected));
    }
}
