//! At-most-one-in-flight turn per `(user, conversationId)` (§5).
//!
//! A plain mutex-guarded set, the same idiom [`chatcore::ApprovalRegistry`] uses
//! for its pending map: this registry is tiny and short-lived, no need for a
//! sharded or lock-free structure. The guard owns an `Arc` clone rather than
//! borrowing, so it can be moved into the turn's spawned task alongside the
//! `AppState` it came from.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct ConversationLocks {
    inflight: Mutex<HashSet<(String, String)>>,
}

pub struct ConversationLockGuard {
    locks: Arc<ConversationLocks>,
    key: (String, String),
}

impl ConversationLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(ConversationLocks {
            inflight: Mutex::new(HashSet::new()),
        })
    }

    /// Acquires the lock for `(user, conv_id)`, or `None` if a turn is already
    /// running for that pair.
    pub fn try_acquire(self: &Arc<Self>, user: &str, conv_id: &str) -> Option<ConversationLockGuard> {
        let key = (user.to_string(), conv_id.to_string());
        let mut inflight = self.inflight.lock().unwrap();
        if inflight.contains(&key) {
            return None;
        }
        inflight.insert(key.clone());
        Some(ConversationLockGuard {
            locks: self.clone(),
            key,
        })
    }
}

impl Drop for ConversationLockGuard {
    fn drop(&mut self) {
        self.locks.inflight.lock().unwrap().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_for_same_pair_fails_until_released() {
        let locks = ConversationLocks::new();
        let guard = locks.try_acquire("alice", "c1").unwrap();
        assert!(locks.try_acquire("alice", "c1").is_none());
        drop(guard);
        assert!(locks.try_acquire("alice", "c1").is_some());
    }

    #[test]
    fn different_conversations_or_users_do_not_contend() {
        let locks = ConversationLocks::new();
        let _g1 = locks.try_acquire("alice", "c1").unwrap();
        assert!(locks.try_acquire("alice", "c2").is_some());
        assert!(locks.try_acquire("bob", "c1").is_some());
    }
}
