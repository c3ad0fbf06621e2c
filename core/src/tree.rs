//! In-memory operations on the message forest: root-to-leaf walks and active-branch
//! resolution. Operates on an already-loaded snapshot of a conversation's messages —
//! callers fetch via [`crate::store::Store::list_messages_by_conversation`] first.

use std::collections::{HashMap, HashSet};

use crate::error::CoreError;
use crate::model::{Message, MessageId};

/// A loaded conversation snapshot, indexed for fast parent/child lookups.
pub struct MessageTree {
    by_id: HashMap<MessageId, Message>,
    children_of: HashMap<MessageId, Vec<MessageId>>,
}

impl MessageTree {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut by_id = HashMap::with_capacity(messages.len());
        let mut children_of: HashMap<MessageId, Vec<MessageId>> = HashMap::new();
        for msg in messages {
            if let Some(parent) = msg.parent_id {
                children_of.entry(parent).or_default().push(msg.id);
            }
            by_id.insert(msg.id, msg);
        }
        MessageTree { by_id, children_of }
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.by_id.get(&id)
    }

    pub fn children_of(&self, id: MessageId) -> &[MessageId] {
        self.children_of.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ordered sequence from root to `msg_id`, inclusive. Fails fast on a cycle or a
    /// dangling parent reference rather than looping forever.
    pub fn path_to_root(&self, msg_id: MessageId) -> Result<Vec<MessageId>, CoreError> {
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        let mut current = Some(msg_id);
        while let Some(id) = current {
            if !visited.insert(id) {
                return Err(CoreError::Internal(format!(
                    "cycle detected in message tree at message {id}"
                )));
            }
            let msg = self.by_id.get(&id).ok_or_else(|| {
                CoreError::Internal(format!("dangling parent reference to message {id}"))
            })?;
            path.push(id);
            current = msg.parent_id;
        }
        path.reverse();
        Ok(path)
    }

    /// Walks down from `start` following `active_branches` overrides, defaulting to
    /// the highest (most recent) child id at any fork, stopping at a childless node.
    pub fn resolve_active_leaf(
        &self,
        start: MessageId,
        active_branches: &HashMap<MessageId, MessageId>,
    ) -> MessageId {
        let mut current = start;
        loop {
            let children = self.children_of(current);
            if children.is_empty() {
                return current;
            }
            let next = active_branches
                .get(&current)
                .copied()
                .filter(|c| children.contains(c))
                .unwrap_or_else(|| *children.iter().max().unwrap());
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    fn msg(id: MessageId, parent: Option<MessageId>) -> Message {
        Message {
            id,
            conv_id: "c1".into(),
            role: Role::User,
            model: None,
            parent_id: parent,
            content: String::new(),
            reasoning: None,
            error: None,
        }
    }

    #[test]
    fn path_to_root_walks_up_in_order() {
        let tree = MessageTree::from_messages(vec![msg(1, None), msg(2, Some(1)), msg(3, Some(2))]);
        assert_eq!(tree.path_to_root(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn path_to_root_detects_cycles() {
        // Hand-construct a cycle; the Store never produces one, but Tree must defend
        // against it anyway.
        let mut messages = vec![msg(1, Some(2)), msg(2, Some(1))];
        messages[0].parent_id = Some(2);
        let tree = MessageTree::from_messages(messages);
        let err = tree.path_to_root(1).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn resolve_active_leaf_prefers_override_then_highest_child() {
        // 1 -> {2, 3}; no override picks 3 (highest id).
        let tree = MessageTree::from_messages(vec![msg(1, None), msg(2, Some(1)), msg(3, Some(1))]);
        assert_eq!(tree.resolve_active_leaf(1, &HashMap::new()), 3);

        let mut overrides = HashMap::new();
        overrides.insert(1, 2);
        assert_eq!(tree.resolve_active_leaf(1, &overrides), 2);
    }

    #[test]
    fn resolve_active_leaf_stops_at_childless_node() {
        let tree = MessageTree::from_messages(vec![msg(1, None), msg(2, Some(1))]);
        assert_eq!(tree.resolve_active_leaf(2, &HashMap::new()), 2);
    }
}
