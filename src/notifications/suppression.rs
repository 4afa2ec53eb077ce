use super::store::NotificationStore;
use anyhow::Result;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionReason {
    /// The actor is the recipient.
    SelfAction,
    /// The recipient blocked the actor.
    Blocked,
    /// An equivalent notification was already created today.
    Duplicate,
    /// Only an article's author can announce its publication.
    NotAuthor,
    /// A follow event without a matching follow edge.
    NotFollowing,
}

impl SuppressionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressionReason::SelfAction => "self_action",
            SuppressionReason::Blocked => "blocked",
            SuppressionReason::Duplicate => "duplicate",
            SuppressionReason::NotAuthor => "not_author",
            SuppressionReason::NotFollowing => "not_following",
        }
    }
}

pub struct SuppressionFilter {
    store: Arc<dyn NotificationStore>,
}

impl SuppressionFilter {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// True if `recipient_id` blocked `actor_id`.
    pub fn should_suppress(&self, recipient_id: &str, actor_id: &str) -> Result<bool> {
        self.store.is_actor_blocked(recipient_id, actor_id)
    }

    /// Runs the self-notification guard, then the block list.
    pub fn check(&self, recipient_id: &str, actor_id: &str) -> Result<Option<SuppressionReason>> {
        if recipient_id == actor_id {
            return Ok(Some(SuppressionReason::SelfAction));
        }
        if self.should_suppress(recipient_id, actor_id)? {
            return Ok(Some(SuppressionReason::Blocked));
        }
        Ok(None)
    }
}
