use super::models::Notification;
use super::suppression::SuppressionReason;
use serde::{Deserialize, Serialize};

/// A platform action that may notify someone. The acting user is passed
/// alongside, never inside, the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NotificationEvent {
    ArticleComment {
        article_id: String,
        comment_id: String,
    },
    CommentReply {
        comment_id: String,
        parent_comment_id: String,
    },
    ArticleLike {
        article_id: String,
    },
    ArticleUnlike {
        article_id: String,
    },
    CommentLike {
        comment_id: String,
    },
    CommentUnlike {
        comment_id: String,
    },
    ArticlePublished {
        article_id: String,
    },
    Follow {
        user_id: String,
    },
    ArticleRejected {
        article_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::ArticleComment { .. } => "article_comment",
            NotificationEvent::CommentReply { .. } => "comment_reply",
            NotificationEvent::ArticleLike { .. } => "article_like",
            NotificationEvent::ArticleUnlike { .. } => "article_unlike",
            NotificationEvent::CommentLike { .. } => "comment_like",
            NotificationEvent::CommentUnlike { .. } => "comment_unlike",
            NotificationEvent::ArticlePublished { .. } => "article_published",
            NotificationEvent::Follow { .. } => "follow",
            NotificationEvent::ArticleRejected { .. } => "article_rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// One notification per recipient. Empty when a fan-out reached nobody.
    Created(Vec<Notification>),
    Aggregated(Notification),
    /// An unlike was applied, or there was nothing to take back.
    Retracted,
    Suppressed(SuppressionReason),
    SubjectNotFound,
    /// Dispatch ran into an error. It has been logged.
    Failed,
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Created(_) => "created",
            DispatchOutcome::Aggregated(_) => "aggregated",
            DispatchOutcome::Retracted => "retracted",
            DispatchOutcome::Suppressed(_) => "suppressed",
            DispatchOutcome::SubjectNotFound => "subject_not_found",
            DispatchOutcome::Failed => "failed",
        }
    }

    /// The notifications written by this dispatch.
    pub fn notifications(&self) -> Vec<&Notification> {
        match self {
            DispatchOutcome::Created(created) => created.iter().collect(),
            DispatchOutcome::Aggregated(aggregate) => vec![aggregate],
            _ => vec![],
        }
    }
}
