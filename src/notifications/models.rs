use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Announcement,
    Comment,
    Reply,
    Like,
    Follow,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Announcement => "announcement",
            NotificationType::Comment => "comment",
            NotificationType::Reply => "reply",
            NotificationType::Like => "like",
            NotificationType::Follow => "follow",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "announcement" => Some(NotificationType::Announcement),
            "comment" => Some(NotificationType::Comment),
            "reply" => Some(NotificationType::Reply),
            "like" => Some(NotificationType::Like),
            "follow" => Some(NotificationType::Follow),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A substitution value of a translation descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateValue {
    Number(i64),
    Text(String),
    Null,
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Text(value)
    }
}

impl From<Option<String>> for TemplateValue {
    fn from(value: Option<String>) -> Self {
        value.map(TemplateValue::Text).unwrap_or(TemplateValue::Null)
    }
}

impl From<usize> for TemplateValue {
    fn from(value: usize) -> Self {
        TemplateValue::Number(value as i64)
    }
}

/// Title or message of a notification: either final text, or a template key
/// plus the values the consumer substitutes when rendering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Literal(String),
    Templated {
        key: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        values: BTreeMap<String, TemplateValue>,
    },
}

impl LocalizedText {
    pub fn literal<S: Into<String>>(text: S) -> Self {
        LocalizedText::Literal(text.into())
    }

    pub fn template<S: Into<String>>(key: S) -> Self {
        LocalizedText::Templated {
            key: key.into(),
            values: BTreeMap::new(),
        }
    }

    /// Adds a substitution value. No-op on literal text.
    pub fn with<V: Into<TemplateValue>>(mut self, name: &str, value: V) -> Self {
        if let LocalizedText::Templated { values, .. } = &mut self {
            values.insert(name.to_string(), value.into());
        }
        self
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            LocalizedText::Literal(_) => None,
            LocalizedText::Templated { key, .. } => Some(key),
        }
    }

    pub fn value(&self, name: &str) -> Option<&TemplateValue> {
        match self {
            LocalizedText::Literal(_) => None,
            LocalizedText::Templated { values, .. } => values.get(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationActor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NotificationActor {
    pub fn profile_link(&self) -> String {
        match self.nickname.as_deref().filter(|n| !n.is_empty()) {
            Some(nickname) => format!("/{}", nickname),
            None => format!("/user/{}", self.id),
        }
    }
}

/// A persisted notification as it is exposed to its recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: LocalizedText,
    pub message: LocalizedText,
    pub link: Option<String>,
    pub actor: Option<NotificationActor>,
    pub meta: Option<Map<String, Value>>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn actor_id(&self) -> Option<&str> {
        self.actor.as_ref().map(|actor| actor.id.as_str())
    }

    pub fn meta_str(&self, field: &str) -> Option<&str> {
        self.meta.as_ref()?.get(field)?.as_str()
    }
}

/// Everything a producer decides about a notification before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: LocalizedText,
    pub message: LocalizedText,
    pub link: Option<String>,
    pub actor: Option<NotificationActor>,
    pub meta: Option<Map<String, Value>>,
}

/// Which kind of content an aggregated like notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeKind {
    Article,
    Comment,
}

impl LikeKind {
    /// The value stored in `meta.kind`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeKind::Article => "article-like",
            LikeKind::Comment => "comment-like",
        }
    }

    /// The meta field carrying the subject id.
    pub fn subject_field(&self) -> &'static str {
        match self {
            LikeKind::Article => "articleId",
            LikeKind::Comment => "commentId",
        }
    }

    pub fn aggregate_key(&self, subject_id: &str) -> String {
        format!("{}:{}", self.as_str(), subject_id)
    }

    /// Splits an aggregate key back into its kind and subject id.
    pub fn parse_aggregate_key(key: &str) -> Option<(LikeKind, &str)> {
        let (kind, subject_id) = key.split_once(':')?;
        let kind = match kind {
            "article-like" => LikeKind::Article,
            "comment-like" => LikeKind::Comment,
            _ => return None,
        };
        Some((kind, subject_id))
    }
}

/// Fields of an aggregated like notification that are recomputed every time
/// its liker set changes.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeRendering {
    pub title: LocalizedText,
    pub message: LocalizedText,
    pub link: Option<String>,
    pub actor: Option<NotificationActor>,
    pub meta: Map<String, Value>,
}

/// Result of removing a liker from an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum LikeRemoval {
    /// There was no aggregate, or the actor was not part of it.
    Unchanged,
    /// The aggregate still has likers and was re-rendered.
    Updated(Notification),
    /// The last liker left and the aggregate was deleted.
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub data: Vec<Notification>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub unread_count: usize,
    pub blocked_actor_ids: Vec<String>,
}
