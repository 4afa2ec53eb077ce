//! Translatable titles and messages.
//!
//! Producers never build final strings: they emit a template key plus the
//! values they know about, and the reader renders it in its own locale. The
//! [`TemplateCatalog`] is the English rendering used by the terminal watcher.

use super::models::{LikeKind, LocalizedText, TemplateValue};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};

pub const ARTICLE_COMMENT_TITLE: &str = "notifications.titles.articleComment";
pub const ARTICLE_COMMENT_MESSAGE: &str = "notifications.messages.articleComment";
pub const ARTICLE_COMMENT_UNTITLED_MESSAGE: &str = "notifications.messages.articleCommentUntitled";
pub const COMMENT_REPLY_TITLE: &str = "notifications.titles.commentReply";
pub const COMMENT_REPLY_MESSAGE: &str = "notifications.messages.commentReply";
pub const ARTICLE_LIKE_MESSAGE: &str = "notifications.messages.articleLike";
pub const COMMENT_LIKE_MESSAGE: &str = "notifications.messages.commentLike";
pub const NEW_FOLLOWER_TITLE: &str = "notifications.titles.newFollower";
pub const NEW_FOLLOWER_MESSAGE: &str = "notifications.messages.newFollower";
pub const NEW_ARTICLE_TITLE: &str = "notifications.titles.newArticle";
pub const NEW_ARTICLE_MESSAGE: &str = "notifications.messages.newArticle";
pub const ARTICLE_REJECTED_TITLE: &str = "notifications.titles.articleRejected";
pub const ARTICLE_REJECTED_MESSAGE: &str = "notifications.messages.articleRejected";

pub const DEFAULT_UNKNOWN_USER_LABEL: &str = "Unknown user";

fn like_title_key(kind: LikeKind, count: usize) -> String {
    let base = match kind {
        LikeKind::Article => "notifications.titles.articleLike",
        LikeKind::Comment => "notifications.titles.commentLike",
    };
    let variant = match count {
        0 | 1 => "single",
        2 => "dual",
        _ => "many",
    };
    format!("{}.{}", base, variant)
}

pub fn article_comment(actor_name: Option<String>, article_title: Option<&str>) -> (LocalizedText, LocalizedText) {
    let title = LocalizedText::template(ARTICLE_COMMENT_TITLE).with("user", actor_name);
    let message = match article_title.filter(|t| !t.trim().is_empty()) {
        Some(article_title) => LocalizedText::template(ARTICLE_COMMENT_MESSAGE).with("title", article_title),
        None => LocalizedText::template(ARTICLE_COMMENT_UNTITLED_MESSAGE),
    };
    (title, message)
}

pub fn comment_reply(actor_name: Option<String>) -> (LocalizedText, LocalizedText) {
    (
        LocalizedText::template(COMMENT_REPLY_TITLE).with("user", actor_name),
        LocalizedText::template(COMMENT_REPLY_MESSAGE),
    )
}

/// Title and message of a like aggregate. `liker_names` is aligned with the
/// liker ids, first liker first; unresolved names are `None`.
pub fn like_summary(
    kind: LikeKind,
    liker_names: &[Option<String>],
    article_title: Option<&str>,
) -> (LocalizedText, LocalizedText) {
    let count = liker_names.len();
    let name_at = |index: usize| liker_names.get(index).cloned().flatten();

    let key = like_title_key(kind, count);
    let title = match count {
        0 | 1 => LocalizedText::template(key).with("user", name_at(0)),
        2 => LocalizedText::template(key)
            .with("user1", name_at(0))
            .with("user2", name_at(1)),
        _ => LocalizedText::template(key)
            .with("user", name_at(0))
            .with("count", count - 1),
    };

    let message = match kind {
        LikeKind::Article => LocalizedText::template(ARTICLE_LIKE_MESSAGE)
            .with("title", article_title.map(str::to_string))
            .with("count", count),
        LikeKind::Comment => LocalizedText::template(COMMENT_LIKE_MESSAGE).with("count", count),
    };
    (title, message)
}

pub fn new_follower(actor_name: Option<String>) -> (LocalizedText, LocalizedText) {
    (
        LocalizedText::template(NEW_FOLLOWER_TITLE).with("user", actor_name.clone()),
        LocalizedText::template(NEW_FOLLOWER_MESSAGE).with("user", actor_name),
    )
}

pub fn new_article(author_name: Option<String>, article_title: Option<&str>) -> (LocalizedText, LocalizedText) {
    (
        LocalizedText::template(NEW_ARTICLE_TITLE).with("user", author_name),
        LocalizedText::template(NEW_ARTICLE_MESSAGE).with("title", article_title.map(str::to_string)),
    )
}

/// A moderator supplied reason is shown verbatim.
pub fn article_rejected(reason: Option<&str>) -> (LocalizedText, LocalizedText) {
    let message = match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => LocalizedText::literal(reason),
        None => LocalizedText::template(ARTICLE_REJECTED_MESSAGE),
    };
    (LocalizedText::template(ARTICLE_REJECTED_TITLE), message)
}

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{(\w+)\}").expect("valid placeholder regex");
}

/// Substitutes `{name}` placeholders. Missing and null values render as the
/// unknown-user label.
pub fn render_template(
    template: &str,
    values: &BTreeMap<String, TemplateValue>,
    unknown_user_label: &str,
) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
            Some(TemplateValue::Text(text)) => text.clone(),
            Some(TemplateValue::Number(number)) => number.to_string(),
            Some(TemplateValue::Null) | None => unknown_user_label.to_string(),
        })
        .into_owned()
}

pub struct TemplateCatalog {
    templates: HashMap<String, String>,
    unknown_user_label: String,
}

impl TemplateCatalog {
    pub fn new(unknown_user_label: &str) -> Self {
        Self {
            templates: HashMap::new(),
            unknown_user_label: unknown_user_label.to_string(),
        }
    }

    pub fn english() -> Self {
        Self::english_with_label(DEFAULT_UNKNOWN_USER_LABEL)
    }

    pub fn english_with_label(unknown_user_label: &str) -> Self {
        let mut catalog = Self::new(unknown_user_label);
        for (key, template) in [
            (ARTICLE_COMMENT_TITLE, "{user} commented on your article"),
            (ARTICLE_COMMENT_MESSAGE, "New comment on \"{title}\""),
            (ARTICLE_COMMENT_UNTITLED_MESSAGE, "New comment on your article"),
            (COMMENT_REPLY_TITLE, "{user} replied to your comment"),
            (COMMENT_REPLY_MESSAGE, "Someone replied to your comment"),
            ("notifications.titles.articleLike.single", "{user} liked your article"),
            ("notifications.titles.articleLike.dual", "{user1} and {user2} liked your article"),
            ("notifications.titles.articleLike.many", "{user} and {count} others liked your article"),
            ("notifications.titles.commentLike.single", "{user} liked your comment"),
            ("notifications.titles.commentLike.dual", "{user1} and {user2} liked your comment"),
            ("notifications.titles.commentLike.many", "{user} and {count} others liked your comment"),
            (ARTICLE_LIKE_MESSAGE, "\"{title}\" now has {count} likes"),
            (COMMENT_LIKE_MESSAGE, "Your comment now has {count} likes"),
            (NEW_FOLLOWER_TITLE, "New follower"),
            (NEW_FOLLOWER_MESSAGE, "{user} started following you"),
            (NEW_ARTICLE_TITLE, "{user} published a new article"),
            (NEW_ARTICLE_MESSAGE, "{title}"),
            (ARTICLE_REJECTED_TITLE, "Your article was rejected"),
            (ARTICLE_REJECTED_MESSAGE, "A moderator rejected your article"),
        ] {
            catalog.insert(key, template);
        }
        catalog
    }

    pub fn insert(&mut self, key: &str, template: &str) {
        self.templates.insert(key.to_string(), template.to_string());
    }

    /// Unknown keys render as the key itself.
    pub fn render(&self, text: &LocalizedText) -> String {
        match text {
            LocalizedText::Literal(text) => text.clone(),
            LocalizedText::Templated { key, values } => match self.templates.get(key) {
                Some(template) => render_template(template, values, &self.unknown_user_label),
                None => key.clone(),
            },
        }
    }
}
