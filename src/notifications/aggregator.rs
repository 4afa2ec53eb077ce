//! Like aggregation.
//!
//! All likes on one subject collapse into a single notification per
//! recipient. The liker set itself lives in the store, which adds and removes
//! likers atomically; this module decides how the aggregate reads.

use super::describe_actor;
use super::messages;
use super::models::{LikeKind, LikeRemoval, LikeRendering, Notification, NotificationActor};
use super::store::NotificationStore;
use crate::directory::{ArticleRef, CommentRef, ContentDirectory};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// What a like aggregate is about, resolved once per event.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeSubject {
    pub kind: LikeKind,
    pub subject_id: String,
    pub article_id: String,
    pub article_slug: String,
    pub article_title: Option<String>,
    pub link: String,
}

impl LikeSubject {
    pub fn article(article: &ArticleRef) -> Self {
        Self {
            kind: LikeKind::Article,
            subject_id: article.id.clone(),
            article_id: article.id.clone(),
            article_slug: article.link_slug().to_string(),
            article_title: article.title.clone(),
            link: article.link(),
        }
    }

    /// The article may have disappeared, in which case its id stands in for
    /// the slug.
    pub fn comment(comment: &CommentRef, article: Option<&ArticleRef>) -> Self {
        let article_slug = article
            .map(|article| article.link_slug().to_string())
            .unwrap_or_else(|| comment.article_id.clone());
        Self {
            kind: LikeKind::Comment,
            subject_id: comment.id.clone(),
            article_id: comment.article_id.clone(),
            link: format!("/article/{}#comment-{}", article_slug, comment.id),
            article_slug,
            article_title: article.and_then(|article| article.title.clone()),
        }
    }

    /// Stands in for content that no longer exists.
    pub fn missing(kind: LikeKind, subject_id: &str) -> Self {
        let link = match kind {
            LikeKind::Article => format!("/article/{}", subject_id),
            LikeKind::Comment => format!("/article/{0}#comment-{0}", subject_id),
        };
        Self {
            kind,
            subject_id: subject_id.to_string(),
            article_id: subject_id.to_string(),
            article_slug: subject_id.to_string(),
            article_title: None,
            link,
        }
    }
}

/// Display names resolved ahead of a store write, keyed by user id.
type KnownNames = HashMap<String, Option<String>>;

pub struct LikeAggregator {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn ContentDirectory>,
}

impl LikeAggregator {
    pub fn new(store: Arc<dyn NotificationStore>, directory: Arc<dyn ContentDirectory>) -> Self {
        Self { store, directory }
    }

    /// Merges `actor` into the recipient's aggregate for `subject`. The
    /// aggregate comes back unread, dated `now` and attributed to `actor`.
    pub fn record_like(
        &self,
        recipient_id: &str,
        subject: &LikeSubject,
        actor: &NotificationActor,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        let mut names = self.known_names(recipient_id, subject)?;
        names.insert(actor.id.clone(), actor.name.clone());
        let render =
            |liker_ids: &[String]| self.render(subject, liker_ids, Some(actor.clone()), &names);
        self.store.add_liker(
            recipient_id,
            subject.kind,
            &subject.subject_id,
            &actor.id,
            now,
            &render,
        )
    }

    /// Takes `actor_id` out of the aggregate. The most recent remaining liker
    /// becomes the displayed actor.
    pub fn retract_like(
        &self,
        recipient_id: &str,
        subject: &LikeSubject,
        actor_id: &str,
    ) -> Result<LikeRemoval> {
        let names = self.known_names(recipient_id, subject)?;
        let render = |liker_ids: &[String]| self.render_remaining(subject, liker_ids, &names);
        self.store.remove_liker(
            recipient_id,
            subject.kind,
            &subject.subject_id,
            actor_id,
            &render,
        )
    }

    /// Blocks `actor_id` for the recipient. Aggregates the actor liked are
    /// re-rendered from their remaining likers.
    pub fn block_actor(&self, recipient_id: &str, actor_id: &str, now: DateTime<Utc>) -> Result<usize> {
        let render = |kind: LikeKind, subject_id: &str, liker_ids: &[String]| {
            let subject = self.resolve_subject(kind, subject_id);
            self.render_remaining(&subject, liker_ids, &KnownNames::new())
        };
        self.store.block_actor(recipient_id, actor_id, now, &render)
    }

    fn resolve_subject(&self, kind: LikeKind, subject_id: &str) -> LikeSubject {
        let resolved = match kind {
            LikeKind::Article => self
                .directory
                .get_article(subject_id)
                .ok()
                .flatten()
                .map(|article| LikeSubject::article(&article)),
            LikeKind::Comment => self
                .directory
                .get_comment(subject_id)
                .ok()
                .flatten()
                .map(|comment| {
                    let article = self.directory.get_article(&comment.article_id).ok().flatten();
                    LikeSubject::comment(&comment, article.as_ref())
                }),
        };
        resolved.unwrap_or_else(|| LikeSubject::missing(kind, subject_id))
    }

    /// Names of the current likers, looked up before the store locks the
    /// aggregate.
    fn known_names(&self, recipient_id: &str, subject: &LikeSubject) -> Result<KnownNames> {
        let liker_ids = self
            .store
            .get_liker_ids(recipient_id, subject.kind, &subject.subject_id)?;
        Ok(liker_ids
            .into_iter()
            .map(|id| {
                let name = self.directory.display_name(&id);
                (id, name)
            })
            .collect())
    }

    fn render_remaining(
        &self,
        subject: &LikeSubject,
        liker_ids: &[String],
        names: &KnownNames,
    ) -> LikeRendering {
        let latest = liker_ids
            .last()
            .map(|id| describe_actor(self.directory.as_ref(), id));
        self.render(subject, liker_ids, latest, names)
    }

    fn render(
        &self,
        subject: &LikeSubject,
        liker_ids: &[String],
        actor: Option<NotificationActor>,
        names: &KnownNames,
    ) -> LikeRendering {
        let liker_names: Vec<Option<String>> = liker_ids
            .iter()
            .map(|id| match names.get(id) {
                Some(name) => name.clone(),
                None => self.directory.display_name(id),
            })
            .collect();
        let (title, message) =
            messages::like_summary(subject.kind, &liker_names, subject.article_title.as_deref());

        let mut meta = Map::new();
        meta.insert("kind".to_string(), json!(subject.kind.as_str()));
        meta.insert("articleId".to_string(), json!(subject.article_id));
        meta.insert("articleSlug".to_string(), json!(subject.article_slug));
        if subject.kind == LikeKind::Comment {
            meta.insert("commentId".to_string(), json!(subject.subject_id));
        }
        meta.insert("likerIds".to_string(), json!(liker_ids));
        meta.insert(
            "likerNames".to_string(),
            Value::from(liker_names.into_iter().flatten().collect::<Vec<_>>()),
        );
        meta.insert("count".to_string(), json!(liker_ids.len()));

        LikeRendering {
            title,
            message,
            link: Some(subject.link.clone()),
            actor,
            meta,
        }
    }
}
