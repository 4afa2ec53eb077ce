use super::aggregator::{LikeAggregator, LikeSubject};
use super::clock::{start_of_local_day, Clock};
use super::describe_actor;
use super::events::{DispatchOutcome, NotificationEvent};
use super::messages;
use super::models::{FeedPage, LikeRemoval, NewNotification, NotificationType};
use super::store::NotificationStore;
use super::suppression::{SuppressionFilter, SuppressionReason};
use crate::directory::ContentDirectory;
use anyhow::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSettings {
    /// Skip comment, reply, follow and announcement notifications that repeat
    /// one created earlier the same local day.
    pub same_day_dedup: bool,
    /// Most followers notified about a single new article.
    pub fan_out_limit: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            same_day_dedup: true,
            fan_out_limit: 10_000,
        }
    }
}

fn meta(entries: &[(&str, Value)]) -> Option<Map<String, Value>> {
    Some(
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect(),
    )
}

pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn ContentDirectory>,
    clock: Arc<dyn Clock>,
    settings: NotificationSettings,
    suppression: SuppressionFilter,
    aggregator: LikeAggregator,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn ContentDirectory>,
        clock: Arc<dyn Clock>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            suppression: SuppressionFilter::new(store.clone()),
            aggregator: LikeAggregator::new(store.clone(), directory.clone()),
            store,
            directory,
            clock,
            settings,
        }
    }

    /// Produces the notifications `event` calls for. Never fails: errors are
    /// logged and reported as [`DispatchOutcome::Failed`], so the action that
    /// triggered the event is never held back by its notifications.
    pub fn dispatch(&self, actor_id: &str, event: &NotificationEvent) -> DispatchOutcome {
        let result = match event {
            NotificationEvent::ArticleComment {
                article_id,
                comment_id,
            } => self.notify_article_comment(actor_id, article_id, comment_id),
            NotificationEvent::CommentReply {
                comment_id,
                parent_comment_id,
            } => self.notify_comment_reply(actor_id, comment_id, parent_comment_id),
            NotificationEvent::ArticleLike { article_id } => {
                self.notify_article_like(actor_id, article_id)
            }
            NotificationEvent::ArticleUnlike { article_id } => {
                self.retract_article_like(actor_id, article_id)
            }
            NotificationEvent::CommentLike { comment_id } => {
                self.notify_comment_like(actor_id, comment_id)
            }
            NotificationEvent::CommentUnlike { comment_id } => {
                self.retract_comment_like(actor_id, comment_id)
            }
            NotificationEvent::ArticlePublished { article_id } => {
                self.notify_article_published(actor_id, article_id)
            }
            NotificationEvent::Follow { user_id } => self.notify_follow(actor_id, user_id),
            NotificationEvent::ArticleRejected { article_id, reason } => {
                self.notify_article_rejected(actor_id, article_id, reason.as_deref())
            }
        };

        match result {
            Ok(outcome) => {
                match &outcome {
                    DispatchOutcome::Suppressed(reason) => debug!(
                        "Suppressed {} notification from {}: {}",
                        event.kind(),
                        actor_id,
                        reason.as_str()
                    ),
                    DispatchOutcome::SubjectNotFound => debug!(
                        "Dropped {} notification from {}: subject not found ({:?})",
                        event.kind(),
                        actor_id,
                        event
                    ),
                    _ => {}
                }
                outcome
            }
            Err(err) => {
                warn!(
                    "Failed to dispatch {} notification from {} ({:?}): {:#}",
                    event.kind(),
                    actor_id,
                    event,
                    err
                );
                DispatchOutcome::Failed
            }
        }
    }

    fn suppression_for(&self, recipient_id: &str, actor_id: &str) -> Result<Option<DispatchOutcome>> {
        Ok(self
            .suppression
            .check(recipient_id, actor_id)?
            .map(DispatchOutcome::Suppressed))
    }

    /// Stores `new`, subject to same-day duplicate suppression keyed on
    /// `subject_key`.
    fn create(&self, new: NewNotification, subject_key: Option<String>) -> Result<DispatchOutcome> {
        let now = self.clock.now();
        if !self.settings.same_day_dedup {
            let notification = self.store.insert_notification(new, now)?;
            return Ok(DispatchOutcome::Created(vec![notification]));
        }
        let created = self.store.insert_unless_duplicate(
            new,
            subject_key.as_deref(),
            start_of_local_day(now),
            now,
        )?;
        Ok(match created {
            Some(notification) => DispatchOutcome::Created(vec![notification]),
            None => DispatchOutcome::Suppressed(SuppressionReason::Duplicate),
        })
    }

    pub fn notify_article_comment(
        &self,
        actor_id: &str,
        article_id: &str,
        comment_id: &str,
    ) -> Result<DispatchOutcome> {
        let Some(article) = self.directory.get_article(article_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        match self.directory.get_comment(comment_id)? {
            Some(comment) if comment.article_id == article.id => {}
            _ => return Ok(DispatchOutcome::SubjectNotFound),
        }
        if let Some(suppressed) = self.suppression_for(&article.author_id, actor_id)? {
            return Ok(suppressed);
        }

        let actor = describe_actor(self.directory.as_ref(), actor_id);
        let (title, message) = messages::article_comment(actor.name.clone(), article.title.as_deref());
        let new = NewNotification {
            user_id: article.author_id.clone(),
            notification_type: NotificationType::Comment,
            title,
            message,
            link: Some(article.comment_link(comment_id)),
            actor: Some(actor),
            meta: meta(&[
                ("articleId", json!(article.id)),
                ("articleSlug", json!(article.link_slug())),
                ("commentId", json!(comment_id)),
            ]),
        };
        self.create(new, Some(format!("articleId:{}", article.id)))
    }

    /// Notifies the author of the parent comment, not the article author.
    pub fn notify_comment_reply(
        &self,
        actor_id: &str,
        comment_id: &str,
        parent_comment_id: &str,
    ) -> Result<DispatchOutcome> {
        let Some(parent) = self.directory.get_comment(parent_comment_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        match self.directory.get_comment(comment_id)? {
            Some(reply) if reply.article_id == parent.article_id => {}
            _ => return Ok(DispatchOutcome::SubjectNotFound),
        }
        let Some(article) = self.directory.get_article(&parent.article_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        if let Some(suppressed) = self.suppression_for(&parent.author_id, actor_id)? {
            return Ok(suppressed);
        }

        let actor = describe_actor(self.directory.as_ref(), actor_id);
        let (title, message) = messages::comment_reply(actor.name.clone());
        let new = NewNotification {
            user_id: parent.author_id.clone(),
            notification_type: NotificationType::Reply,
            title,
            message,
            link: Some(article.comment_link(comment_id)),
            actor: Some(actor),
            meta: meta(&[
                ("articleId", json!(article.id)),
                ("articleSlug", json!(article.link_slug())),
                ("commentId", json!(comment_id)),
                ("parentCommentId", json!(parent.id)),
            ]),
        };
        self.create(new, Some(format!("parentCommentId:{}", parent.id)))
    }

    pub fn notify_article_like(&self, actor_id: &str, article_id: &str) -> Result<DispatchOutcome> {
        let Some(article) = self.directory.get_article(article_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        if let Some(suppressed) = self.suppression_for(&article.author_id, actor_id)? {
            return Ok(suppressed);
        }
        let actor = describe_actor(self.directory.as_ref(), actor_id);
        let aggregate = self.aggregator.record_like(
            &article.author_id,
            &LikeSubject::article(&article),
            &actor,
            self.clock.now(),
        )?;
        Ok(DispatchOutcome::Aggregated(aggregate))
    }

    pub fn notify_comment_like(&self, actor_id: &str, comment_id: &str) -> Result<DispatchOutcome> {
        let Some(comment) = self.directory.get_comment(comment_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        if let Some(suppressed) = self.suppression_for(&comment.author_id, actor_id)? {
            return Ok(suppressed);
        }
        let article = self.directory.get_article(&comment.article_id)?;
        let actor = describe_actor(self.directory.as_ref(), actor_id);
        let aggregate = self.aggregator.record_like(
            &comment.author_id,
            &LikeSubject::comment(&comment, article.as_ref()),
            &actor,
            self.clock.now(),
        )?;
        Ok(DispatchOutcome::Aggregated(aggregate))
    }

    pub fn retract_article_like(&self, actor_id: &str, article_id: &str) -> Result<DispatchOutcome> {
        let Some(article) = self.directory.get_article(article_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        if article.author_id == actor_id {
            return Ok(DispatchOutcome::Suppressed(SuppressionReason::SelfAction));
        }
        let removal =
            self.aggregator
                .retract_like(&article.author_id, &LikeSubject::article(&article), actor_id)?;
        Ok(retracted(&article.id, removal))
    }

    pub fn retract_comment_like(&self, actor_id: &str, comment_id: &str) -> Result<DispatchOutcome> {
        let Some(comment) = self.directory.get_comment(comment_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        if comment.author_id == actor_id {
            return Ok(DispatchOutcome::Suppressed(SuppressionReason::SelfAction));
        }
        let article = self.directory.get_article(&comment.article_id)?;
        let removal = self.aggregator.retract_like(
            &comment.author_id,
            &LikeSubject::comment(&comment, article.as_ref()),
            actor_id,
        )?;
        Ok(retracted(&comment.id, removal))
    }

    /// Notifies every follower of the author, one notification each. A
    /// failure for one follower does not stop the others.
    pub fn notify_article_published(&self, actor_id: &str, article_id: &str) -> Result<DispatchOutcome> {
        let Some(article) = self.directory.get_article(article_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        if article.author_id != actor_id {
            return Ok(DispatchOutcome::Suppressed(SuppressionReason::NotAuthor));
        }

        let mut follower_ids = self.directory.get_follower_ids(&article.author_id)?;
        if follower_ids.len() > self.settings.fan_out_limit {
            warn!(
                "Article {} has {} followers to notify, only the first {} will be",
                article.id,
                follower_ids.len(),
                self.settings.fan_out_limit
            );
            follower_ids.truncate(self.settings.fan_out_limit);
        }

        let author = describe_actor(self.directory.as_ref(), &article.author_id);
        let (title, message) = messages::new_article(author.name.clone(), article.title.as_deref());
        let mut created = Vec::new();
        for follower_id in follower_ids {
            match self.suppression_for(&follower_id, &article.author_id) {
                Ok(None) => {}
                Ok(Some(_)) => continue,
                Err(err) => {
                    warn!("Failed to check suppression for follower {}: {:#}", follower_id, err);
                    continue;
                }
            }
            let new = NewNotification {
                user_id: follower_id.clone(),
                notification_type: NotificationType::Announcement,
                title: title.clone(),
                message: message.clone(),
                link: Some(article.link()),
                actor: Some(author.clone()),
                meta: meta(&[
                    ("articleId", json!(article.id)),
                    ("articleSlug", json!(article.link_slug())),
                    ("kind", json!("new-article")),
                ]),
            };
            match self.create(new, Some(format!("articleId:{}", article.id))) {
                Ok(DispatchOutcome::Created(mut notifications)) => created.append(&mut notifications),
                Ok(_) => {}
                Err(err) => warn!(
                    "Failed to notify follower {} about article {}: {:#}",
                    follower_id, article.id, err
                ),
            }
        }
        Ok(DispatchOutcome::Created(created))
    }

    pub fn notify_follow(&self, actor_id: &str, followed_id: &str) -> Result<DispatchOutcome> {
        let Some(followed) = self.directory.get_user(followed_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        if let Some(suppressed) = self.suppression_for(&followed.id, actor_id)? {
            return Ok(suppressed);
        }
        if !self.directory.is_following(actor_id, &followed.id)? {
            return Ok(DispatchOutcome::Suppressed(SuppressionReason::NotFollowing));
        }

        let actor = describe_actor(self.directory.as_ref(), actor_id);
        let (title, message) = messages::new_follower(actor.name.clone());
        let new = NewNotification {
            user_id: followed.id.clone(),
            notification_type: NotificationType::Follow,
            title,
            message,
            link: Some(actor.profile_link()),
            meta: meta(&[("followerId", json!(actor.id))]),
            actor: Some(actor),
        };
        self.create(new, None)
    }

    /// Tells an author that a moderator rejected their article. The notice
    /// is a system announcement and carries no actor.
    pub fn notify_article_rejected(
        &self,
        moderator_id: &str,
        article_id: &str,
        reason: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let Some(article) = self.directory.get_article(article_id)? else {
            return Ok(DispatchOutcome::SubjectNotFound);
        };
        if article.author_id == moderator_id {
            return Ok(DispatchOutcome::Suppressed(SuppressionReason::SelfAction));
        }

        let (title, message) = messages::article_rejected(reason);
        let new = NewNotification {
            user_id: article.author_id.clone(),
            notification_type: NotificationType::Announcement,
            title,
            message,
            link: Some(article.link()),
            actor: None,
            meta: meta(&[("articleId", json!(article.id)), ("action", json!("reject"))]),
        };
        self.create(new, Some(format!("articleId:{}", article.id)))
    }

    /// `page` starts at 1. Both arguments are raised to at least 1. Pages
    /// past the end are empty.
    pub fn get_feed(&self, user_id: &str, page: usize, page_size: usize) -> Result<FeedPage> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page - 1).saturating_mul(page_size);
        Ok(FeedPage {
            data: self.store.get_notifications(user_id, offset, page_size)?,
            total: self.store.count_notifications(user_id)?,
            page,
            page_size,
            unread_count: self.store.count_unread(user_id)?,
            blocked_actor_ids: self.store.get_blocked_actor_ids(user_id)?,
        })
    }

    pub fn unread_count(&self, user_id: &str) -> Result<usize> {
        self.store.count_unread(user_id)
    }

    /// Returns false if the notification does not exist for this user. That
    /// is not an error for callers.
    pub fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<bool> {
        self.store.mark_read(user_id, notification_id, self.clock.now())
    }

    pub fn mark_read_ids(&self, user_id: &str, notification_ids: &[String]) -> Result<usize> {
        self.store
            .mark_read_many(user_id, notification_ids, self.clock.now())
    }

    pub fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        self.store.mark_all_read(user_id, self.clock.now())
    }

    pub fn delete_notification(&self, user_id: &str, notification_id: &str) -> Result<bool> {
        self.store.delete_notification(user_id, notification_id)
    }

    /// Blocks `actor_id` for `user_id` and removes the notifications the
    /// actor already caused. Returns how many were removed.
    pub fn block_actor(&self, user_id: &str, actor_id: &str) -> Result<usize> {
        let purged = self.aggregator.block_actor(user_id, actor_id, self.clock.now())?;
        debug!(
            "User {} blocked {}, {} notifications removed",
            user_id, actor_id, purged
        );
        Ok(purged)
    }

    pub fn unblock_actor(&self, user_id: &str, actor_id: &str) -> Result<bool> {
        self.store.unblock_actor(user_id, actor_id)
    }
}

fn retracted(subject_id: &str, removal: LikeRemoval) -> DispatchOutcome {
    if removal == LikeRemoval::Deleted {
        debug!("Last like on {} withdrawn, aggregate removed", subject_id);
    }
    DispatchOutcome::Retracted
}
