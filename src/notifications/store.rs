use super::models::{LikeKind, LikeRemoval, LikeRendering, NewNotification, Notification};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Renders an aggregate from its ordered liker ids, first liker first.
pub type LikeRenderer<'a> = dyn Fn(&[String]) -> LikeRendering + 'a;

/// Renders any of a recipient's aggregates, identified by kind and subject
/// id, from its remaining liker ids.
pub type AggregateRenderer<'a> = dyn Fn(LikeKind, &str, &[String]) -> LikeRendering + 'a;

/// Persistence of notifications and of each recipient's blocked actors.
///
/// Every read and write is scoped by the recipient id: operations on ids
/// owned by someone else behave as if the id did not exist.
pub trait NotificationStore: Send + Sync {
    fn insert_notification(&self, new: NewNotification, now: DateTime<Utc>) -> Result<Notification>;

    /// Inserts `new` unless a notification of the same type, from the same
    /// actor and about the same `subject_key` was created at or after
    /// `since`. Check and insert happen atomically.
    /// Returns Ok(None) if a duplicate exists.
    fn insert_unless_duplicate(
        &self,
        new: NewNotification,
        subject_key: Option<&str>,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>>;

    /// Adds `actor_id` to the liker set of the aggregate for
    /// (`user_id`, `kind`, `subject_id`), creating it if absent, and stores
    /// the fields produced by `render` as an unread notification dated `now`.
    /// Adding an actor that is already a liker keeps the set unchanged.
    fn add_liker(
        &self,
        user_id: &str,
        kind: LikeKind,
        subject_id: &str,
        actor_id: &str,
        now: DateTime<Utc>,
        render: &LikeRenderer<'_>,
    ) -> Result<Notification>;

    /// Removes `actor_id` from the liker set. The aggregate keeps its read
    /// state and creation time, and is deleted once no liker remains.
    fn remove_liker(
        &self,
        user_id: &str,
        kind: LikeKind,
        subject_id: &str,
        actor_id: &str,
        render: &LikeRenderer<'_>,
    ) -> Result<LikeRemoval>;

    /// Ordered liker ids of an aggregate, empty if it does not exist.
    fn get_liker_ids(&self, user_id: &str, kind: LikeKind, subject_id: &str) -> Result<Vec<String>>;

    /// Returns Ok(None) if the notification does not exist for this user.
    fn get_notification(&self, user_id: &str, id: &str) -> Result<Option<Notification>>;

    /// Newest first.
    fn get_notifications(&self, user_id: &str, offset: usize, limit: usize) -> Result<Vec<Notification>>;

    fn count_notifications(&self, user_id: &str) -> Result<usize>;

    fn count_unread(&self, user_id: &str) -> Result<usize>;

    /// Returns whether the notification exists for this user. `read_at` is
    /// only set the first time.
    fn mark_read(&self, user_id: &str, id: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Returns the number of notifications that went from unread to read.
    fn mark_read_many(&self, user_id: &str, ids: &[String], now: DateTime<Utc>) -> Result<usize>;

    /// Returns the number of notifications that went from unread to read.
    fn mark_all_read(&self, user_id: &str, now: DateTime<Utc>) -> Result<usize>;

    /// Returns false if nothing was deleted.
    fn delete_notification(&self, user_id: &str, id: &str) -> Result<bool>;

    /// Adds `actor_id` to the user's blocked set and deletes every
    /// notification of that user whose actor is `actor_id`. Like aggregates
    /// lose `actor_id` from their liker set instead: the ones with likers left
    /// are re-rendered through `render` keeping their read state and
    /// creation time, the others are deleted.
    /// Returns the number of notifications deleted.
    fn block_actor(
        &self,
        user_id: &str,
        actor_id: &str,
        now: DateTime<Utc>,
        render: &AggregateRenderer<'_>,
    ) -> Result<usize>;

    /// Returns false if the actor was not blocked.
    fn unblock_actor(&self, user_id: &str, actor_id: &str) -> Result<bool>;

    fn is_actor_blocked(&self, user_id: &str, actor_id: &str) -> Result<bool>;

    /// Oldest block first.
    fn get_blocked_actor_ids(&self, user_id: &str) -> Result<Vec<String>>;
}
