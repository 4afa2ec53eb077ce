use super::models::{
    LikeKind, LikeRemoval, LikeRendering, NewNotification, Notification, NotificationType,
};
use super::schema::NOTIFICATIONS_VERSIONED_SCHEMAS;
use super::store::{AggregateRenderer, LikeRenderer, NotificationStore};
use crate::sqlite_persistence::open_versioned;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str =
    "id, notification_type, title, message, link, actor, meta, read, created_at, read_at";

pub struct SqliteNotificationStore {
    conn: Arc<Mutex<Connection>>,
}

fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error<E>(index: usize, error: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
}

fn parse_timestamp(index: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| conversion_error(index, e))
}

fn json_column<T: DeserializeOwned>(row: &Row, index: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(index, e))
}

fn optional_json_column<T: DeserializeOwned>(row: &Row, index: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|raw| serde_json::from_str(&raw).map_err(|e| conversion_error(index, e)))
        .transpose()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("Failed to serialize notification field")
}

fn to_optional_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value.as_ref().map(to_json).transpose()
}

fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    let raw_type: String = row.get(1)?;
    let notification_type = NotificationType::parse(&raw_type).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(1, format!("notification_type '{}'", raw_type), Type::Text)
    })?;
    let created_at: String = row.get(8)?;
    let read_at: Option<String> = row.get(9)?;
    Ok(Notification {
        id: row.get(0)?,
        notification_type,
        title: json_column(row, 2)?,
        message: json_column(row, 3)?,
        link: row.get(4)?,
        actor: optional_json_column(row, 5)?,
        meta: optional_json_column(row, 6)?,
        read: row.get::<_, i64>(7)? != 0,
        created_at: parse_timestamp(8, &created_at)?,
        read_at: read_at.map(|raw| parse_timestamp(9, &raw)).transpose()?,
    })
}

fn select_notification(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Notification>> {
    let notification = conn
        .query_row(
            &format!(
                "SELECT {} FROM notifications WHERE id = ?1 AND user_id = ?2",
                NOTIFICATION_COLUMNS
            ),
            params![id, user_id],
            notification_from_row,
        )
        .optional()?;
    Ok(notification)
}

fn insert_row(
    conn: &Connection,
    new: &NewNotification,
    subject_key: Option<&str>,
    now: &DateTime<Utc>,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO notifications (id, user_id, notification_type, title, message, link, actor, actor_id, meta, subject_key, read, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)",
        params![
            id,
            new.user_id,
            new.notification_type.as_str(),
            to_json(&new.title)?,
            to_json(&new.message)?,
            new.link,
            to_optional_json(&new.actor)?,
            new.actor.as_ref().map(|actor| actor.id.as_str()),
            to_optional_json(&new.meta)?,
            subject_key,
            format_timestamp(now),
        ],
    )
    .context("Failed to insert notification")?;
    Ok(id)
}

fn find_aggregate_id(conn: &Connection, user_id: &str, aggregate_key: &str) -> Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM notifications WHERE user_id = ?1 AND aggregate_key = ?2",
            params![user_id, aggregate_key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn load_liker_ids(conn: &Connection, notification_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT actor_id FROM notification_likers WHERE notification_id = ?1 ORDER BY position ASC",
    )?;
    let ids = stmt
        .query_map(params![notification_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

fn store_rendering(conn: &Connection, notification_id: &str, rendering: &LikeRendering) -> Result<()> {
    conn.execute(
        "UPDATE notifications SET title = ?2, message = ?3, link = ?4, actor = ?5, actor_id = ?6, meta = ?7 WHERE id = ?1",
        params![
            notification_id,
            to_json(&rendering.title)?,
            to_json(&rendering.message)?,
            rendering.link,
            to_optional_json(&rendering.actor)?,
            rendering.actor.as_ref().map(|actor| actor.id.as_str()),
            to_json(&rendering.meta)?,
        ],
    )?;
    Ok(())
}

impl SqliteNotificationStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, NOTIFICATIONS_VERSIONED_SCHEMAS, "notifications")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory notifications store")?;
        NOTIFICATIONS_VERSIONED_SCHEMAS
            .last()
            .context("No notifications schema defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("notifications connection mutex poisoned"))
    }
}

impl NotificationStore for SqliteNotificationStore {
    fn insert_notification(&self, new: NewNotification, now: DateTime<Utc>) -> Result<Notification> {
        let conn = self.conn()?;
        let id = insert_row(&conn, &new, None, &now)?;
        select_notification(&conn, &new.user_id, &id)?
            .with_context(|| format!("Notification {} vanished after insert", id))
    }

    fn insert_unless_duplicate(
        &self,
        new: NewNotification,
        subject_key: Option<&str>,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let actor_id = new.actor.as_ref().map(|actor| actor.id.as_str());
        let duplicate = tx
            .query_row(
                "SELECT id FROM notifications WHERE user_id = ?1 AND notification_type = ?2 \
                 AND actor_id IS ?3 AND subject_key IS ?4 AND created_at >= ?5 LIMIT 1",
                params![
                    new.user_id,
                    new.notification_type.as_str(),
                    actor_id,
                    subject_key,
                    format_timestamp(&since)
                ],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        if let Some(existing_id) = duplicate {
            debug!(
                "Skipping {} notification for {}: duplicate of {}",
                new.notification_type, new.user_id, existing_id
            );
            return Ok(None);
        }

        let id = insert_row(&tx, &new, subject_key, &now)?;
        let notification = select_notification(&tx, &new.user_id, &id)?;
        tx.commit()?;
        Ok(notification)
    }

    fn add_liker(
        &self,
        user_id: &str,
        kind: LikeKind,
        subject_id: &str,
        actor_id: &str,
        now: DateTime<Utc>,
        render: &LikeRenderer<'_>,
    ) -> Result<Notification> {
        let aggregate_key = kind.aggregate_key(subject_id);
        let now = format_timestamp(&now);
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let id = match find_aggregate_id(&tx, user_id, &aggregate_key)? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO notifications (id, user_id, notification_type, title, message, subject_key, aggregate_key, read, created_at) \
                     VALUES (?1, ?2, ?3, '\"\"', '\"\"', ?4, ?5, 0, ?6)",
                    params![
                        id,
                        user_id,
                        NotificationType::Like.as_str(),
                        format!("{}:{}", kind.subject_field(), subject_id),
                        aggregate_key,
                        now
                    ],
                )
                .context("Failed to create like aggregate")?;
                id
            }
        };

        tx.execute(
            "INSERT OR IGNORE INTO notification_likers (notification_id, actor_id, position) \
             VALUES (?1, ?2, (SELECT COALESCE(MAX(position), 0) + 1 FROM notification_likers WHERE notification_id = ?1))",
            params![id, actor_id],
        )?;
        let liker_ids = load_liker_ids(&tx, &id)?;
        store_rendering(&tx, &id, &render(&liker_ids))?;
        tx.execute(
            "UPDATE notifications SET read = 0, read_at = NULL, created_at = ?2 WHERE id = ?1",
            params![id, now],
        )?;

        let notification = select_notification(&tx, user_id, &id)?
            .with_context(|| format!("Like aggregate {} vanished during update", id))?;
        tx.commit()?;
        Ok(notification)
    }

    fn remove_liker(
        &self,
        user_id: &str,
        kind: LikeKind,
        subject_id: &str,
        actor_id: &str,
        render: &LikeRenderer<'_>,
    ) -> Result<LikeRemoval> {
        let aggregate_key = kind.aggregate_key(subject_id);
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(id) = find_aggregate_id(&tx, user_id, &aggregate_key)? else {
            return Ok(LikeRemoval::Unchanged);
        };
        let removed = tx.execute(
            "DELETE FROM notification_likers WHERE notification_id = ?1 AND actor_id = ?2",
            params![id, actor_id],
        )?;
        if removed == 0 {
            return Ok(LikeRemoval::Unchanged);
        }

        let liker_ids = load_liker_ids(&tx, &id)?;
        let removal = if liker_ids.is_empty() {
            tx.execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
            LikeRemoval::Deleted
        } else {
            store_rendering(&tx, &id, &render(&liker_ids))?;
            let notification = select_notification(&tx, user_id, &id)?
                .with_context(|| format!("Like aggregate {} vanished during update", id))?;
            LikeRemoval::Updated(notification)
        };
        tx.commit()?;
        Ok(removal)
    }

    fn get_liker_ids(&self, user_id: &str, kind: LikeKind, subject_id: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        match find_aggregate_id(&conn, user_id, &kind.aggregate_key(subject_id))? {
            Some(id) => load_liker_ids(&conn, &id),
            None => Ok(vec![]),
        }
    }

    fn get_notification(&self, user_id: &str, id: &str) -> Result<Option<Notification>> {
        let conn = self.conn()?;
        select_notification(&conn, user_id, id)
    }

    fn get_notifications(&self, user_id: &str, offset: usize, limit: usize) -> Result<Vec<Notification>> {
        // SQLite reads a negative LIMIT as "no limit" and a negative OFFSET as 0.
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            NOTIFICATION_COLUMNS
        ))?;
        let notifications = stmt
            .query_map(
                params![user_id, limit, offset],
                notification_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    fn count_notifications(&self, user_id: &str) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn count_unread(&self, user_id: &str) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn mark_read(&self, user_id: &str, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let matched = self.conn()?.execute(
            "UPDATE notifications SET read = 1, read_at = COALESCE(read_at, ?3) WHERE id = ?1 AND user_id = ?2",
            params![id, user_id, format_timestamp(&now)],
        )?;
        Ok(matched > 0)
    }

    fn mark_read_many(&self, user_id: &str, ids: &[String], now: DateTime<Utc>) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE notifications SET read = 1, read_at = COALESCE(read_at, ?) WHERE user_id = ? AND read = 0 AND id IN ({})",
            placeholders
        );
        let mut values = Vec::with_capacity(ids.len() + 2);
        values.push(format_timestamp(&now));
        values.push(user_id.to_string());
        values.extend(ids.iter().cloned());
        let updated = self.conn()?.execute(&sql, params_from_iter(values.iter()))?;
        Ok(updated)
    }

    fn mark_all_read(&self, user_id: &str, now: DateTime<Utc>) -> Result<usize> {
        let updated = self.conn()?.execute(
            "UPDATE notifications SET read = 1, read_at = COALESCE(read_at, ?2) WHERE user_id = ?1 AND read = 0",
            params![user_id, format_timestamp(&now)],
        )?;
        Ok(updated)
    }

    fn delete_notification(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if deleted > 0 {
            tx.execute(
                "DELETE FROM notification_likers WHERE notification_id = ?1",
                params![id],
            )?;
        }
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn block_actor(
        &self,
        user_id: &str,
        actor_id: &str,
        now: DateTime<Utc>,
        render: &AggregateRenderer<'_>,
    ) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT OR IGNORE INTO blocked_actors (user_id, actor_id, blocked_at) VALUES (?1, ?2, ?3)",
            params![user_id, actor_id, format_timestamp(&now)],
        )?;

        let aggregates = {
            let mut stmt = tx.prepare(
                "SELECT n.id, n.aggregate_key FROM notifications n \
                 JOIN notification_likers l ON l.notification_id = n.id \
                 WHERE n.user_id = ?1 AND l.actor_id = ?2 AND n.aggregate_key IS NOT NULL",
            )?;
            let rows = stmt
                .query_map(params![user_id, actor_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut purged = 0;
        for (id, aggregate_key) in aggregates {
            tx.execute(
                "DELETE FROM notification_likers WHERE notification_id = ?1 AND actor_id = ?2",
                params![id, actor_id],
            )?;
            let liker_ids = load_liker_ids(&tx, &id)?;
            let subject = LikeKind::parse_aggregate_key(&aggregate_key);
            match subject {
                Some((kind, subject_id)) if !liker_ids.is_empty() => {
                    store_rendering(&tx, &id, &render(kind, subject_id, &liker_ids))?;
                }
                _ => {
                    tx.execute(
                        "DELETE FROM notification_likers WHERE notification_id = ?1",
                        params![id],
                    )?;
                    purged += tx.execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
                }
            }
        }

        purged += tx.execute(
            "DELETE FROM notifications WHERE user_id = ?1 AND actor_id = ?2 AND aggregate_key IS NULL",
            params![user_id, actor_id],
        )?;
        tx.commit()?;
        Ok(purged)
    }

    fn unblock_actor(&self, user_id: &str, actor_id: &str) -> Result<bool> {
        let removed = self.conn()?.execute(
            "DELETE FROM blocked_actors WHERE user_id = ?1 AND actor_id = ?2",
            params![user_id, actor_id],
        )?;
        Ok(removed > 0)
    }

    fn is_actor_blocked(&self, user_id: &str, actor_id: &str) -> Result<bool> {
        let blocked = self
            .conn()?
            .query_row(
                "SELECT 1 FROM blocked_actors WHERE user_id = ?1 AND actor_id = ?2",
                params![user_id, actor_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(blocked.is_some())
    }

    fn get_blocked_actor_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT actor_id FROM blocked_actors WHERE user_id = ?1 ORDER BY blocked_at ASC, rowid ASC",
        )?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::models::{LocalizedText, NotificationActor};
    use chrono::Duration;
    use serde_json::{json, Map};
    use std::cell::RefCell;
    use std::thread;
    use tempfile::TempDir;

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn actor(id: &str) -> NotificationActor {
        NotificationActor {
            id: id.to_string(),
            nickname: Some(id.to_string()),
            name: Some(id.to_string()),
        }
    }

    fn comment_for(user_id: &str, actor_id: &str) -> NewNotification {
        let mut meta = Map::new();
        meta.insert("articleId".to_string(), json!("a1"));
        NewNotification {
            user_id: user_id.to_string(),
            notification_type: NotificationType::Comment,
            title: LocalizedText::template("notifications.titles.articleComment")
                .with("user", actor_id),
            message: LocalizedText::literal("hello"),
            link: Some("/article/a1#comment-c1".to_string()),
            actor: Some(actor(actor_id)),
            meta: Some(meta),
        }
    }

    fn rendering(liker_ids: &[String]) -> LikeRendering {
        let mut meta = Map::new();
        meta.insert("likerIds".to_string(), json!(liker_ids));
        meta.insert("count".to_string(), json!(liker_ids.len()));
        LikeRendering {
            title: LocalizedText::literal(format!("{} likes", liker_ids.len())),
            message: LocalizedText::literal(""),
            link: Some("/article/a1".to_string()),
            actor: liker_ids.last().map(|id| actor(id.as_str())),
            meta,
        }
    }

    fn rerender(_kind: LikeKind, _subject_id: &str, liker_ids: &[String]) -> LikeRendering {
        rendering(liker_ids)
    }

    #[test]
    fn inserted_notification_round_trips_through_the_feed() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00.123Z");
        let new = comment_for("r", "x");
        let inserted = store.insert_notification(new.clone(), now).unwrap();

        let page = store.get_notifications("r", 0, 20).unwrap();
        assert_eq!(page, vec![inserted.clone()]);
        assert_eq!(inserted.notification_type, new.notification_type);
        assert_eq!(inserted.title, new.title);
        assert_eq!(inserted.message, new.message);
        assert_eq!(inserted.link, new.link);
        assert_eq!(inserted.actor, new.actor);
        assert_eq!(inserted.meta, new.meta);
        assert!(!inserted.read);
        assert_eq!(inserted.created_at, now);
        assert_eq!(inserted.read_at, None);
    }

    #[test]
    fn feed_is_newest_first_and_paged() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let start = at("2026-10-18T10:00:00Z");
        for minute in 0..5 {
            store
                .insert_notification(comment_for("r", "x"), start + Duration::minutes(minute))
                .unwrap();
        }
        let first = store.get_notifications("r", 0, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].created_at, start + Duration::minutes(4));
        assert_eq!(first[1].created_at, start + Duration::minutes(3));
        let last = store.get_notifications("r", 4, 2).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].created_at, start);
        assert_eq!(store.count_notifications("r").unwrap(), 5);
        assert!(store.get_notifications("someone-else", 0, 10).unwrap().is_empty());
    }

    #[test]
    fn duplicate_check_respects_the_since_boundary() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let day_start = at("2026-10-18T00:00:00Z");
        let morning = at("2026-10-18T09:00:00Z");

        let first = store
            .insert_unless_duplicate(comment_for("r", "x"), Some("articleId:a1"), day_start, morning)
            .unwrap();
        assert!(first.is_some());
        let second = store
            .insert_unless_duplicate(comment_for("r", "x"), Some("articleId:a1"), day_start, morning)
            .unwrap();
        assert!(second.is_none());

        // Different subject or actor is not a duplicate.
        assert!(store
            .insert_unless_duplicate(comment_for("r", "x"), Some("articleId:a2"), day_start, morning)
            .unwrap()
            .is_some());
        assert!(store
            .insert_unless_duplicate(comment_for("r", "y"), Some("articleId:a1"), day_start, morning)
            .unwrap()
            .is_some());

        let next_day = day_start + Duration::days(1);
        assert!(store
            .insert_unless_duplicate(
                comment_for("r", "x"),
                Some("articleId:a1"),
                next_day,
                next_day + Duration::hours(1)
            )
            .unwrap()
            .is_some());
        assert_eq!(store.count_notifications("r").unwrap(), 4);
    }

    #[test]
    fn likers_are_a_set_in_first_seen_order() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00Z");
        for liker in ["a", "b", "a", "c"] {
            store
                .add_liker("r", LikeKind::Article, "a1", liker, now, &rendering)
                .unwrap();
        }
        assert_eq!(
            store.get_liker_ids("r", LikeKind::Article, "a1").unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(store.count_notifications("r").unwrap(), 1);

        // A comment like on the same id is a separate aggregate.
        store
            .add_liker("r", LikeKind::Comment, "a1", "a", now, &rendering)
            .unwrap();
        assert_eq!(store.count_notifications("r").unwrap(), 2);
    }

    #[test]
    fn new_like_resurfaces_the_aggregate() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let first = at("2026-10-18T10:00:00Z");
        let aggregate = store
            .add_liker("r", LikeKind::Article, "a1", "a", first, &rendering)
            .unwrap();
        assert!(store.mark_read("r", &aggregate.id, first).unwrap());

        let later = first + Duration::hours(2);
        let updated = store
            .add_liker("r", LikeKind::Article, "a1", "b", later, &rendering)
            .unwrap();
        assert_eq!(updated.id, aggregate.id);
        assert!(!updated.read);
        assert_eq!(updated.read_at, None);
        assert_eq!(updated.created_at, later);
        assert_eq!(updated.actor_id(), Some("b"));
        assert_eq!(updated.meta.unwrap()["count"], json!(2));
    }

    #[test]
    fn removing_likers_recounts_then_deletes() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00Z");
        store
            .add_liker("r", LikeKind::Comment, "c1", "a", now, &rendering)
            .unwrap();
        let aggregate = store
            .add_liker("r", LikeKind::Comment, "c1", "b", now, &rendering)
            .unwrap();
        store.mark_read("r", &aggregate.id, now).unwrap();

        assert_eq!(
            store
                .remove_liker("r", LikeKind::Comment, "c1", "nobody", &rendering)
                .unwrap(),
            LikeRemoval::Unchanged
        );
        match store
            .remove_liker("r", LikeKind::Comment, "c1", "b", &rendering)
            .unwrap()
        {
            LikeRemoval::Updated(updated) => {
                assert!(updated.read);
                assert_eq!(updated.actor_id(), Some("a"));
                assert_eq!(updated.meta.unwrap()["likerIds"], json!(["a"]));
            }
            other => panic!("unexpected removal result {:?}", other),
        }
        assert_eq!(
            store
                .remove_liker("r", LikeKind::Comment, "c1", "a", &rendering)
                .unwrap(),
            LikeRemoval::Deleted
        );
        assert_eq!(store.count_notifications("r").unwrap(), 0);

        // The next like starts a fresh aggregate.
        store
            .add_liker("r", LikeKind::Comment, "c1", "c", now, &rendering)
            .unwrap();
        assert_eq!(
            store.get_liker_ids("r", LikeKind::Comment, "c1").unwrap(),
            vec!["c".to_string()]
        );
    }

    #[test]
    fn concurrent_likes_are_never_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteNotificationStore::new(dir.path().join("notifications.db")).unwrap());
        let now = at("2026-10-18T10:00:00Z");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    store
                        .add_liker("r", LikeKind::Article, "a1", &format!("liker-{}", i), now, &rendering)
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let likers = store.get_liker_ids("r", LikeKind::Article, "a1").unwrap();
        assert_eq!(likers.len(), 8);
        let aggregate = &store.get_notifications("r", 0, 10).unwrap()[0];
        assert_eq!(aggregate.meta.as_ref().unwrap()["count"], json!(8));
    }

    #[test]
    fn read_marks_are_scoped_and_stamped_once() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00Z");
        let n = store.insert_notification(comment_for("r", "x"), now).unwrap();

        assert!(!store.mark_read("intruder", &n.id, now).unwrap());
        assert!(!store.mark_read("r", "missing", now).unwrap());
        assert!(store.mark_read("r", &n.id, now).unwrap());
        assert!(store.mark_read("r", &n.id, now + Duration::hours(1)).unwrap());

        let read = store.get_notification("r", &n.id).unwrap().unwrap();
        assert!(read.read);
        assert_eq!(read.read_at, Some(now));
        assert!(store.get_notification("intruder", &n.id).unwrap().is_none());
    }

    #[test]
    fn mark_many_and_mark_all() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00Z");
        let ids: Vec<String> = (0..4)
            .map(|_| store.insert_notification(comment_for("r", "x"), now).unwrap().id)
            .collect();
        store.insert_notification(comment_for("other", "x"), now).unwrap();

        let marked = store
            .mark_read_many("r", &[ids[0].clone(), ids[1].clone(), "missing".to_string()], now)
            .unwrap();
        assert_eq!(marked, 2);
        assert_eq!(store.count_unread("r").unwrap(), 2);
        assert_eq!(store.mark_read_many("r", &[], now).unwrap(), 0);

        assert_eq!(store.mark_all_read("r", now).unwrap(), 2);
        assert_eq!(store.count_unread("r").unwrap(), 0);
        assert_eq!(store.count_unread("other").unwrap(), 1);
        assert!(store
            .get_notifications("r", 0, 10)
            .unwrap()
            .iter()
            .all(|n| n.read && n.read_at.is_some()));
    }

    #[test]
    fn delete_is_scoped_to_owner() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00Z");
        let n = store.insert_notification(comment_for("r", "x"), now).unwrap();
        assert!(!store.delete_notification("intruder", &n.id).unwrap());
        assert!(store.delete_notification("r", &n.id).unwrap());
        assert!(!store.delete_notification("r", &n.id).unwrap());
    }

    #[test]
    fn blocking_purges_existing_notifications_from_the_actor() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00Z");
        store.insert_notification(comment_for("r", "x"), now).unwrap();
        store.insert_notification(comment_for("r", "x"), now).unwrap();
        store.insert_notification(comment_for("r", "y"), now).unwrap();
        store.insert_notification(comment_for("other", "x"), now).unwrap();
        store
            .add_liker("r", LikeKind::Article, "a1", "x", now, &rendering)
            .unwrap();

        assert_eq!(store.block_actor("r", "x", now, &rerender).unwrap(), 3);
        assert!(store.is_actor_blocked("r", "x").unwrap());
        assert!(!store.is_actor_blocked("other", "x").unwrap());
        assert_eq!(store.count_notifications("r").unwrap(), 1);
        assert_eq!(store.count_notifications("other").unwrap(), 1);
        assert!(store.get_liker_ids("r", LikeKind::Article, "a1").unwrap().is_empty());

        // Blocking twice is harmless.
        assert_eq!(store.block_actor("r", "x", now, &rerender).unwrap(), 0);
        store.block_actor("r", "z", now + Duration::minutes(1), &rerender).unwrap();
        assert_eq!(
            store.get_blocked_actor_ids("r").unwrap(),
            vec!["x".to_string(), "z".to_string()]
        );

        assert!(store.unblock_actor("r", "x").unwrap());
        assert!(!store.unblock_actor("r", "x").unwrap());
        assert!(!store.is_actor_blocked("r", "x").unwrap());
    }

    #[test]
    fn blocking_an_earlier_liker_keeps_the_aggregate_for_the_others() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00Z");
        store
            .add_liker("r", LikeKind::Article, "a1", "x", now, &rendering)
            .unwrap();
        let aggregate = store
            .add_liker("r", LikeKind::Article, "a1", "b", now, &rendering)
            .unwrap();
        store.mark_read("r", &aggregate.id, now).unwrap();

        let later = now + Duration::hours(1);
        assert_eq!(store.block_actor("r", "x", later, &rerender).unwrap(), 0);
        let remaining = store.get_notification("r", &aggregate.id).unwrap().unwrap();
        assert!(remaining.read);
        assert_eq!(remaining.created_at, now);
        assert_eq!(remaining.actor_id(), Some("b"));
        assert_eq!(remaining.meta.unwrap()["likerIds"], json!(["b"]));

        // The next like no longer carries the blocked liker.
        let updated = store
            .add_liker("r", LikeKind::Article, "a1", "c", later, &rendering)
            .unwrap();
        assert_eq!(updated.meta.unwrap()["likerIds"], json!(["b", "c"]));
    }

    #[test]
    fn blocking_the_latest_liker_hands_the_aggregate_back() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00Z");
        store
            .add_liker("r", LikeKind::Comment, "c1", "b", now, &rendering)
            .unwrap();
        let aggregate = store
            .add_liker("r", LikeKind::Comment, "c1", "x", now, &rendering)
            .unwrap();
        assert_eq!(aggregate.actor_id(), Some("x"));

        let rendered = RefCell::new(Vec::new());
        let render = |kind: LikeKind, subject_id: &str, liker_ids: &[String]| {
            rendered.borrow_mut().push((kind, subject_id.to_string()));
            rendering(liker_ids)
        };
        let purged = store.block_actor("r", "x", now, &render).unwrap();
        let rendered = rendered.into_inner();
        assert_eq!(purged, 0);
        assert_eq!(rendered, vec![(LikeKind::Comment, "c1".to_string())]);
        assert_eq!(
            store.get_liker_ids("r", LikeKind::Comment, "c1").unwrap(),
            vec!["b".to_string()]
        );
        let remaining = store.get_notification("r", &aggregate.id).unwrap().unwrap();
        assert_eq!(remaining.actor_id(), Some("b"));
        assert_eq!(store.count_notifications("r").unwrap(), 1);
    }

    #[test]
    fn offsets_past_the_end_return_nothing() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let now = at("2026-10-18T10:00:00Z");
        store.insert_notification(comment_for("r", "x"), now).unwrap();
        assert!(store.get_notifications("r", usize::MAX, 20).unwrap().is_empty());
        assert_eq!(store.get_notifications("r", 0, usize::MAX).unwrap().len(), 1);
    }

    #[test]
    fn reopening_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notifications.db");
        let now = at("2026-10-18T10:00:00Z");
        {
            let store = SqliteNotificationStore::new(&path).unwrap();
            store.insert_notification(comment_for("r", "x"), now).unwrap();
            store.block_actor("r", "y", now, &rerender).unwrap();
        }
        let store = SqliteNotificationStore::new(&path).unwrap();
        assert_eq!(store.count_notifications("r").unwrap(), 1);
        assert_eq!(store.get_blocked_actor_ids("r").unwrap(), vec!["y".to_string()]);
    }
}
