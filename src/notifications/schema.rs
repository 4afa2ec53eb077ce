//! SQLite schema for the notifications database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};

/// `title`, `message`, `actor` and `meta` hold JSON. `actor_id` and
/// `subject_key` duplicate what duplicate suppression and block purges look
/// up. `aggregate_key` is only set on like aggregates.
const NOTIFICATIONS_TABLE_V1: Table = Table {
    name: "notifications",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("notification_type", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("message", &SqlType::Text, non_null = true),
        sqlite_column!("link", &SqlType::Text),
        sqlite_column!("actor", &SqlType::Text),
        sqlite_column!("actor_id", &SqlType::Text),
        sqlite_column!("meta", &SqlType::Text),
        sqlite_column!("subject_key", &SqlType::Text),
        sqlite_column!("aggregate_key", &SqlType::Text),
        sqlite_column!(
            "read",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("read_at", &SqlType::Text),
    ],
    indices: &[
        ("idx_notifications_user_created", "user_id, created_at"),
        ("idx_notifications_user_read", "user_id, read"),
        ("idx_notifications_user_actor", "user_id, actor_id"),
    ],
    unique_constraints: &[&["user_id", "aggregate_key"]],
};

const NOTIFICATION_LIKERS_TABLE_V1: Table = Table {
    name: "notification_likers",
    columns: &[
        sqlite_column!("notification_id", &SqlType::Text, non_null = true),
        sqlite_column!("actor_id", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_notification_likers_notification", "notification_id")],
    unique_constraints: &[&["notification_id", "actor_id"]],
};

const BLOCKED_ACTORS_TABLE_V1: Table = Table {
    name: "blocked_actors",
    columns: &[
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("actor_id", &SqlType::Text, non_null = true),
        sqlite_column!("blocked_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_blocked_actors_user", "user_id")],
    unique_constraints: &[&["user_id", "actor_id"]],
};

pub const NOTIFICATIONS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        NOTIFICATIONS_TABLE_V1,
        NOTIFICATION_LIKERS_TABLE_V1,
        BLOCKED_ACTORS_TABLE_V1,
    ],
    migration: None,
}];
