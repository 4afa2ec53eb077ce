//! SQLite schema for the directory database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};

const USERS_TABLE_V1: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("nickname", &SqlType::Text),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("surname", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};

const ARTICLES_TABLE_V1: Table = Table {
    name: "articles",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("author_id", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text),
        sqlite_column!("slug", &SqlType::Text),
    ],
    indices: &[("idx_articles_author", "author_id")],
    unique_constraints: &[],
};

const COMMENTS_TABLE_V1: Table = Table {
    name: "comments",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("article_id", &SqlType::Text, non_null = true),
        sqlite_column!("author_id", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_comments_article", "article_id")],
    unique_constraints: &[],
};

const FOLLOWS_TABLE_V1: Table = Table {
    name: "follows",
    columns: &[
        sqlite_column!("follower_id", &SqlType::Text, non_null = true),
        sqlite_column!("followed_id", &SqlType::Text, non_null = true),
        sqlite_column!("followed_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_follows_followed", "followed_id")],
    unique_constraints: &[&["follower_id", "followed_id"]],
};

const SESSIONS_TABLE_V1: Table = Table {
    name: "sessions",
    columns: &[
        sqlite_column!("token", &SqlType::Text, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const DIRECTORY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        USERS_TABLE_V1,
        ARTICLES_TABLE_V1,
        COMMENTS_TABLE_V1,
        FOLLOWS_TABLE_V1,
        SESSIONS_TABLE_V1,
    ],
    migration: None,
}];
