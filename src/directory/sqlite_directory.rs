use super::models::{ArticleRef, CommentRef, UserProfile};
use super::schema::DIRECTORY_VERSIONED_SCHEMAS;
use super::ContentDirectory;
use crate::sqlite_persistence::open_versioned;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct SqliteDirectory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDirectory {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, DIRECTORY_VERSIONED_SCHEMAS, "directory")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory directory")?;
        DIRECTORY_VERSIONED_SCHEMAS
            .last()
            .context("No directory schema defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("directory connection mutex poisoned"))
    }

    pub fn add_user(&self, user: &UserProfile) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO users (id, nickname, name, surname) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.nickname, user.name, user.surname],
        )?;
        Ok(())
    }

    pub fn add_article(&self, article: &ArticleRef) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO articles (id, author_id, title, slug) VALUES (?1, ?2, ?3, ?4)",
            params![article.id, article.author_id, article.title, article.slug],
        )?;
        Ok(())
    }

    pub fn add_comment(&self, comment: &CommentRef) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO comments (id, article_id, author_id) VALUES (?1, ?2, ?3)",
            params![comment.id, comment.article_id, comment.author_id],
        )?;
        Ok(())
    }

    /// Returns false if the follow edge already existed.
    pub fn add_follow(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO follows (follower_id, followed_id, followed_at) VALUES (?1, ?2, ?3)",
            params![follower_id, followed_id, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    pub fn remove_follow(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        let removed = self.conn()?.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
            params![follower_id, followed_id],
        )?;
        Ok(removed > 0)
    }

    pub fn add_session(&self, token: &str, user_id: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO sessions (token, user_id) VALUES (?1, ?2)",
            params![token, user_id],
        )?;
        Ok(())
    }
}

impl ContentDirectory for SqliteDirectory {
    fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let user = self
            .conn()?
            .query_row(
                "SELECT id, nickname, name, surname FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        nickname: row.get(1)?,
                        name: row.get(2)?,
                        surname: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn get_article(&self, article_id: &str) -> Result<Option<ArticleRef>> {
        let article = self
            .conn()?
            .query_row(
                "SELECT id, author_id, title, slug FROM articles WHERE id = ?1",
                params![article_id],
                |row| {
                    Ok(ArticleRef {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        title: row.get(2)?,
                        slug: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(article)
    }

    fn get_comment(&self, comment_id: &str) -> Result<Option<CommentRef>> {
        let comment = self
            .conn()?
            .query_row(
                "SELECT id, article_id, author_id FROM comments WHERE id = ?1",
                params![comment_id],
                |row| {
                    Ok(CommentRef {
                        id: row.get(0)?,
                        article_id: row.get(1)?,
                        author_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(comment)
    }

    fn get_follower_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT follower_id FROM follows WHERE followed_id = ?1 ORDER BY followed_at ASC, rowid ASC",
        )?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    fn is_following(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        let edge = self
            .conn()?
            .query_row(
                "SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                params![follower_id, followed_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(edge.is_some())
    }

    fn resolve_session_token(&self, token: &str) -> Result<Option<String>> {
        let user_id = self
            .conn()?
            .query_row(
                "SELECT user_id FROM sessions WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user(id: &str, nickname: Option<&str>) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            nickname: nickname.map(str::to_string),
            name: None,
            surname: None,
        }
    }

    #[test]
    fn resolves_users_articles_and_comments() {
        let directory = SqliteDirectory::in_memory().unwrap();
        directory.add_user(&user("u1", Some("ayse"))).unwrap();
        directory
            .add_article(&ArticleRef {
                id: "a1".to_string(),
                author_id: "u1".to_string(),
                title: Some("Ownership".to_string()),
                slug: Some("ownership".to_string()),
            })
            .unwrap();
        directory
            .add_comment(&CommentRef {
                id: "c1".to_string(),
                article_id: "a1".to_string(),
                author_id: "u2".to_string(),
            })
            .unwrap();

        assert_eq!(directory.display_name("u1"), Some("ayse".to_string()));
        assert_eq!(directory.get_article("a1").unwrap().unwrap().author_id, "u1");
        assert_eq!(directory.get_comment("c1").unwrap().unwrap().article_id, "a1");
        assert!(directory.get_article("missing").unwrap().is_none());
        assert!(directory.display_name("missing").is_none());
    }

    #[test]
    fn follow_edges_are_unique_and_ordered() {
        let directory = SqliteDirectory::in_memory().unwrap();
        assert!(directory.add_follow("f1", "author").unwrap());
        assert!(directory.add_follow("f2", "author").unwrap());
        assert!(!directory.add_follow("f1", "author").unwrap());

        assert_eq!(
            directory.get_follower_ids("author").unwrap(),
            vec!["f1".to_string(), "f2".to_string()]
        );
        assert!(directory.is_following("f1", "author").unwrap());
        assert!(!directory.is_following("author", "f1").unwrap());

        assert!(directory.remove_follow("f1", "author").unwrap());
        assert!(!directory.is_following("f1", "author").unwrap());
        assert_eq!(directory.get_follower_ids("author").unwrap(), vec!["f2".to_string()]);
    }

    #[test]
    fn sessions_resolve_to_user_ids() {
        let directory = SqliteDirectory::in_memory().unwrap();
        directory.add_session("token-1", "u1").unwrap();
        assert_eq!(
            directory.resolve_session_token("token-1").unwrap(),
            Some("u1".to_string())
        );
        assert!(directory.resolve_session_token("nope").unwrap().is_none());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("directory.db");
        {
            let directory = SqliteDirectory::new(&path).unwrap();
            directory.add_user(&user("u1", Some("ayse"))).unwrap();
        }
        let directory = SqliteDirectory::new(&path).unwrap();
        assert_eq!(directory.display_name("u1"), Some("ayse".to_string()));
    }
}
