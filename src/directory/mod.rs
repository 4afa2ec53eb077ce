//! Read-side view of the community data the notification engine depends on.
//!
//! Users, articles, comments, follow edges and session tokens are owned by other
//! parts of the platform. The engine only needs to resolve them, so it talks to
//! them through [`ContentDirectory`].

mod models;
mod schema;
mod sqlite_directory;

pub use models::{ArticleRef, CommentRef, UserProfile};
pub use schema::DIRECTORY_VERSIONED_SCHEMAS;
pub use sqlite_directory::SqliteDirectory;

use anyhow::Result;

pub trait ContentDirectory: Send + Sync {
    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Returns Ok(None) if the article does not exist.
    fn get_article(&self, article_id: &str) -> Result<Option<ArticleRef>>;

    /// Returns Ok(None) if the comment does not exist.
    fn get_comment(&self, comment_id: &str) -> Result<Option<CommentRef>>;

    /// Ids of every user following `user_id`, oldest follow first.
    fn get_follower_ids(&self, user_id: &str) -> Result<Vec<String>>;

    fn is_following(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        Ok(self
            .get_follower_ids(followed_id)?
            .iter()
            .any(|id| id == follower_id))
    }

    /// Maps a session token to the id of the user owning it.
    fn resolve_session_token(&self, token: &str) -> Result<Option<String>>;

    /// Best-effort display name lookup. Lookup failures count as "no name".
    fn display_name(&self, user_id: &str) -> Option<String> {
        self.get_user(user_id)
            .ok()
            .flatten()
            .and_then(|user| user.display_name())
    }
}
