//! Test fixture creation
//!
//! Seeds the community directory the notification engine reads from.

use super::constants::*;
use anyhow::Result;
use notification_server::directory::{ArticleRef, CommentRef, SqliteDirectory, UserProfile};
use std::path::Path;

fn user(id: &str, nickname: Option<&str>, name: Option<&str>, surname: Option<&str>) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        nickname: nickname.map(str::to_string),
        name: name.map(str::to_string),
        surname: surname.map(str::to_string),
    }
}

/// Creates a directory database at `db_path` holding the users, sessions,
/// articles, comments and follows described in `constants`.
pub fn create_test_directory(db_path: &Path) -> Result<SqliteDirectory> {
    let directory = SqliteDirectory::new(db_path)?;

    for (profile, token) in [
        (user(AUTHOR_ID, Some(AUTHOR_NICKNAME), Some("Ayse"), None), AUTHOR_TOKEN),
        (user(READER_1_ID, Some(READER_1_NICKNAME), None, None), READER_1_TOKEN),
        (
            user(READER_2_ID, None, Some(READER_2_NAME), Some(READER_2_SURNAME)),
            READER_2_TOKEN,
        ),
        (user(READER_3_ID, None, None, None), READER_3_TOKEN),
        (user(MODERATOR_ID, Some("mod"), None, None), MODERATOR_TOKEN),
    ] {
        directory.add_user(&profile)?;
        directory.add_session(token, &profile.id)?;
    }

    directory.add_article(&ArticleRef {
        id: ARTICLE_1_ID.to_string(),
        author_id: AUTHOR_ID.to_string(),
        title: Some(ARTICLE_1_TITLE.to_string()),
        slug: Some(ARTICLE_1_SLUG.to_string()),
    })?;
    directory.add_article(&ArticleRef {
        id: ARTICLE_2_ID.to_string(),
        author_id: AUTHOR_ID.to_string(),
        title: None,
        slug: None,
    })?;

    for (id, article_id, author_id) in [
        (COMMENT_1_ID, ARTICLE_1_ID, READER_1_ID),
        (COMMENT_2_ID, ARTICLE_1_ID, AUTHOR_ID),
        (COMMENT_3_ID, ARTICLE_1_ID, READER_2_ID),
        (COMMENT_4_ID, ARTICLE_2_ID, READER_2_ID),
    ] {
        directory.add_comment(&CommentRef {
            id: id.to_string(),
            article_id: article_id.to_string(),
            author_id: author_id.to_string(),
        })?;
    }

    directory.add_follow(READER_1_ID, AUTHOR_ID)?;
    directory.add_follow(READER_2_ID, AUTHOR_ID)?;

    Ok(directory)
}
