use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub nickname: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
}

impl UserProfile {
    /// Nickname first, then "name surname", then the bare name.
    pub fn display_name(&self) -> Option<String> {
        fn non_empty(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        if let Some(nickname) = non_empty(&self.nickname) {
            return Some(nickname.to_string());
        }
        match (non_empty(&self.name), non_empty(&self.surname)) {
            (Some(name), Some(surname)) => Some(format!("{} {}", name, surname)),
            (Some(name), None) => Some(name.to_string()),
            _ => None,
        }
    }

    /// Path of the user's public profile page.
    pub fn profile_link(&self) -> String {
        match self.nickname.as_deref().filter(|n| !n.is_empty()) {
            Some(nickname) => format!("/{}", nickname),
            None => format!("/user/{}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub id: String,
    pub author_id: String,
    pub title: Option<String>,
    pub slug: Option<String>,
}

impl ArticleRef {
    /// The slug used in links, falling back to the article id.
    pub fn link_slug(&self) -> &str {
        self.slug
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
    }

    pub fn link(&self) -> String {
        format!("/article/{}", self.link_slug())
    }

    pub fn comment_link(&self, comment_id: &str) -> String {
        format!("/article/{}#comment-{}", self.link_slug(), comment_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRef {
    pub id: String,
    pub article_id: String,
    pub author_id: String,
}
