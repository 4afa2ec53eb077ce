//! HTTP client for the notification endpoints.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::polling::FeedSource;
use crate::notifications::FeedPage;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    success: bool,
    unread_count: Option<usize>,
}

/// Talks to a notification server on behalf of one session.
pub struct NotificationsClient {
    client: reqwest::Client,
    base_url: String,
    session_token: String,
}

impl NotificationsClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the notification server (e.g., "http://localhost:3002")
    /// * `session_token` - Sent as a bearer token in the Authorization header
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: &str, session_token: &str, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: session_token.to_string(),
        })
    }

    fn notifications_url(&self) -> String {
        format!("{}/v1/notifications", self.base_url)
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.session_token)
    }

    /// Fetch one page of the feed. `page` starts at 1.
    pub async fn fetch_feed(&self, page: usize, page_size: usize) -> Result<FeedPage> {
        let response = self
            .client
            .get(self.notifications_url())
            .header("Authorization", self.authorization())
            .query(&[("page", page), ("pageSize", page_size)])
            .send()
            .await
            .context("Failed to connect to notification server")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch notifications: status {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse notifications response")
    }

    /// Mark the given notifications read. Returns the updated unread count.
    /// An empty `ids` is refused by the server and reported as an error.
    pub async fn mark_read(&self, ids: &[String]) -> Result<usize> {
        let response = self
            .client
            .post(self.notifications_url())
            .header("Authorization", self.authorization())
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .context("Failed to connect to notification server")?;

        self.unread_count_from(response).await
    }

    /// Mark every notification read. Returns the updated unread count.
    pub async fn mark_all_read(&self) -> Result<usize> {
        let response = self
            .client
            .put(self.notifications_url())
            .header("Authorization", self.authorization())
            .json(&json!({ "action": "markAllRead" }))
            .send()
            .await
            .context("Failed to connect to notification server")?;

        self.unread_count_from(response).await
    }

    async fn unread_count_from(&self, response: reqwest::Response) -> Result<usize> {
        if !response.status().is_success() {
            anyhow::bail!("Failed to update notifications: status {}", response.status());
        }
        let body: UpdateResponse = response
            .json()
            .await
            .context("Failed to parse unread count response")?;
        if !body.success {
            anyhow::bail!("Notification server did not apply the update");
        }
        body.unread_count
            .context("Notification server did not report an unread count")
    }
}

#[async_trait]
impl FeedSource for NotificationsClient {
    async fn fetch_feed(&self, page: usize, page_size: usize) -> Result<FeedPage> {
        NotificationsClient::fetch_feed(self, page, page_size).await
    }
}
