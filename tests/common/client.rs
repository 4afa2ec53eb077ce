//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all notification-server endpoints.
//!
//! When API routes or request formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client sending a session token with every request
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client sending `token` in the Authorization header
    pub fn authenticated(base_url: String, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..Self::new(base_url)
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    // ========================================================================
    // Feed Endpoints
    // ========================================================================

    /// GET /v1/notifications
    pub async fn get_notifications(&self) -> Response {
        self.request(reqwest::Method::GET, "/v1/notifications")
            .send()
            .await
            .expect("Get notifications request failed")
    }

    /// GET /v1/notifications?page&pageSize
    pub async fn get_notifications_page(&self, page: usize, page_size: usize) -> Response {
        self.request(reqwest::Method::GET, "/v1/notifications")
            .query(&[("page", page), ("pageSize", page_size)])
            .send()
            .await
            .expect("Get notifications request failed")
    }

    /// GET /v1/notifications, parsed. Panics on a non-200 response.
    pub async fn feed(&self) -> Value {
        let response = self.get_notifications().await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("Invalid feed body")
    }

    /// POST /v1/notifications
    pub async fn mark_read(&self, ids: &[&str]) -> Response {
        self.request(reqwest::Method::POST, "/v1/notifications")
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .expect("Mark read request failed")
    }

    /// POST /v1/notifications/{id}/read
    pub async fn mark_single_read(&self, notification_id: &str) -> Response {
        self.request(
            reqwest::Method::POST,
            &format!("/v1/notifications/{}/read", notification_id),
        )
        .send()
        .await
        .expect("Mark single read request failed")
    }

    /// PUT /v1/notifications
    pub async fn notification_action(&self, body: Value) -> Response {
        self.request(reqwest::Method::PUT, "/v1/notifications")
            .json(&body)
            .send()
            .await
            .expect("Notification action request failed")
    }

    pub async fn mark_all_read(&self) -> Response {
        self.notification_action(json!({ "action": "markAllRead" }))
            .await
    }

    pub async fn delete_notification(&self, notification_id: &str) -> Response {
        self.notification_action(json!({ "action": "delete", "notificationId": notification_id }))
            .await
    }

    pub async fn block_user(&self, actor_id: &str) -> Response {
        self.notification_action(json!({ "action": "blockUser", "actorId": actor_id }))
            .await
    }

    pub async fn unblock_user(&self, actor_id: &str) -> Response {
        self.notification_action(json!({ "action": "unblockUser", "actorId": actor_id }))
            .await
    }

    // ========================================================================
    // Event Endpoints
    // ========================================================================

    /// POST /v1/events
    pub async fn post_event(&self, event: Value) -> Response {
        self.request(reqwest::Method::POST, "/v1/events")
            .json(&event)
            .send()
            .await
            .expect("Post event request failed")
    }

    /// POST /v1/events, returning the reported outcome label
    pub async fn send_event(&self, event: Value) -> String {
        let response = self.post_event(event).await;
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        let body: Value = response.json().await.expect("Invalid event response");
        body["outcome"]
            .as_str()
            .expect("Missing outcome")
            .to_string()
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.request(reqwest::Method::GET, "/")
            .send()
            .await
            .expect("Home request failed")
    }
}
