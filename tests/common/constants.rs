//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (users, articles, comments, tokens),
//! update only this file.

#![allow(dead_code)]

// ============================================================================
// Test Users
// ============================================================================

/// Author of both test articles, followed by READER_1 and READER_2
pub const AUTHOR_ID: &str = "user-author";
pub const AUTHOR_NICKNAME: &str = "ayse";
pub const AUTHOR_TOKEN: &str = "token-author";

/// Reader with a nickname
pub const READER_1_ID: &str = "user-reader-1";
pub const READER_1_NICKNAME: &str = "burak";
pub const READER_1_TOKEN: &str = "token-reader-1";

/// Reader known only by first and last name
pub const READER_2_ID: &str = "user-reader-2";
pub const READER_2_NAME: &str = "Can";
pub const READER_2_SURNAME: &str = "Demir";
pub const READER_2_TOKEN: &str = "token-reader-2";

/// Reader without any display name
pub const READER_3_ID: &str = "user-reader-3";
pub const READER_3_TOKEN: &str = "token-reader-3";

/// Moderator who reviews articles
pub const MODERATOR_ID: &str = "user-moderator";
pub const MODERATOR_TOKEN: &str = "token-moderator";

// ============================================================================
// Test Content
// ============================================================================

/// "Rust in Production" by AUTHOR, slug "rust-in-production"
pub const ARTICLE_1_ID: &str = "article-1";
pub const ARTICLE_1_TITLE: &str = "Rust in Production";
pub const ARTICLE_1_SLUG: &str = "rust-in-production";

/// Untitled draft by AUTHOR, no slug
pub const ARTICLE_2_ID: &str = "article-2";

/// Comment by READER_1 on ARTICLE_1
pub const COMMENT_1_ID: &str = "comment-1";

/// Comment by AUTHOR on ARTICLE_1
pub const COMMENT_2_ID: &str = "comment-2";

/// Reply by READER_2 to COMMENT_1
pub const COMMENT_3_ID: &str = "comment-3";

/// Comment by READER_2 on ARTICLE_2
pub const COMMENT_4_ID: &str = "comment-4";

// ============================================================================
// Timeouts
// ============================================================================

/// Request timeout for test HTTP client
pub const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Maximum time to wait for server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval when waiting for server readiness
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;
