//! Notification Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod client;
pub mod config;
pub mod directory;
pub mod notifications;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use directory::{ContentDirectory, SqliteDirectory};
pub use notifications::{
    NotificationEvent, NotificationService, NotificationSettings, NotificationStore,
    SqliteNotificationStore,
};
pub use server::{make_app, run_server, RequestsLoggingLevel};
