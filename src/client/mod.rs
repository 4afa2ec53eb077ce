//! Client side of the feed polling contract: an HTTP client for the
//! notification endpoints and a watcher that turns newly arrived
//! notifications into toasts.

mod http_client;
mod polling;

pub use http_client::NotificationsClient;
pub use polling::{FeedSource, NotificationWatcher, PollingSession, Toast, DEFAULT_POLL_INTERVAL};
