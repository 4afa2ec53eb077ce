use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::notifications::{FeedPage, Notification, TemplateCatalog};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_PAGE_SIZE: usize = 20;

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, page: usize, page_size: usize) -> Result<FeedPage>;
}

/// Remembers which notifications a client has already seen, so each poll can
/// tell new arrivals from backlog.
#[derive(Debug)]
pub struct PollingSession {
    known_ids: HashSet<String>,
    initial_load: bool,
}

impl Default for PollingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingSession {
    pub fn new() -> Self {
        Self {
            known_ids: HashSet::new(),
            initial_load: true,
        }
    }

    pub fn is_initial_load(&self) -> bool {
        self.initial_load
    }

    /// Returns the unread items that were not in the previous poll. The first
    /// call only records what is there and returns nothing.
    pub fn observe(&mut self, items: &[Notification]) -> Vec<Notification> {
        let arrived = if self.initial_load {
            vec![]
        } else {
            items
                .iter()
                .filter(|item| !item.read && !self.known_ids.contains(&item.id))
                .cloned()
                .collect()
        };

        self.known_ids = items.iter().map(|item| item.id.clone()).collect();
        self.initial_load = false;
        arrived
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub text: String,
    pub link: Option<String>,
}

impl Toast {
    /// Uses the title, or the message when the title renders empty.
    pub fn render(notification: &Notification, catalog: &TemplateCatalog) -> Self {
        let title = catalog.render(&notification.title);
        let text = if title.trim().is_empty() {
            catalog.render(&notification.message)
        } else {
            title
        };
        Toast {
            text,
            link: notification.link.clone(),
        }
    }
}

pub struct NotificationWatcher {
    source: Arc<dyn FeedSource>,
    catalog: TemplateCatalog,
    interval: Duration,
    page_size: usize,
    session: PollingSession,
}

impl NotificationWatcher {
    pub fn new(source: Arc<dyn FeedSource>, catalog: TemplateCatalog) -> Self {
        Self {
            source,
            catalog,
            interval: DEFAULT_POLL_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
            session: PollingSession::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fetches the first feed page and returns toasts for what arrived since
    /// the last poll. Notifications from blocked actors are skipped.
    pub async fn poll_once(&mut self) -> Result<Vec<Toast>> {
        let page = self.source.fetch_feed(1, self.page_size).await?;
        let blocked: HashSet<&str> = page.blocked_actor_ids.iter().map(String::as_str).collect();
        let visible: Vec<Notification> = page
            .data
            .iter()
            .filter(|item| item.actor_id().map_or(true, |id| !blocked.contains(id)))
            .cloned()
            .collect();

        let arrived = self.session.observe(&visible);
        debug!(
            "Polled {} notifications ({} unread), {} new",
            visible.len(),
            page.unread_count,
            arrived.len()
        );
        Ok(arrived
            .iter()
            .map(|notification| Toast::render(notification, &self.catalog))
            .collect())
    }

    /// Polls until `shutdown` is cancelled or the toast receiver goes away.
    /// Failed polls are logged and retried on the next tick.
    pub async fn run(mut self, shutdown: CancellationToken, toasts: mpsc::Sender<Toast>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Notification watcher stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let arrived = match self.poll_once().await {
                Ok(arrived) => arrived,
                Err(err) => {
                    warn!("Failed to poll notifications: {:#}", err);
                    continue;
                }
            };

            for toast in arrived {
                if toasts.send(toast).await.is_err() {
                    debug!("Toast receiver dropped, stopping watcher");
                    return;
                }
            }
        }
    }
}
