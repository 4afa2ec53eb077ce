//! The notification engine: turns platform events into per-recipient
//! notifications, aggregating likes and suppressing blocked, self-inflicted
//! and same-day duplicate notifications.

mod aggregator;
mod clock;
mod events;
pub mod messages;
mod models;
mod schema;
mod service;
mod sqlite_notification_store;
mod store;
mod suppression;

pub use aggregator::{LikeAggregator, LikeSubject};
pub use clock::{start_of_day_in, start_of_local_day, Clock, FixedClock, SystemClock};
pub use events::{DispatchOutcome, NotificationEvent};
pub use messages::TemplateCatalog;
pub use models::{
    FeedPage, LikeKind, LikeRemoval, LikeRendering, LocalizedText, NewNotification, Notification,
    NotificationActor, NotificationType, TemplateValue,
};
pub use schema::NOTIFICATIONS_VERSIONED_SCHEMAS;
pub use service::{NotificationService, NotificationSettings};
pub use sqlite_notification_store::SqliteNotificationStore;
pub use store::{LikeRenderer, NotificationStore};
pub use suppression::{SuppressionFilter, SuppressionReason};

use crate::directory::ContentDirectory;

/// Describes `actor_id` the way notifications show it. An unknown user or a
/// failed lookup yields a bare id.
pub(crate) fn describe_actor(directory: &dyn ContentDirectory, actor_id: &str) -> NotificationActor {
    let profile = directory.get_user(actor_id).ok().flatten();
    NotificationActor {
        id: actor_id.to_string(),
        nickname: profile.as_ref().and_then(|p| p.nickname.clone()),
        name: profile.as_ref().and_then(|p| p.display_name()),
    }
}
