use axum::extract::FromRef;

use crate::directory::ContentDirectory;
use crate::notifications::NotificationService;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedNotificationService = Arc<NotificationService>;
pub type GuardedContentDirectory = Arc<dyn ContentDirectory>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub notification_service: GuardedNotificationService,
    pub directory: GuardedContentDirectory,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        notification_service: GuardedNotificationService,
        directory: GuardedContentDirectory,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            notification_service,
            directory,
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedNotificationService {
    fn from_ref(input: &ServerState) -> Self {
        input.notification_service.clone()
    }
}

impl FromRef<ServerState> for GuardedContentDirectory {
    fn from_ref(input: &ServerState) -> Self {
        input.directory.clone()
    }
}
