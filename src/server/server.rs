use anyhow::{Context, Result};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::{ApiError, ApiResult};
use super::metrics::{metrics_handler, record_dispatch};
use super::session::Session;
use super::{log_requests, state::*, ServerConfig};
use crate::notifications::NotificationEvent;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct FeedQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl FeedQuery {
    /// Page defaults to 1, page size to the configured default, and the page
    /// size is clamped to [1, max_page_size].
    fn resolve(&self, config: &ServerConfig) -> (usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self
            .page_size
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size.max(1));
        (page, page_size)
    }
}

#[derive(Deserialize, Debug)]
struct MarkReadBody {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct NotificationActionBody {
    pub action: String,
    pub notification_id: Option<String>,
    pub actor_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCountResponse {
    success: bool,
    unread_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationActionResponse {
    success: bool,
    unread_count: usize,
    action: String,
}

fn required_id(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {}", field)))
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
    })
}

async fn get_notifications(
    session: Session,
    State(state): State<ServerState>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Response> {
    let (page, page_size) = query.resolve(&state.config);
    let feed = state
        .notification_service
        .get_feed(&session.user_id, page, page_size)?;
    Ok(Json(feed).into_response())
}

async fn post_notifications_read(
    session: Session,
    State(service): State<GuardedNotificationService>,
    Json(body): Json<MarkReadBody>,
) -> ApiResult<Response> {
    if body.ids.is_empty() {
        return Ok(Json(json!({ "success": false })).into_response());
    }
    let marked = service.mark_read_ids(&session.user_id, &body.ids)?;
    debug!("Marked {} notifications read for {}", marked, session.user_id);
    Ok(Json(UnreadCountResponse {
        success: true,
        unread_count: service.unread_count(&session.user_id)?,
    })
    .into_response())
}

async fn put_notifications(
    session: Session,
    State(service): State<GuardedNotificationService>,
    Json(body): Json<NotificationActionBody>,
) -> ApiResult<Response> {
    let user_id = session.user_id.as_str();
    match body.action.as_str() {
        "markAllRead" => {
            service.mark_all_read(user_id)?;
        }
        "delete" => {
            let notification_id = required_id(body.notification_id, "notificationId")?;
            service.delete_notification(user_id, &notification_id)?;
        }
        "blockUser" => {
            let actor_id = required_id(body.actor_id, "actorId")?;
            if actor_id == user_id {
                return Err(ApiError::BadRequest("Cannot block yourself".to_string()));
            }
            service.block_actor(user_id, &actor_id)?;
        }
        "unblockUser" => {
            let actor_id = required_id(body.actor_id, "actorId")?;
            service.unblock_actor(user_id, &actor_id)?;
        }
        other => {
            return Err(ApiError::BadRequest(format!("Invalid action: {}", other)));
        }
    }

    Ok(Json(NotificationActionResponse {
        success: true,
        unread_count: service.unread_count(user_id)?,
        action: body.action,
    })
    .into_response())
}

async fn post_notification_read(
    session: Session,
    State(service): State<GuardedNotificationService>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    service.mark_read(&session.user_id, &id)?;
    Ok(Json(UnreadCountResponse {
        success: true,
        unread_count: service.unread_count(&session.user_id)?,
    })
    .into_response())
}

/// Dispatch is best-effort, so this always answers 202 once the event parsed.
async fn post_event(
    session: Session,
    State(service): State<GuardedNotificationService>,
    Json(event): Json<NotificationEvent>,
) -> Response {
    let outcome = service.dispatch(&session.user_id, &event);
    record_dispatch(event.kind(), outcome.label());
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "outcome": outcome.label(),
            "created": outcome.notifications().len(),
        })),
    )
        .into_response()
}

pub fn make_app(
    config: ServerConfig,
    notification_service: GuardedNotificationService,
    directory: GuardedContentDirectory,
) -> Router {
    let state = ServerState::new(config, notification_service, directory);

    let notification_routes: Router = Router::new()
        .route(
            "/",
            get(get_notifications)
                .post(post_notifications_read)
                .put(put_notifications),
        )
        .route("/{id}/read", post(post_notification_read))
        .with_state(state.clone());

    let event_routes: Router = Router::new()
        .route("/", post(post_event))
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1/notifications", notification_routes)
        .nest("/v1/events", event_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    metrics_port: u16,
    notification_service: GuardedNotificationService,
    directory: GuardedContentDirectory,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, notification_service, directory);

    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    let metrics_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app())
            .with_graceful_shutdown(async move { metrics_shutdown.cancelled().await })
            .await
        {
            tracing::error!("Metrics server stopped: {}", err);
        }
    });
    info!("Metrics available on port {}", metrics_port);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
