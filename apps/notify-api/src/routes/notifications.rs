//! Notification dispatch and catch-up read endpoints.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::dispatch::dispatcher::DeliveryOutcome;
use crate::dispatch::store::{NotificationFilter, NotificationRecord, NotificationState};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::hub::envelope::{
    AlertLevel, NotificationEnvelope, NotificationKind, NotificationPayload, NotificationTarget,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", post(send_notification).get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendNotificationRequest {
    pub kind: NotificationKind,
    pub alert: AlertLevel,
    pub target: NotificationTarget,
    /// External user id for `target = user`, tenant id for `target = all`.
    pub target_id: String,
    pub tenant_id: Option<String>,
    pub payload: NotificationPayload,
    /// For `target = all`: leave out the caller's own connections.
    #[serde(default)]
    pub exclude_sender: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendNotificationResponse {
    pub notification_id: String,
    pub outcome: DeliveryOutcome,
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications",
    tag = "Notifications",
    security(("bearer" = [])),
    request_body = SendNotificationRequest,
    responses(
        (status = 200, description = "Notification dispatched", body = SendNotificationResponse),
        (status = 400, description = "Invalid request", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn send_notification(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>, ApiError> {
    if req.target_id.trim().is_empty() {
        return Err(ApiError::validation(vec![FieldError {
            field: "target_id".to_string(),
            message: "target_id must not be empty".to_string(),
        }]));
    }

    let tenant_id = req.tenant_id.or(auth.tenant);
    let envelope = NotificationEnvelope::new(
        req.kind,
        req.alert,
        req.target,
        req.target_id,
        tenant_id,
        req.payload,
    );

    let outcome = match req.target {
        NotificationTarget::User => state.dispatcher.notify_user(&envelope).await?,
        NotificationTarget::All => {
            let exclude = req.exclude_sender.then_some(auth.user_id.as_str());
            state.dispatcher.notify_all(&envelope, exclude).await?
        }
    };

    tracing::info!(
        notification_id = %envelope.id,
        ?outcome,
        actor = %auth.user_id,
        "notification dispatched"
    );

    Ok(Json(SendNotificationResponse {
        notification_id: envelope.id,
        outcome,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread-count",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Unread notification count for the caller", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = state.store.count_unread(&auth.user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsParams {
    pub state: Option<NotificationState>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListNotificationsResponse {
    pub data: Vec<NotificationRecord>,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "Notifications",
    security(("bearer" = [])),
    params(
        ("state" = Option<NotificationState>, Query, description = "Filter by read state"),
        ("limit" = Option<usize>, Query, description = "Number of records (1-100, default 50)"),
    ),
    responses(
        (status = 200, description = "The caller's notifications, newest first", body = ListNotificationsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListNotificationsParams>,
) -> Result<Json<ListNotificationsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let data = state
        .store
        .query(&NotificationFilter {
            user_id: Some(auth.user_id),
            state: params.state,
            limit,
        })
        .await?;
    Ok(Json(ListNotificationsResponse { data }))
}
