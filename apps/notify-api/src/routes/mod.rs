pub mod health;
pub mod notifications;
pub mod presence;

use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::hub::server::router())
        .nest(
            "/api/v1",
            notifications::router().merge(presence::router()),
        )
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Notifications
        notifications::send_notification,
        notifications::list_notifications,
        notifications::unread_count,
        // Presence
        presence::tenant_presence,
        presence::user_connections,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Wire model
            crate::hub::envelope::NotificationEnvelope,
            crate::hub::envelope::NotificationKind,
            crate::hub::envelope::AlertLevel,
            crate::hub::envelope::NotificationTarget,
            crate::hub::envelope::NotificationPayload,
            crate::dispatch::dispatcher::DeliveryOutcome,
            crate::dispatch::store::NotificationRecord,
            crate::dispatch::store::NotificationState,
            // Route request/response types
            health::HealthResponse,
            notifications::SendNotificationRequest,
            notifications::SendNotificationResponse,
            notifications::UnreadCountResponse,
            notifications::ListNotificationsResponse,
            presence::TenantPresenceResponse,
            presence::UserConnectionsResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Notifications", description = "Real-time notification dispatch and catch-up reads"),
        (name = "Presence", description = "Live connection queries"),
    )
)]
pub struct ApiDoc;
