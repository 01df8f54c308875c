//! Notification wire model: the envelope delivered over the hub and handed to
//! the durable store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signet_common::id::{prefix, prefixed_ulid};
use utoipa::ToSchema;

/// The single logical command name used for every hub delivery.
pub const NOTIFY_COMMAND: &str = "notification";

/// Enumerated notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Message,
    Audit,
    System,
}

/// Severity/style tag rendered by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Addressing mode: one user, or every live connection in a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTarget {
    User,
    All,
}

/// Tagged union over the payload shapes the hub carries. Delivery and
/// persistence code match on this exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// Human-readable message; the only variant that produces a durable
    /// notification record.
    Message {
        subject: String,
        summary: String,
        body: String,
    },
    /// Administrative audit event (actor did something reviewers care about).
    Audit { actor_id: String, action: String },
    /// Machine-facing signal (cache flush, forced logout, config reload).
    System { code: String },
}

impl NotificationPayload {
    /// Whether this payload warrants a durable per-recipient record.
    pub fn is_message_bearing(&self) -> bool {
        matches!(self, NotificationPayload::Message { .. })
    }
}

/// The message unit sent over the real-time channel.
///
/// `target = User` addresses `target_id` as an external user id within
/// `tenant_id`; `target = All` addresses every live connection under the
/// tenant, where `tenant_id` falls back to `target_id` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NotificationEnvelope {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub kind: NotificationKind,
    pub alert: AlertLevel,
    pub target: NotificationTarget,
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub payload: NotificationPayload,
}

impl NotificationEnvelope {
    pub fn new(
        kind: NotificationKind,
        alert: AlertLevel,
        target: NotificationTarget,
        target_id: impl Into<String>,
        tenant_id: Option<String>,
        payload: NotificationPayload,
    ) -> Self {
        Self {
            id: prefixed_ulid(prefix::NOTIFICATION),
            created_at: Utc::now(),
            kind,
            alert,
            target,
            target_id: target_id.into(),
            tenant_id,
            payload,
        }
    }

    /// Tenant addressing key: `tenant_id`, falling back to `target_id`.
    pub fn tenant_key(&self) -> &str {
        self.tenant_id.as_deref().unwrap_or(&self.target_id)
    }
}
