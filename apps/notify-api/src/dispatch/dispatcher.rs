//! Outbound notification routing.
//!
//! Two independent phases, deliberately non-transactional: a fire-and-forget
//! live send over the transport hub, then a durable write for message-bearing
//! payloads. A crash between the phases can deliver without persisting or the
//! reverse; the real-time channel serves connected clients and the durable
//! store serves catch-up reads, and they are allowed to drift.
//!
//! Only contract violations (wrong target kind) surface as errors. Transport
//! and persistence failures are logged and reported through
//! [`DeliveryOutcome`] so callers and tests can observe them without the
//! dispatcher ever failing the request.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::hub::envelope::{NotificationEnvelope, NotificationTarget, NOTIFY_COMMAND};
use crate::hub::session::address_key;
use crate::hub::transport::{HubFrame, TransportHub};
use crate::registry::PresenceDirectory;

use super::store::{NotificationState, NotificationStore};

/// What actually happened to a dispatched notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// At least one live connection received the frame.
    Delivered,
    /// No live connections matched; expected steady-state when the target is
    /// offline. Durable persistence still ran.
    NoRecipients,
    /// The live send could not be attempted or the presence lookup failed.
    TransportError,
    /// Live delivery ran, but the durable write failed.
    PersistenceError,
}

/// Contract violation: the caller used the wrong entry point for the
/// envelope's target. Rejected, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTarget {
    pub expected: NotificationTarget,
    pub actual: NotificationTarget,
}

impl fmt::Display for InvalidTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "notification target mismatch: expected {:?}, got {:?}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for InvalidTarget {}

impl From<InvalidTarget> for ApiError {
    fn from(err: InvalidTarget) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

/// Routes envelopes to live connections and the durable store.
pub struct NotificationDispatcher {
    hub: Arc<TransportHub>,
    presence: PresenceDirectory,
    store: Arc<dyn NotificationStore>,
    default_tenant: String,
}

impl NotificationDispatcher {
    pub fn new(
        hub: Arc<TransportHub>,
        presence: PresenceDirectory,
        store: Arc<dyn NotificationStore>,
        default_tenant: String,
    ) -> Self {
        Self {
            hub,
            presence,
            store,
            default_tenant,
        }
    }

    /// Deliver to a single user's live connections and persist a durable
    /// record for them. Requires `target = User`.
    pub async fn notify_user(
        &self,
        envelope: &NotificationEnvelope,
    ) -> Result<DeliveryOutcome, InvalidTarget> {
        if envelope.target != NotificationTarget::User {
            return Err(InvalidTarget {
                expected: NotificationTarget::User,
                actual: envelope.target,
            });
        }

        let tenant_id = envelope
            .tenant_id
            .as_deref()
            .unwrap_or(&self.default_tenant);
        let address = address_key(tenant_id, &envelope.target_id);

        let mut transport_failed = false;
        let delivered = match HubFrame::new(NOTIFY_COMMAND, envelope) {
            Ok(frame) => self.hub.send_to_user(&address, &frame),
            Err(e) => {
                tracing::error!(?e, notification_id = %envelope.id, "envelope serialization failed");
                transport_failed = true;
                0
            }
        };
        if delivered == 0 && !transport_failed {
            tracing::info!(%address, notification_id = %envelope.id, "no live connections for user notification");
        }

        if !self
            .persist(envelope, std::slice::from_ref(&envelope.target_id))
            .await
        {
            return Ok(DeliveryOutcome::PersistenceError);
        }

        Ok(if transport_failed {
            DeliveryOutcome::TransportError
        } else if delivered == 0 {
            DeliveryOutcome::NoRecipients
        } else {
            DeliveryOutcome::Delivered
        })
    }

    /// Deliver to every live connection under the envelope's tenant, either
    /// via the broadcast group or — when excluding the sender — as individual
    /// sends to the resolved connection subset. Requires `target = All`.
    pub async fn notify_all(
        &self,
        envelope: &NotificationEnvelope,
        exclude_user_id: Option<&str>,
    ) -> Result<DeliveryOutcome, InvalidTarget> {
        if envelope.target != NotificationTarget::All {
            return Err(InvalidTarget {
                expected: NotificationTarget::All,
                actual: envelope.target,
            });
        }

        let tenant_id = envelope.tenant_key().to_string();

        let mut transport_failed = false;
        let delivered = match HubFrame::new(NOTIFY_COMMAND, envelope) {
            Ok(frame) => match exclude_user_id {
                None => self.hub.send_to_group(&tenant_id, &frame),
                Some(excluded) => {
                    match self
                        .presence
                        .find_tenant_connections(&tenant_id, Some(excluded))
                        .await
                    {
                        Ok(connections) if connections.is_empty() => {
                            tracing::info!(
                                %tenant_id,
                                notification_id = %envelope.id,
                                "no recipients after excluding sender"
                            );
                            0
                        }
                        Ok(connections) => self.hub.send_to_connections(&connections, &frame),
                        Err(e) => {
                            tracing::error!(?e, %tenant_id, "presence lookup failed, skipping live delivery");
                            transport_failed = true;
                            0
                        }
                    }
                }
            },
            Err(e) => {
                tracing::error!(?e, notification_id = %envelope.id, "envelope serialization failed");
                transport_failed = true;
                0
            }
        };

        let recipients = self.tenant_recipients(&tenant_id, exclude_user_id).await;
        if !self.persist(envelope, &recipients).await {
            return Ok(DeliveryOutcome::PersistenceError);
        }

        Ok(if transport_failed {
            DeliveryOutcome::TransportError
        } else if delivered == 0 {
            DeliveryOutcome::NoRecipients
        } else {
            DeliveryOutcome::Delivered
        })
    }

    /// Distinct active users under a tenant, for durable fan-out. A failed
    /// registry read degrades to an empty recipient list — the live phase has
    /// already run and must not be unwound.
    async fn tenant_recipients(&self, tenant_id: &str, exclude_user_id: Option<&str>) -> Vec<String> {
        match self.presence.tenant_users(tenant_id, exclude_user_id).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(?e, %tenant_id, "recipient enumeration failed");
                Vec::new()
            }
        }
    }

    /// Durable write for message-bearing payloads. Returns `false` only when
    /// the store reported a failure; "nothing to persist" and an empty
    /// recipient list are both success.
    async fn persist(&self, envelope: &NotificationEnvelope, recipients: &[String]) -> bool {
        if !envelope.payload.is_message_bearing() || recipients.is_empty() {
            return true;
        }
        match self
            .store
            .store_notification(envelope, NotificationState::Unread, recipients)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(?e, notification_id = %envelope.id, "durable notification write failed");
                false
            }
        }
    }
}
