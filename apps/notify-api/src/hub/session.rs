//! Hub session lifecycle.
//!
//! A connection moves through `Connecting → Authenticated → Registered →
//! Active → Disconnecting → Removed`. Registration is best-effort: an
//! anonymous principal, an empty subject claim, or a registry write failure
//! leaves the connection untracked but never fails the transport. The
//! disconnect path is a no-op for untracked sessions.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::registry::ConnectionRegistry;

use super::transport::TransportHub;

/// Verified identity attached to a hub connection.
#[derive(Debug, Clone)]
pub struct HubPrincipal {
    /// Stable subject identifier from the token's `sub` claim.
    pub subject: String,
    /// Optional `tenant` claim.
    pub tenant: Option<String>,
}

/// Presence registration recorded for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub tenant_id: String,
    pub user_id: String,
}

/// Per-connection session state handed back to the connection loop.
#[derive(Debug)]
pub struct HubSession {
    pub connection_id: String,
    pub registration: Option<Registration>,
}

impl HubSession {
    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }
}

/// Address key for targeted sends.
pub fn address_key(tenant_id: &str, user_id: &str) -> String {
    format!("{tenant_id}:{user_id}")
}

/// Tenant resolution: the `tenant` claim wins, then the connection's host
/// name, then the configured sentinel. Always produces a value.
fn resolve_tenant(claim: Option<&str>, host: Option<&str>, fallback: &str) -> String {
    if let Some(tenant) = claim.filter(|t| !t.is_empty()) {
        return tenant.to_string();
    }
    match host.filter(|h| !h.is_empty()) {
        Some(host) => host.to_string(),
        None => fallback.to_string(),
    }
}

/// Drives connect/disconnect side effects: broadcast-group membership,
/// address binding, and the distributed registry entry.
pub struct SessionManager {
    registry: ConnectionRegistry,
    hub: Arc<TransportHub>,
    default_tenant: String,
}

impl SessionManager {
    pub fn new(registry: ConnectionRegistry, hub: Arc<TransportHub>, default_tenant: String) -> Self {
        Self {
            registry,
            hub,
            default_tenant,
        }
    }

    /// Handle a freshly connected transport session. Registers presence when
    /// the principal yields a usable subject; otherwise the connection stays
    /// anonymous and untracked, which is a supported mode, not an error.
    pub async fn on_connected(
        &self,
        connection_id: &str,
        principal: Option<&HubPrincipal>,
        host: Option<&str>,
    ) -> HubSession {
        let mut session = HubSession {
            connection_id: connection_id.to_string(),
            registration: None,
        };

        let Some(principal) = principal else {
            tracing::debug!(%connection_id, "anonymous hub connection, not tracked");
            return session;
        };

        let user_id = principal.subject.trim();
        if user_id.is_empty() {
            tracing::warn!(%connection_id, "principal has empty subject, skipping registration");
            return session;
        }

        let tenant_id = resolve_tenant(principal.tenant.as_deref(), host, &self.default_tenant);

        // Registry write first: if the store is down the connection degrades
        // to untracked without joining any group.
        match self.registry.add(&tenant_id, user_id, connection_id).await {
            Ok(()) => {
                self.hub.join_group(&tenant_id, connection_id);
                self.hub
                    .bind_address(&address_key(&tenant_id, user_id), connection_id);
                tracing::info!(%connection_id, %tenant_id, %user_id, "hub connection registered");
                session.registration = Some(Registration {
                    tenant_id,
                    user_id: user_id.to_string(),
                });
            }
            Err(e) => {
                tracing::error!(?e, %connection_id, "presence registration failed, connection untracked");
            }
        }

        session
    }

    /// Tear down a session. Failures are logged and swallowed — presence
    /// cleanup must never block the transport's disconnect sequence.
    pub async fn on_disconnected(&self, session: &HubSession, cancel: &CancellationToken) {
        self.hub.disconnect(&session.connection_id);

        let Some(registration) = &session.registration else {
            return;
        };

        self.hub
            .leave_group(&registration.tenant_id, &session.connection_id);
        self.hub.unbind_address(
            &address_key(&registration.tenant_id, &registration.user_id),
            &session.connection_id,
        );

        if let Err(e) = self
            .registry
            .remove(
                &session.connection_id,
                Some(&registration.tenant_id),
                Some(&registration.user_id),
                cancel,
            )
            .await
        {
            tracing::error!(
                ?e,
                connection_id = %session.connection_id,
                "failed to remove presence entry"
            );
        }
    }
}
