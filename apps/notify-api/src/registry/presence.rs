//! Read side: presence queries derived from registry key patterns.

use crate::error::ApiError;

use super::{trailing_segment, user_segment, ConnectionRegistry, CLIENT_KEY_PREFIX};

/// Presence queries over the connection registry. Every method is a pattern
/// enumeration; nothing here writes.
#[derive(Clone)]
pub struct PresenceDirectory {
    registry: ConnectionRegistry,
}

impl PresenceDirectory {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Every registry key currently live, across all tenants. Raw keys —
    /// callers parse the segments they need. Users connected under several
    /// tenants appear once per connection, not deduplicated.
    pub async fn online_users(&self) -> Result<Vec<String>, ApiError> {
        self.registry
            .find_keys(&format!("{CLIENT_KEY_PREFIX}:*"))
            .await
    }

    /// Connection ids live under a tenant, optionally excluding every
    /// connection whose user segment matches `exclude_user_id`
    /// (case-insensitive). Returns only the trailing connection-id segment.
    pub async fn find_tenant_connections(
        &self,
        tenant_id: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<Vec<String>, ApiError> {
        let keys = self
            .registry
            .find_keys(&format!("{CLIENT_KEY_PREFIX}:{tenant_id}:*"))
            .await?;

        Ok(keys
            .iter()
            .filter(|key| match exclude_user_id {
                Some(excluded) => user_segment(key)
                    .map(|user| !user.eq_ignore_ascii_case(excluded))
                    .unwrap_or(true),
                None => true,
            })
            .map(|key| trailing_segment(key).to_string())
            .collect())
    }

    /// Distinct external user ids with at least one live connection under a
    /// tenant, optionally excluding one user (case-insensitive). Sorted, for
    /// deterministic durable fan-out.
    pub async fn tenant_users(
        &self,
        tenant_id: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<Vec<String>, ApiError> {
        let keys = self
            .registry
            .find_keys(&format!("{CLIENT_KEY_PREFIX}:{tenant_id}:*"))
            .await?;

        let mut users = std::collections::BTreeSet::new();
        for key in &keys {
            if let Some(user) = user_segment(key) {
                let excluded = exclude_user_id
                    .map(|ex| user.eq_ignore_ascii_case(ex))
                    .unwrap_or(false);
                if !excluded {
                    users.insert(user.to_string());
                }
            }
        }
        Ok(users.into_iter().collect())
    }

    /// Full registry keys for one user's connections under a tenant. Unlike
    /// `find_tenant_connections` this returns whole keys — callers that need
    /// the connection id extract it themselves. Both shapes have dependants;
    /// do not unify them.
    pub async fn get_connections(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, ApiError> {
        self.registry
            .find_keys(&format!("{CLIENT_KEY_PREFIX}:{tenant_id}:{user_id}:*"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::kv::MemoryStore;

    async fn directory_with(entries: &[(&str, &str, &str)]) -> PresenceDirectory {
        let registry = ConnectionRegistry::new(Arc::new(MemoryStore::new()));
        for (tenant, user, conn) in entries {
            registry.add(tenant, user, conn).await.unwrap();
        }
        PresenceDirectory::new(registry)
    }

    #[tokio::test]
    async fn online_users_returns_raw_keys() {
        let dir = directory_with(&[("acme", "user1", "c1"), ("globex", "user2", "c2")]).await;

        let mut keys = dir.online_users().await.unwrap();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "notification_clients:acme:user1:c1",
                "notification_clients:globex:user2:c2",
            ]
        );
    }

    #[tokio::test]
    async fn tenant_connections_returns_connection_ids_only() {
        let dir = directory_with(&[
            ("acme", "user1", "c1"),
            ("acme", "user2", "c2"),
            ("globex", "user3", "c3"),
        ])
        .await;

        let mut conns = dir.find_tenant_connections("acme", None).await.unwrap();
        conns.sort();
        assert_eq!(conns, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn tenant_connections_excludes_user_case_insensitively() {
        let dir = directory_with(&[("acme", "User1", "c1"), ("acme", "user2", "c2")]).await;

        let conns = dir
            .find_tenant_connections("acme", Some("user1"))
            .await
            .unwrap();
        assert_eq!(conns, vec!["c2"]);
    }

    #[tokio::test]
    async fn get_connections_returns_full_keys() {
        let dir = directory_with(&[("acme", "user1", "conn-123")]).await;

        let keys = dir.get_connections("acme", "user1").await.unwrap();
        assert_eq!(keys, vec!["notification_clients:acme:user1:conn-123"]);
    }

    #[tokio::test]
    async fn get_connections_for_unknown_user_is_empty() {
        let dir = directory_with(&[("acme", "user1", "c1")]).await;
        assert!(dir.get_connections("acme", "ghost").await.unwrap().is_empty());
    }
}
