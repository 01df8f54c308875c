//! Write side of the connection registry.
//!
//! Maps `(tenant_id, external_user_id, connection_id)` triples to a liveness
//! marker in the shared key-value store, so any process in the deployment can
//! resolve which connections are live. Entries have no TTL: a process that
//! dies without running its disconnect path leaves its keys behind until a
//! removal matching the same connection id runs. Presence queries tolerate
//! that staleness.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::kv::KeyValueStore;

use super::{client_key, CLIENT_KEY_PREFIX};

/// Registry handle. Cheap to clone; the store is shared behind an `Arc`.
#[derive(Clone)]
pub struct ConnectionRegistry {
    kv: Arc<dyn KeyValueStore>,
}

impl ConnectionRegistry {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Record a live connection. Idempotent: re-adding the same triple
    /// overwrites the existing entry. Only store failures propagate.
    pub async fn add(
        &self,
        tenant_id: &str,
        user_id: &str,
        connection_id: &str,
    ) -> Result<(), ApiError> {
        let key = client_key(tenant_id, user_id, connection_id);
        // The value is the tenant id, used purely as an existence marker.
        self.kv.set(&key, tenant_id).await
    }

    /// Remove every entry for `connection_id`. Tenant and user qualifiers only
    /// narrow the search pattern; omitting them substitutes a wildcard and
    /// still deletes only keys whose trailing segment is this connection id.
    ///
    /// Returns the number of keys deleted; zero matches is a no-op, not an
    /// error. Cancellation stops the loop between deletions — already-issued
    /// deletes complete, and any keys left behind are swept up by a later
    /// removal for the same connection id.
    pub async fn remove(
        &self,
        connection_id: &str,
        tenant_id: Option<&str>,
        user_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<usize, ApiError> {
        let pattern = format!(
            "{CLIENT_KEY_PREFIX}:{}:{}:{}",
            tenant_id.unwrap_or("*"),
            user_id.unwrap_or("*"),
            connection_id,
        );

        let keys = self.kv.find_keys(&pattern).await?;
        let mut removed = 0;
        for key in keys {
            if cancel.is_cancelled() {
                tracing::debug!(
                    %connection_id,
                    removed,
                    "registry removal cancelled mid-enumeration"
                );
                break;
            }
            self.kv.del(&key).await?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Raw glob enumeration against the store's key space.
    pub async fn find_keys(&self, pattern: &str) -> Result<Vec<String>, ApiError> {
        self.kv.find_keys(pattern).await
    }
}
