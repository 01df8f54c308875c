//! Distributed connection registry and the presence queries built on it.

pub mod connections;
pub mod presence;

pub use connections::ConnectionRegistry;
pub use presence::PresenceDirectory;

/// Prefix for every registry key. Full keys look like
/// `notification_clients:<tenant_id>:<external_user_id>:<connection_id>`.
pub const CLIENT_KEY_PREFIX: &str = "notification_clients";

/// Key components must never contain `:` — it would corrupt segment parsing.
pub const KEY_DELIMITER: char = ':';

pub(crate) fn client_key(tenant_id: &str, user_id: &str, connection_id: &str) -> String {
    format!("{CLIENT_KEY_PREFIX}:{tenant_id}:{user_id}:{connection_id}")
}

/// Trailing connection-id segment of a registry key. A malformed key with no
/// delimiter is returned whole rather than failing.
pub(crate) fn trailing_segment(key: &str) -> &str {
    key.rsplit_once(KEY_DELIMITER)
        .map(|(_, tail)| tail)
        .unwrap_or(key)
}

/// User segment of a fully-qualified registry key.
pub(crate) fn user_segment(key: &str) -> Option<&str> {
    key.split(KEY_DELIMITER).nth(2)
}
