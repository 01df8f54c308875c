//! Key-value store abstraction backing the connection registry.
//!
//! Backed by Redis in production and an in-memory map in tests. The registry
//! only needs single-key upsert/delete plus glob enumeration; no TTLs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ApiError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError>;
    async fn del(&self, key: &str) -> Result<(), ApiError>;
    /// All keys matching a glob pattern (`*` matches zero or more characters).
    async fn find_keys(&self, pattern: &str) -> Result<Vec<String>, ApiError>;
}

// ---------------------------------------------------------------------------
// Redis implementation
// ---------------------------------------------------------------------------

/// Redis-backed store. `ConnectionManager` multiplexes and reconnects, so the
/// struct is cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, ApiError> {
        let client = redis::Client::open(redis_url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(|e| {
            tracing::error!(?e, "redis set failed");
            ApiError::from(e)
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let val: Option<String> = conn.get(key).await.map_err(|e| {
            tracing::error!(?e, "redis get failed");
            ApiError::from(e)
        })?;
        Ok(val)
    }

    async fn del(&self, key: &str) -> Result<(), ApiError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(|e| {
            tracing::error!(?e, "redis del failed");
            ApiError::from(e)
        })
    }

    async fn find_keys(&self, pattern: &str) -> Result<Vec<String>, ApiError> {
        use redis::AsyncCommands;
        // SCAN, not KEYS — enumeration must not block the server.
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut iter = conn.scan_match::<_, String>(pattern).await.map_err(|e| {
            tracing::error!(?e, "redis scan failed");
            ApiError::from(e)
        })?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests and single-process deployments)
// ---------------------------------------------------------------------------

pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn del(&self, key: &str) -> Result<(), ApiError> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    async fn find_keys(&self, pattern: &str) -> Result<Vec<String>, ApiError> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect())
    }
}

/// Match `input` against `pattern`, where `*` matches zero or more characters
/// and every other byte matches literally. Same semantics Redis applies to
/// SCAN MATCH patterns built from `*`-only wildcards.
fn glob_match(pattern: &str, input: &str) -> bool {
    let p = pattern.as_bytes();
    let s = input.as_bytes();
    let (mut pi, mut si) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while si < s.len() {
        if pi < p.len() && p[pi] != b'*' && p[pi] == s[si] {
            pi += 1;
            si += 1;
        } else if pi < p.len() && p[pi] == b'*' {
            star = Some(pi);
            mark = si;
            pi += 1;
        } else if let Some(star_pos) = star {
            // Backtrack: let the last `*` swallow one more character.
            pi = star_pos + 1;
            mark += 1;
            si = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_literal_match() {
        assert!(glob_match("abc", "abc"));
        assert!(!glob_match("abc", "abd"));
        assert!(!glob_match("abc", "abcd"));
    }

    #[test]
    fn glob_star_matches_zero_or_more() {
        assert!(glob_match("a*", "a"));
        assert!(glob_match("a*", "abc"));
        assert!(glob_match("*c", "abc"));
        assert!(glob_match("a*c", "ac"));
        assert!(glob_match("a*c", "abbbc"));
        assert!(!glob_match("a*c", "abd"));
    }

    #[test]
    fn glob_multiple_stars() {
        assert!(glob_match("nc:*:*:conn-1", "nc:acme:user1:conn-1"));
        assert!(!glob_match("nc:*:*:conn-1", "nc:acme:user1:conn-2"));
        assert!(glob_match("nc:acme:*", "nc:acme:user1:conn-1"));
    }

    #[tokio::test]
    async fn memory_store_find_keys() {
        let store = MemoryStore::new();
        store.set("nc:acme:u1:c1", "acme").await.unwrap();
        store.set("nc:acme:u2:c2", "acme").await.unwrap();
        store.set("nc:globex:u1:c3", "globex").await.unwrap();

        let mut keys = store.find_keys("nc:acme:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["nc:acme:u1:c1", "nc:acme:u2:c2"]);

        let all = store.find_keys("nc:*").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn memory_store_set_get_del() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
