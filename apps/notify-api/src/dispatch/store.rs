//! Durable-notification collaborator contract.
//!
//! The relational implementation lives with the directory database and is
//! consumed through this trait; the in-memory implementation backs tests and
//! single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use signet_common::SnowflakeGenerator;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::hub::envelope::{AlertLevel, NotificationEnvelope, NotificationKind, NotificationPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationState {
    Unread,
    Read,
}

/// One persisted notification row, one per recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NotificationRecord {
    pub id: i64,
    pub notification_id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub alert: AlertLevel,
    pub subject: String,
    pub summary: String,
    pub body: String,
    pub state: NotificationState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub user_id: Option<String>,
    pub state: Option<NotificationState>,
    /// Zero means "no limit".
    pub limit: usize,
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Write one record per recipient. Returns `false` (without writing) when
    /// the envelope's payload carries nothing durable.
    async fn store_notification(
        &self,
        envelope: &NotificationEnvelope,
        state: NotificationState,
        recipient_user_ids: &[String],
    ) -> Result<bool, ApiError>;

    async fn count_unread(&self, user_id: &str) -> Result<i64, ApiError>;

    async fn query(&self, filter: &NotificationFilter) -> Result<Vec<NotificationRecord>, ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

pub struct MemoryNotificationStore {
    records: RwLock<Vec<NotificationRecord>>,
    snowflake: Arc<SnowflakeGenerator>,
}

impl MemoryNotificationStore {
    pub fn new(snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            snowflake,
        }
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn store_notification(
        &self,
        envelope: &NotificationEnvelope,
        state: NotificationState,
        recipient_user_ids: &[String],
    ) -> Result<bool, ApiError> {
        let NotificationPayload::Message {
            subject,
            summary,
            body,
        } = &envelope.payload
        else {
            return Ok(false);
        };

        let mut records = self.records.write();
        for user_id in recipient_user_ids {
            records.push(NotificationRecord {
                id: self.snowflake.generate(),
                notification_id: envelope.id.clone(),
                user_id: user_id.clone(),
                kind: envelope.kind,
                alert: envelope.alert,
                subject: subject.clone(),
                summary: summary.clone(),
                body: body.clone(),
                state,
                created_at: envelope.created_at,
            });
        }
        Ok(true)
    }

    async fn count_unread(&self, user_id: &str) -> Result<i64, ApiError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.user_id == user_id && r.state == NotificationState::Unread)
            .count() as i64)
    }

    async fn query(&self, filter: &NotificationFilter) -> Result<Vec<NotificationRecord>, ApiError> {
        let records = self.records.read();
        let mut matched: Vec<NotificationRecord> = records
            .iter()
            .filter(|r| {
                filter
                    .user_id
                    .as_deref()
                    .map_or(true, |user| r.user_id == user)
                    && filter.state.map_or(true, |state| r.state == state)
            })
            .cloned()
            .collect();
        // Newest first, matching the relational store's default ordering.
        matched.sort_by(|a, b| b.id.cmp(&a.id));
        if filter.limit > 0 {
            matched.truncate(filter.limit);
        }
        Ok(matched)
    }
}
