use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{NotificationError, NotificationEvent, NotificationLogEntry};

/// Audit trail of delivery attempts.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn record(&self, entry: NotificationLogEntry) -> Result<(), NotificationError>;

    /// Whether a *successful* `event` notification for `booking_id` was logged at or after `since`.
    async fn has_sent_since(
        &self,
        booking_id: Uuid,
        event: NotificationEvent,
        since: DateTime<Utc>,
    ) -> Result<bool, NotificationError>;
}

#[derive(Default)]
pub struct InMemoryNotificationLog {
    entries: RwLock<Vec<NotificationLogEntry>>,
}

impl InMemoryNotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<NotificationLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl NotificationLog for InMemoryNotificationLog {
    async fn record(&self, entry: NotificationLogEntry) -> Result<(), NotificationError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn has_sent_since(
        &self,
        booking_id: Uuid,
        event: NotificationEvent,
        since: DateTime<Utc>,
    ) -> Result<bool, NotificationError> {
        Ok(self.entries.read().await.iter().any(|e| {
            e.booking_id == booking_id && e.event == event && e.success && e.sent_at >= since
        }))
    }
}

/// `notification_logs` table.
pub struct SupabaseNotificationLog {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseNotificationLog {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl NotificationLog for SupabaseNotificationLog {
    async fn record(&self, entry: NotificationLogEntry) -> Result<(), NotificationError> {
        debug!("Recording {} notification via {} for booking {}", entry.event, entry.channel, entry.booking_id);

        let row = json!({
            "booking_id": entry.booking_id,
            "channel": entry.channel,
            "event": entry.event,
            "sent_at": entry.sent_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "result": if entry.success { "success" } else { "failed" },
            "provider_msg_id": entry.provider_msg_id,
            "error": entry.error,
        });

        let _: Vec<Value> = self
            .supabase
            .request_returning(Method::POST, "/rest/v1/notification_logs", row)
            .await
            .map_err(|e| NotificationError::Log(e.to_string()))?;

        Ok(())
    }

    async fn has_sent_since(
        &self,
        booking_id: Uuid,
        event: NotificationEvent,
        since: DateTime<Utc>,
    ) -> Result<bool, NotificationError> {
        let path = format!(
            "/rest/v1/notification_logs?booking_id=eq.{}&event=eq.{}&result=eq.success&sent_at=gte.{}&select=id&limit=1",
            booking_id,
            event,
            since.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| NotificationError::Log(e.to_string()))?;

        Ok(!rows.is_empty())
    }
}
